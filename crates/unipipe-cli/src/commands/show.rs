use unipipe_state::ServiceInstanceRepository;

pub fn show(repo: &ServiceInstanceRepository, id: &str) -> anyhow::Result<()> {
    let Some(instance) = repo.try_get_service_instance(id)? else {
        anyhow::bail!("service instance {id} not found");
    };
    let status = repo.get_service_instance_status(id)?;

    print!("{}", serde_yaml::to_string(&instance)?);
    println!("---");
    print!("{}", serde_yaml::to_string(&status)?);
    Ok(())
}
