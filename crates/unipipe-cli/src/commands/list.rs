use unipipe_state::{ServiceInstance, ServiceInstanceRepository, Status};

pub fn list(repo: &ServiceInstanceRepository, service_id: Option<&str>) -> anyhow::Result<()> {
    let instances = match service_id {
        Some(id) => repo.find_instances_by_service_id(id)?,
        None => repo.list_instances()?,
    };

    if instances.is_empty() {
        println!("No service instances found.");
        return Ok(());
    }

    for instance in &instances {
        let status = repo.get_service_instance_status(&instance.service_instance_id)?;
        println!("{}", format_row(instance, &status));
    }
    Ok(())
}

fn format_row(instance: &ServiceInstance, status: &Status) -> String {
    let deleted = if instance.deleted { "deleted" } else { "-" };
    format!(
        "{:<38} {:<24} {:<8} {} ({})",
        instance.service_instance_id,
        instance.service_definition_id,
        deleted,
        status.status,
        status.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_contains_all_columns() {
        let instance = ServiceInstance::new("abc", "postgres", "small").marked_deleted();
        let row = format_row(&instance, &Status::default_status());

        assert!(row.starts_with("abc "));
        assert!(row.contains("postgres"));
        assert!(row.contains("deleted"));
        assert!(row.ends_with("in progress (preparing deployment)"));
    }
}
