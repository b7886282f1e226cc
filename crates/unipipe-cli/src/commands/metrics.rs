use chrono::{DateTime, Utc};
use unipipe_state::{MetricType, ServiceInstanceRepository};

pub fn metrics(
    repo: &ServiceInstanceRepository,
    id: &str,
    kind: MetricType,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> anyhow::Result<()> {
    anyhow::ensure!(from <= to, "--from must not be after --to");
    let series = repo.metrics_of_type(kind, id, from, to)?;
    tracing::debug!(%id, %kind, series = series.len(), "metrics loaded");
    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}
