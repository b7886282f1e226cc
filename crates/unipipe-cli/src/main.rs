use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use unipipe_core::BrokerConfig;
use unipipe_state::{MetricType, ServiceInstanceRepository};

mod commands;

#[derive(Parser)]
#[command(
    name = "unipipe",
    about = "UniPipe — inspect a git-backed service broker repository",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to unipipe.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Repository directory. Overrides [git].local_path from the config.
    #[arg(short, long, global = true)]
    repo: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List service instances, oldest first
    List {
        /// Only show instances of this service definition
        #[arg(long)]
        service_id: Option<String>,
    },
    /// Show the descriptor and status of a service instance
    Show {
        /// Service instance id
        id: String,
    },
    /// Query metrics of a service instance within [from, to].
    ///
    /// Timestamps are RFC 3339, e.g. 2024-03-01T00:00:00Z.
    Metrics {
        /// Service instance id
        id: String,
        /// Metric type: gauge, periodic, or sampling
        #[arg(short, long)]
        kind: MetricType,
        #[arg(long)]
        from: DateTime<Utc>,
        #[arg(long)]
        to: DateTime<Utc>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<BrokerConfig> {
    let mut config = match &cli.config {
        Some(path) => BrokerConfig::from_file(path)?,
        None => BrokerConfig::default(),
    };
    if let Some(repo) = &cli.repo {
        config.git.local_path = repo.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("unipipe=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    anyhow::ensure!(
        config.git.local_path.is_dir(),
        "repository directory {} does not exist",
        config.git.local_path.display()
    );
    let repo = ServiceInstanceRepository::open(&config.git)?;

    match cli.command {
        Commands::List { service_id } => commands::list::list(&repo, service_id.as_deref()),
        Commands::Show { id } => commands::show::show(&repo, &id),
        Commands::Metrics { id, kind, from, to } => {
            commands::metrics::metrics(&repo, &id, kind, from, to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_metrics_arguments() {
        let cli = Cli::try_parse_from([
            "unipipe",
            "--repo",
            "/srv/repo",
            "metrics",
            "abc",
            "--kind",
            "periodic",
            "--from",
            "2024-03-01T00:00:00Z",
            "--to",
            "2024-03-02T00:00:00Z",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.git.local_path, PathBuf::from("/srv/repo"));
        match cli.command {
            Commands::Metrics { id, kind, from, to } => {
                assert_eq!(id, "abc");
                assert_eq!(kind, MetricType::Periodic);
                assert!(from < to);
            }
            _ => panic!("expected metrics command"),
        }
    }

    #[test]
    fn unknown_metric_kind_is_rejected() {
        let result = Cli::try_parse_from([
            "unipipe", "metrics", "abc", "--kind", "histogram", "--from",
            "2024-03-01T00:00:00Z", "--to", "2024-03-02T00:00:00Z",
        ]);
        assert!(result.is_err());
    }
}
