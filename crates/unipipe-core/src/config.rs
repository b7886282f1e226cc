//! unipipe.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_AUTHOR_NAME: &str = "unipipe-service-broker";
pub const DEFAULT_AUTHOR_EMAIL: &str = "unipipe@meshcloud.io";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BrokerConfig {
    #[serde(default)]
    pub git: GitConfig,
}

/// Location of the working tree and the identity used for commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitConfig {
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            local_path: default_local_path(),
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

fn default_local_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_author_name() -> String {
    DEFAULT_AUTHOR_NAME.to_string()
}

fn default_author_email() -> String {
    DEFAULT_AUTHOR_EMAIL.to_string()
}

impl BrokerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BrokerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Default configuration pointed at an explicit working tree.
    pub fn for_repository(path: impl Into<PathBuf>) -> Self {
        BrokerConfig {
            git: GitConfig {
                local_path: path.into(),
                ..GitConfig::default()
            },
        }
    }
}
