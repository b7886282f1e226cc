//! Record codec: typed records to and from YAML files.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult, io_err};

/// Encodes and decodes typed records at filesystem paths.
pub trait RecordCodec {
    /// Serialize `value` to `path`, replacing any existing content.
    fn write<T: Serialize>(&self, value: &T, path: &Path) -> StateResult<()>;

    /// Decode the file at `path` as a `T`.
    fn read<T: DeserializeOwned>(&self, path: &Path) -> StateResult<T>;
}

/// YAML codec backed by `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl RecordCodec for YamlCodec {
    fn write<T: Serialize>(&self, value: &T, path: &Path) -> StateResult<()> {
        let yaml = serde_yaml::to_string(value).map_err(|e| StateError::Serialize(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err!(parent))?;
        }
        fs::write(path, yaml).map_err(io_err!(path))?;
        debug!(path = %path.display(), "record written");
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> StateResult<T> {
        let content = fs::read_to_string(path).map_err(io_err!(path))?;
        serde_yaml::from_str(&content).map_err(|e| StateError::Deserialize {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
