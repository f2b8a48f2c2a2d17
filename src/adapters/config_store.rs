//! File-backed configuration store.
//!
//! Implements [`ConfigPort`].  The file holds a `postcard` blob as written
//! by [`save`](ConfigPort::save); a hand-edited JSON object is accepted on
//! load as well.  A missing file yields defaults.
//!
//! Every load and save runs [`ControllerConfig::validate`].

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ControllerConfig;

pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn decode(bytes: &[u8]) -> Result<ControllerConfig, ConfigError> {
    let looks_like_json = bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');
    if looks_like_json {
        serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)
    } else {
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)
    }
}

impl ConfigPort for FileConfigStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("config: no file at {}, using defaults", self.path.display());
                return Ok(ControllerConfig::default());
            }
            Err(e) => {
                warn!("config: cannot read {}: {e}", self.path.display());
                return Err(ConfigError::Io);
            }
        };
        let config = decode(&bytes)?;
        config.validate()?;
        info!("config: loaded from {} ({} bytes)", self.path.display(), bytes.len());
        Ok(config)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::Corrupted)?;
        fs::write(&self.path, &bytes).map_err(|e| {
            warn!("config: cannot write {}: {e}", self.path.display());
            ConfigError::Io
        })?;
        info!("config: saved to {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }
}
