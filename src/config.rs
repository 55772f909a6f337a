//! # Session Configuration
//!
//! Bundles the command catalog and device directory that a [`PlmSession`]
//! is constructed from. Both halves are immutable and reference counted, so
//! one loaded configuration can back any number of sessions.
//!
//! [`PlmSession`]: crate::plm::session::PlmSession

use crate::catalog::Catalog;
use crate::directory::DeviceDirectory;
use crate::error::PlmError;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PlmConfig {
    pub catalog: Arc<Catalog>,
    pub directory: Arc<DeviceDirectory>,
}

impl PlmConfig {
    pub fn new(catalog: Catalog, directory: DeviceDirectory) -> Self {
        PlmConfig {
            catalog: Arc::new(catalog),
            directory: Arc::new(directory),
        }
    }

    /// Load all four tables from one directory. Any failure is fatal.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, PlmError> {
        let dir = dir.as_ref();
        let catalog = Catalog::load_dir(dir)?;
        let directory = DeviceDirectory::load_dir(dir)?;
        log::debug!(
            "Loaded {} send command(s), {} frame type(s), {} device(s) from {}",
            catalog.send_commands().count(),
            catalog.receive_frames().count(),
            directory.len(),
            dir.display()
        );
        Ok(PlmConfig::new(catalog, directory))
    }

    /// Tables embedded in the crate.
    pub fn builtin() -> Result<Self, PlmError> {
        Ok(PlmConfig::new(Catalog::builtin()?, DeviceDirectory::builtin()?))
    }
}
