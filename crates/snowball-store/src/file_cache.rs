//! JSON-file implementation of the device-local progress cache.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snowball_core::cache::{CachedProgress, LocalCache};
use snowball_core::error::DomainError;
use tracing::debug;

/// Local cache persisted as `{ "maxStepReached": n }` in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    /// Creates a cache stored at `path`. Nothing is touched until the
    /// first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> DomainError {
    DomainError::Infrastructure(format!("failed to {action} {}: {err}", path.display()))
}

impl LocalCache for JsonFileCache {
    fn load(&self) -> Result<Option<u32>, DomainError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error("read", &self.path, &err)),
        };
        let cached: CachedProgress = serde_json::from_str(&raw).map_err(|e| {
            DomainError::Infrastructure(format!("corrupt cache {}: {e}", self.path.display()))
        })?;
        Ok(Some(cached.max_step_reached))
    }

    fn store(&self, max_step_reached: u32) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, &e))?;
        }
        let body = serde_json::to_vec(&CachedProgress { max_step_reached })
            .map_err(|e| DomainError::Infrastructure(format!("cache serialization failed: {e}")))?;
        // Write-then-rename so a crash never leaves a half-written file.
        let staging = self.path.with_extension("tmp");
        std::fs::write(&staging, body).map_err(|e| io_error("write", &staging, &e))?;
        std::fs::rename(&staging, &self.path).map_err(|e| io_error("replace", &self.path, &e))?;
        debug!(max_step_reached, path = %self.path.display(), "local cache stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), DomainError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error("remove", &self.path, &err)),
        }
    }
}
