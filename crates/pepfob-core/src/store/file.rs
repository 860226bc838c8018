use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::CredentialStore;
use crate::error::CoreError;

/// One file per namespace under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, namespace: &str) -> Result<PathBuf, CoreError> {
        let valid = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CoreError::Store {
                message: format!("invalid namespace {namespace:?}"),
            });
        }
        Ok(self.dir.join(format!("{namespace}.bin")))
    }
}

fn io_error(path: &Path, e: &std::io::Error) -> CoreError {
    CoreError::Store {
        message: format!("{}: {e}", path.display()),
    }
}

impl CredentialStore for FileStore {
    fn load(&self, namespace: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let path = self.path_for(namespace)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, &e)),
        }
    }

    fn save(&self, namespace: &str, bytes: &[u8]) -> Result<(), CoreError> {
        let path = self.path_for(namespace)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, &e))?;
        // Write-then-rename so a power cut never leaves half a record.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|e| io_error(&tmp, &e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_error(&path, &e))?;
        debug!(namespace, len = bytes.len(), "record saved");
        Ok(())
    }

    fn erase(&self, namespace: &str) -> Result<(), CoreError> {
        let path = self.path_for(namespace)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn records_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.load("cookie-jar").unwrap(), None);
        store.save("cookie-jar", b"abc").unwrap();
        assert_eq!(store.load("cookie-jar").unwrap().as_deref(), Some(&b"abc"[..]));

        store.erase("cookie-jar").unwrap();
        store.erase("cookie-jar").unwrap();
        assert_eq!(store.load("cookie-jar").unwrap(), None);
    }

    #[test]
    fn namespace_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.save("../evil", b"x").is_err());
    }
}
