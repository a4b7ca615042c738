//! Bookmark file persistence
//!
//! Reads the bookmark file and writes it back atomically (write to a temp
//! file in the same directory, then rename) so a reader never sees a
//! half-written file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::IoError;

/// Persistence handler for one bookmark file
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Create a handler for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the bookmark file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file
    ///
    /// Returns `None` if the file doesn't exist.
    pub fn load(&self) -> Result<Option<Vec<u8>>, IoError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                debug!("Read {} bytes from {:?}", bytes.len(), self.path);
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IoError::reading(e, self.path.clone())),
        }
    }

    /// Replace the file contents atomically
    pub fn save(&self, data: &[u8]) -> Result<(), IoError> {
        atomic_write(&self.path, data)?;
        debug!("Wrote {} bytes to {:?}", data.len(), self.path);
        Ok(())
    }
}

/// Temp file used while saving `path`: a hidden sibling
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bookmarks".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// On failure the temp file is removed and the target is left as it was.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), IoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| IoError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = temp_path(path);

    let written = File::create(&temp_path).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(IoError::writing(e, temp_path));
    }

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(IoError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}
