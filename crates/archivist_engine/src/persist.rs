use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory unusable: {0}")]
    Dir(String),
    #[error("could not serialize manifest: {0}")]
    Serialize(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Create `dir` if missing and verify it is a writable directory.
pub fn ensure_album_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(PersistError::Dir(format!(
                "{} exists and is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|err| PersistError::Dir(err.to_string()))?;
    }
    // Writability probe: creating a temp file fails fast on read-only mounts.
    NamedTempFile::new_in(dir).map_err(|err| PersistError::Dir(err.to_string()))?;
    Ok(())
}

/// Write `content` to `{dir}/{file_name}` through a temp file and a rename,
/// so readers never observe a half-written file. Replaces any existing file.
pub fn write_atomic(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf, PersistError> {
    ensure_album_dir(dir)?;

    let target = dir.join(file_name);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    if target.exists() {
        fs::remove_file(&target)?;
    }
    tmp.persist(&target).map_err(|err| PersistError::Io(err.error))?;
    Ok(target)
}
