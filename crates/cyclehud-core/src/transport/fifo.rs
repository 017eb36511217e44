//! Named pipes

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tracing::{debug, warn};

use super::{Connector, TransportError};

/// Permission bits of newly created FIFOs
pub const FIFO_MODE: libc::mode_t = 0o644;

/// Make sure `path` is a FIFO, creating it (and its parent directory) if
/// needed. Anything else at that path is replaced.
pub fn ensure_fifo(path: &Path) -> Result<(), TransportError> {
    let create_error = |source: io::Error| TransportError::CreateFifo {
        path: path.display().to_string(),
        source,
    };

    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => return Ok(()),
        Ok(_) => {
            warn!(path = %path.display(), "Replacing non-FIFO file with a FIFO");
            fs::remove_file(path).map_err(create_error)?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(create_error(e)),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(create_error)?;
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| create_error(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), FIFO_MODE) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        // Another process created it between the check and mkfifo
        if err.kind() != io::ErrorKind::AlreadyExists {
            return Err(create_error(err));
        }
    }
    debug!(path = %path.display(), "FIFO ready");
    Ok(())
}

/// Opens the read end of a FIFO. Opening waits for a writer.
#[derive(Debug, Clone)]
pub struct FifoReadConnector {
    path: PathBuf,
}

impl FifoReadConnector {
    /// Read from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Connector for FifoReadConnector {
    type Stream = File;

    async fn connect(&mut self) -> Result<File, TransportError> {
        ensure_fifo(&self.path)?;
        File::open(&self.path)
            .await
            .map_err(|source| TransportError::Open {
                path: self.describe(),
                source,
            })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Opens the write end of a FIFO. Opening waits for a reader.
#[derive(Debug, Clone)]
pub struct FifoWriteConnector {
    path: PathBuf,
}

impl FifoWriteConnector {
    /// Write to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Connector for FifoWriteConnector {
    type Stream = File;

    async fn connect(&mut self) -> Result<File, TransportError> {
        ensure_fifo(&self.path)?;
        OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(|source| TransportError::Open {
                path: self.describe(),
                source,
            })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn is_fifo(path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_fifo())
            .unwrap_or(false)
    }

    #[test]
    fn test_ensure_fifo_creates_parent_and_fifo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bob").join("fifo_to_video");

        ensure_fifo(&path).unwrap();
        assert!(is_fifo(&path));

        // Idempotent
        ensure_fifo(&path).unwrap();
        assert!(is_fifo(&path));
    }

    #[test]
    fn test_ensure_fifo_replaces_regular_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fifo_to_can");
        fs::write(&path, b"stale").unwrap();

        ensure_fifo(&path).unwrap();
        assert!(is_fifo(&path));
    }

    #[test]
    fn test_ensure_fifo_refuses_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();

        assert!(matches!(
            ensure_fifo(&path),
            Err(TransportError::CreateFifo { .. })
        ));
    }
}
