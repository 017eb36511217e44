//! Frame outputs
//!
//! Where rendered overlay frames go. The camera preview picks frames up from
//! a file; tests and headless runs discard them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::overlay::RgbaRaster;

/// Receiver of rendered overlay frames (the camera preview driver)
pub trait FrameOutput: Send {
    /// Hand over one frame
    fn present(&mut self, frame: &RgbaRaster) -> io::Result<()>;
}

/// Discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl FrameOutput for NullOutput {
    fn present(&mut self, _frame: &RgbaRaster) -> io::Result<()> {
        Ok(())
    }
}

/// Publishes each frame as raw RGBA bytes, replacing the file atomically so
/// the reader never sees a partially written frame
#[derive(Debug, Clone)]
pub struct FrameFile {
    path: PathBuf,
    staging: PathBuf,
}

impl FrameFile {
    /// Publish frames to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut staging = path.clone().into_os_string();
        staging.push(".tmp");
        Self {
            path,
            staging: staging.into(),
        }
    }

    /// Published file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameOutput for FrameFile {
    fn present(&mut self, frame: &RgbaRaster) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.staging, frame.as_bytes())?;
        fs::rename(&self.staging, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Rgba;

    #[test]
    fn test_frame_file_publishes_raw_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bob").join("overlay.rgba");
        let mut output = FrameFile::new(&path);

        let mut frame = RgbaRaster::new(2, 1);
        frame.put(1, 0, Rgba::new(1, 2, 3, 4));
        output.present(&frame).unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(!dir.path().join("bob").join("overlay.rgba.tmp").exists());
    }
}
