// SPDX-License-Identifier: GPL-3.0-only

//! Still-image frame source
//!
//! Streams frames from an image file or from every image in a directory
//! (sorted by file name). Useful for running the pipeline without a camera.

use super::FrameSource;
use super::types::Frame;
use crate::constants::capture::IMAGE_EXTENSIONS;
use crate::errors::{AcquisitionError, AcquisitionResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Frame source reading images from disk
pub struct ImageSequenceSource {
    path: PathBuf,
    looping: bool,
    files: Vec<PathBuf>,
    position: usize,
    sequence: u64,
    opened: bool,
}

impl ImageSequenceSource {
    /// `looping` restarts from the first image instead of ending the stream
    pub fn new(path: PathBuf, looping: bool) -> Self {
        Self {
            path,
            looping,
            files: Vec::new(),
            position: 0,
            sequence: 0,
            opened: false,
        }
    }

    fn open_failed(&self, reason: impl std::fmt::Display) -> AcquisitionError {
        AcquisitionError::OpenFailed {
            source_id: self.id(),
            reason: reason.to_string(),
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&mut self) -> AcquisitionResult<()> {
        let files = if self.path.is_dir() {
            let entries = std::fs::read_dir(&self.path).map_err(|e| self.open_failed(e))?;
            let mut files: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && is_image(path))
                .collect();
            files.sort();
            files
        } else if self.path.is_file() {
            vec![self.path.clone()]
        } else {
            return Err(self.open_failed("no such file or directory"));
        };

        if files.is_empty() {
            return Err(self.open_failed("no images found"));
        }

        info!(path = %self.path.display(), count = files.len(), looping = self.looping, "Image source opened");
        self.files = files;
        self.position = 0;
        self.opened = true;
        Ok(())
    }

    fn read(&mut self) -> AcquisitionResult<Frame> {
        if !self.opened {
            return Err(AcquisitionError::NotOpen);
        }

        if self.position >= self.files.len() {
            if !self.looping {
                return Err(AcquisitionError::EndOfStream);
            }
            self.position = 0;
        }

        let path = &self.files[self.position];
        self.position += 1;

        // An unreadable file is a bad frame, not a dead source
        let image = image::open(path)
            .map_err(|e| AcquisitionError::Transient(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        debug!(path = %path.display(), sequence = self.sequence, "Loaded image frame");
        let frame = Frame::from_image(image, self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }

    fn close(&mut self) {
        if self.opened {
            debug!(path = %self.path.display(), "Image source closed");
        }
        self.opened = false;
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &Path, name: &str, rgb: [u8; 3]) {
        let image = image::RgbImage::from_pixel(4, 3, image::Rgb(rgb));
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_reads_directory_in_name_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png", [0, 255, 0]);
        write_image(dir.path(), "a.png", [255, 0, 0]);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::new(dir.path().to_path_buf(), false);
        source.open().unwrap();

        let first = source.read().unwrap();
        assert_eq!((first.width, first.height), (4, 3));
        assert_eq!(first.pixel(0, 0), (255, 0, 0));
        assert_eq!(first.sequence, 0);

        let second = source.read().unwrap();
        assert_eq!(second.pixel(0, 0), (0, 255, 0));
        assert_eq!(second.sequence, 1);

        assert_eq!(source.read().unwrap_err(), AcquisitionError::EndOfStream);
        source.close();
    }

    #[test]
    fn test_looping_restarts() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "only.png", [1, 2, 3]);

        let mut source = ImageSequenceSource::new(dir.path().join("only.png"), true);
        source.open().unwrap();
        for expected in 0..3 {
            assert_eq!(source.read().unwrap().sequence, expected);
        }
    }

    #[test]
    fn test_empty_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ImageSequenceSource::new(dir.path().to_path_buf(), false);
        assert!(matches!(
            source.open(),
            Err(AcquisitionError::OpenFailed { .. })
        ));
    }

    #[test]
    fn test_read_requires_open() {
        let mut source = ImageSequenceSource::new(PathBuf::from("missing"), false);
        assert_eq!(source.read().unwrap_err(), AcquisitionError::NotOpen);
    }
}
