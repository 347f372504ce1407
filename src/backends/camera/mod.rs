// SPDX-License-Identifier: GPL-3.0-only

//! Frame acquisition
//!
//! The detection worker only depends on the [`FrameSource`] trait. Concrete
//! sources:
//!
//! - [`V4l2Source`]: a webcam through V4L2 memory-mapped streaming
//! - [`ImageSequenceSource`]: still images from a file or directory
//!
//! ```text
//! ┌──────────────────┐   open/read/close   ┌──────────────────┐
//! │ Detection worker │ ──────────────────▶ │   FrameSource    │
//! └──────────────────┘                     └────────┬─────────┘
//!                                         ┌─────────┴─────────┐
//!                                         ▼                   ▼
//!                                   ┌──────────┐     ┌────────────────┐
//!                                   │   V4L2   │     │ Image sequence │
//!                                   └──────────┘     └────────────────┘
//! ```

pub mod format_converters;
pub mod image_sequence;
pub mod types;
pub mod v4l2;

pub use image_sequence::ImageSequenceSource;
pub use types::Frame;
pub use v4l2::{V4l2Source, list_devices};

use crate::constants::capture;
use crate::errors::AcquisitionResult;
use std::path::{Path, PathBuf};

/// A source of frames, driven by exactly one worker thread
///
/// Lifecycle: `open` once, `read` until it fails persistently or reports
/// end of stream, then `close`. `close` must be safe to call whether or not
/// `open` succeeded.
pub trait FrameSource: Send {
    /// Human-readable identifier used in logs and errors
    fn id(&self) -> String;

    /// Acquire the underlying resource
    fn open(&mut self) -> AcquisitionResult<()>;

    /// Read the next frame
    ///
    /// Errors are classified by [`AcquisitionError`](crate::errors::AcquisitionError):
    /// `Transient` may be retried, `EndOfStream` ends the stream normally,
    /// anything else is persistent.
    fn read(&mut self) -> AcquisitionResult<Frame>;

    /// Release the underlying resource
    fn close(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn id(&self) -> String {
        (**self).id()
    }

    fn open(&mut self) -> AcquisitionResult<()> {
        (**self).open()
    }

    fn read(&mut self) -> AcquisitionResult<Frame> {
        (**self).read()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Where frames come from, parsed from the `camera_source` setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    /// V4L2 device by index (`0` → `/dev/video0`)
    DeviceIndex(usize),
    /// V4L2 device by path
    DevicePath(PathBuf),
    /// A still image or a directory of images
    Images(PathBuf),
}

impl CameraSource {
    /// Parse a source identifier
    ///
    /// Integers select a V4L2 device index, paths under `/dev/` a device node,
    /// and anything else is treated as an image file or directory.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let Ok(index) = value.parse::<usize>() {
            return CameraSource::DeviceIndex(index);
        }
        let path = Path::new(value);
        if path.starts_with("/dev") {
            CameraSource::DevicePath(path.to_path_buf())
        } else {
            CameraSource::Images(path.to_path_buf())
        }
    }

    /// Create the matching frame source
    ///
    /// `loop_images` makes an image sequence restart instead of ending.
    pub fn into_frame_source(self, loop_images: bool) -> Box<dyn FrameSource> {
        match self {
            CameraSource::DeviceIndex(index) => Box::new(V4l2Source::new(
                PathBuf::from(format!("/dev/video{}", index)),
                capture::DEFAULT_WIDTH,
                capture::DEFAULT_HEIGHT,
            )),
            CameraSource::DevicePath(path) => Box::new(V4l2Source::new(
                path,
                capture::DEFAULT_WIDTH,
                capture::DEFAULT_HEIGHT,
            )),
            CameraSource::Images(path) => Box::new(ImageSequenceSource::new(path, loop_images)),
        }
    }
}

impl std::fmt::Display for CameraSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraSource::DeviceIndex(index) => write!(f, "/dev/video{}", index),
            CameraSource::DevicePath(path) | CameraSource::Images(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}
