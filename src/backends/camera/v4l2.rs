// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 webcam source
//!
//! Opens a capture device, negotiates MJPEG (falling back to YUYV) and
//! streams through memory-mapped buffers. Buffers are converted to RGB24
//! before they leave this module.

use super::FrameSource;
use super::format_converters::{mjpeg_to_rgb, yuyv_to_rgb};
use super::types::Frame;
use crate::constants::capture;
use crate::errors::{AcquisitionError, AcquisitionResult};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// `ENODEV`: the device node exists but the hardware is gone
const ENODEV: i32 = 19;

/// How long a single dequeue may block before it counts as a transient failure
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Pixel layout negotiated with the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureFormat {
    Mjpeg,
    Yuyv,
}

struct OpenDevice {
    // Stream must be dropped before the device it was created from
    stream: Stream<'static>,
    _device: Device,
    format: CaptureFormat,
    width: u32,
    height: u32,
}

/// Webcam frame source backed by V4L2
pub struct V4l2Source {
    path: PathBuf,
    width: u32,
    height: u32,
    device: Option<OpenDevice>,
    sequence: u64,
}

impl V4l2Source {
    /// Create a source for a device node; nothing is opened until [`FrameSource::open`]
    pub fn new(path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            path,
            width,
            height,
            device: None,
            sequence: 0,
        }
    }

    fn open_failed(&self, reason: impl std::fmt::Display) -> AcquisitionError {
        AcquisitionError::OpenFailed {
            source_id: self.id(),
            reason: reason.to_string(),
        }
    }

    fn negotiate_format(&self, dev: &Device) -> AcquisitionResult<(CaptureFormat, u32, u32)> {
        let mjpg = FourCC::new(b"MJPG");
        let yuyv = FourCC::new(b"YUYV");

        for (fourcc, format) in [(mjpg, CaptureFormat::Mjpeg), (yuyv, CaptureFormat::Yuyv)] {
            match dev.set_format(&Format::new(self.width, self.height, fourcc)) {
                Ok(actual) if actual.fourcc == fourcc => {
                    info!(
                        width = actual.width,
                        height = actual.height,
                        fourcc = ?actual.fourcc,
                        "Set V4L2 format"
                    );
                    return Ok((format, actual.width, actual.height));
                }
                Ok(actual) => {
                    debug!(requested = ?fourcc, got = ?actual.fourcc, "Device rejected format");
                }
                Err(e) => {
                    debug!(requested = ?fourcc, error = %e, "Could not set format");
                }
            }
        }

        Err(self.open_failed("device supports neither MJPG nor YUYV"))
    }
}

impl FrameSource for V4l2Source {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&mut self) -> AcquisitionResult<()> {
        info!(path = %self.path.display(), "Opening V4L2 device");

        let dev = Device::with_path(&self.path).map_err(|e| self.open_failed(e))?;
        let (format, width, height) = self.negotiate_format(&dev)?;

        let mut stream = Stream::with_buffers(&dev, Type::VideoCapture, capture::V4L2_BUFFER_COUNT)
            .map_err(|e| self.open_failed(format!("failed to create buffer stream: {}", e)))?;
        stream.set_timeout(READ_TIMEOUT);

        info!(path = %self.path.display(), ?format, width, height, "V4L2 capture stream started");

        self.device = Some(OpenDevice {
            stream,
            _device: dev,
            format,
            width,
            height,
        });
        Ok(())
    }

    fn read(&mut self) -> AcquisitionResult<Frame> {
        let open = self.device.as_mut().ok_or(AcquisitionError::NotOpen)?;

        let (buf, meta) = open.stream.next().map_err(classify_io_error)?;
        let used = (meta.bytesused as usize).min(buf.len());
        let buf = &buf[..used];

        let frame = match open.format {
            CaptureFormat::Mjpeg => {
                let (width, height, rgb) = mjpeg_to_rgb(buf)
                    .map_err(|e| AcquisitionError::Transient(format!("corrupt MJPEG frame: {}", e)))?;
                Frame::from_rgb(width, height, rgb, self.sequence)
            }
            CaptureFormat::Yuyv => yuyv_to_rgb(buf, open.width, open.height)
                .and_then(|rgb| Frame::from_rgb(open.width, open.height, rgb, self.sequence)),
        };

        let frame = frame.ok_or_else(|| {
            AcquisitionError::Transient(format!("short buffer ({} bytes)", used))
        })?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            info!(path = %self.path.display(), "V4L2 device closed");
        }
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map a dequeue error to transient or persistent
fn classify_io_error(err: io::Error) -> AcquisitionError {
    if err.raw_os_error() == Some(ENODEV) {
        return AcquisitionError::Disconnected(err.to_string());
    }
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe | io::ErrorKind::PermissionDenied => {
            AcquisitionError::Disconnected(err.to_string())
        }
        _ => {
            warn!(error = %err, "V4L2 dequeue failed");
            AcquisitionError::Transient(err.to_string())
        }
    }
}

/// List V4L2 capture devices as `(path, name)` pairs
///
/// Names come from sysfs; devices without one are listed by node name.
pub fn list_devices() -> Vec<(String, String)> {
    let entries = match std::fs::read_dir("/dev") {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut devices: Vec<(u32, String, String)> = entries
        .flatten()
        .filter_map(|entry| {
            let node = entry.file_name().to_string_lossy().to_string();
            let index = node.strip_prefix("video")?.parse::<u32>().ok()?;
            let name = std::fs::read_to_string(format!("/sys/class/video4linux/{}/name", node))
                .map(|n| n.trim().to_string())
                .unwrap_or_default();
            let name = if name.is_empty() { node.clone() } else { name };
            Some((index, format!("/dev/{}", node), name))
        })
        .collect();

    devices.sort_by_key(|(index, _, _)| *index);
    devices
        .into_iter()
        .map(|(_, path, name)| (path, name))
        .collect()
}
