// SPDX-License-Identifier: GPL-3.0-only

//! Frame type shared by sources, detectors and drivers

use std::sync::Arc;
use std::time::Instant;

/// A captured RGB24 frame
///
/// Pixel data is reference counted and never mutated after construction.
/// Cloning a frame is cheap, and transforms such as [`Frame::mirrored`]
/// produce a new buffer instead of touching the shared one.
#[derive(Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGB24 pixels, `width * height * 3` bytes
    data: Arc<[u8]>,
    /// Source-assigned sequence number
    pub sequence: u64,
    /// When the frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl Frame {
    /// Build a frame from packed RGB24 bytes
    ///
    /// Returns `None` when the buffer does not match the dimensions.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>, sequence: u64) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            sequence,
            captured_at: Instant::now(),
        })
    }

    /// Build a frame from an `image` RGB buffer
    pub fn from_image(image: image::RgbImage, sequence: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw().into_boxed_slice()),
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// A solid-colour frame, mostly useful for tests and placeholders
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let data: Vec<u8> = std::iter::repeat_n(rgb, (width * height) as usize)
            .flatten()
            .collect();
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Raw RGB24 bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGB value at `(x, y)`, clamped to the frame bounds
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let idx = (y * self.width as usize + x) * 3;
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }

    /// Horizontally flipped copy (selfie view)
    ///
    /// Keeps sequence number and capture time.
    pub fn mirrored(&self) -> Frame {
        let row_len = self.width as usize * 3;
        let mut flipped = Vec::with_capacity(self.data.len());
        for row in self.data.chunks_exact(row_len.max(1)) {
            for pixel in row.chunks_exact(3).rev() {
                flipped.extend_from_slice(pixel);
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            data: Arc::from(flipped.into_boxed_slice()),
            sequence: self.sequence,
            captured_at: self.captured_at,
        }
    }

    /// Copy into an `image` buffer (for saving snapshots or feeding encoders)
    pub fn to_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.to_vec())
    }

    /// Whether two frames share the same pixel buffer
    pub fn shares_buffer_with(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}
