// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for V4L2 capture buffers
//!
//! Webcams typically deliver either packed YUYV 4:2:2 or MJPEG. Both are
//! converted to tightly packed RGB24 before a frame enters the pipeline.

/// Convert YUYV (YUV 4:2:2) to RGB24
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients. Returns `None` if the buffer is too short for
/// the given dimensions.
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let pixel_count = (width as usize) * (height as usize);
    if data.len() < pixel_count * 2 {
        return None;
    }

    let mut rgb = Vec::with_capacity(pixel_count * 3);

    // YUYV: Y0 U0 Y1 V0 - processes 2 pixels at a time
    for chunk in data[..pixel_count * 2].chunks_exact(4) {
        let y0 = chunk[0];
        let u = chunk[1];
        let y1 = chunk[2];
        let v = chunk[3];

        for y in [y0, y1] {
            let (r, g, b) = yuv_to_rgb(y, u, v);
            rgb.push(r);
            rgb.push(g);
            rgb.push(b);
        }
    }

    Some(rgb)
}

/// Decode an MJPEG buffer to RGB24
///
/// Returns the decoded dimensions with the pixel data, since a camera may
/// deliver a different size than negotiated.
pub fn mjpeg_to_rgb(data: &[u8]) -> Result<(u32, u32, Vec<u8>), image::ImageError> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok((width, height, rgb.into_raw()))
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}
