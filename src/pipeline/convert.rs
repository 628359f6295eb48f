//! Pixel and sample conversion helpers shared by the model stages
//!
//! Every stage preprocesses its input the same way: resize to the stage's
//! working resolution, then flatten to a normalized f32 NHWC buffer. The
//! postprocessing direction (float tensor back to RGB8) lives here too, so
//! the stages stay free of pixel math.

use bytes::Bytes;

use crate::pipeline::types::VideoFrame;

/// Bilinear resize of an RGB8 frame.
///
/// Returns the input unchanged (shared buffer, no copy) when the target size
/// already matches.
pub fn resize_bilinear(frame: &VideoFrame, dst_w: u32, dst_h: u32) -> VideoFrame {
    if frame.width() == dst_w && frame.height() == dst_h {
        return frame.clone();
    }

    let src = frame.data();
    let (sw, sh) = (frame.width() as usize, frame.height() as usize);
    let (dw, dh) = (dst_w as usize, dst_h as usize);

    let x_ratio = if dw > 1 {
        (sw - 1) as f32 / (dw - 1) as f32
    } else {
        0.0
    };
    let y_ratio = if dh > 1 {
        (sh - 1) as f32 / (dh - 1) as f32
    } else {
        0.0
    };

    let mut out = vec![0u8; dw * dh * 3];
    for dy in 0..dh {
        let sy = dy as f32 * y_ratio;
        let y0 = sy as usize;
        let y1 = (y0 + 1).min(sh - 1);
        let fy = sy - y0 as f32;

        for dx in 0..dw {
            let sx = dx as f32 * x_ratio;
            let x0 = sx as usize;
            let x1 = (x0 + 1).min(sw - 1);
            let fx = sx - x0 as f32;

            for c in 0..3 {
                let p00 = src[(y0 * sw + x0) * 3 + c] as f32;
                let p10 = src[(y0 * sw + x1) * 3 + c] as f32;
                let p01 = src[(y1 * sw + x0) * 3 + c] as f32;
                let p11 = src[(y1 * sw + x1) * 3 + c] as f32;

                let top = p00 + (p10 - p00) * fx;
                let bottom = p01 + (p11 - p01) * fx;
                out[(dy * dw + dx) * 3 + c] = (top + (bottom - top) * fy).round() as u8;
            }
        }
    }

    VideoFrame::new_unchecked(Bytes::from(out), dst_w, dst_h)
}

/// Flatten a frame to f32 NHWC in `[0, 1]`.
pub fn normalize_unit(frame: &VideoFrame) -> Vec<f32> {
    frame.data().iter().map(|&b| b as f32 / 255.0).collect()
}

/// Flatten a frame to f32 NHWC in `[-1, 1]`.
pub fn normalize_signed(frame: &VideoFrame) -> Vec<f32> {
    frame
        .data()
        .iter()
        .map(|&b| (b as f32 - 127.5) / 127.5)
        .collect()
}

/// Convert a `[0, 1]` float tensor back to an RGB8 frame, clamping out-of-range
/// values. The slice length must be `width * height * 3`; the caller checks
/// this before handing the tensor over.
pub fn floats_to_rgb8(values: &[f32], width: u32, height: u32) -> VideoFrame {
    debug_assert_eq!(values.len(), (width * height * 3) as usize);
    let out: Vec<u8> = values
        .iter()
        .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    VideoFrame::new_unchecked(Bytes::from(out), width, height)
}

/// Decode 16-bit little-endian PCM to f32 samples in `[-1, 1]`.
pub fn pcm16_to_f32(samples: &[u8]) -> Vec<f32> {
    samples
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}
