//! Synthetic frame source
//!
//! Generates a moving test-pattern at a fixed rate, standing in for a
//! camera. Frames that cannot be delivered because the channel is full are
//! dropped (keep-only-latest, the same policy a camera feed uses).

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::FrameSource;
use crate::pipeline::types::VideoFrame;

/// Test-pattern generator: a two-axis gradient whose blue channel cycles
/// with the frame index, so consecutive frames differ.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    fps: u32,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps: fps.max(1),
        }
    }

    fn make_frame(&self, index: u64) -> VideoFrame {
        let (w, h) = (self.width, self.height);
        let phase = (index % 256) as u8;
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                let r = if w > 1 { (x * 255 / (w - 1)) as u8 } else { 0 };
                let g = if h > 1 { (y * 255 / (h - 1)) as u8 } else { 0 };
                data.extend_from_slice(&[r, g, phase]);
            }
        }
        VideoFrame::new_unchecked(Bytes::from(data), w, h)
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn run(
        self,
        output: mpsc::Sender<VideoFrame>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(1) / self.fps);
        let mut index = 0u64;
        let mut dropped = 0u64;

        info!(
            "SyntheticSource: producing {}x{} frames at {} fps",
            self.width, self.height, self.fps
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let frame = self.make_frame(index);
                    index += 1;
                    match output.try_send(frame) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped += 1;
                            debug!("SyntheticSource: consumer behind, frame dropped");
                        }
                        Err(TrySendError::Closed(_)) => break,
                    }
                }
            }
        }

        info!(
            "SyntheticSource: stopped after {} frames ({} dropped)",
            index, dropped
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_pattern_dimensions_and_gradient() {
        let source = SyntheticSource::new(4, 2, 30);
        let frame = source.make_frame(0);

        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        // Red grows along x, green along y.
        assert_eq!(frame.pixel(0, 0)[0], 0);
        assert_eq!(frame.pixel(3, 0)[0], 255);
        assert_eq!(frame.pixel(0, 0)[1], 0);
        assert_eq!(frame.pixel(0, 1)[1], 255);
    }

    #[test]
    fn test_consecutive_frames_differ() {
        let source = SyntheticSource::new(2, 2, 30);
        assert_ne!(source.make_frame(0), source.make_frame(1));
    }

    #[tokio::test]
    async fn test_delivers_frames_until_cancelled() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            SyntheticSource::new(2, 2, 200).run(tx, cancel.clone()),
        );

        let first = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no frame within timeout")
            .expect("source closed early");
        assert_eq!(first.width(), 2);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
