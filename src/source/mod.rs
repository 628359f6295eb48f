//! Input sources for the pipeline
//!
//! A source produces frames (or audio) at its own rate and pushes them into
//! a channel; the coordinator drains that channel without ever pushing back.
//! Real sensor acquisition lives behind these traits; the built-in
//! implementations generate synthetic input for demos and tests.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::pipeline::types::{AudioChunk, VideoFrame};

mod audio;
mod synthetic;

pub use audio::SilenceSource;
pub use synthetic::SyntheticSource;

/// Trait for frame producers.
///
/// `run` delivers frames into `output` until cancelled or the receiver is
/// dropped. When the channel is full the source decides what to drop; the
/// consumer side never blocks it.
#[async_trait]
pub trait FrameSource: Send {
    async fn run(
        self,
        output: mpsc::Sender<VideoFrame>,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Trait for audio producers, mirroring [`FrameSource`].
#[async_trait]
pub trait AudioSource: Send {
    async fn run(
        self,
        output: mpsc::Sender<AudioChunk>,
        cancel: CancellationToken,
    ) -> Result<()>;
}
