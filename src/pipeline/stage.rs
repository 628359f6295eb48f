//! Stage trait and the registered stage set
//!
//! A stage is one independent asynchronous transformation: one input value
//! in, at most one output value out. The coordinator fans every frame out to
//! all registered stages and never waits for any of them.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::pipeline::types::{AudioChunk, DetectedRegion, VideoFrame};

/// Trait for model stages that transform one input into one output.
///
/// Contract:
/// - `invoke` emits at most one output per call; a failure is returned as
///   `Err` and the coordinator turns it into exactly one error event. An
///   invocation must never panic the pipeline.
/// - A stage must tolerate being invoked again while a previous invocation
///   is still running; any interior state is behind the stage's own
///   synchronization and must not block the coordinator's fan-out.
#[async_trait]
pub trait ModelStage: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Transform one input. Suspends for however long the model takes.
    async fn invoke(&self, input: Self::Input) -> Result<Self::Output>;

    /// Get the name of this stage for logging and error attribution.
    fn name(&self) -> &'static str;
}

/// A stage consuming frames and producing labeled regions.
pub type RegionStage = Arc<dyn ModelStage<Input = VideoFrame, Output = Vec<DetectedRegion>>>;
/// A stage consuming frames and producing frames.
pub type FrameStage = Arc<dyn ModelStage<Input = VideoFrame, Output = VideoFrame>>;
/// A stage consuming frames and producing text.
pub type TextStage = Arc<dyn ModelStage<Input = VideoFrame, Output = String>>;
/// A stage consuming audio and producing text.
pub type SpeechStage = Arc<dyn ModelStage<Input = AudioChunk, Output = String>>;

/// The closed set of capabilities a coordinator can drive.
///
/// Every slot is optional: a stage whose construction failed is simply never
/// registered, and the rest of the pipeline runs without it.
#[derive(Clone, Default)]
pub struct StageSet {
    pub classifier: Option<RegionStage>,
    pub restyler: Option<FrameStage>,
    pub text_reader: Option<TextStage>,
    pub speech: Option<SpeechStage>,
}

impl StageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered stages that consume video frames.
    pub fn frame_stage_count(&self) -> usize {
        [
            self.classifier.is_some(),
            self.restyler.is_some(),
            self.text_reader.is_some(),
        ]
        .iter()
        .filter(|&&registered| registered)
        .count()
    }

    /// Total number of registered stages.
    pub fn stage_count(&self) -> usize {
        self.frame_stage_count() + usize::from(self.speech.is_some())
    }
}
