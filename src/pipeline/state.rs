//! Composite pipeline state
//!
//! The merged, most-recent-per-field snapshot the display layer consumes.
//! Constructed once with placeholder values, then mutated field-by-field by
//! the coordinator's merge task. Fields update independently on arrival
//! order; a populated field never reverts to its placeholder.

use crate::pipeline::types::{DetectedRegion, StageUpdate, VideoFrame};

/// The merged snapshot of every stage's most recent output.
///
/// A consumer must tolerate partially-placeholder snapshots indefinitely: a
/// disabled stage, or one that has not produced its first result, leaves its
/// field at the placeholder forever. Staleness across fields is accepted by
/// design; a slow stage may publish a result computed from an older frame
/// than the one a fast stage is currently showing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeState {
    /// Most recent frame delivered by the source.
    pub latest_frame: Option<VideoFrame>,
    /// Most recent restyler output.
    pub latest_styled_frame: Option<VideoFrame>,
    /// Most recent classifier regions. Empty until the first result.
    pub latest_regions: Vec<DetectedRegion>,
    /// Most recent recognized text. Empty until the first result.
    pub latest_text: String,
    /// Most recent speech command. Empty until the first result.
    pub latest_command: String,
}

impl CompositeState {
    /// The construction-time snapshot: all fields at their placeholders.
    /// Valid to read immediately; never blocks.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Apply one tagged update to exactly the field it targets.
    pub fn apply(&mut self, update: StageUpdate) {
        match update {
            StageUpdate::SourceFrame(frame) => self.latest_frame = Some(frame),
            StageUpdate::StyledFrame(frame) => self.latest_styled_frame = Some(frame),
            StageUpdate::Regions(regions) => self.latest_regions = regions,
            StageUpdate::RecognizedText(text) => self.latest_text = text,
            StageUpdate::SpeechCommand(command) => self.latest_command = command,
        }
    }

    /// Number of fields that have left their placeholder value.
    pub fn populated_fields(&self) -> usize {
        [
            self.latest_frame.is_some(),
            self.latest_styled_frame.is_some(),
            !self.latest_regions.is_empty(),
            !self.latest_text.is_empty(),
            !self.latest_command.is_empty(),
        ]
        .iter()
        .filter(|&&populated| populated)
        .count()
    }
}
