//! Image classification stage
//!
//! Resizes each frame to the model's working resolution, runs the model and
//! reports the top-scoring class as one full-frame region. The label table
//! is indexed directly by the model's output index; the table ships with the
//! background entry at row 0, so no offset is applied.

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::pipeline::convert;
use crate::pipeline::model::CompiledModel;
use crate::pipeline::stage::ModelStage;
use crate::pipeline::types::{BoundingBox, DetectedRegion, VideoFrame};

/// Working resolution the input frame is resized to.
pub const INPUT_SIZE: u32 = 224;
/// Number of classes the model scores (background + 1000).
pub const NUM_CLASSES: usize = 1001;

/// Label table used when none is supplied: the head of the standard
/// 1001-entry table, background first. Short tables are fine; an index past
/// the end maps to an empty label.
static DEFAULT_LABELS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "background",
        "tench",
        "goldfish",
        "great white shark",
        "tiger shark",
        "hammerhead",
        "electric ray",
        "stingray",
        "cock",
        "hen",
        "ostrich",
        "brambling",
        "goldfinch",
        "house finch",
        "junco",
        "indigo bunting",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
});

pub fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.clone()
}

/// Frame → labeled regions.
pub struct Classifier {
    model: Arc<dyn CompiledModel>,
    labels: Arc<Vec<String>>,
}

impl Classifier {
    /// Build the stage around a loaded model. Fails (and the stage stays
    /// unregistered) when the model's tensor shapes don't fit the contract.
    pub fn new(model: Arc<dyn CompiledModel>, labels: Vec<String>) -> Result<Self> {
        let expected = (INPUT_SIZE * INPUT_SIZE * 3) as usize;
        ensure!(
            model.input_len() == expected,
            "classifier model expects {} input values, stage feeds {}",
            model.input_len(),
            expected
        );
        ensure!(
            model.output_len() == NUM_CLASSES,
            "classifier model produces {} scores, expected {}",
            model.output_len(),
            NUM_CLASSES
        );
        Ok(Self {
            model,
            labels: Arc::new(labels),
        })
    }
}

#[async_trait]
impl ModelStage for Classifier {
    type Input = VideoFrame;
    type Output = Vec<DetectedRegion>;

    async fn invoke(&self, input: VideoFrame) -> Result<Vec<DetectedRegion>> {
        let resized = convert::resize_bilinear(&input, INPUT_SIZE, INPUT_SIZE);
        let pixels = convert::normalize_signed(&resized);
        ensure!(
            pixels.len() == self.model.input_len(),
            "input buffer size mismatch: expected {}, got {}",
            self.model.input_len(),
            pixels.len()
        );

        let model = self.model.clone();
        let scores = tokio::task::spawn_blocking(move || model.run(&pixels))
            .await
            .context("classifier inference task failed")??;
        ensure!(
            scores.len() == NUM_CLASSES,
            "output buffer size mismatch: expected {}, got {}",
            NUM_CLASSES,
            scores.len()
        );

        let (best, confidence) = argmax(&scores);
        // Direct index into the label table; see module docs.
        let label = self.labels.get(best).cloned().unwrap_or_default();

        Ok(vec![DetectedRegion {
            label,
            confidence,
            // Reported in the original frame's coordinate space, not the
            // working resolution.
            bounding_box: BoundingBox::full_frame(&input),
        }])
    }

    fn name(&self) -> &'static str {
        "classifier"
    }
}

fn argmax(scores: &[f32]) -> (usize, f32) {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, &score) in scores.iter().enumerate() {
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    (best, best_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::FixedLogitsModel;

    fn stage_with_peak(peak: usize, score: f32) -> Classifier {
        let model = FixedLogitsModel::with_peak(
            (INPUT_SIZE * INPUT_SIZE * 3) as usize,
            NUM_CLASSES,
            peak,
            score,
        );
        Classifier::new(Arc::new(model), default_labels()).unwrap()
    }

    #[test]
    fn test_construction_rejects_wrong_shapes() {
        let bad_input = FixedLogitsModel::with_peak(10, NUM_CLASSES, 0, 1.0);
        assert!(Classifier::new(Arc::new(bad_input), default_labels()).is_err());

        let bad_output =
            FixedLogitsModel::with_peak((INPUT_SIZE * INPUT_SIZE * 3) as usize, 10, 0, 1.0);
        assert!(Classifier::new(Arc::new(bad_output), default_labels()).is_err());
    }

    #[tokio::test]
    async fn test_direct_label_mapping() {
        let stage = stage_with_peak(2, 0.75);
        let frame = VideoFrame::filled(64, 48, [120, 90, 60]);

        let regions = stage.invoke(frame.clone()).await.unwrap();
        assert_eq!(regions.len(), 1);
        // Output index 2 maps straight to table row 2.
        assert_eq!(regions[0].label, "goldfish");
        assert_eq!(regions[0].confidence, 0.75);
    }

    #[tokio::test]
    async fn test_box_spans_original_frame() {
        let stage = stage_with_peak(1, 0.5);
        let frame = VideoFrame::filled(640, 480, [0, 0, 0]);

        let regions = stage.invoke(frame.clone()).await.unwrap();
        assert_eq!(regions[0].bounding_box, BoundingBox::full_frame(&frame));
    }

    #[tokio::test]
    async fn test_index_past_label_table_is_unlabeled() {
        let stage = stage_with_peak(999, 0.9);
        let frame = VideoFrame::filled(8, 8, [1, 2, 3]);

        let regions = stage.invoke(frame).await.unwrap();
        assert_eq!(regions[0].label, "");
        assert_eq!(regions[0].confidence, 0.9);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.9, 0.3]), (1, 0.9));
        assert_eq!(argmax(&[0.5]), (0, 0.5));
        // Ties resolve to the first index.
        assert_eq!(argmax(&[0.4, 0.4]).0, 0);
    }
}
