//! Style transfer stage
//!
//! Produces a restyled frame at the model's fixed working resolution. The
//! output deliberately does NOT match the input resolution; scaling the
//! result back up is the display layer's choice.

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;

use crate::pipeline::convert;
use crate::pipeline::model::CompiledModel;
use crate::pipeline::stage::ModelStage;
use crate::pipeline::types::VideoFrame;

/// Working resolution for both input and output.
pub const INPUT_SIZE: u32 = 256;

/// Frame → restyled frame.
pub struct Restyler {
    model: Arc<dyn CompiledModel>,
}

impl Restyler {
    pub fn new(model: Arc<dyn CompiledModel>) -> Result<Self> {
        let expected = (INPUT_SIZE * INPUT_SIZE * 3) as usize;
        ensure!(
            model.input_len() == expected,
            "restyler model expects {} input values, stage feeds {}",
            model.input_len(),
            expected
        );
        ensure!(
            model.output_len() == expected,
            "restyler model produces {} values, expected a {}x{} RGB tensor",
            model.output_len(),
            INPUT_SIZE,
            INPUT_SIZE
        );
        Ok(Self { model })
    }
}

#[async_trait]
impl ModelStage for Restyler {
    type Input = VideoFrame;
    type Output = VideoFrame;

    async fn invoke(&self, input: VideoFrame) -> Result<VideoFrame> {
        let resized = convert::resize_bilinear(&input, INPUT_SIZE, INPUT_SIZE);
        let pixels = convert::normalize_unit(&resized);
        ensure!(
            pixels.len() == self.model.input_len(),
            "input buffer size mismatch: expected {}, got {}",
            self.model.input_len(),
            pixels.len()
        );

        let model = self.model.clone();
        let styled = tokio::task::spawn_blocking(move || model.run(&pixels))
            .await
            .context("restyler inference task failed")??;
        ensure!(
            styled.len() == (INPUT_SIZE * INPUT_SIZE * 3) as usize,
            "output buffer size mismatch: expected {}, got {}",
            INPUT_SIZE * INPUT_SIZE * 3,
            styled.len()
        );

        Ok(convert::floats_to_rgb8(&styled, INPUT_SIZE, INPUT_SIZE))
    }

    fn name(&self) -> &'static str {
        "restyler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::{PassthroughModel, ZeroModel};

    #[test]
    fn test_construction_rejects_wrong_shapes() {
        assert!(Restyler::new(Arc::new(PassthroughModel::new(16))).is_err());

        let asymmetric = ZeroModel::new((INPUT_SIZE * INPUT_SIZE * 3) as usize, 5);
        assert!(Restyler::new(Arc::new(asymmetric)).is_err());
    }

    #[tokio::test]
    async fn test_output_is_working_resolution() {
        let len = (INPUT_SIZE * INPUT_SIZE * 3) as usize;
        let stage = Restyler::new(Arc::new(PassthroughModel::new(len))).unwrap();

        // Input resolution differs from the working resolution on purpose.
        let frame = VideoFrame::filled(640, 480, [100, 150, 200]);
        let styled = stage.invoke(frame).await.unwrap();

        assert_eq!(styled.width(), INPUT_SIZE);
        assert_eq!(styled.height(), INPUT_SIZE);
    }

    #[tokio::test]
    async fn test_passthrough_model_preserves_pixels() {
        let len = (INPUT_SIZE * INPUT_SIZE * 3) as usize;
        let stage = Restyler::new(Arc::new(PassthroughModel::new(len))).unwrap();

        let frame = VideoFrame::filled(INPUT_SIZE, INPUT_SIZE, [100, 150, 200]);
        let styled = stage.invoke(frame.clone()).await.unwrap();
        assert_eq!(styled, frame);
    }
}
