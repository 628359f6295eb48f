//! Text recognition stage
//!
//! Structurally a full stage: preprocess, inference, postprocess. The
//! decode step is a placeholder until a real recognition head is supplied,
//! so every successful invocation currently yields the same marker string.

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;

use crate::pipeline::convert;
use crate::pipeline::model::CompiledModel;
use crate::pipeline::stage::ModelStage;
use crate::pipeline::types::VideoFrame;

pub const INPUT_SIZE: u32 = 320;

/// Frame → recognized text.
pub struct TextReader {
    model: Arc<dyn CompiledModel>,
}

impl TextReader {
    pub fn new(model: Arc<dyn CompiledModel>) -> Result<Self> {
        let expected = (INPUT_SIZE * INPUT_SIZE * 3) as usize;
        ensure!(
            model.input_len() == expected,
            "text model expects {} input values, stage feeds {}",
            model.input_len(),
            expected
        );
        ensure!(model.output_len() > 0, "text model has no output tensor");
        Ok(Self { model })
    }

    // TODO: replace with a CTC decode once the recognition head lands.
    fn decode(&self, _output: &[f32]) -> String {
        "[OCR output]".into()
    }
}

#[async_trait]
impl ModelStage for TextReader {
    type Input = VideoFrame;
    type Output = String;

    async fn invoke(&self, input: VideoFrame) -> Result<String> {
        let resized = convert::resize_bilinear(&input, INPUT_SIZE, INPUT_SIZE);
        let pixels = convert::normalize_unit(&resized);
        ensure!(
            pixels.len() == self.model.input_len(),
            "input buffer size mismatch: expected {}, got {}",
            self.model.input_len(),
            pixels.len()
        );

        let model = self.model.clone();
        let output = tokio::task::spawn_blocking(move || model.run(&pixels))
            .await
            .context("text inference task failed")??;

        Ok(self.decode(&output))
    }

    fn name(&self) -> &'static str {
        "text_reader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::ZeroModel;

    #[test]
    fn test_construction_rejects_wrong_shapes() {
        assert!(TextReader::new(Arc::new(ZeroModel::new(10, 10))).is_err());

        let no_output = ZeroModel::new((INPUT_SIZE * INPUT_SIZE * 3) as usize, 0);
        assert!(TextReader::new(Arc::new(no_output)).is_err());
    }

    #[tokio::test]
    async fn test_placeholder_decode() {
        let model = ZeroModel::new((INPUT_SIZE * INPUT_SIZE * 3) as usize, 128);
        let stage = TextReader::new(Arc::new(model)).unwrap();

        let text = stage
            .invoke(VideoFrame::filled(30, 20, [5, 5, 5]))
            .await
            .unwrap();
        assert_eq!(text, "[OCR output]");
    }
}
