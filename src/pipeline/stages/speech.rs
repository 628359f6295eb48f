//! Speech recognition stage
//!
//! Decodes PCM16 audio to float samples, runs the model and produces a
//! command string. Like the text reader, the decode step is a placeholder
//! until a real decoder is supplied.

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;

use crate::pipeline::convert;
use crate::pipeline::model::CompiledModel;
use crate::pipeline::stage::ModelStage;
use crate::pipeline::types::AudioChunk;

/// Audio → command text.
pub struct SpeechRecognizer {
    model: Arc<dyn CompiledModel>,
}

impl SpeechRecognizer {
    pub fn new(model: Arc<dyn CompiledModel>) -> Result<Self> {
        ensure!(model.input_len() > 0, "speech model has no input tensor");
        ensure!(model.output_len() > 0, "speech model has no output tensor");
        Ok(Self { model })
    }

    // TODO: replace with a real transcript decode alongside the text reader's.
    fn decode(&self, _output: &[f32]) -> String {
        "[speech output]".into()
    }
}

#[async_trait]
impl ModelStage for SpeechRecognizer {
    type Input = AudioChunk;
    type Output = String;

    async fn invoke(&self, input: AudioChunk) -> Result<String> {
        let samples = convert::pcm16_to_f32(input.data());
        ensure!(
            samples.len() == self.model.input_len(),
            "audio window size mismatch: model expects {} samples, chunk has {}",
            self.model.input_len(),
            samples.len()
        );

        let model = self.model.clone();
        let output = tokio::task::spawn_blocking(move || model.run(&samples))
            .await
            .context("speech inference task failed")??;

        Ok(self.decode(&output))
    }

    fn name(&self) -> &'static str {
        "speech_recognizer"
    }
}
