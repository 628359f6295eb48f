//! Model backend seam
//!
//! A stage never talks to an inference runtime directly; it owns a
//! [`CompiledModel`] and feeds it flat f32 tensors. How the model was
//! obtained (bundled asset, downloaded file, hardware delegate) is the
//! loader's concern: a stage is constructed with a ready model or it is not
//! constructed at all.
//!
//! The built-in backends below are enough to run the full pipeline without
//! any model files, and they double as test fixtures.

use anyhow::{Result, ensure};

/// A loaded, ready-to-run model with fixed input and output tensor sizes.
///
/// `run` is synchronous and CPU-bound; stages call it through
/// `spawn_blocking` so a slow model never stalls the runtime.
pub trait CompiledModel: Send + Sync {
    /// Number of f32 values the model expects as input.
    fn input_len(&self) -> usize;

    /// Number of f32 values the model produces.
    fn output_len(&self) -> usize;

    /// Run one inference. The input slice length is validated by the caller
    /// against `input_len`; implementations may still reject it.
    fn run(&self, input: &[f32]) -> Result<Vec<f32>>;
}

/// Backend that ignores its input and returns a fixed score vector.
///
/// Stands in for a classification model: put the peak wherever the "detected"
/// class should be.
pub struct FixedLogitsModel {
    input_len: usize,
    logits: Vec<f32>,
}

impl FixedLogitsModel {
    pub fn new(input_len: usize, logits: Vec<f32>) -> Self {
        Self { input_len, logits }
    }

    /// A score vector of `classes` entries with a single peak.
    pub fn with_peak(input_len: usize, classes: usize, peak_index: usize, score: f32) -> Self {
        let mut logits = vec![0.0; classes];
        if peak_index < classes {
            logits[peak_index] = score;
        }
        Self { input_len, logits }
    }
}

impl CompiledModel for FixedLogitsModel {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.logits.len()
    }

    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        ensure!(
            input.len() == self.input_len,
            "input tensor size mismatch: expected {}, got {}",
            self.input_len,
            input.len()
        );
        Ok(self.logits.clone())
    }
}

/// Backend that returns its input unchanged. Stands in for an image-to-image
/// model; with the restyler's `[0, 1]` normalization the "restyled" output is
/// the resized input.
pub struct PassthroughModel {
    len: usize,
}

impl PassthroughModel {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl CompiledModel for PassthroughModel {
    fn input_len(&self) -> usize {
        self.len
    }

    fn output_len(&self) -> usize {
        self.len
    }

    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        ensure!(
            input.len() == self.len,
            "input tensor size mismatch: expected {}, got {}",
            self.len,
            input.len()
        );
        Ok(input.to_vec())
    }
}

/// Backend that produces an all-zero output tensor. Stands in for the text
/// and speech models whose decoders are still placeholders.
pub struct ZeroModel {
    input_len: usize,
    output_len: usize,
}

impl ZeroModel {
    pub fn new(input_len: usize, output_len: usize) -> Self {
        Self { input_len, output_len }
    }
}

impl CompiledModel for ZeroModel {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.output_len
    }

    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        ensure!(
            input.len() == self.input_len,
            "input tensor size mismatch: expected {}, got {}",
            self.input_len,
            input.len()
        );
        Ok(vec![0.0; self.output_len])
    }
}
