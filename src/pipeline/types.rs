//! Core types for the perception pipeline

use anyhow::{Result, ensure};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An immutable RGB8 video frame.
///
/// Pixel data is reference-counted (`Bytes`), so cloning a frame is cheap and
/// every concurrently-running stage invocation can hold the same buffer
/// without copying it. There is no mutation API: a stage that transforms
/// pixels produces a new frame.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFrame {
    data: Bytes,
    width: u32,
    height: u32,
}

impl VideoFrame {
    /// Wrap an RGB8 buffer. The buffer length must be `width * height * 3`.
    pub fn from_rgb8(data: impl Into<Bytes>, width: u32, height: u32) -> Result<Self> {
        let data = data.into();
        ensure!(width > 0 && height > 0, "frame dimensions must be non-zero");
        ensure!(
            data.len() == (width * height * 3) as usize,
            "RGB8 buffer size mismatch: expected {} bytes for {}x{}, got {}",
            width * height * 3,
            width,
            height,
            data.len()
        );
        Ok(Self { data, width, height })
    }

    /// Create a solid-color frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            data: Bytes::from(data),
            width,
            height,
        }
    }

    /// Internal constructor for buffers whose size is already known to match.
    pub(crate) fn new_unchecked(data: Bytes, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height * 3) as usize);
        Self { data, width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB8 pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The RGB triple at `(x, y)`. Panics on out-of-bounds coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size", &self.size_bytes())
            .finish()
    }
}

/// An immutable chunk of 16-bit little-endian PCM audio.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioChunk {
    samples: Bytes,
    sample_rate: u32,
}

impl AudioChunk {
    /// Wrap a PCM16-LE buffer. The buffer length must be even.
    pub fn from_pcm16(samples: impl Into<Bytes>, sample_rate: u32) -> Result<Self> {
        let samples = samples.into();
        ensure!(
            samples.len() % 2 == 0,
            "PCM16 buffer has odd length {}",
            samples.len()
        );
        ensure!(sample_rate > 0, "sample rate must be non-zero");
        Ok(Self { samples, sample_rate })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Raw PCM16-LE bytes.
    pub fn data(&self) -> &[u8] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len() / 2
    }
}

impl std::fmt::Debug for AudioChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioChunk")
            .field("samples", &self.sample_count())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Axis-aligned rectangle in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// The rectangle covering an entire frame.
    pub fn full_frame(frame: &VideoFrame) -> Self {
        Self {
            x: 0,
            y: 0,
            width: frame.width(),
            height: frame.height(),
        }
    }
}

/// One labeled region produced by the classifier.
///
/// The bounding box is expressed in the coordinate space of the original
/// input frame, not the classifier's internal working resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub label: String,
    /// The stage's own score in `[0, 1]`, not renormalized.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// A tagged per-stage result, fanned in to the merge task.
///
/// Each variant maps to exactly one field of
/// [`CompositeState`](crate::pipeline::state::CompositeState), so the merge
/// step can apply an update without knowing which stage produced it.
#[derive(Debug, Clone)]
pub enum StageUpdate {
    /// A frame as delivered by the source, untransformed.
    SourceFrame(VideoFrame),
    /// The restyler's output frame (at its working resolution).
    StyledFrame(VideoFrame),
    /// The classifier's labeled regions for one frame. May be empty.
    Regions(Vec<DetectedRegion>),
    /// Text recognized in one frame.
    RecognizedText(String),
    /// A command transcribed from one audio chunk.
    SpeechCommand(String),
}

impl StageUpdate {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StageUpdate::SourceFrame(_) => "source_frame",
            StageUpdate::StyledFrame(_) => "styled_frame",
            StageUpdate::Regions(_) => "regions",
            StageUpdate::RecognizedText(_) => "recognized_text",
            StageUpdate::SpeechCommand(_) => "speech_command",
        }
    }
}

/// A non-fatal failure reported by one stage invocation.
///
/// Errors are advisory: the invocation that produced one simply yields no
/// result, and the next input is a natural retry.
#[derive(Debug, Clone)]
pub struct StageError {
    pub stage: &'static str,
    pub message: String,
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}
