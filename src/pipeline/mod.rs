//! Perception pipeline for perceptify
//!
//! This module provides the fan-out/fan-in architecture that turns a live
//! frame stream into one merged snapshot, separating concerns between:
//! - Capability dispatch: the `ModelStage` trait and its concrete stages
//! - Data transport: channels between the source, the stages and the merge
//! - Consistency: a single-writer combine-latest merge into `CompositeState`
//! - Failure visibility: one shared error stream for all stages
//!
//! # Architecture
//!
//! Each submitted frame is dispatched to every registered stage as its own
//! async task; no stage can delay another, the frame source, or the
//! consumer. Stage results fan in to one merge task that owns the composite
//! state and republishes it on every update. Stage failures fan in to one
//! broadcast error stream. Health counters track the whole flow.

pub mod convert;
pub mod coordinator;
pub mod health;
pub mod model;
pub mod stage;
pub mod stages;
pub mod state;
pub mod types;

pub use coordinator::Coordinator;
pub use health::{HealthSummary, PipelineHealth};
pub use stage::{ModelStage, StageSet};
pub use state::CompositeState;
pub use types::{
    AudioChunk, BoundingBox, DetectedRegion, StageError, StageUpdate, VideoFrame,
};
