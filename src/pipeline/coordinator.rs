//! Pipeline coordinator: fan-out to the stages, fan-in to one snapshot
//!
//! Bridges one frame source to the registered stages and merges their
//! independent output streams into a single [`CompositeState`], without ever
//! letting a slow stage stall the source or another stage.
//!
//! # Architecture
//!
//! - `submit_frame` spawns one task per registered frame stage and returns
//!   immediately; invocations for consecutive frames overlap freely. There
//!   is no single-flight limiting and no cancellation of superseded work:
//!   the design favors freshness and availability over bounded concurrency.
//! - Each invocation's result is wrapped in a tagged [`StageUpdate`] and
//!   sent through one fan-in channel.
//! - A single merge task owns the composite state, applies each update to
//!   exactly one field, and republishes the whole snapshot on a `watch`
//!   channel. Consumers read the latest snapshot without blocking; the
//!   initial value is the placeholder, so the composite is never "pending".
//! - Failed invocations become [`StageError`] events on one shared broadcast
//!   channel; an error never stops frame intake or other stages.

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::pipeline::health::PipelineHealth;
use crate::pipeline::stage::{ModelStage, StageSet};
use crate::pipeline::state::CompositeState;
use crate::pipeline::types::{AudioChunk, StageError, StageUpdate, VideoFrame};

/// Capacity of the fan-in channel of tagged stage updates.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the shared error broadcast channel.
const ERROR_CHANNEL_CAPACITY: usize = 32;

/// Coordinates the perception pipeline: source → fan-out → stages → merge.
///
/// Cheap to clone; clones share the same stages, channels, and health
/// metrics. Must be created inside a Tokio runtime (construction spawns the
/// merge task).
#[derive(Clone)]
pub struct Coordinator {
    stages: StageSet,
    update_tx: mpsc::Sender<StageUpdate>,
    state_rx: watch::Receiver<CompositeState>,
    error_tx: broadcast::Sender<StageError>,
    health: Arc<PipelineHealth>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Create a coordinator over the given stage set and start its merge
    /// task. The published snapshot starts at the placeholder value.
    pub fn new(stages: StageSet) -> Self {
        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(CompositeState::placeholder());
        let (error_tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let health = Arc::new(PipelineHealth::new());
        let cancel = CancellationToken::new();

        tokio::spawn(run_merge(
            update_rx,
            state_tx,
            health.clone(),
            cancel.clone(),
        ));

        info!(
            "Coordinator: started with {} registered stages",
            stages.stage_count()
        );

        Self {
            stages,
            update_tx,
            state_rx,
            error_tx,
            health,
            cancel,
        }
    }

    /// Fan one frame out to every registered frame stage.
    ///
    /// Non-blocking: one invocation task is spawned per stage and this
    /// returns without waiting for any of them. If a stage is still working
    /// on a previous frame, both invocations run concurrently.
    pub fn submit_frame(&self, frame: VideoFrame) {
        self.health.record_frame_submitted();

        // The untransformed frame is itself one input to the composite.
        self.dispatch_update(StageUpdate::SourceFrame(frame.clone()));

        if let Some(stage) = &self.stages.classifier {
            self.spawn_invocation(stage.clone(), frame.clone(), StageUpdate::Regions);
        }
        if let Some(stage) = &self.stages.restyler {
            self.spawn_invocation(stage.clone(), frame.clone(), StageUpdate::StyledFrame);
        }
        if let Some(stage) = &self.stages.text_reader {
            self.spawn_invocation(stage.clone(), frame, StageUpdate::RecognizedText);
        }
    }

    /// Fan one audio chunk out to the speech stage, if registered.
    pub fn submit_audio(&self, chunk: AudioChunk) {
        self.health.record_audio_submitted();

        if let Some(stage) = &self.stages.speech {
            self.spawn_invocation(stage.clone(), chunk, StageUpdate::SpeechCommand);
        }
    }

    /// Drain a frame source into the fan-out. The coordinator applies no
    /// backpressure upstream; overload policy (drop-oldest, keep-latest)
    /// belongs to the source side of the channel.
    pub fn attach_source(&self, mut frames: mpsc::Receiver<VideoFrame>) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = coordinator.cancel.cancelled() => break,
                    frame = frames.recv() => match frame {
                        Some(frame) => coordinator.submit_frame(frame),
                        None => break,
                    },
                }
            }
            debug!("Coordinator: frame source detached");
        });
    }

    /// Drain an audio source into the fan-out.
    pub fn attach_audio_source(&self, mut chunks: mpsc::Receiver<AudioChunk>) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = coordinator.cancel.cancelled() => break,
                    chunk = chunks.recv() => match chunk {
                        Some(chunk) => coordinator.submit_audio(chunk),
                        None => break,
                    },
                }
            }
            debug!("Coordinator: audio source detached");
        });
    }

    /// Subscribe to composite snapshots. The receiver immediately holds the
    /// latest value and is notified on every field update.
    pub fn subscribe(&self) -> watch::Receiver<CompositeState> {
        self.state_rx.clone()
    }

    /// Subscribe to the shared error stream of all stages.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<StageError> {
        self.error_tx.subscribe()
    }

    /// The latest composite snapshot. Never blocks.
    pub fn snapshot(&self) -> CompositeState {
        self.state_rx.borrow().clone()
    }

    /// Get the pipeline health metrics.
    pub fn health(&self) -> Arc<PipelineHealth> {
        self.health.clone()
    }

    /// Stop the merge task. In-flight invocations run to completion; their
    /// late results are discarded.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Spawn one stage invocation and route its outcome: a result becomes a
    /// tagged update on the fan-in channel, a failure becomes exactly one
    /// error event on the shared error channel.
    fn spawn_invocation<I, O>(
        &self,
        stage: Arc<dyn ModelStage<Input = I, Output = O>>,
        input: I,
        wrap: fn(O) -> StageUpdate,
    ) where
        I: Send + 'static,
        O: Send + 'static,
    {
        let update_tx = self.update_tx.clone();
        let error_tx = self.error_tx.clone();
        let health = self.health.clone();
        health.record_invocation_started();

        tokio::spawn(async move {
            match stage.invoke(input).await {
                Ok(output) => {
                    if update_tx.send(wrap(output)).await.is_err() {
                        debug!("{}: merge task gone, result discarded", stage.name());
                    }
                }
                Err(e) => {
                    health.record_invocation_failure();
                    let error = StageError {
                        stage: stage.name(),
                        message: format!("{e:#}"),
                    };
                    debug!("invocation failed: {error}");
                    // Err only means there is no subscriber right now.
                    let _ = error_tx.send(error);
                }
            }
        });
    }

    /// Forward an update to the merge task without blocking the caller.
    fn dispatch_update(&self, update: StageUpdate) {
        let update_tx = self.update_tx.clone();
        tokio::spawn(async move {
            let _ = update_tx.send(update).await;
        });
    }
}

/// The single writer of the composite state: drains the fan-in channel,
/// applies each tagged update to its field, republishes the whole snapshot.
async fn run_merge(
    mut update_rx: mpsc::Receiver<StageUpdate>,
    state_tx: watch::Sender<CompositeState>,
    health: Arc<PipelineHealth>,
    cancel: CancellationToken,
) {
    let mut state = CompositeState::placeholder();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            update = update_rx.recv() => match update {
                Some(update) => {
                    debug!("Coordinator: merging {} update", update.kind());
                    state.apply(update);
                    health.record_merge();
                    state_tx.send_replace(state.clone());
                }
                None => break,
            },
        }
    }
    info!("Coordinator: merge task stopped");
}
