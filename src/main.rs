use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, ArgAction, Command};
use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, app_name, version};
use crate::pipeline::model::{FixedLogitsModel, PassthroughModel, ZeroModel};
use crate::pipeline::stages::{
    Classifier, Restyler, SpeechRecognizer, TextReader, classifier, default_labels, restyler,
    text_reader,
};
use crate::pipeline::{Coordinator, StageSet};
use crate::source::{AudioSource, FrameSource, SilenceSource, SyntheticSource};

pub mod config;
pub mod pipeline;
pub mod source;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let matches = Command::new(app_name())
        .version(version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("width")
                .long("width")
                .value_name("PIXELS")
                .help("Source frame width.")
                .value_parser(clap::value_parser!(u32).range(1..))
                .default_value("640"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_name("PIXELS")
                .help("Source frame height.")
                .value_parser(clap::value_parser!(u32).range(1..))
                .default_value("480"),
        )
        .arg(
            Arg::new("fps")
                .long("fps")
                .value_name("RATE")
                .help("Source frame rate.")
                .value_parser(clap::value_parser!(u32).range(1..=240))
                .default_value("15"),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .value_name("SECONDS")
                .help("Stop after this many seconds (default: run until Ctrl-C).")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("labels")
                .long("labels")
                .value_name("FILE")
                .help("Label table, one label per line, background first."),
        )
        .arg(
            Arg::new("no-classifier")
                .long("no-classifier")
                .help("Disable the classification stage.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-restyler")
                .long("no-restyler")
                .help("Disable the style transfer stage.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-text")
                .long("no-text")
                .help("Disable the text recognition stage.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-speech")
                .long("no-speech")
                .help("Disable the speech recognition stage.")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let mut config = Config::new();
    config.source_width = *matches.get_one::<u32>("width").unwrap();
    config.source_height = *matches.get_one::<u32>("height").unwrap();
    config.source_fps = *matches.get_one::<u32>("fps").unwrap();
    config.enable_classifier = !matches.get_flag("no-classifier");
    config.enable_restyler = !matches.get_flag("no-restyler");
    config.enable_text_reader = !matches.get_flag("no-text");
    config.enable_speech = !matches.get_flag("no-speech");
    config.labels_path = matches.get_one::<String>("labels").map(Into::into);
    let duration = matches.get_one::<u64>("duration").copied();

    // gracefully close the pipeline when receiving SIGINT, SIGTERM, or SIGHUP
    let cancel = CancellationToken::new();
    let ctrlc_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        ctrlc_cancel.cancel();
    })
    .expect("Error setting Ctrl-C handler");

    let coordinator = Coordinator::new(build_stages(&config));

    // Frame and audio sources feed the fan-out through plain channels; the
    // coordinator drains them without pushing back.
    let (frame_tx, frame_rx) = mpsc::channel(1);
    coordinator.attach_source(frame_rx);
    let source = SyntheticSource::new(config.source_width, config.source_height, config.source_fps);
    let source_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = source.run(frame_tx, source_cancel).await {
            error!("frame source failed: {e:#}");
        }
    });

    if config.enable_speech {
        let (audio_tx, audio_rx) = mpsc::channel(1);
        coordinator.attach_audio_source(audio_rx);
        let audio = SilenceSource::new(config.audio_sample_rate, config.audio_chunk_samples);
        let audio_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = audio.run(audio_tx, audio_cancel).await {
                error!("audio source failed: {e:#}");
            }
        });
    }

    spawn_state_consumer(&coordinator);
    spawn_error_consumer(&coordinator);

    // Log health metrics periodically
    let health = coordinator.health();
    let interval = config.health_log_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // skip the immediate first tick
        loop {
            ticker.tick().await;
            info!("{}", health.summary());
        }
    });

    match duration {
        Some(secs) => {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!("session duration reached");
                    cancel.cancel();
                }
            }
        }
        None => cancel.cancelled().await,
    }

    coordinator.shutdown();
    info!("{}", coordinator.health().summary());
}

/// Construct every enabled stage. A stage whose construction fails is
/// logged and skipped; the pipeline runs with whatever is left.
fn build_stages(config: &Config) -> StageSet {
    let mut stages = StageSet::new();

    if config.enable_classifier {
        let labels = match &config.labels_path {
            Some(path) => match config::load_labels(path) {
                Ok(labels) => labels,
                Err(e) => {
                    warn!("label table unusable, falling back to built-in: {e:#}");
                    default_labels()
                }
            },
            None => default_labels(),
        };
        let model = Arc::new(FixedLogitsModel::with_peak(
            (classifier::INPUT_SIZE * classifier::INPUT_SIZE * 3) as usize,
            classifier::NUM_CLASSES,
            2,
            0.88,
        ));
        match Classifier::new(model, labels) {
            Ok(stage) => stages.classifier = Some(Arc::new(stage)),
            Err(e) => error!("classifier unavailable: {e:#}"),
        }
    }

    if config.enable_restyler {
        let len = (restyler::INPUT_SIZE * restyler::INPUT_SIZE * 3) as usize;
        match Restyler::new(Arc::new(PassthroughModel::new(len))) {
            Ok(stage) => stages.restyler = Some(Arc::new(stage)),
            Err(e) => error!("restyler unavailable: {e:#}"),
        }
    }

    if config.enable_text_reader {
        let len = (text_reader::INPUT_SIZE * text_reader::INPUT_SIZE * 3) as usize;
        match TextReader::new(Arc::new(ZeroModel::new(len, 128))) {
            Ok(stage) => stages.text_reader = Some(Arc::new(stage)),
            Err(e) => error!("text reader unavailable: {e:#}"),
        }
    }

    if config.enable_speech {
        let model = ZeroModel::new(config.audio_chunk_samples, 64);
        match SpeechRecognizer::new(Arc::new(model)) {
            Ok(stage) => stages.speech = Some(Arc::new(stage)),
            Err(e) => error!("speech recognizer unavailable: {e:#}"),
        }
    }

    stages
}

/// The display layer of the demo: logs each snapshot transition and dumps
/// the region list as JSON whenever it changes.
fn spawn_state_consumer(coordinator: &Coordinator) {
    let mut state_rx = coordinator.subscribe();
    tokio::spawn(async move {
        let mut last_regions = Vec::new();
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow_and_update().clone();
            debug!(
                "StateConsumer: {}/5 fields, frame {:?}, styled {:?}, regions {}, text {:?}, command {:?}",
                state.populated_fields(),
                state.latest_frame,
                state.latest_styled_frame,
                state.latest_regions.len(),
                state.latest_text,
                state.latest_command
            );

            if state.latest_regions != last_regions {
                last_regions = state.latest_regions.clone();
                match serde_json::to_string(&last_regions) {
                    Ok(json) => info!("StateConsumer: regions {json}"),
                    Err(e) => warn!("region serialization failed: {e}"),
                }
            }
        }
        debug!("StateConsumer: state stream ended");
    });
}

/// Surfaces the most recent stage error as advisory text.
fn spawn_error_consumer(coordinator: &Coordinator) {
    let mut errors = coordinator.subscribe_errors();
    tokio::spawn(async move {
        loop {
            match errors.recv().await {
                Ok(error) => warn!("stage error: {error}"),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("error stream lagged, {missed} errors missed");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
