use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime configuration for the demo pipeline.
pub struct Config {
    pub source_width: u32,
    pub source_height: u32,
    pub source_fps: u32,

    pub enable_classifier: bool,
    pub enable_restyler: bool,
    pub enable_text_reader: bool,
    pub enable_speech: bool,

    /// Optional label table file, one label per line, background first.
    pub labels_path: Option<PathBuf>,

    /// Speech input window, in samples.
    pub audio_sample_rate: u32,
    pub audio_chunk_samples: usize,

    pub health_log_interval: Duration,
}

impl Config {
    pub fn new() -> Self {
        Config {
            source_width: 640,
            source_height: 480,
            source_fps: 15,
            enable_classifier: true,
            enable_restyler: true,
            enable_text_reader: true,
            enable_speech: true,
            labels_path: None,
            audio_sample_rate: 16_000,
            audio_chunk_samples: 1600,
            health_log_interval: Duration::from_secs(30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a label table from a file, one label per line, background first.
pub fn load_labels(path: &PathBuf) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read label table {}", path.display()))?;
    Ok(raw.lines().map(|line| line.to_string()).collect())
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_all_stages() {
        let config = Config::new();
        assert!(config.enable_classifier);
        assert!(config.enable_restyler);
        assert!(config.enable_text_reader);
        assert!(config.enable_speech);
        assert_eq!(config.source_fps, 15);
    }

    #[test]
    fn test_load_labels_missing_file() {
        let path = PathBuf::from("/nonexistent/labels.txt");
        assert!(load_labels(&path).is_err());
    }
}
