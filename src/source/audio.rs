//! Synthetic audio source
//!
//! Emits zeroed PCM chunks at a steady cadence, standing in for a
//! microphone so the speech stage stays exercised end to end.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::AudioSource;
use crate::pipeline::types::AudioChunk;

pub struct SilenceSource {
    sample_rate: u32,
    chunk_samples: usize,
}

impl SilenceSource {
    pub fn new(sample_rate: u32, chunk_samples: usize) -> Self {
        Self {
            sample_rate,
            chunk_samples: chunk_samples.max(1),
        }
    }

    fn chunk_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.chunk_samples as f64 / self.sample_rate as f64)
    }
}

#[async_trait]
impl AudioSource for SilenceSource {
    async fn run(
        self,
        output: mpsc::Sender<AudioChunk>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut interval = tokio::time::interval(self.chunk_duration());
        let silence = vec![0u8; self.chunk_samples * 2];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let chunk = AudioChunk::from_pcm16(silence.clone(), self.sample_rate)?;
                    if output.send(chunk).await.is_err() {
                        break;
                    }
                }
            }
        }

        info!("SilenceSource: stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_chunk_duration() {
        let source = SilenceSource::new(16_000, 1600);
        assert_eq!(source.chunk_duration(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_emits_sized_chunks() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(SilenceSource::new(16_000, 160).run(tx, cancel.clone()));

        let chunk = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no chunk within timeout")
            .expect("source closed early");
        assert_eq!(chunk.sample_count(), 160);
        assert_eq!(chunk.sample_rate(), 16_000);
        assert!(chunk.data().iter().all(|&b| b == 0));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
