//! Speech worker: the single consumer of the admission queue
//!
//! Takes one item at a time through query, render and playback. The next
//! item is not dequeued until the current one reaches a terminal state.

use crate::audio::PlaybackSink;
use crate::messages::TextItem;
use crate::speech::synthesis::SpeechSynthesizer;
use crate::utils::QueueConsumer;
use crate::{RelayError, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Terminal state of one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceOutcome {
    Spoken,
    QueryFailed(RelayError),
    RenderFailed(RelayError),
    PlaybackFailed(RelayError),
}

impl UtteranceOutcome {
    pub fn is_spoken(&self) -> bool {
        matches!(self, UtteranceOutcome::Spoken)
    }
}

/// Running totals kept by the worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub processed: u64,
    pub spoken: u64,
    pub query_failed: u64,
    pub render_failed: u64,
    pub playback_failed: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: &UtteranceOutcome) {
        self.processed += 1;
        match outcome {
            UtteranceOutcome::Spoken => self.spoken += 1,
            UtteranceOutcome::QueryFailed(_) => self.query_failed += 1,
            UtteranceOutcome::RenderFailed(_) => self.render_failed += 1,
            UtteranceOutcome::PlaybackFailed(_) => self.playback_failed += 1,
        }
    }
}

pub struct SpeechWorker<S, P> {
    synthesizer: S,
    sink: P,
    speaker_id: u32,
    stats: Arc<Mutex<WorkerStats>>,
}

impl<S, P> SpeechWorker<S, P>
where
    S: SpeechSynthesizer,
    P: PlaybackSink,
{
    pub fn new(synthesizer: S, sink: P, speaker_id: u32) -> Self {
        Self {
            synthesizer,
            sink,
            speaker_id,
            stats: Arc::new(Mutex::new(WorkerStats::default())),
        }
    }

    /// Shared view of the worker's counters
    pub fn stats(&self) -> Arc<Mutex<WorkerStats>> {
        Arc::clone(&self.stats)
    }

    /// Run one item to its terminal state.
    ///
    /// Failures are logged and reported in the outcome, never propagated.
    pub fn process(&mut self, item: TextItem) -> UtteranceOutcome {
        debug!(
            "Speaking {} after {}ms in queue: {}",
            item.id,
            item.waited_ms(Utc::now()),
            item.preview()
        );

        let outcome = self.speak(&item);
        match &outcome {
            UtteranceOutcome::Spoken => info!("Spoke: {}", item.preview()),
            UtteranceOutcome::QueryFailed(e) => warn!("audio_query failed for '{}': {}", item.preview(), e),
            UtteranceOutcome::RenderFailed(e) => warn!("synthesis failed for '{}': {}", item.preview(), e),
            UtteranceOutcome::PlaybackFailed(e) => warn!("Playback failed for '{}': {}", item.preview(), e),
        }

        self.stats.lock().record(&outcome);
        outcome
    }

    fn speak(&mut self, item: &TextItem) -> UtteranceOutcome {
        let query = match self.synthesizer.build_query(item.text(), self.speaker_id) {
            Ok(query) => query,
            Err(e) => return UtteranceOutcome::QueryFailed(e),
        };

        let audio = match self.synthesizer.render(&query, self.speaker_id) {
            Ok(audio) => audio,
            Err(e) => return UtteranceOutcome::RenderFailed(e),
        };

        match self.sink.play(audio) {
            Ok(()) => UtteranceOutcome::Spoken,
            Err(e) => UtteranceOutcome::PlaybackFailed(e),
        }
    }

    /// Drain the queue until every producer is gone
    pub fn run(mut self, consumer: QueueConsumer) {
        info!("Speech worker ready (speaker {})", self.speaker_id);

        while let Some(item) = consumer.dequeue() {
            self.process(item);
        }

        info!("Speech worker stopped");
    }
}

impl<S, P> SpeechWorker<S, P>
where
    S: SpeechSynthesizer + Send + 'static,
    P: PlaybackSink + Send + 'static,
{
    /// Start the worker on its own thread.
    /// Returns the JoinHandle for the worker thread.
    pub fn spawn(self, consumer: QueueConsumer) -> Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("speech-worker".into())
            .spawn(move || self.run(consumer))
            .map_err(|e| RelayError::IOError(format!("Failed to spawn speech worker: {}", e)))
    }
}
