//! Relay wiring: admission queue -> speech worker, plus the control listener
//! that feeds the queue

use crate::audio::PlaybackSink;
use crate::control::{ControlHandler, ControlListener};
use crate::integration::config::RelayConfig;
use crate::speech::{SpeechSynthesizer, SpeechWorker, WorkerStats};
use crate::utils::{admission_queue, AdmissionQueue};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// A running relay: the worker thread is live and the queue accepts work
pub struct Relay {
    config: RelayConfig,
    queue: AdmissionQueue,
    stats: Arc<Mutex<WorkerStats>>,
    worker: JoinHandle<()>,
}

impl Relay {
    /// Validate `config`, create the queue and start the speech worker
    pub fn start<S, P>(config: RelayConfig, synthesizer: S, sink: P) -> Result<Self>
    where
        S: SpeechSynthesizer + Send + 'static,
        P: PlaybackSink + Send + 'static,
    {
        config.validate()?;

        let (queue, consumer) = admission_queue(config.queue_capacity)?;
        let worker = SpeechWorker::new(synthesizer, sink, config.speaker_id);
        let stats = worker.stats();
        let worker = worker.spawn(consumer)?;

        info!(
            "Relay started: engine={} speaker={} queue capacity={}",
            config.engine_url, config.speaker_id, config.queue_capacity
        );

        Ok(Self {
            config,
            queue,
            stats,
            worker,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Handler feeding this relay's queue
    pub fn handler(&self) -> ControlHandler {
        ControlHandler::new(self.queue.clone(), self.config.endpoint.clone())
    }

    /// Bind the control socket at the configured address
    pub async fn bind_listener(&self) -> Result<ControlListener> {
        ControlListener::bind(self.config.control_addr(), self.handler()).await
    }

    /// Items waiting behind the one in flight
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.lock().clone()
    }

    /// Stop admitting work and wait for the worker to finish everything
    /// already queued.
    ///
    /// Handlers or listeners still holding the queue keep the worker alive,
    /// so drop them first.
    pub fn shutdown(self) -> WorkerStats {
        let Relay {
            queue,
            stats,
            worker,
            ..
        } = self;

        drop(queue);
        if worker.join().is_err() {
            warn!("Speech worker panicked");
        }

        let stats = stats.lock().clone();
        info!(
            "Relay stopped: {} processed, {} spoken",
            stats.processed, stats.spoken
        );
        stats
    }
}
