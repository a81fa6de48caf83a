//! Speech pipeline: remote synthesis and the serial worker that drives it

pub mod synthesis;
pub mod worker;

pub use synthesis::{SpeechSynthesizer, SynthesisQuery, VoicevoxClient};
pub use worker::{SpeechWorker, UtteranceOutcome, WorkerStats};
