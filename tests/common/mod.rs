//! Fake synthesis engine and playback sink shared by the integration tests

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use voxrelay::audio::{decode_wav, encode_wav, PlaybackSink};
use voxrelay::speech::{SpeechSynthesizer, SynthesisQuery};
use voxrelay::{RelayError, Result};

/// Shared record of what the pipeline did, in order
#[derive(Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Timeline {
    /// Mark one pipeline step as running for a short while
    fn step(&self, label: &str, text: &str) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.events.lock().push(format!("{}:{}", label, text));
        thread::sleep(Duration::from_millis(2));
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Texts that reached the playback device, in order
    pub fn played(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("play:").map(str::to_string))
            .collect()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Synthesizer that fails the query for "broken", renders undecodable
/// audio for "garbled", and blocks on `hold` for texts starting with "hold"
pub struct FakeEngine {
    timeline: Timeline,
    hold: Option<Receiver<()>>,
}

impl FakeEngine {
    pub fn new(timeline: Timeline) -> Self {
        Self { timeline, hold: None }
    }

    pub fn with_hold(mut self, hold: Receiver<()>) -> Self {
        self.hold = Some(hold);
        self
    }
}

impl SpeechSynthesizer for FakeEngine {
    fn build_query(&mut self, text: &str, speaker_id: u32) -> Result<SynthesisQuery> {
        self.timeline.step("query", text);
        if text.starts_with("hold") {
            if let Some(hold) = &self.hold {
                let _ = hold.recv();
            }
        }
        if text == "broken" {
            return Err(RelayError::SynthesisUnavailable("engine refused".into()));
        }
        SynthesisQuery::from_json(json!({ "text": text, "speaker": speaker_id }))
    }

    fn render(&mut self, query: &SynthesisQuery, _speaker_id: u32) -> Result<Vec<u8>> {
        let text = query.as_json()["text"].as_str().unwrap_or_default().to_string();
        self.timeline.step("render", &text);
        if text == "garbled" {
            return Ok(b"this is not a wav file".to_vec());
        }
        // Tag the payload with the text so the sink can report it
        let mut samples = vec![0.0f32; 8];
        samples.extend(text.bytes().map(|b| b as f32 / 255.0));
        encode_wav(&samples, 24000, 1)
    }
}

/// Sink that decodes the payload and records which text it "played"
pub struct FakeSpeaker {
    timeline: Timeline,
}

impl FakeSpeaker {
    pub fn new(timeline: Timeline) -> Self {
        Self { timeline }
    }
}

impl PlaybackSink for FakeSpeaker {
    fn play(&mut self, audio: Vec<u8>) -> Result<()> {
        let decoded = decode_wav(&audio)?;
        let text: String = decoded.samples[8..]
            .iter()
            .map(|s| (s * 255.0).round() as u8 as char)
            .collect();
        self.timeline.step("play", &text);
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
