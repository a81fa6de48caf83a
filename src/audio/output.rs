use crate::Result;
#[cfg(feature = "audio-io")]
use crate::audio::wav::decode_wav;
#[cfg(feature = "audio-io")]
use crate::RelayError;
#[cfg(feature = "audio-io")]
use tracing::{debug, info};

/// Destination for synthesized audio.
///
/// `play` must not return before the payload has finished playing, and must
/// release the output device on every return path.
pub trait PlaybackSink {
    fn play(&mut self, audio: Vec<u8>) -> Result<()>;
}

/// Plays WAV payloads on the default output device through rodio.
///
/// The device is opened per call and dropped when the call returns, so
/// nothing holds it between utterances.
#[cfg(feature = "audio-io")]
#[derive(Debug, Default)]
pub struct RodioSink {
    played: u64,
}

#[cfg(feature = "audio-io")]
impl RodioSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads played to completion
    pub fn played(&self) -> u64 {
        self.played
    }
}

#[cfg(feature = "audio-io")]
impl PlaybackSink for RodioSink {
    fn play(&mut self, audio: Vec<u8>) -> Result<()> {
        // Decode before the device is opened
        let decoded = decode_wav(&audio)?;
        drop(audio);

        let (_stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| RelayError::DeviceError(format!("Failed to open output device: {}", e)))?;
        let sink = rodio::Sink::try_new(&handle)
            .map_err(|e| RelayError::DeviceError(format!("Failed to create playback sink: {}", e)))?;

        debug!(
            "Playing {:.2}s of audio ({} Hz, {} ch)",
            decoded.duration_secs(),
            decoded.sample_rate,
            decoded.channels
        );

        sink.append(rodio::buffer::SamplesBuffer::new(
            decoded.channels,
            decoded.sample_rate,
            decoded.samples,
        ));
        sink.sleep_until_end();

        self.played += 1;
        info!("Playback finished");
        Ok(())
    }
}
