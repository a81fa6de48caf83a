use crate::{RelayError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::debug;

/// PCM audio decoded from a WAV payload
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    /// Interleaved samples in the range -1.0 to 1.0
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

/// Decode an in-memory WAV file
///
/// # Arguments
/// * `bytes` - Complete RIFF/WAVE payload as returned by the synthesis engine
///
/// # Returns
/// * Interleaved `f32` samples with the stream's rate and channel count
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| RelayError::DecodeError(format!("Not a WAV payload: {}", e)))?;

    let spec = reader.spec();

    debug!(
        "Decoding WAV payload: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(RelayError::DecodeError(format!(
            "Invalid stream format: {} Hz, {} channels",
            spec.sample_rate, spec.channels
        )));
    }

    let read_err = |e: hound::Error| RelayError::DecodeError(format!("Failed to read sample: {}", e));

    let samples: Result<Vec<f32>> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().map(|s| s.map_err(read_err)).collect(),
        SampleFormat::Int => match spec.bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|sample| sample as f32 / i8::MAX as f32).map_err(read_err))
                .collect(),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|sample| sample as f32 / i16::MAX as f32).map_err(read_err))
                .collect(),
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / 8388608.0).map_err(read_err)) // 2^23
                .collect(),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / i32::MAX as f32).map_err(read_err))
                .collect(),
            bits => {
                return Err(RelayError::DecodeError(format!(
                    "Unsupported bit depth: {}",
                    bits
                )));
            }
        },
    };

    let samples = samples?;
    if samples.is_empty() {
        return Err(RelayError::DecodeError("WAV payload contains no samples".into()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Encode samples as a 16-bit PCM WAV payload
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| RelayError::IOError(format!("Failed to create WAV writer: {}", e)))?;

        for &sample in samples {
            let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| RelayError::IOError(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| RelayError::IOError(format!("Failed to finalize WAV payload: {}", e)))?;
    }

    Ok(cursor.into_inner())
}
