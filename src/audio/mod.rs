pub mod output;
pub mod wav;

#[cfg(feature = "audio-io")]
pub use output::RodioSink;
pub use output::PlaybackSink;
pub use wav::{decode_wav, encode_wav, DecodedAudio};
