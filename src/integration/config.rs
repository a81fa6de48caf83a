//! Configuration for the relay
//!
//! Values are parsed once at startup, validated, and then handed to each
//! component as an immutable `RelayConfig`.

use crate::control::DEFAULT_ENDPOINT;
use crate::utils::{MAX_QUEUE_CAPACITY, MIN_QUEUE_CAPACITY};
use crate::{RelayError, Result};
use clap::Parser;
use reqwest::Url;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default VOICEVOX engine address
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:50021";

/// Default OSC listen port
pub const DEFAULT_CONTROL_PORT: u16 = 9000;

/// Default number of utterances allowed to wait behind the current one
pub const DEFAULT_QUEUE_CAPACITY: usize = 3;

/// Command-line interface
#[derive(Parser, Debug, Clone)]
#[command(name = "voxrelay")]
#[command(about = "Speak OSC text messages through a VOICEVOX engine")]
#[command(version)]
pub struct Cli {
    /// VOICEVOX engine base URL
    #[arg(long, env = "VOXRELAY_ENGINE", default_value = DEFAULT_ENGINE_URL)]
    pub engine: String,

    /// VOICEVOX speaker ID
    #[arg(long, env = "VOXRELAY_SPEAKER", default_value_t = 1, allow_negative_numbers = true)]
    pub speaker: i64,

    /// UDP port for incoming OSC messages
    #[arg(long, env = "VOXRELAY_PORT", default_value_t = DEFAULT_CONTROL_PORT)]
    pub port: u16,

    /// Maximum number of pending utterances (1-10)
    #[arg(long = "queue-capacity", env = "VOXRELAY_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Interface to bind the OSC listener to
    #[arg(long, env = "VOXRELAY_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// OSC address carrying the text to speak
    #[arg(long, env = "VOXRELAY_ADDRESS", default_value = DEFAULT_ENDPOINT)]
    pub address: String,
}

impl Cli {
    /// Convert parsed arguments into a validated configuration
    pub fn into_config(self) -> Result<RelayConfig> {
        let speaker_id = u32::try_from(self.speaker).map_err(|_| {
            RelayError::ConfigError(format!(
                "speaker ID must be a non-negative 32-bit integer, got {}",
                self.speaker
            ))
        })?;

        let config = RelayConfig {
            engine_url: self.engine,
            speaker_id,
            bind_addr: self.bind,
            port: self.port,
            queue_capacity: self.queue_capacity,
            endpoint: self.address,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Startup configuration, fixed for the process lifetime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// Synthesis engine base URL
    pub engine_url: String,

    /// Speaker used for every utterance
    pub speaker_id: u32,

    /// Interface the control listener binds to
    pub bind_addr: IpAddr,

    /// Control listener UDP port
    pub port: u16,

    /// Admission queue capacity
    pub queue_capacity: usize,

    /// OSC address of the utterance endpoint
    pub endpoint: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            speaker_id: 1,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_CONTROL_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl RelayConfig {
    pub fn with_engine(mut self, engine_url: impl Into<String>) -> Self {
        self.engine_url = engine_url.into();
        self
    }

    pub fn with_speaker(mut self, speaker_id: u32) -> Self {
        self.speaker_id = speaker_id;
        self
    }

    /// Listen on `addr` instead of the configured interface and port
    pub fn with_control_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr.ip();
        self.port = addr.port();
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.engine_url).map_err(|e| {
            RelayError::ConfigError(format!("Invalid engine URL '{}': {}", self.engine_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(RelayError::ConfigError(format!(
                "Engine URL must be an http(s) address: {}",
                self.engine_url
            )));
        }

        if !(MIN_QUEUE_CAPACITY..=MAX_QUEUE_CAPACITY).contains(&self.queue_capacity) {
            return Err(RelayError::ConfigError(format!(
                "Queue capacity must be between {} and {}, got {}",
                MIN_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY, self.queue_capacity
            )));
        }

        if !self.endpoint.starts_with('/') {
            return Err(RelayError::ConfigError(format!(
                "OSC address must start with '/': {}",
                self.endpoint
            )));
        }

        Ok(())
    }
}
