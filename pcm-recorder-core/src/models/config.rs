use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::audio_models::{ChannelLayout, InputSource, PcmEncoding};
use super::error::RecorderError;

/// Highest accepted capture rate. Keeps every derived byte rate within `u32`.
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// Configuration for a recorder session.
///
/// Construct with [`RecorderConfig::new`] (explicit parameters) or
/// [`crate::session::probe::find_working_config`] (auto-detected). The engine
/// keeps its own copy, so the value cannot change under a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,

    pub channels: ChannelLayout,

    pub encoding: PcmEncoding,

    #[serde(default)]
    pub input_source: InputSource,

    /// Raw PCM output file, finalized to WAV on completion.
    /// `None` streams to the subscriber only.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl RecorderConfig {
    pub fn new(
        input_source: InputSource,
        sample_rate: u32,
        channels: ChannelLayout,
        encoding: PcmEncoding,
    ) -> Result<Self, RecorderError> {
        let config = Self {
            sample_rate,
            channels,
            encoding,
            input_source,
            file_path: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn without_file(mut self) -> Self {
        self.file_path = None;
        self
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.sample_rate == 0 {
            return Err(RecorderError::Configuration("sample rate must be positive".into()));
        }
        if self.sample_rate > MAX_SAMPLE_RATE {
            return Err(RecorderError::Configuration(format!(
                "sample rate {} Hz exceeds {} Hz",
                self.sample_rate, MAX_SAMPLE_RATE
            )));
        }
        if let Some(ref path) = self.file_path {
            if path.as_os_str().is_empty() {
                return Err(RecorderError::Configuration("file path is empty".into()));
            }
        }
        Ok(())
    }

    /// Bytes per second of the persisted payload.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels.count() as u32 * self.encoding.bytes_per_sample() as u32
    }

    pub fn from_json(json: &str) -> Result<Self, RecorderError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RecorderError::Configuration(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, RecorderError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RecorderError::Configuration(format!("failed to serialize config: {}", e)))
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: ChannelLayout::Mono,
            encoding: PcmEncoding::Pcm16Bit,
            input_source: InputSource::Default,
            file_path: None,
        }
    }
}

impl fmt::Display for RecorderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, bits: {}, channel: {}",
            self.sample_rate, self.encoding, self.channels
        )
    }
}
