use thiserror::Error;

/// Errors that can occur while configuring, running or finalizing a recording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// The device rejected the requested parameters (no usable buffer size).
    #[error("configuration failed: {0}")]
    Configuration(String),

    /// The device could not be brought to an initialized or recording state.
    #[error("device initialization failed: {0}")]
    DeviceInit(String),

    #[error("i/o error: {0}")]
    Io(String),

    /// Runtime failure on the capture thread.
    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("no working capture configuration after {attempts} attempts")]
    ProbeFailed { attempts: usize },

    /// Session parameters and recorded payload disagree.
    #[error("configuration inconsistency: {0}")]
    ConfigurationInconsistency(String),
}

impl From<std::io::Error> for RecorderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
