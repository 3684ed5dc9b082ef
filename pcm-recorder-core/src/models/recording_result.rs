use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::InputSource;

/// Result returned when a persisted recording has been finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    /// PCM payload length, excluding the 44-byte header.
    pub data_bytes: u64,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    /// SHA-256 of the finished WAV file, lowercase hex.
    pub checksum: String,
}

/// Metadata stored alongside a recording.
///
/// Serializable for the JSON sidecar written by
/// [`crate::storage::metadata::write_metadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub input_source: InputSource,
    pub duration_secs: f64,
    pub data_bytes: u64,
    pub checksum: String,
}

impl RecordingMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_path: &str,
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        input_source: InputSource,
        duration_secs: f64,
        data_bytes: u64,
        checksum: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: file_path.to_string(),
            sample_rate,
            channels,
            bits_per_sample,
            input_source,
            duration_secs,
            data_bytes,
            checksum: checksum.to_string(),
        }
    }
}
