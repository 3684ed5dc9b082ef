//! # pcm-recorder-core
//!
//! Platform-agnostic single-input PCM recorder.
//!
//! Streams fixed-size sample buffers from a capture device to a subscriber,
//! optionally persists them as raw PCM, and finalizes the file into a WAV
//! container. Platform backends implement `CaptureBackend` / `CaptureDevice`
//! and plug into the generic `RecorderEngine`.
//!
//! ## Architecture
//!
//! ```text
//! pcm-recorder-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureDevice, RecorderSubscriber
//! ├── models/       ← RecorderError, RecorderState, RecorderConfig, SampleBuffer, etc.
//! ├── processing/   ← PauseGate, WAV header generation
//! ├── session/      ← RecorderEngine, format probe
//! └── storage/      ← FileSink, WAV finalizer, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{ChannelLayout, InputSource, PcmEncoding, SampleBuffer};
pub use models::config::RecorderConfig;
pub use models::error::RecorderError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::RecorderState;
pub use processing::pause_gate::{GateWait, PauseGate};
pub use processing::wav_format::WavSpec;
pub use session::engine::{RecorderEngine, DEVICE_BUFFER_MULTIPLIER};
pub use session::probe::{find_working_config, probe_all, ProbeCandidate};
pub use storage::file_sink::FileSink;
pub use traits::capture_device::{CaptureBackend, CaptureDevice, DeviceState, MinBufferSize, RecordingState};
pub use traits::subscriber::{BufferCallback, CallbackSubscriber, RecorderSubscriber};
