//! # pcm-recorder-sim
//!
//! Synthetic capture backend for pcm-recorder.
//!
//! Provides:
//! - `SimBackend`: `CaptureBackend` with a table of accepted formats and fault injection
//! - `SimDevice`: blocking `CaptureDevice` that paces reads like real hardware
//! - `Signal`: counter, sine and silence generators
//!
//! ## Usage
//! ```no_run
//! use pcm_recorder_core::{InputSource, RecorderEngine};
//! use pcm_recorder_sim::SimBackend;
//!
//! let mut engine = RecorderEngine::with_probed_config(SimBackend::new(), InputSource::Mic, None).unwrap();
//! engine.start().unwrap();
//! engine.stop();
//! ```

pub mod signal;
pub mod sim_backend;
pub mod sim_device;

pub use signal::Signal;
pub use sim_backend::{FaultPlan, SimBackend, SimStats};
pub use sim_device::{Pace, SimDevice};
