//! Synthetic capture device.
//!
//! Behaves like a blocking platform recorder: reads take (optionally) as long
//! as the audio they return, `release` makes every later read fail, and all
//! state queries are lock-free.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use pcm_recorder_core::models::audio_models::ChannelLayout;
use pcm_recorder_core::models::error::RecorderError;
use pcm_recorder_core::traits::capture_device::{CaptureDevice, DeviceState, RecordingState};

use crate::signal::Signal;
use crate::sim_backend::SimStats;

/// How long a read blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// As long as the returned audio lasts.
    Realtime,
    /// A fixed delay per read, regardless of size.
    Fixed(Duration),
    /// Return immediately.
    Unpaced,
}

/// Per-device fault switches copied from the backend's fault plan.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DeviceFaults {
    pub fail_start: bool,
    pub fail_read_after: Option<u64>,
}

pub struct SimDevice {
    sample_rate: u32,
    channels: ChannelLayout,
    signal: Signal,
    pace: Pace,
    faults: DeviceFaults,

    initialized: AtomicBool,
    recording: AtomicBool,
    released: AtomicBool,

    reads: AtomicU64,
    position: Mutex<u64>,
    stats: Arc<SimStats>,
}

impl SimDevice {
    pub(crate) fn new(
        sample_rate: u32,
        channels: ChannelLayout,
        signal: Signal,
        pace: Pace,
        faults: DeviceFaults,
        initialized: bool,
        stats: Arc<SimStats>,
    ) -> Self {
        stats.device_opened();
        Self {
            sample_rate,
            channels,
            signal,
            pace,
            faults,
            initialized: AtomicBool::new(initialized),
            recording: AtomicBool::new(false),
            released: AtomicBool::new(false),
            reads: AtomicU64::new(0),
            position: Mutex::new(0),
            stats,
        }
    }

    fn read_delay(&self, samples: usize) -> Duration {
        match self.pace {
            Pace::Realtime => {
                let frames = samples as u64 / self.channels.count() as u64;
                Duration::from_micros(frames * 1_000_000 / self.sample_rate as u64)
            }
            Pace::Fixed(delay) => delay,
            Pace::Unpaced => Duration::ZERO,
        }
    }
}

impl CaptureDevice for SimDevice {
    fn state(&self) -> DeviceState {
        if self.initialized.load(Ordering::SeqCst) {
            DeviceState::Initialized
        } else {
            DeviceState::Uninitialized
        }
    }

    fn recording_state(&self) -> RecordingState {
        if self.recording.load(Ordering::SeqCst) {
            RecordingState::Recording
        } else {
            RecordingState::Stopped
        }
    }

    fn start(&self) -> Result<(), RecorderError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(RecorderError::DeviceInit("device is not initialized".into()));
        }
        if self.faults.fail_start {
            return Err(RecorderError::DeviceInit("injected start failure".into()));
        }
        self.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), RecorderError> {
        self.recording.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.recording.store(false, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);
        self.stats.device_released();
    }

    fn read(&self, buffer: &mut [i16]) -> Result<usize, RecorderError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(RecorderError::Stream("device released".into()));
        }
        if !self.recording.load(Ordering::SeqCst) {
            return Err(RecorderError::Stream("device is not recording".into()));
        }

        let delay = self.read_delay(buffer.len());
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if self.released.load(Ordering::SeqCst) {
            return Err(RecorderError::Stream("device released during read".into()));
        }

        let completed = self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.faults.fail_read_after {
            if completed >= limit {
                return Err(RecorderError::Stream("injected read failure".into()));
            }
        }

        let mut position = self.position.lock();
        *position = self
            .signal
            .fill(buffer, *position, self.sample_rate, self.channels.count());
        self.stats.read_completed();
        Ok(buffer.len())
    }
}

impl Drop for SimDevice {
    fn drop(&mut self) {
        self.release();
    }
}
