//! Synthetic capture backend.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use pcm_recorder_core::models::audio_models::{ChannelLayout, InputSource, PcmEncoding};
use pcm_recorder_core::models::error::RecorderError;
use pcm_recorder_core::session::probe::ProbeCandidate;
use pcm_recorder_core::traits::capture_device::{CaptureBackend, CaptureDevice, MinBufferSize};

use crate::signal::Signal;
use crate::sim_device::{DeviceFaults, Pace, SimDevice};

/// Counters shared by a backend and every device it opened.
#[derive(Debug, Default)]
pub struct SimStats {
    opened: AtomicUsize,
    live: AtomicUsize,
    reads: AtomicU64,
}

impl SimStats {
    /// Devices constructed so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Devices constructed and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn device_opened(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn device_released(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn read_completed(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

/// Failures to inject into buffer queries and devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultPlan {
    /// Answer every minimum-buffer query with this instead.
    pub min_buffer: Option<MinBufferSize>,
    /// `open` returns an error.
    pub fail_open: bool,
    /// Devices come up uninitialized.
    pub fail_init: bool,
    /// `start` fails.
    pub fail_start: bool,
    /// Reads succeed this many times, then fail.
    pub fail_read_after: Option<u64>,
}

/// A backend whose capabilities are a table.
///
/// Formats outside the table report [`MinBufferSize::Invalid`]. With no table
/// every format is accepted.
pub struct SimBackend {
    accepted: Option<Vec<ProbeCandidate>>,
    signal: Signal,
    pace: Pace,
    faults: FaultPlan,
    stats: Arc<SimStats>,
}

impl SimBackend {
    /// Accept every format, real-time paced 440 Hz tone.
    pub fn new() -> Self {
        Self {
            accepted: None,
            signal: Signal::Sine {
                frequency_hz: 440.0,
                amplitude: 0.5,
            },
            pace: Pace::Realtime,
            faults: FaultPlan::default(),
            stats: Arc::new(SimStats::default()),
        }
    }

    /// Accept only the listed formats.
    pub fn accepting(formats: impl IntoIterator<Item = (u32, PcmEncoding, ChannelLayout)>) -> Self {
        let accepted = formats
            .into_iter()
            .map(|(sample_rate, encoding, channels)| ProbeCandidate {
                sample_rate,
                encoding,
                channels,
            })
            .collect();
        Self {
            accepted: Some(accepted),
            ..Self::new()
        }
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    pub fn stats(&self) -> Arc<SimStats> {
        Arc::clone(&self.stats)
    }

    pub fn supports(&self, sample_rate: u32, encoding: PcmEncoding, channels: ChannelLayout) -> bool {
        match self.accepted {
            Some(ref table) => table.contains(&ProbeCandidate {
                sample_rate,
                encoding,
                channels,
            }),
            None => true,
        }
    }

    /// 20 ms of audio in the requested format, rounded up to whole samples.
    pub fn nominal_buffer_bytes(sample_rate: u32, encoding: PcmEncoding, channels: ChannelLayout) -> usize {
        let frames = (sample_rate as usize / 50).max(1);
        let bytes = frames * channels.count() as usize * encoding.bytes_per_sample();
        (bytes + 1) & !1
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for SimBackend {
    fn min_buffer_size(&self, sample_rate: u32, channels: ChannelLayout, encoding: PcmEncoding) -> MinBufferSize {
        if let Some(answer) = self.faults.min_buffer {
            return answer;
        }
        if !self.supports(sample_rate, encoding, channels) {
            return MinBufferSize::Invalid;
        }
        MinBufferSize::Bytes(Self::nominal_buffer_bytes(sample_rate, encoding, channels))
    }

    fn open(
        &self,
        source: InputSource,
        sample_rate: u32,
        channels: ChannelLayout,
        encoding: PcmEncoding,
        buffer_size_bytes: usize,
    ) -> Result<Box<dyn CaptureDevice>, RecorderError> {
        if self.faults.fail_open {
            return Err(RecorderError::DeviceInit("injected open failure".into()));
        }

        let initialized = !self.faults.fail_init
            && buffer_size_bytes > 0
            && self.supports(sample_rate, encoding, channels);

        log::debug!(
            "Sim device {:?}: {} Hz, {}, {}, {} byte buffer, initialized: {}",
            source,
            sample_rate,
            encoding,
            channels,
            buffer_size_bytes,
            initialized
        );

        Ok(Box::new(SimDevice::new(
            sample_rate,
            channels,
            self.signal,
            self.pace,
            DeviceFaults {
                fail_start: self.faults.fail_start,
                fail_read_after: self.faults.fail_read_after,
            },
            initialized,
            Arc::clone(&self.stats),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcm_recorder_core::traits::capture_device::{DeviceState, RecordingState};

    #[test]
    fn nominal_size_is_20ms() {
        assert_eq!(
            SimBackend::nominal_buffer_bytes(8000, PcmEncoding::Pcm16Bit, ChannelLayout::Mono),
            320
        );
        assert_eq!(
            SimBackend::nominal_buffer_bytes(44100, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo),
            3528
        );
        assert_eq!(
            SimBackend::nominal_buffer_bytes(11025, PcmEncoding::Pcm8Bit, ChannelLayout::Mono),
            220
        );
    }

    #[test]
    fn table_rejects_unlisted_formats() {
        let backend = SimBackend::accepting([(11025, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo)]);
        assert_eq!(
            backend.min_buffer_size(8000, ChannelLayout::Mono, PcmEncoding::Pcm8Bit),
            MinBufferSize::Invalid
        );
        assert!(matches!(
            backend.min_buffer_size(11025, ChannelLayout::Stereo, PcmEncoding::Pcm16Bit),
            MinBufferSize::Bytes(_)
        ));
    }

    #[test]
    fn device_lifecycle_and_counters() {
        let backend = SimBackend::new().with_signal(Signal::Counter).with_pace(Pace::Unpaced);
        let stats = backend.stats();

        let device = backend
            .open(InputSource::Mic, 8000, ChannelLayout::Mono, PcmEncoding::Pcm16Bit, 3200)
            .unwrap();
        assert_eq!(device.state(), DeviceState::Initialized);
        assert_eq!(device.recording_state(), RecordingState::Stopped);
        assert!(device.read(&mut [0i16; 4]).is_err());

        device.start().unwrap();
        let mut buffer = [0i16; 4];
        assert_eq!(device.read(&mut buffer).unwrap(), 4);
        assert_eq!(buffer, [0, 1, 2, 3]);
        assert_eq!(stats.reads(), 1);

        device.release();
        assert_eq!(device.state(), DeviceState::Uninitialized);
        assert!(device.read(&mut buffer).is_err());
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.live(), 0);

        drop(device);
        assert_eq!(stats.live(), 0);
    }

    #[test]
    fn injected_faults() {
        let backend = SimBackend::new().with_pace(Pace::Unpaced).with_faults(FaultPlan {
            fail_read_after: Some(1),
            ..Default::default()
        });
        let device = backend
            .open(InputSource::Default, 8000, ChannelLayout::Mono, PcmEncoding::Pcm16Bit, 3200)
            .unwrap();
        device.start().unwrap();
        assert!(device.read(&mut [0i16; 2]).is_ok());
        assert!(device.read(&mut [0i16; 2]).is_err());

        let uninitialized = SimBackend::new().with_faults(FaultPlan {
            fail_init: true,
            ..Default::default()
        });
        let device = uninitialized
            .open(InputSource::Default, 8000, ChannelLayout::Mono, PcmEncoding::Pcm16Bit, 3200)
            .unwrap();
        assert_eq!(device.state(), DeviceState::Uninitialized);
        assert!(device.start().is_err());
    }
}
