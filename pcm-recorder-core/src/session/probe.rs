//! Capture format negotiation.
//!
//! Walks a fixed grid of (sample rate, encoding, channel layout) candidates and
//! keeps the first one the device actually initializes with.

use crate::models::audio_models::{ChannelLayout, InputSource, PcmEncoding};
use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;
use crate::traits::capture_device::{CaptureBackend, DeviceState};

/// Sample rates tried, in order.
pub const PROBE_SAMPLE_RATES: [u32; 4] = [8000, 11025, 22050, 44100];

/// Encodings tried for each rate, in order.
pub const PROBE_ENCODINGS: [PcmEncoding; 2] = [PcmEncoding::Pcm8Bit, PcmEncoding::Pcm16Bit];

/// Channel layouts tried for each encoding, in order.
pub const PROBE_CHANNELS: [ChannelLayout; 2] = [ChannelLayout::Mono, ChannelLayout::Stereo];

/// One point of the probe grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeCandidate {
    pub sample_rate: u32,
    pub encoding: PcmEncoding,
    pub channels: ChannelLayout,
}

/// The candidate grid in probe order: rate (outer), encoding, channels (inner).
pub fn probe_grid() -> impl Iterator<Item = ProbeCandidate> {
    PROBE_SAMPLE_RATES.into_iter().flat_map(|sample_rate| {
        PROBE_ENCODINGS.into_iter().flat_map(move |encoding| {
            PROBE_CHANNELS.into_iter().map(move |channels| ProbeCandidate {
                sample_rate,
                encoding,
                channels,
            })
        })
    })
}

/// Find the first grid candidate the device accepts.
///
/// Candidate failures are logged and skipped. Returns
/// [`RecorderError::ProbeFailed`] when nothing in the grid works. The returned
/// config has no file path.
pub fn find_working_config<B: CaptureBackend + ?Sized>(
    backend: &B,
    input_source: InputSource,
) -> Result<RecorderConfig, RecorderError> {
    let mut attempts = 0;
    for candidate in probe_grid() {
        attempts += 1;
        if try_candidate(backend, input_source, candidate) {
            log::info!(
                "Probe selected {} Hz, {}, {} after {} attempts",
                candidate.sample_rate,
                candidate.encoding,
                candidate.channels,
                attempts
            );
            return RecorderConfig::new(
                input_source,
                candidate.sample_rate,
                candidate.channels,
                candidate.encoding,
            );
        }
    }

    log::warn!("Probe found no working capture configuration for {:?}", input_source);
    Err(RecorderError::ProbeFailed { attempts })
}

/// Every grid candidate the device accepts, in probe order.
pub fn probe_all<B: CaptureBackend + ?Sized>(backend: &B, input_source: InputSource) -> Vec<ProbeCandidate> {
    probe_grid()
        .filter(|&candidate| try_candidate(backend, input_source, candidate))
        .collect()
}

fn try_candidate<B: CaptureBackend + ?Sized>(
    backend: &B,
    input_source: InputSource,
    candidate: ProbeCandidate,
) -> bool {
    let ProbeCandidate {
        sample_rate,
        encoding,
        channels,
    } = candidate;

    log::debug!(
        "Attempting rate {} Hz, bits: {}, channel: {}",
        sample_rate,
        encoding,
        channels
    );

    let Some(buffer_size) = backend.min_buffer_size(sample_rate, channels, encoding).usable() else {
        log::debug!("{} Hz {} {}: no usable buffer size", sample_rate, encoding, channels);
        return false;
    };

    let device = match backend.open(input_source, sample_rate, channels, encoding, buffer_size) {
        Ok(device) => device,
        Err(e) => {
            log::warn!("{} Hz {} {}: open failed, keep trying: {}", sample_rate, encoding, channels, e);
            return false;
        }
    };

    let initialized = device.state() == DeviceState::Initialized;
    device.release();
    initialized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::capture_device::{CaptureDevice, MinBufferSize, RecordingState};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ProbeDevice {
        initialized: bool,
        released: AtomicBool,
        live: Arc<AtomicUsize>,
    }

    impl CaptureDevice for ProbeDevice {
        fn state(&self) -> DeviceState {
            if self.initialized && !self.released.load(Ordering::SeqCst) {
                DeviceState::Initialized
            } else {
                DeviceState::Uninitialized
            }
        }

        fn recording_state(&self) -> RecordingState {
            RecordingState::Stopped
        }

        fn start(&self) -> Result<(), RecorderError> {
            Ok(())
        }

        fn stop(&self) -> Result<(), RecorderError> {
            Ok(())
        }

        fn release(&self) {
            if !self.released.swap(true, Ordering::SeqCst) {
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
        }

        fn read(&self, _buffer: &mut [i16]) -> Result<usize, RecorderError> {
            Err(RecorderError::Stream("probe device".into()))
        }
    }

    /// Accepts exactly the listed candidates; everything else reports a valid
    /// buffer size but fails to initialize.
    struct TableBackend {
        accepted: Vec<ProbeCandidate>,
        buffer_size: MinBufferSize,
        opened: Mutex<Vec<ProbeCandidate>>,
        live: Arc<AtomicUsize>,
    }

    impl TableBackend {
        fn accepting(accepted: Vec<ProbeCandidate>) -> Self {
            Self {
                accepted,
                buffer_size: MinBufferSize::Bytes(640),
                opened: Mutex::new(Vec::new()),
                live: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CaptureBackend for TableBackend {
        fn min_buffer_size(&self, _rate: u32, _channels: ChannelLayout, _encoding: PcmEncoding) -> MinBufferSize {
            self.buffer_size
        }

        fn open(
            &self,
            _source: InputSource,
            sample_rate: u32,
            channels: ChannelLayout,
            encoding: PcmEncoding,
            _buffer_size_bytes: usize,
        ) -> Result<Box<dyn CaptureDevice>, RecorderError> {
            let candidate = ProbeCandidate {
                sample_rate,
                encoding,
                channels,
            };
            self.opened.lock().push(candidate);
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ProbeDevice {
                initialized: self.accepted.contains(&candidate),
                released: AtomicBool::new(false),
                live: Arc::clone(&self.live),
            }))
        }
    }

    fn candidate(sample_rate: u32, encoding: PcmEncoding, channels: ChannelLayout) -> ProbeCandidate {
        ProbeCandidate {
            sample_rate,
            encoding,
            channels,
        }
    }

    #[test]
    fn grid_order_is_rate_then_encoding_then_channels() {
        let grid: Vec<_> = probe_grid().collect();
        assert_eq!(grid.len(), 16);
        assert_eq!(grid[0], candidate(8000, PcmEncoding::Pcm8Bit, ChannelLayout::Mono));
        assert_eq!(grid[1], candidate(8000, PcmEncoding::Pcm8Bit, ChannelLayout::Stereo));
        assert_eq!(grid[2], candidate(8000, PcmEncoding::Pcm16Bit, ChannelLayout::Mono));
        assert_eq!(grid[4], candidate(11025, PcmEncoding::Pcm8Bit, ChannelLayout::Mono));
        assert_eq!(grid[15], candidate(44100, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo));
    }

    #[test]
    fn selects_only_accepted_triple() {
        let backend = TableBackend::accepting(vec![candidate(11025, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo)]);

        let config = find_working_config(&backend, InputSource::Mic).unwrap();
        assert_eq!(config.sample_rate, 11025);
        assert_eq!(config.encoding, PcmEncoding::Pcm16Bit);
        assert_eq!(config.channels, ChannelLayout::Stereo);
        assert_eq!(config.input_source, InputSource::Mic);
        assert_eq!(config.file_path, None);

        // Stops at the winner: 4 candidates at 8000 Hz plus 4 at 11025 Hz.
        assert_eq!(backend.opened.lock().len(), 8);
    }

    #[test]
    fn encoding_order_precedes_channel_order() {
        let backend = TableBackend::accepting(vec![
            candidate(8000, PcmEncoding::Pcm16Bit, ChannelLayout::Mono),
            candidate(8000, PcmEncoding::Pcm8Bit, ChannelLayout::Mono),
            candidate(44100, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo),
        ]);

        let config = find_working_config(&backend, InputSource::Default).unwrap();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.encoding, PcmEncoding::Pcm8Bit);
        assert_eq!(config.channels, ChannelLayout::Mono);
        assert_eq!(backend.opened.lock().len(), 1);
    }

    #[test]
    fn rate_order_precedes_encoding() {
        let backend = TableBackend::accepting(vec![
            candidate(22050, PcmEncoding::Pcm8Bit, ChannelLayout::Mono),
            candidate(11025, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo),
        ]);

        let config = find_working_config(&backend, InputSource::Default).unwrap();
        assert_eq!(config.sample_rate, 11025);
    }

    #[test]
    fn every_probe_device_is_released() {
        let backend = TableBackend::accepting(vec![candidate(44100, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo)]);
        find_working_config(&backend, InputSource::Default).unwrap();
        assert_eq!(backend.opened.lock().len(), 16);
        assert_eq!(backend.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn total_failure_is_reported() {
        let backend = TableBackend::accepting(Vec::new());
        let err = find_working_config(&backend, InputSource::Default).unwrap_err();
        assert_eq!(err, RecorderError::ProbeFailed { attempts: 16 });
    }

    #[test]
    fn invalid_buffer_size_skips_open() {
        let mut backend =
            TableBackend::accepting(vec![candidate(8000, PcmEncoding::Pcm8Bit, ChannelLayout::Mono)]);
        backend.buffer_size = MinBufferSize::Invalid;

        assert!(find_working_config(&backend, InputSource::Default).is_err());
        assert!(backend.opened.lock().is_empty());
    }

    #[test]
    fn probe_all_lists_accepted_in_order() {
        let backend = TableBackend::accepting(vec![
            candidate(44100, PcmEncoding::Pcm16Bit, ChannelLayout::Mono),
            candidate(8000, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo),
        ]);

        let accepted = probe_all(&backend, InputSource::Default);
        assert_eq!(
            accepted,
            vec![
                candidate(8000, PcmEncoding::Pcm16Bit, ChannelLayout::Stereo),
                candidate(44100, PcmEncoding::Pcm16Bit, ChannelLayout::Mono),
            ]
        );
    }
}
