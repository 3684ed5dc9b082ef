use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::audio_models::{InputSource, SampleBuffer};
use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::RecorderState;
use crate::processing::pause_gate::{GateWait, PauseGate};
use crate::processing::wav_format::WavSpec;
use crate::session::probe;
use crate::storage::file_sink::FileSink;
use crate::storage::wave_finalizer;
use crate::traits::capture_device::{CaptureBackend, CaptureDevice, DeviceState, MinBufferSize, RecordingState};
use crate::traits::subscriber::{BufferCallback, CallbackSubscriber, RecorderSubscriber};

/// The device is opened with this many minimum-size buffers of headroom.
pub const DEVICE_BUFFER_MULTIPLIER: usize = 10;

/// Everything the capture thread hands samples to. Guarded by one lock so
/// that `stop` can wait out an in-flight emission.
#[derive(Default)]
struct Output {
    subscriber: Option<Arc<dyn RecorderSubscriber>>,
    sink: Option<FileSink>,
    sink_error: Option<RecorderError>,
    stream_error: Option<RecorderError>,
}

/// Single-input PCM recorder.
///
/// Owns the capture device, one capture thread per session, and the raw
/// PCM sink. Buffers go to the subscriber first and to the sink second, in
/// capture order.
///
/// ```text
/// [CaptureDevice] → read → [subscriber] → [FileSink] → (paused? wait on PauseGate)
///                                             ↓ complete_recording
///                                        [WaveFinalizer] → .wav
/// ```
pub struct RecorderEngine<B: CaptureBackend> {
    backend: B,
    config: RecorderConfig,
    state: RecorderState,

    device: Option<Arc<dyn CaptureDevice>>,
    buffer_samples: Option<usize>,

    // Capture thread control
    running: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
    output: Arc<Mutex<Output>>,
    producer_handle: Option<thread::JoinHandle<()>>,

    // Raw file closed but not yet turned into a WAV
    pending_raw: Option<PathBuf>,
}

impl<B: CaptureBackend> RecorderEngine<B> {
    pub fn new(backend: B, config: RecorderConfig) -> Self {
        Self {
            backend,
            config,
            state: RecorderState::Idle,
            device: None,
            buffer_samples: None,
            running: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(PauseGate::new()),
            output: Arc::new(Mutex::new(Output::default())),
            producer_handle: None,
            pending_raw: None,
        }
    }

    /// Build an engine whose format is picked by [`probe::find_working_config`].
    pub fn with_probed_config(
        backend: B,
        input_source: InputSource,
        file_path: Option<PathBuf>,
    ) -> Result<Self, RecorderError> {
        let mut config = probe::find_working_config(&backend, input_source)?;
        config.file_path = file_path;
        Ok(Self::new(backend, config))
    }

    pub fn subscribe(&self, subscriber: Arc<dyn RecorderSubscriber>) {
        self.output.lock().subscriber = Some(subscriber);
    }

    pub fn subscribe_fn(&self, callback: BufferCallback) {
        self.subscribe(Arc::new(CallbackSubscriber::new(callback)));
    }

    pub fn unsubscribe(&self) {
        self.output.lock().subscriber = None;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Replace the configuration. Only allowed between sessions.
    pub fn set_config(&mut self, config: RecorderConfig) -> Result<(), RecorderError> {
        if !self.state.is_idle() {
            return Err(RecorderError::InvalidState(format!(
                "cannot reconfigure while {}",
                self.state
            )));
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Samples per emitted buffer, fixed when the session started.
    pub fn buffer_samples(&self) -> Option<usize> {
        self.buffer_samples
    }

    /// Whether the device is currently capturing. Never blocks.
    pub fn is_recording(&self) -> bool {
        self.device
            .as_ref()
            .is_some_and(|d| d.recording_state() == RecordingState::Recording)
    }

    /// Whether there is no device or it is not capturing. Never blocks.
    pub fn is_recording_stopped(&self) -> bool {
        self.device
            .as_ref()
            .map_or(true, |d| d.recording_state() == RecordingState::Stopped)
    }

    /// The runtime error that ended the capture thread, if any.
    pub fn last_error(&self) -> Option<RecorderError> {
        let output = self.output.lock();
        output.stream_error.clone().or_else(|| output.sink_error.clone())
    }

    /// Start a session. Transitions: idle → recording.
    ///
    /// Every check runs before the capture thread is spawned; on error the
    /// engine stays idle with no device and no open file.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if !self.state.is_idle() {
            return Err(RecorderError::InvalidState(format!(
                "can only start from idle state (currently {})",
                self.state
            )));
        }
        self.config.validate()?;

        let sink = match self.config.file_path {
            Some(ref path) => {
                let mut sink = FileSink::new(path.clone(), self.config.encoding);
                sink.open()?;
                Some(sink)
            }
            None => None,
        };

        let (device, buffer_samples) = match self.open_device() {
            Ok(opened) => opened,
            Err(e) => {
                if let Some(sink) = sink {
                    discard_sink(sink);
                }
                return Err(e);
            }
        };

        {
            let mut output = self.output.lock();
            output.sink = sink;
            output.sink_error = None;
            output.stream_error = None;
        }
        self.gate.reset();
        self.running.store(true, Ordering::SeqCst);

        let spawned = {
            let device = Arc::clone(&device);
            let running = Arc::clone(&self.running);
            let gate = Arc::clone(&self.gate);
            let output = Arc::clone(&self.output);
            thread::Builder::new()
                .name("pcm-capture".into())
                .spawn(move || capture_loop(device, running, gate, output, buffer_samples))
        };

        match spawned {
            Ok(handle) => {
                self.producer_handle = Some(handle);
                self.device = Some(device);
                self.buffer_samples = Some(buffer_samples);
                self.pending_raw = None;
                self.state = RecorderState::Recording;
                log::info!("Recording started: {} ({} samples per buffer)", self.config, buffer_samples);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                release_device(device.as_ref());
                if let Some(sink) = self.output.lock().sink.take() {
                    discard_sink(sink);
                }
                Err(RecorderError::DeviceInit(format!("failed to spawn capture thread: {}", e)))
            }
        }
    }

    /// Pause delivery. Transitions: recording → paused.
    ///
    /// A read already in flight still completes and is delivered; the capture
    /// thread parks before the next read.
    pub fn pause(&mut self) -> Result<(), RecorderError> {
        if !self.state.is_recording() {
            return Err(RecorderError::InvalidState(format!(
                "can only pause from recording state (currently {})",
                self.state
            )));
        }
        self.gate.pause();
        self.state = RecorderState::Paused;
        log::debug!("Recording paused");
        Ok(())
    }

    /// Resume delivery. Transitions: paused → recording.
    pub fn resume(&mut self) -> Result<(), RecorderError> {
        if !self.state.is_paused() {
            return Err(RecorderError::InvalidState(format!(
                "can only resume from paused state (currently {})",
                self.state
            )));
        }
        self.gate.resume();
        self.state = RecorderState::Recording;
        log::debug!("Recording resumed");
        Ok(())
    }

    /// Stop capture and release the device. Transitions: recording/paused → stopped.
    ///
    /// Safe to call in any state and any number of times. Once this returns no
    /// further buffer reaches the subscriber. A read blocked inside the device
    /// is not interrupted; the capture thread exits when it returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.gate.close();

        {
            // Waits out an emission in progress.
            let _output = self.output.lock();
            if let Some(device) = self.device.take() {
                release_device(device.as_ref());
            }
        }

        if self.state.is_active() {
            self.state = RecorderState::Stopped;
            log::info!("Recording stopped");
        }
    }

    /// Close the raw file and convert it to WAV. Transitions: stopped → idle.
    ///
    /// Returns `Ok(None)` for a streaming-only session. On failure the engine
    /// stays stopped and the raw file is left as it was, so the call can be
    /// repeated.
    pub fn complete_recording(&mut self) -> Result<Option<RecordingResult>, RecorderError> {
        if !self.state.is_stopped() {
            return Err(RecorderError::InvalidState(format!(
                "can only complete a stopped recording (currently {})",
                self.state
            )));
        }

        self.join_producer();

        let (sink, sink_error) = {
            let mut output = self.output.lock();
            (output.sink.take(), output.sink_error.take())
        };

        if let Some(mut sink) = sink {
            self.pending_raw = Some(sink.file_path().to_path_buf());
            sink.close().map_err(conversion_failed)?;
        }
        if let Some(e) = sink_error {
            return Err(conversion_failed(e));
        }

        let Some(raw_path) = self.pending_raw.clone() else {
            self.state = RecorderState::Idle;
            return Ok(None);
        };

        let spec = WavSpec {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels.count(),
            bits_per_sample: self.config.encoding.bits_per_sample(),
        };
        let data_bytes = wave_finalizer::finalize(&raw_path, &spec).map_err(conversion_failed)?;
        self.pending_raw = None;
        self.state = RecorderState::Idle;

        let checksum = wave_finalizer::sha256_file(&raw_path).map_err(conversion_failed)?;
        let duration_secs = data_bytes as f64 / spec.byte_rate() as f64;

        let metadata = RecordingMetadata::new(
            &raw_path.to_string_lossy(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            self.config.input_source,
            duration_secs,
            data_bytes,
            &checksum,
        );

        Ok(Some(RecordingResult {
            file_path: raw_path,
            data_bytes,
            duration_secs,
            metadata,
            checksum,
        }))
    }

    /// Give up on finalizing a stopped session. Transitions: stopped → idle.
    ///
    /// The raw PCM file stays on disk as it is and its path is returned.
    pub fn discard_recording(&mut self) -> Result<Option<PathBuf>, RecorderError> {
        if !self.state.is_stopped() {
            return Err(RecorderError::InvalidState(format!(
                "can only discard a stopped recording (currently {})",
                self.state
            )));
        }

        self.join_producer();

        let sink = {
            let mut output = self.output.lock();
            output.sink_error = None;
            output.sink.take()
        };
        if let Some(mut sink) = sink {
            self.pending_raw = Some(sink.file_path().to_path_buf());
            if let Err(e) = sink.close() {
                log::warn!("Failed to close {}: {}", sink.file_path().display(), e);
            }
        }

        let kept = self.pending_raw.take();
        if let Some(ref path) = kept {
            log::warn!("Recording left unfinalized at {}", path.display());
        }
        self.state = RecorderState::Idle;
        Ok(kept)
    }

    // --- Internal helpers ---

    /// Steps 2 and 3 of start: size the buffer and bring a device to recording.
    fn open_device(&self) -> Result<(Arc<dyn CaptureDevice>, usize), RecorderError> {
        let config = &self.config;

        let min_bytes = match self
            .backend
            .min_buffer_size(config.sample_rate, config.channels, config.encoding)
        {
            MinBufferSize::Bytes(n) if n > 0 => n,
            other => {
                return Err(RecorderError::Configuration(format!(
                    "unable to get minimum buffer size for {} ({:?})",
                    config, other
                )))
            }
        };

        let device: Arc<dyn CaptureDevice> = Arc::from(
            self.backend
                .open(
                    config.input_source,
                    config.sample_rate,
                    config.channels,
                    config.encoding,
                    min_bytes * DEVICE_BUFFER_MULTIPLIER,
                )
                .map_err(|e| RecorderError::DeviceInit(format!("unable to create capture device: {}", e)))?,
        );

        if device.state() != DeviceState::Initialized {
            device.release();
            return Err(RecorderError::DeviceInit(format!(
                "capture device for {} did not initialize",
                config
            )));
        }

        if let Err(e) = device.start() {
            device.release();
            return Err(RecorderError::DeviceInit(format!("unable to start capture: {}", e)));
        }
        if device.recording_state() != RecordingState::Recording {
            release_device(device.as_ref());
            return Err(RecorderError::DeviceInit("capture device did not enter recording state".into()));
        }

        Ok((device, (min_bytes / 2).max(1)))
    }

    fn join_producer(&mut self) {
        if let Some(handle) = self.producer_handle.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
    }
}

impl<B: CaptureBackend> Drop for RecorderEngine<B> {
    fn drop(&mut self) {
        self.stop();
        self.join_producer();
    }
}

/// Capture thread body: read → emit → write → pause checkpoint.
fn capture_loop(
    device: Arc<dyn CaptureDevice>,
    running: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
    output: Arc<Mutex<Output>>,
    buffer_samples: usize,
) {
    let mut scratch = vec![0i16; buffer_samples];
    let mut sequence = 0u64;

    while running.load(Ordering::SeqCst) && device.recording_state() == RecordingState::Recording {
        let read = match device.read(&mut scratch) {
            Ok(n) => n.min(scratch.len()),
            Err(e) => {
                let mut out = output.lock();
                if running.load(Ordering::SeqCst) {
                    log::error!("Capture read failed: {}", e);
                    let error = RecorderError::Stream(e.to_string());
                    if let Some(subscriber) = out.subscriber.clone() {
                        subscriber.on_error(&error);
                    }
                    out.stream_error = Some(error);
                }
                break;
            }
        };

        {
            let mut guard = output.lock();
            let out = &mut *guard;
            if !running.load(Ordering::SeqCst) {
                break;
            }
            if read > 0 {
                let samples = &scratch[..read];
                if let Some(subscriber) = out.subscriber.clone() {
                    subscriber.on_buffer(SampleBuffer::new(samples, sequence));
                }
                sequence += 1;

                let write_result = match out.sink.as_mut() {
                    Some(sink) if out.sink_error.is_none() => sink.write(samples),
                    _ => Ok(()),
                };
                if let Err(e) = write_result {
                    log::error!("Failed to write audio data: {}", e);
                    if let Some(subscriber) = out.subscriber.clone() {
                        subscriber.on_error(&e);
                    }
                    out.sink_error = Some(e);
                }
            }
        }

        if gate.wait_while_paused() == GateWait::Closed {
            log::debug!("Pause gate closed, capture thread exiting");
            break;
        }
    }

    log::debug!("Capture thread finished after {} buffers", sequence);
    let subscriber = output.lock().subscriber.clone();
    if let Some(subscriber) = subscriber {
        subscriber.on_complete();
    }
}

fn release_device(device: &dyn CaptureDevice) {
    if device.recording_state() == RecordingState::Recording {
        if let Err(e) = device.stop() {
            log::warn!("Failed to stop capture device: {}", e);
        }
    }
    if device.state() == DeviceState::Initialized {
        device.release();
    }
}

fn discard_sink(mut sink: FileSink) {
    let path = sink.file_path().to_path_buf();
    if let Err(e) = sink.close() {
        log::warn!("Failed to close {}: {}", path.display(), e);
    }
    if let Err(e) = std::fs::remove_file(&path) {
        log::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

fn conversion_failed(e: RecorderError) -> RecorderError {
    match e {
        RecorderError::ConfigurationInconsistency(_) => e,
        other => RecorderError::Io(format!("conversion failed: {}", other)),
    }
}
