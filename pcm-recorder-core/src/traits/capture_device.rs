use crate::models::audio_models::{ChannelLayout, InputSource, PcmEncoding};
use crate::models::error::RecorderError;

/// Answer to a minimum-buffer-size query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinBufferSize {
    /// Smallest usable buffer in bytes.
    Bytes(usize),
    /// The parameters are not supported by the device.
    Invalid,
    /// The device could not answer.
    Error,
}

impl MinBufferSize {
    /// The size in bytes, if the device reported a usable one.
    pub fn usable(self) -> Option<usize> {
        match self {
            Self::Bytes(n) if n > 0 => Some(n),
            _ => None,
        }
    }
}

/// Initialization state of an opened device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Initialized,
}

/// Capture state of an opened device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Stopped,
    Recording,
}

/// Platform entry point: capability queries and device construction.
///
/// Implemented by platform glue (and by the synthetic backend in
/// `pcm-recorder-sim`). The engine never enumerates devices; it only asks the
/// backend about the single active input.
pub trait CaptureBackend: Send + Sync {
    fn min_buffer_size(&self, sample_rate: u32, channels: ChannelLayout, encoding: PcmEncoding) -> MinBufferSize;

    /// Construct a capture device. A device that fails to initialize may be
    /// returned in the [`DeviceState::Uninitialized`] state instead of as an error;
    /// callers must check [`CaptureDevice::state`].
    fn open(
        &self,
        source: InputSource,
        sample_rate: u32,
        channels: ChannelLayout,
        encoding: PcmEncoding,
        buffer_size_bytes: usize,
    ) -> Result<Box<dyn CaptureDevice>, RecorderError>;
}

/// An opened capture device.
///
/// Shared between the control thread (start/stop/release/queries) and the
/// capture thread (read), so every method takes `&self`. `state` and
/// `recording_state` must not block. `read` blocks for up to one buffer's
/// worth of audio.
pub trait CaptureDevice: Send + Sync {
    fn state(&self) -> DeviceState;

    fn recording_state(&self) -> RecordingState;

    fn start(&self) -> Result<(), RecorderError>;

    fn stop(&self) -> Result<(), RecorderError>;

    /// Release the native resources. Subsequent reads fail.
    fn release(&self);

    /// Fill `buffer` with interleaved samples and return how many were written.
    fn read(&self, buffer: &mut [i16]) -> Result<usize, RecorderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_positive_sizes_are_usable() {
        assert_eq!(MinBufferSize::Bytes(640).usable(), Some(640));
        assert_eq!(MinBufferSize::Bytes(0).usable(), None);
        assert_eq!(MinBufferSize::Invalid.usable(), None);
        assert_eq!(MinBufferSize::Error.usable(), None);
    }
}
