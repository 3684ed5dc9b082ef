use std::sync::Arc;

use crate::models::audio_models::SampleBuffer;
use crate::models::error::RecorderError;

/// Callback invoked for each captured buffer.
pub type BufferCallback = Arc<dyn Fn(SampleBuffer) + Send + Sync + 'static>;

/// Receiver of the capture stream.
///
/// All methods are called from the capture thread, one at a time, in capture
/// order. Implementations must not call back into the engine's control
/// methods (`stop`, `pause`, ...) from inside a callback.
pub trait RecorderSubscriber: Send + Sync {
    fn on_buffer(&self, buffer: SampleBuffer);

    /// Called when the capture thread hits a runtime failure. The stream ends
    /// after this.
    fn on_error(&self, error: &RecorderError);

    /// Called once when the capture thread exits.
    fn on_complete(&self) {}
}

/// Adapts a plain closure into a [`RecorderSubscriber`]. Errors are logged.
pub struct CallbackSubscriber {
    callback: BufferCallback,
}

impl CallbackSubscriber {
    pub fn new(callback: BufferCallback) -> Self {
        Self { callback }
    }
}

impl RecorderSubscriber for CallbackSubscriber {
    fn on_buffer(&self, buffer: SampleBuffer) {
        (self.callback)(buffer);
    }

    fn on_error(&self, error: &RecorderError) {
        log::error!("Capture stream error: {}", error);
    }
}
