use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Capture channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    /// Number of interleaved channels (1 or 2).
    pub fn count(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    pub fn from_count(count: u16) -> Option<Self> {
        match count {
            1 => Some(Self::Mono),
            2 => Some(Self::Stereo),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => f.write_str("Mono"),
            Self::Stereo => f.write_str("Stereo"),
        }
    }
}

/// PCM sample encoding requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PcmEncoding {
    #[serde(rename = "pcm8")]
    Pcm8Bit,
    #[serde(rename = "pcm16")]
    Pcm16Bit,
}

impl PcmEncoding {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            Self::Pcm8Bit => 8,
            Self::Pcm16Bit => 16,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bits_per_sample() as usize / 8
    }
}

impl fmt::Display for PcmEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pcm8Bit => f.write_str("8BIT"),
            Self::Pcm16Bit => f.write_str("16BIT"),
        }
    }
}

/// Which physical input the platform should route to the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    #[default]
    Default,
    Mic,
    Camcorder,
    VoiceRecognition,
    VoiceCommunication,
    Unprocessed,
}

/// One buffer of interleaved signed 16-bit samples delivered to a subscriber.
///
/// Every emission carries its own allocation, so a subscriber may keep the
/// buffer (or clones of it) for as long as it likes. Cloning is a refcount bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Arc<[i16]>,
    sequence: u64,
}

impl SampleBuffer {
    pub fn new(samples: &[i16], sequence: u64) -> Self {
        Self {
            samples: Arc::from(samples),
            sequence,
        }
    }

    /// Zero-based position of this buffer in the session's capture order.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn to_vec(&self) -> Vec<i16> {
        self.samples.to_vec()
    }
}

impl Deref for SampleBuffer {
    type Target = [i16];

    fn deref(&self) -> &[i16] {
        &self.samples
    }
}
