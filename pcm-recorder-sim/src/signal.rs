//! Sample generators for the synthetic device.

use std::f32::consts::TAU;

/// What the synthetic device "hears".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// Every interleaved sample is the previous one plus one (wrapping).
    /// Makes dropped or duplicated buffers easy to spot.
    Counter,
    /// Identical sine on every channel.
    Sine { frequency_hz: f32, amplitude: f32 },
    Silence,
}

impl Signal {
    /// Fill `buffer` with interleaved samples starting at absolute sample
    /// position `position`. Returns the position after the last sample.
    pub fn fill(&self, buffer: &mut [i16], position: u64, sample_rate: u32, channels: u16) -> u64 {
        let channels = channels.max(1) as u64;
        for (offset, slot) in buffer.iter_mut().enumerate() {
            let index = position + offset as u64;
            *slot = match *self {
                Signal::Counter => index as u16 as i16,
                Signal::Sine {
                    frequency_hz,
                    amplitude,
                } => {
                    let frame = index / channels;
                    let t = frame as f32 / sample_rate as f32;
                    let value = (TAU * frequency_hz * t).sin() * amplitude.clamp(0.0, 1.0);
                    (value * i16::MAX as f32) as i16
                }
                Signal::Silence => 0,
            };
        }
        position + buffer.len() as u64
    }
}
