//! WAV file format utilities.
//!
//! Generates and parses the canonical 44-byte RIFF/WAVE header used for
//! finalized recordings.

use crate::models::error::RecorderError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest payload whose RIFF chunk size (36 + payload) still fits in 32 bits.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// PCM layout described by a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// `None` when the byte rate does not fit the header's 32-bit field.
    pub fn checked_byte_rate(&self) -> Option<u32> {
        let rate = self.sample_rate as u64 * self.channels as u64 * self.bits_per_sample as u64 / 8;
        u32::try_from(rate).ok()
    }

    /// Saturates at `u32::MAX`; see [`WavSpec::checked_byte_rate`].
    pub fn byte_rate(&self) -> u32 {
        self.checked_byte_rate().unwrap_or(u32::MAX)
    }

    pub fn block_align(&self) -> u16 {
        (self.channels as u32 * self.bits_per_sample as u32 / 8).min(u16::MAX as u32) as u16
    }
}

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// `byte_rate` and `block_align` are derived from the layout, so they read
/// `rate * 2` and `2` only for mono 16-bit.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits / 8
/// [32-33]  block_align = channels * bits / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(spec: &WavSpec, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&spec.channels.to_le_bytes());
    header[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&spec.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&spec.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&spec.bits_per_sample.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Parse a canonical 44-byte header, returning the PCM layout and data size.
pub fn parse_wav_header(bytes: &[u8]) -> Result<(WavSpec, u32), RecorderError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(RecorderError::Io(format!(
            "header too short: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(RecorderError::Io("not a RIFF/WAVE file".into()));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(RecorderError::Io("unexpected chunk layout".into()));
    }
    if le_u16(bytes, 20) != 1 {
        return Err(RecorderError::Io("not PCM".into()));
    }

    let spec = WavSpec {
        channels: le_u16(bytes, 22),
        sample_rate: le_u32(bytes, 24),
        bits_per_sample: le_u16(bytes, 34),
    };
    Ok((spec, le_u32(bytes, 40)))
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO_16: WavSpec = WavSpec {
        sample_rate: 8000,
        channels: 1,
        bits_per_sample: 16,
    };

    #[test]
    fn header_size_is_44_bytes() {
        let header = generate_wav_header(&MONO_16, 0);
        assert_eq!(header.len(), 44);
    }

    #[test]
    fn header_riff_magic() {
        let header = generate_wav_header(&MONO_16, 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn header_mono_16bit_fields() {
        let header = generate_wav_header(&MONO_16, 1600);

        assert_eq!(le_u32(&header, 4), 36 + 1600);
        assert_eq!(le_u32(&header, 16), 16);
        assert_eq!(le_u16(&header, 20), 1);
        assert_eq!(le_u16(&header, 22), 1);
        assert_eq!(le_u32(&header, 24), 8000);
        // rate * 2 and block align 2 for mono 16-bit
        assert_eq!(le_u32(&header, 28), 16000);
        assert_eq!(le_u16(&header, 32), 2);
        assert_eq!(le_u16(&header, 34), 16);
        assert_eq!(le_u32(&header, 40), 1600);
    }

    #[test]
    fn header_stereo_derives_rates() {
        let spec = WavSpec {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
        };
        let header = generate_wav_header(&spec, 0);
        assert_eq!(le_u32(&header, 28), 176400);
        assert_eq!(le_u16(&header, 32), 4);
    }

    #[test]
    fn header_8bit_block_align() {
        let spec = WavSpec {
            sample_rate: 11025,
            channels: 1,
            bits_per_sample: 8,
        };
        assert_eq!(spec.block_align(), 1);
        assert_eq!(spec.byte_rate(), 11025);
    }

    #[test]
    fn byte_rate_overflow_is_detected() {
        let spec = WavSpec {
            sample_rate: 3_000_000_000,
            channels: 2,
            bits_per_sample: 16,
        };
        assert_eq!(spec.checked_byte_rate(), None);
        assert_eq!(spec.byte_rate(), u32::MAX);
        assert_eq!(MONO_16.checked_byte_rate(), Some(16000));
    }

    #[test]
    fn parse_reads_back_generated_header() {
        let header = generate_wav_header(&MONO_16, 320);
        let (spec, data_size) = parse_wav_header(&header).unwrap();
        assert_eq!(spec, MONO_16);
        assert_eq!(data_size, 320);
    }

    #[test]
    fn parse_rejects_foreign_bytes() {
        assert!(parse_wav_header(&[0u8; 10]).is_err());
        assert!(parse_wav_header(&[0u8; 44]).is_err());
    }
}
