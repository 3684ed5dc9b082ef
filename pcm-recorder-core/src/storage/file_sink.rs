use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::audio_models::PcmEncoding;
use crate::models::error::RecorderError;

/// Streaming raw PCM writer.
///
/// Appends samples to a headerless file while a session runs. The file is
/// turned into a WAV container afterwards by
/// [`crate::storage::wave_finalizer::finalize`].
///
/// ## Byte layout
///
/// **16-bit:** each sample as low byte then high byte (little-endian).
///
/// **8-bit:** each sample as one unsigned byte, `(sample >> 8) + 128`, which
/// is the WAV convention for 8-bit PCM.
pub struct FileSink {
    file_path: PathBuf,
    encoding: PcmEncoding,
    writer: Option<BufWriter<File>>,
    total_bytes_written: u64,
}

impl FileSink {
    pub fn new(file_path: PathBuf, encoding: PcmEncoding) -> Self {
        Self {
            file_path,
            encoding,
            writer: None,
            total_bytes_written: 0,
        }
    }

    /// Create (or truncate) the output file.
    pub fn open(&mut self) -> Result<(), RecorderError> {
        if self.writer.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| RecorderError::Io(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| RecorderError::Io(format!("failed to create file: {}", e)))?;

        self.writer = Some(BufWriter::new(file));
        self.total_bytes_written = 0;
        log::debug!("Opened raw PCM sink at {}", self.file_path.display());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Append samples. Silently does nothing when the sink is not open.
    pub fn write(&mut self, samples: &[i16]) -> Result<(), RecorderError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let bytes = encode_samples(samples, self.encoding);
        writer
            .write_all(&bytes)
            .map_err(|e| RecorderError::Io(format!("write failed: {}", e)))?;
        self.total_bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), RecorderError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| RecorderError::Io(format!("flush failed: {}", e)))?;
        }
        Ok(())
    }

    /// Flush and close the file. Returns the payload length in bytes.
    pub fn close(&mut self) -> Result<u64, RecorderError> {
        if let Some(writer) = self.writer.take() {
            let file = writer
                .into_inner()
                .map_err(|e| RecorderError::Io(format!("flush failed: {}", e.error())))?;
            file.sync_all()
                .map_err(|e| RecorderError::Io(format!("sync failed: {}", e)))?;
            log::debug!(
                "Closed raw PCM sink at {} ({} bytes)",
                self.file_path.display(),
                self.total_bytes_written
            );
        }
        Ok(self.total_bytes_written)
    }

    /// Total payload bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn encoding(&self) -> PcmEncoding {
        self.encoding
    }
}

/// Serialize samples in the sink's on-disk layout.
pub fn encode_samples(samples: &[i16], encoding: PcmEncoding) -> Vec<u8> {
    match encoding {
        PcmEncoding::Pcm16Bit => {
            let mut bytes = Vec::with_capacity(samples.len() * 2);
            for &sample in samples {
                bytes.push((sample & 0xFF) as u8);
                bytes.push(((sample >> 8) & 0xFF) as u8);
            }
            bytes
        }
        PcmEncoding::Pcm8Bit => samples
            .iter()
            .map(|&sample| ((sample >> 8) + 128) as u8)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pcm_recorder_sink_{}_{}", uuid::Uuid::new_v4(), name))
    }

    #[test]
    fn encodes_little_endian_pairs() {
        assert_eq!(
            encode_samples(&[0x1234, -1], PcmEncoding::Pcm16Bit),
            vec![0x34, 0x12, 0xFF, 0xFF]
        );
    }

    #[test]
    fn encodes_unsigned_bytes_for_8bit() {
        assert_eq!(
            encode_samples(&[i16::MIN, 0, i16::MAX, -256], PcmEncoding::Pcm8Bit),
            vec![0x00, 0x80, 0xFF, 0x7F]
        );
    }

    #[test]
    fn write_appends_raw_bytes() {
        let path = temp_file_path("raw.pcm");
        let mut sink = FileSink::new(path.clone(), PcmEncoding::Pcm16Bit);
        sink.open().unwrap();

        sink.write(&[0x1234, -1]).unwrap();
        sink.write(&[0x0102]).unwrap();
        assert_eq!(sink.close().unwrap(), 6);

        let data = fs::read(&path).unwrap();
        assert_eq!(data, vec![0x34, 0x12, 0xFF, 0xFF, 0x02, 0x01]);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn write_without_open_is_noop() {
        let path = temp_file_path("never_opened.pcm");
        let mut sink = FileSink::new(path.clone(), PcmEncoding::Pcm16Bit);

        sink.write(&[1, 2, 3]).unwrap();
        assert_eq!(sink.bytes_written(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn open_creates_missing_directories() {
        let dir = temp_file_path("nested");
        let path = dir.join("deeper").join("take.pcm");
        let mut sink = FileSink::new(path.clone(), PcmEncoding::Pcm8Bit);
        sink.open().unwrap();
        sink.write(&[0]).unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![0x80]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn close_twice_is_harmless() {
        let path = temp_file_path("double_close.pcm");
        let mut sink = FileSink::new(path.clone(), PcmEncoding::Pcm16Bit);
        sink.open().unwrap();
        sink.write(&[7]).unwrap();
        assert_eq!(sink.close().unwrap(), 2);
        assert_eq!(sink.close().unwrap(), 2);
        assert!(!sink.is_open());

        fs::remove_file(&path).ok();
    }
}
