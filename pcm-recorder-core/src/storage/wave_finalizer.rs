use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::RecorderError;
use crate::processing::wav_format::{self, WavSpec, MAX_DATA_SIZE};

/// Turn a raw PCM file into a WAV file in place.
///
/// The header is inserted ahead of the payload: the file grows by
/// [`wav_format::WAV_HEADER_SIZE`] bytes and every payload byte is preserved.
/// Returns the payload length.
pub fn finalize(raw_path: &Path, spec: &WavSpec) -> Result<u64, RecorderError> {
    finalize_to(raw_path, raw_path, spec)
}

/// Write `[header][raw payload]` to `wav_path`.
///
/// The WAV is assembled in a sibling temp file and renamed over `wav_path`
/// only once complete, so a failure part-way leaves both `raw_path` and any
/// existing `wav_path` untouched and the call can simply be retried.
pub fn finalize_to(raw_path: &Path, wav_path: &Path, spec: &WavSpec) -> Result<u64, RecorderError> {
    if spec.channels == 0 || !matches!(spec.bits_per_sample, 8 | 16) || spec.checked_byte_rate().is_none() {
        return Err(RecorderError::ConfigurationInconsistency(format!(
            "cannot describe {} Hz, {} ch, {} bit PCM in a WAV header",
            spec.sample_rate, spec.channels, spec.bits_per_sample
        )));
    }

    let data_size = fs::metadata(raw_path)
        .map_err(|e| RecorderError::Io(format!("failed to stat {}: {}", raw_path.display(), e)))?
        .len();

    if data_size > MAX_DATA_SIZE {
        return Err(RecorderError::Io(format!(
            "payload of {} bytes does not fit a RIFF header",
            data_size
        )));
    }

    let block_align = spec.block_align() as u64;
    if data_size % block_align != 0 {
        log::warn!(
            "{}: payload of {} bytes ends in a partial {}-byte frame ({} ch, {} bit)",
            raw_path.display(),
            data_size,
            block_align,
            spec.channels,
            spec.bits_per_sample
        );
    }

    let header = wav_format::generate_wav_header(spec, data_size as u32);
    let temp_path = temp_sibling(wav_path);

    if let Err(e) = write_wav(raw_path, &temp_path, &header, data_size) {
        fs::remove_file(&temp_path).ok();
        return Err(RecorderError::Io(format!("failed to write WAV: {}", e)));
    }

    fs::rename(&temp_path, wav_path).map_err(|e| {
        fs::remove_file(&temp_path).ok();
        RecorderError::Io(format!("failed to replace {}: {}", wav_path.display(), e))
    })?;

    log::info!(
        "Finalized {} ({} Hz, {} ch, {} bit, {} data bytes)",
        wav_path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        data_size
    );
    Ok(data_size)
}

fn write_wav(raw_path: &Path, temp_path: &Path, header: &[u8], data_size: u64) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(raw_path)?);
    let mut writer = BufWriter::new(File::create(temp_path)?);

    writer.write_all(header)?;
    let copied = io::copy(&mut reader.by_ref().take(data_size), &mut writer)?;
    if copied != data_size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("raw file shrank: copied {} of {} bytes", copied, data_size),
        ));
    }

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".wavtmp");
    path.with_file_name(name)
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let mut reader = BufReader::new(
        File::open(path).map_err(|e| RecorderError::Io(format!("failed to read file for checksum: {}", e)))?,
    );
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader
            .read(&mut chunk)
            .map_err(|e| RecorderError::Io(format!("failed to read file for checksum: {}", e)))?;
        if n == 0 {
            break;
        }
        hasher.update(&chunk[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
