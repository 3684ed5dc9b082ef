//! sim-record - record from the synthetic backend to a WAV file

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU16, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use pcm_recorder_core::storage::metadata;
use pcm_recorder_core::{
    ChannelLayout, InputSource, PcmEncoding, RecorderConfig, RecorderEngine, RecorderError, RecorderSubscriber,
    SampleBuffer,
};
use pcm_recorder_sim::{Signal, SimBackend};

#[derive(Parser)]
#[command(name = "sim-record")]
#[command(about = "Record a synthetic tone through the pcm-recorder engine")]
#[command(version)]
struct Cli {
    /// Output file (raw PCM while recording, WAV afterwards). Omit to stream only.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Recording length in seconds
    #[arg(short, long, default_value = "2", value_parser = parse_seconds)]
    seconds: f32,

    /// Sample rate in Hz (probe the device when omitted)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Record two channels
    #[arg(long)]
    stereo: bool,

    /// Record 8-bit samples
    #[arg(long)]
    eight_bit: bool,

    /// Tone frequency in Hz
    #[arg(long, default_value = "440")]
    frequency: f32,

    /// Pause for this many seconds halfway through
    #[arg(long, value_parser = parse_seconds)]
    pause: Option<f32>,

    /// Write a JSON metadata sidecar next to the WAV
    #[arg(long)]
    metadata: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_seconds(value: &str) -> Result<f32, String> {
    let seconds: f32 = value.parse::<f32>().map_err(|e| e.to_string())?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("{} is not a non-negative number of seconds", value));
    }
    Ok(seconds)
}

/// Logs the running peak level once per second of audio.
struct LevelLogger {
    buffers: AtomicU64,
    samples: AtomicU64,
    peak: AtomicU16,
    samples_per_report: u64,
}

impl RecorderSubscriber for LevelLogger {
    fn on_buffer(&self, buffer: SampleBuffer) {
        let peak = buffer.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        self.peak.fetch_max(peak, Ordering::Relaxed);
        self.buffers.fetch_add(1, Ordering::Relaxed);

        let before = self.samples.fetch_add(buffer.len() as u64, Ordering::Relaxed);
        let after = before + buffer.len() as u64;
        if after / self.samples_per_report > before / self.samples_per_report {
            let peak = self.peak.swap(0, Ordering::Relaxed);
            log::info!(
                "{}s: peak {:.1}%",
                after / self.samples_per_report,
                peak as f32 * 100.0 / i16::MAX as f32
            );
        }
    }

    fn on_error(&self, error: &RecorderError) {
        log::error!("stream error: {}", error);
    }

    fn on_complete(&self) {
        log::info!("stream complete after {} buffers", self.buffers.load(Ordering::Relaxed));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let backend = SimBackend::new().with_signal(Signal::Sine {
        frequency_hz: cli.frequency,
        amplitude: 0.5,
    });

    let mut engine = match cli.sample_rate {
        Some(rate) => {
            let channels = if cli.stereo { ChannelLayout::Stereo } else { ChannelLayout::Mono };
            let encoding = if cli.eight_bit { PcmEncoding::Pcm8Bit } else { PcmEncoding::Pcm16Bit };
            let mut config = RecorderConfig::new(InputSource::Mic, rate, channels, encoding)?;
            config.file_path = cli.output.clone();
            RecorderEngine::new(backend, config)
        }
        None => RecorderEngine::with_probed_config(backend, InputSource::Mic, cli.output.clone())
            .context("no usable capture format")?,
    };
    log::info!("Format: {}", engine.config());

    let config = engine.config();
    engine.subscribe(Arc::new(LevelLogger {
        buffers: AtomicU64::new(0),
        samples: AtomicU64::new(0),
        peak: AtomicU16::new(0),
        samples_per_report: (config.sample_rate as u64 * config.channels.count() as u64).max(1),
    }));

    engine.start().context("failed to start recording")?;

    let half = Duration::from_secs_f32(cli.seconds / 2.0);
    thread::sleep(half);
    if let Some(pause) = cli.pause {
        engine.pause()?;
        log::info!("Paused for {:.1}s", pause);
        thread::sleep(Duration::from_secs_f32(pause));
        engine.resume()?;
    }
    thread::sleep(half);

    engine.stop();

    match engine.complete_recording().context("failed to finalize recording")? {
        Some(result) => {
            println!(
                "{}: {:.2}s, {} data bytes, sha256 {}",
                result.file_path.display(),
                result.duration_secs,
                result.data_bytes,
                result.checksum
            );
            if cli.metadata {
                let sidecar = metadata::write_metadata(&result.metadata, &result.file_path)?;
                println!("metadata: {}", sidecar.display());
            }
        }
        None => println!("streamed without writing a file"),
    }

    Ok(())
}
