pub mod pause_gate;
pub mod wav_format;
