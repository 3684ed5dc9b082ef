pub mod file_sink;
pub mod metadata;
pub mod wave_finalizer;
