pub mod engine;
pub mod probe;
