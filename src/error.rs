use thiserror::Error;

/// Rejected configurations. These are only ever produced outside the audio callback, once
/// `prepare()` succeeds the processing path has nothing left that can fail.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample rate {0} Hz is outside the supported range")]
    InvalidSampleRate(f32),

    #[error("block size {0} is outside the supported range")]
    InvalidBlockSize(usize),

    #[error("{0} channels requested, only mono and stereo are supported")]
    UnsupportedChannelCount(usize),

    #[error("sample relay needs a non-zero chunk size and a power-of-two capacity (got chunk size {chunk_size}, capacity {capacity})")]
    InvalidRelayGeometry { chunk_size: usize, capacity: usize },
}
