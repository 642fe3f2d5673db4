//! Error types for payload coding and stream navigation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BasebandError {
    #[error("malformed word buffer: {reason}")]
    MalformedBuffer { reason: String },

    #[error("no codec registered for {bps} bits per sample")]
    UnsupportedBitWidth { bps: u32 },

    #[error(
        "cannot address samples of {bits_per_sample} bits in {bits_per_word}-bit words: \
         neither divides the other"
    )]
    UnsupportedLayout {
        bits_per_sample: u32,
        bits_per_word: u32,
    },

    #[error("sample index {index} out of range for {len} samples")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("truncated read: expected {expected} bytes, got {actual}")]
    TruncatedRead { expected: usize, actual: usize },

    #[error("stream too short to detect the frame rate (less than one second of frames)")]
    InsufficientDataForRateDetection,

    #[error("corrupt stream: no valid frame header in the last {searched} bytes")]
    CorruptStream { searched: usize },

    #[error("invalid mode: {reason}")]
    InvalidMode { reason: String },

    #[error("invalid sample rate {rate}: must be positive and finite")]
    InvalidSampleRate { rate: f64 },

    #[error("invalid sample shape: {reason}")]
    InvalidShape { reason: String },

    #[error("invalid selector: {reason}")]
    InvalidSelector { reason: String },

    #[error("data mismatch: {reason}")]
    DataMismatch { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BasebandError>;
