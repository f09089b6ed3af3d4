//! Error types shared across crates.

use thiserror::Error;

/// Failure to parse a [`TxId`](crate::TxId) or [`NodeId`](crate::NodeId).
#[derive(Debug, Error)]
pub enum IdError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid id length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Invalid or unreadable avalanche parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("round-time breakpoints must be strictly increasing: mid {mid}, late {late}, stuck {stuck}")]
    NonIncreasingBreakpoints { mid: u32, late: u32, stuck: u32 },

    #[error("round-time breakpoint `{0}` must be non-zero")]
    ZeroBreakpoint(&'static str),

    #[error("threshold `{name}` is {value}%, must be at most 100%")]
    ThresholdOutOfRange { name: &'static str, value: u32 },

    #[error("minimum consensus time must be non-zero")]
    ZeroMinConsensus,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
