//! Error types for channels and message decoding.

use thiserror::Error;

/// Errors raised by a channel provider.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel could not be opened.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The source could not be read (replay files, etc.).
    #[error("Source unavailable: {0}")]
    Source(String),
}

/// Errors raised while decoding an inbound message.
///
/// All of these are non-fatal: the message is dropped and the
/// connection carries on.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload was not valid JSON, had an unknown `type`, or missed fields.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A numeric field was outside its allowed range.
    #[error("Field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl ChannelError {
    /// Reason string shown to the user when a connect attempt fails.
    pub fn user_reason(&self) -> String {
        format!("Failed to connect to the metrics stream: {}", self)
    }
}
