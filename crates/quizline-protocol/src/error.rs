//! Error types for the protocol layer.
//!
//! Each crate in Quizline defines its own error enum. A `ProtocolError`
//! always means the problem is in turning events into bytes or back,
//! never in game rules or networking.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into an event).
    ///
    /// Common causes: malformed JSON, an unknown event name, or a payload
    /// of the wrong shape for the named event.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame could not be interpreted as an event at all
    /// (e.g. a binary frame that is not UTF-8).
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
