//! Error types for the server crate.

use quizline_protocol::ProtocolError;

/// Errors that can occur on a WebSocket connection or listener.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding, accepting, or upgrading a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}

/// Top-level error for running a Quizline server.
///
/// The `#[from]` conversions let `?` lift transport and codec errors.
#[derive(Debug, thiserror::Error)]
pub enum QuizlineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The question bank file couldn't be read.
    #[error("cannot read question bank {path}: {source}")]
    BankIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The question bank isn't valid JSON for a list of questions.
    #[error("invalid question bank: {0}")]
    BankFormat(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed(std::io::Error::other("gone"));
        let quizline_err: QuizlineError = err.into();
        assert!(matches!(quizline_err, QuizlineError::Transport(_)));
        assert!(quizline_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidFrame("bad".into());
        let quizline_err: QuizlineError = err.into();
        assert!(matches!(quizline_err, QuizlineError::Protocol(_)));
    }
}
