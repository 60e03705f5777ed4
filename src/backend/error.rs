use thiserror::Error;

/// Errors from remote procedure calls.
///
/// Cloneable so a single failed fetch can be handed to every caller that
/// joined it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
  /// The backend connection has not been established yet.
  #[error("Actor not available")]
  ConnectionUnavailable,

  /// The backend declined the call.
  #[error("{0}")]
  Rejected(String),

  /// Network or HTTP failure.
  #[error("transport error: {0}")]
  Transport(String),

  /// The reply did not match the expected shape.
  #[error("unexpected reply from {method}: {message}")]
  Decode {
    /// Remote procedure name
    method: String,
    /// Decoder message
    message: String,
  },

  /// The call was abandoned before it produced a result.
  #[error("request cancelled")]
  Cancelled,
}

impl BackendError {
  /// Message text of a backend rejection, if this is one
  pub fn rejection(&self) -> Option<&str> {
    match self {
      BackendError::Rejected(message) => Some(message),
      _ => None,
    }
  }
}
