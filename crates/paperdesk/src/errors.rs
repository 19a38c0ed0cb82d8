//! Error types for the paperdesk client library.
//!
//! Failures fall into three groups:
//! - Validation failures, detected locally before anything is sent
//! - Remote failures, reported by the service or by the transport underneath it
//! - Local resource failures, such as reading or writing the session file
//!
//! # Examples
//!
//! ```no_run
//! use paperdesk::{errors::PaperdeskError, gateway::Gateway};
//!
//! # async fn example(gateway: &Gateway) -> Result<(), PaperdeskError> {
//! match gateway.get::<serde_json::Value>("/api/history").await {
//!   Err(PaperdeskError::SessionExpired) => println!("Please log in again"),
//!   Err(PaperdeskError::Remote { message: Some(message), .. }) => println!("{message}"),
//!   Err(e) => println!("Other error: {e}"),
//!   Ok(rows) => println!("{rows}"),
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the paperdesk service.
#[derive(Error, Debug)]
pub enum PaperdeskError {
  /// Input was rejected locally and never reached the network.
  ///
  /// The string is the message shown next to the offending control, e.g. an arXiv identifier
  /// that is not of the `2305.03048` form or a query without any selected field.
  #[error("{0}")]
  Validation(String),

  /// The service answered with a non-2xx status.
  ///
  /// `message` carries the `error`, `info` or `message` field of the response body when the
  /// service provided one.
  #[error("{}", .message.as_deref().unwrap_or("Request failed"))]
  Remote {
    /// HTTP status code of the response
    status:  u16,
    /// Server-provided explanation, if any
    message: Option<String>,
  },

  /// An authenticated endpoint refused the credential that was sent with the request.
  ///
  /// The gateway has already discarded the local credential when this is returned.
  #[error("Session expired, please log in again")]
  SessionExpired,

  /// The request did not settle within the configured timeout.
  #[error("Request timed out after {0:?}")]
  Timeout(Duration),

  /// A network request failed before a response was received.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The configured endpoint or a request path could not be parsed.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// A request or response body was not the expected JSON.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// Reading or writing a local file failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// A client route could not be understood.
  #[error("Invalid route: {0}")]
  InvalidRoute(String),

  /// A configuration value from the environment could not be used.
  #[error("Invalid configuration: {0}")]
  Config(String),
}

impl PaperdeskError {
  /// Whether this error was produced by local validation.
  pub fn is_validation(&self) -> bool { matches!(self, PaperdeskError::Validation(_)) }

  /// Whether this error came from the remote side of a call (status, transport or timeout).
  pub fn is_remote(&self) -> bool {
    matches!(
      self,
      PaperdeskError::Remote { .. }
        | PaperdeskError::SessionExpired
        | PaperdeskError::Timeout(_)
        | PaperdeskError::Network(_)
    )
  }

  /// The message a page shows for this error, given the operation's fallback text.
  ///
  /// Validation and session errors keep their own wording. Remote errors use the server's
  /// message when present, everything else falls back to `fallback`.
  pub fn user_message(&self, fallback: &str) -> String {
    match self {
      PaperdeskError::Validation(message) => message.clone(),
      PaperdeskError::Remote { message: Some(message), .. } => message.clone(),
      PaperdeskError::SessionExpired => self.to_string(),
      _ => fallback.to_string(),
    }
  }
}
