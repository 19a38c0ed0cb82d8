//! Error types for the paperdesk CLI.
//!
//! Remote failures of an operation never reach this type: they settle inside the operation's
//! task and are printed as warnings. What remains are problems that stop the command itself,
//! such as a bad configuration, an aborted prompt or a malformed filter.

use thiserror::Error;

/// Errors that end a CLI invocation with a non-zero exit code.
#[derive(Error, Debug)]
pub enum PaperdeskCliError {
  /// Errors from user interaction dialogs
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// Errors from the paperdesk library
  #[error(transparent)]
  Paperdesk(#[from] paperdesk::errors::PaperdeskError),

  /// A `--where` argument that is not of the form `key=value`
  #[error("Invalid filter {0:?}, expected key=value")]
  Filter(String),
}
