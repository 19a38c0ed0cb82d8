//! Deployment configuration for the client.
//!
//! A single base endpoint is configured per deployment. Values come from the environment:
//!
//! | variable | default |
//! |---|---|
//! | `PAPERDESK_API_URL` | `http://localhost:5001` |
//! | `PAPERDESK_SESSION` | `<data dir>/paperdesk/session.json` |
//! | `PAPERDESK_TIMEOUT_SECS` | `120` |

use super::*;

/// Base endpoint used when `PAPERDESK_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:5001";

/// Per-request timeout used when `PAPERDESK_TIMEOUT_SECS` is not set.
///
/// Analysis requests download and summarize a PDF on the server, so this is generous.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
  /// Base endpoint every request path is resolved against
  pub api_url:         Url,
  /// File holding the persisted session
  pub session_path:    PathBuf,
  /// Upper bound on how long a single remote call may take
  pub request_timeout: Duration,
}

impl Config {
  /// Creates a configuration for the given endpoint with default session path and timeout.
  pub fn new(api_url: Url) -> Self {
    Self { api_url, session_path: Self::default_session_path(), request_timeout: DEFAULT_TIMEOUT }
  }

  /// Reads the configuration from the process environment.
  pub fn from_env() -> Result<Self, PaperdeskError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Builds the configuration from an arbitrary key lookup.
  ///
  /// Empty values are treated as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PaperdeskError> {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let api_url = Url::parse(&get("PAPERDESK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()))?;
    let session_path =
      get("PAPERDESK_SESSION").map(PathBuf::from).unwrap_or_else(Self::default_session_path);
    let request_timeout = match get("PAPERDESK_TIMEOUT_SECS") {
      Some(secs) => {
        let secs = secs
          .parse::<u64>()
          .ok()
          .filter(|s| *s > 0)
          .ok_or_else(|| PaperdeskError::Config(format!("PAPERDESK_TIMEOUT_SECS={secs}")))?;
        Duration::from_secs(secs)
      },
      None => DEFAULT_TIMEOUT,
    };

    debug!("Loaded configuration: api_url={api_url}, session={}", session_path.display());
    Ok(Self { api_url, session_path, request_timeout })
  }

  /// Replaces the base endpoint.
  pub fn with_api_url(mut self, api_url: Url) -> Self {
    self.api_url = api_url;
    self
  }

  /// Replaces the request timeout.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.request_timeout = timeout;
    self
  }

  /// Get default session path in user's data directory
  pub fn default_session_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("paperdesk").join("session.json")
  }
}
