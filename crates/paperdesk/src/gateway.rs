//! The request gateway every remote call goes through.
//!
//! The gateway resolves request paths against the configured base endpoint, reads the session
//! immediately before each send and attaches `Authorization: Bearer <credential>` when a
//! credential is held and its scope allows it. Successful responses are decoded from JSON;
//! non-2xx responses become [`PaperdeskError::Remote`] carrying the server's message.
//!
//! Calls are fire-once: no retries and no caching. Each call is bounded by the configured
//! timeout.
//!
//! The wire itself sits behind the [`Transport`] trait so the gateway's behavior can be
//! exercised without a server; [`HttpTransport`] is the `reqwest` implementation.
//!
//! # Examples
//!
//! ```no_run
//! use paperdesk::{config::Config, gateway::Gateway, models::HistoryEntry, session::SessionStore};
//!
//! # async fn example() -> Result<(), paperdesk::errors::PaperdeskError> {
//! let config = Config::from_env()?;
//! let gateway = Gateway::new(&config, SessionStore::open(&config.session_path)?)?;
//! let history: Vec<HistoryEntry> = gateway.get("/api/history").await?;
//! println!("{} papers read", history.len());
//! # Ok(())
//! # }
//! ```

use std::{future::Future, pin::Pin};

pub use reqwest::Method;

use super::*;
use crate::session::CredentialScope;

/// Future returned by [`Transport::execute`].
pub type TransportFuture<'a> =
  Pin<Box<dyn Future<Output = Result<InboundResponse, PaperdeskError>> + Send + 'a>>;

/// Moves a fully prepared request over the wire.
pub trait Transport: Send + Sync {
  /// Sends `request` and returns the raw response, whatever its status.
  fn execute(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// A request as it leaves the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
  /// HTTP method
  pub method: Method,
  /// Absolute request URL
  pub url:    Url,
  /// Credential to send as a bearer token
  pub bearer: Option<String>,
  /// JSON body, if any
  pub body:   Option<Value>,
}

impl OutboundRequest {
  /// The `Authorization` header value this request carries, if any.
  pub fn authorization(&self) -> Option<String> {
    self.bearer.as_ref().map(|token| format!("Bearer {token}"))
  }
}

/// A response as the transport received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
  /// HTTP status code
  pub status: u16,
  /// Raw response body
  pub body:   String,
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  /// Internal web client used to connect to the API.
  client: reqwest::Client,
}

impl HttpTransport {
  /// Wraps an existing client.
  pub fn new(client: reqwest::Client) -> Self { Self { client } }
}

impl Transport for HttpTransport {
  fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
    Box::pin(async move {
      let mut builder = self.client.request(request.method, request.url);
      if let Some(token) = &request.bearer {
        builder = builder.bearer_auth(token);
      }
      if let Some(body) = &request.body {
        builder = builder.json(body);
      }

      let response = builder.send().await?;
      let status = response.status().as_u16();
      let body = response.text().await?;
      Ok(InboundResponse { status, body })
    })
  }
}

/// Result of a logout: the local credential is always gone, the remote side may not agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
  /// Why the remote logout failed, if it did
  pub remote_error: Option<String>,
}

/// The single entry point for outbound calls.
#[derive(Clone)]
pub struct Gateway {
  /// Base endpoint, always ending in `/`
  base:      Url,
  /// Session consulted before every send
  session:   SessionStore,
  /// Upper bound for a single call
  timeout:   Duration,
  /// Wire implementation
  transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Gateway {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Gateway")
      .field("base", &self.base.as_str())
      .field("timeout", &self.timeout)
      .finish_non_exhaustive()
  }
}

impl Gateway {
  /// Creates a gateway that talks HTTP to `config.api_url`.
  pub fn new(config: &Config, session: SessionStore) -> Result<Self, PaperdeskError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("paperdesk/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self::with_transport(config, session, Arc::new(HttpTransport::new(client))))
  }

  /// Creates a gateway on top of an arbitrary transport.
  pub fn with_transport(
    config: &Config,
    session: SessionStore,
    transport: Arc<dyn Transport>,
  ) -> Self {
    let mut base = config.api_url.clone();
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }
    if !CredentialScope::default().permits(&base, &base) {
      warn!("{base} is neither https nor loopback; the credential will never be sent to it");
    }
    Self { base, session, timeout: config.request_timeout, transport }
  }

  /// The session this gateway reads credentials from.
  pub fn session(&self) -> &SessionStore { &self.session }

  /// The configured base endpoint.
  pub fn base_url(&self) -> &Url { &self.base }

  /// Resolves a request path against the base endpoint, keeping any path prefix it has.
  pub fn endpoint(&self, path: &str) -> Result<Url, PaperdeskError> {
    Ok(self.base.join(path.trim_start_matches('/'))?)
  }

  /// `GET path`.
  pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, PaperdeskError> {
    self.send(Method::GET, path, None).await
  }

  /// `POST path` with a JSON body.
  pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, PaperdeskError>
  where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
  {
    self.send(Method::POST, path, Some(serde_json::to_value(body)?)).await
  }

  /// `POST path` without a body.
  pub async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R, PaperdeskError> {
    self.send(Method::POST, path, None).await
  }

  /// Sends one request and decodes the response.
  ///
  /// # Errors
  ///
  /// - [`PaperdeskError::Remote`] for any non-2xx status
  /// - [`PaperdeskError::SessionExpired`] when an authenticated endpoint answers `401` to a
  ///   request that carried a credential; that credential is cleared if it is still held
  /// - [`PaperdeskError::Timeout`] when the call does not settle in time
  /// - transport and decoding errors otherwise
  pub async fn send<R: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> Result<R, PaperdeskError> {
    let url = self.endpoint(path)?;

    // Read the session now, never earlier: a login or logout may have happened meanwhile.
    let bearer =
      self.session.credential().filter(|_| self.session.scope().permits(&url, &self.base));
    debug!("{method} {url} (authorized: {})", bearer.is_some());

    let request = OutboundRequest { method, url: url.clone(), bearer: bearer.clone(), body };
    let response = tokio::time::timeout(self.timeout, self.transport.execute(request))
      .await
      .map_err(|_| PaperdeskError::Timeout(self.timeout))??;
    trace!("{url} responded {}: {}", response.status, response.body);

    if !(200..300).contains(&response.status) {
      if let Some(sent) = bearer.filter(|_| response.status == 401 && !is_auth_path(path)) {
        // Only the credential this call carried is discarded, never one stored meanwhile.
        if self.session.clear_credential_if(&sent)? {
          warn!("Credential rejected by {url}, discarding session");
        }
        return Err(PaperdeskError::SessionExpired);
      }
      return Err(PaperdeskError::Remote {
        status:  response.status,
        message: server_message(&response.body),
      });
    }

    let body = if response.body.trim().is_empty() { "null" } else { response.body.as_str() };
    Ok(serde_json::from_str(body)?)
  }

  /// Logs out remotely on a best-effort basis; the local credential is cleared regardless.
  ///
  /// Only a failure to clear the local session is returned as an error.
  pub async fn logout(&self) -> Result<LogoutOutcome, PaperdeskError> {
    let remote = self.post_empty::<Value>("/auth/logout").await;
    self.session.clear_credential()?;

    let remote_error = remote.err().map(|e| {
      warn!("Remote logout failed, session cleared locally: {e}");
      e.to_string()
    });
    Ok(LogoutOutcome { remote_error })
  }
}

/// Whether `path` belongs to the authentication endpoints, which answer `401` for bad input.
fn is_auth_path(path: &str) -> bool { path.trim_start_matches('/').starts_with("auth/") }

/// Extracts the server's explanation from an error body.
///
/// The service reports problems under `error`, collection results under `info` and
/// acknowledgements under `message`.
fn server_message(body: &str) -> Option<String> {
  let value: Value = serde_json::from_str(body).ok()?;
  ["error", "info", "message"]
    .iter()
    .filter_map(|key| value.get(key).and_then(Value::as_str))
    .map(str::trim)
    .find(|message| !message.is_empty())
    .map(str::to_string)
}
