//! The session store: the single holder of the bearer credential.
//!
//! A [`SessionStore`] is created once at startup and handed to the [`Gateway`] and the
//! [`RouteGuard`](crate::guard::RouteGuard). Clones share the same state. When opened from a
//! file, every change is written through immediately so a later run sees it.
//!
//! ```no_run
//! use paperdesk::session::SessionStore;
//!
//! # fn example() -> Result<(), paperdesk::errors::PaperdeskError> {
//! let session = SessionStore::open(SessionStore::default_path())?;
//! session.set_credential("eyJhbGciOi...")?;
//! assert!(session.is_logged_in());
//! session.clear_credential()?;
//! # Ok(())
//! # }
//! ```

use std::io::Write;

use tempfile::NamedTempFile;

use super::*;

/// Same-site policy of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
  /// Only ever sent to the site that issued it
  Strict,
  /// Sent to the issuing site and on top-level navigation to it
  Lax,
}

/// Where a stored credential may be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialScope {
  /// Path prefix requests must fall under
  pub path:      String,
  /// Only send over https (loopback hosts count as secure)
  pub secure:    bool,
  /// Cross-site policy
  pub same_site: SameSite,
}

impl Default for CredentialScope {
  fn default() -> Self { Self { path: "/".into(), secure: true, same_site: SameSite::Strict } }
}

impl CredentialScope {
  /// Whether a credential with this scope may accompany a request to `url`, where `site` is the
  /// configured base endpoint of the deployment.
  pub fn permits(&self, url: &Url, site: &Url) -> bool {
    if !url.path().starts_with(&self.path) {
      return false;
    }
    if self.secure && url.scheme() != "https" && !is_loopback(url) {
      return false;
    }
    // Gateway calls are never top-level navigations, so Lax and Strict agree here.
    url.host_str() == site.host_str()
  }
}

/// Browsers treat loopback origins as secure contexts; so do we.
fn is_loopback(url: &Url) -> bool {
  match url.host() {
    Some(url::Host::Domain(domain)) => domain == "localhost",
    Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
    Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
    None => false,
  }
}

/// Persisted session record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  /// Opaque bearer token, present iff logged in
  pub credential: Option<String>,
  /// Where the credential may be sent
  #[serde(default)]
  pub scope:      CredentialScope,
}

/// Shared handle to the current session.
#[derive(Debug, Clone)]
pub struct SessionStore {
  /// Current session, shared between clones
  inner: Arc<RwLock<Session>>,
  /// Backing file, if the session is durable
  path:  Option<PathBuf>,
}

impl SessionStore {
  /// Opens the session stored at `path`, starting logged out if the file does not exist.
  ///
  /// A file that does not decode is treated as holding no credential; it is overwritten by the
  /// next change.
  pub fn open(path: impl AsRef<Path>) -> Result<Self, PaperdeskError> {
    let path = path.as_ref().to_path_buf();
    let session = if path.exists() {
      let text = std::fs::read_to_string(&path)?;
      if text.trim().is_empty() {
        Session::default()
      } else {
        serde_json::from_str(&text).unwrap_or_else(|e| {
          warn!("Ignoring unreadable session at {}: {e}", path.display());
          Session::default()
        })
      }
    } else {
      Session::default()
    };
    debug!(
      "Opened session at {} (logged in: {})",
      path.display(),
      session.credential.is_some()
    );
    Ok(Self { inner: Arc::new(RwLock::new(session)), path: Some(path) })
  }

  /// A session that lives only as long as the process.
  pub fn in_memory() -> Self {
    Self { inner: Arc::new(RwLock::new(Session::default())), path: None }
  }

  /// Get default session path in user's data directory
  pub fn default_path() -> PathBuf { Config::default_session_path() }

  /// The credential currently held, read at the moment of the call.
  pub fn credential(&self) -> Option<String> { self.read().credential.clone() }

  /// The scope the held credential is restricted to.
  pub fn scope(&self) -> CredentialScope { self.read().scope.clone() }

  /// Whether a credential is held.
  pub fn is_logged_in(&self) -> bool { self.read().credential.is_some() }

  /// Replaces any held credential with `token`.
  pub fn set_credential(&self, token: impl Into<String>) -> Result<(), PaperdeskError> {
    let snapshot = {
      let mut session = self.write();
      session.credential = Some(token.into());
      session.scope = CredentialScope::default();
      session.clone()
    };
    debug!("Stored new credential");
    self.persist(&snapshot)
  }

  /// Drops the held credential, if any.
  pub fn clear_credential(&self) -> Result<(), PaperdeskError> {
    let snapshot = {
      let mut session = self.write();
      session.credential = None;
      session.clone()
    };
    debug!("Cleared credential");
    self.persist(&snapshot)
  }

  /// Drops the held credential only if it is still `token`, returning whether it did.
  ///
  /// The comparison and the removal happen under one lock, so a credential stored after `token`
  /// was read is left alone.
  pub fn clear_credential_if(&self, token: &str) -> Result<bool, PaperdeskError> {
    let snapshot = {
      let mut session = self.write();
      if session.credential.as_deref() != Some(token) {
        return Ok(false);
      }
      session.credential = None;
      session.clone()
    };
    debug!("Cleared rejected credential");
    self.persist(&snapshot)?;
    Ok(true)
  }

  /// Writes the session through to its backing file.
  ///
  /// The file is replaced atomically and, on unix, readable by its owner only.
  fn persist(&self, session: &Session) -> Result<(), PaperdeskError> {
    let Some(path) = &self.path else { return Ok(()) };
    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };
    trace!("Creating parent directories: {}", dir.display());
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      file.as_file().set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(serde_json::to_string_pretty(session)?.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
  }

  /// Read access; a poisoned lock still holds a consistent `Session`.
  fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
    self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Write access, see [`SessionStore::read`].
  fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
    self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
