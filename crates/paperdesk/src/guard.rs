//! Client routes and the access rule deciding whether one may render.
//!
//! | requested | logged in | logged out |
//! |---|---|---|
//! | `/` | redirect to `/collect` | redirect to `/login` |
//! | `/login`, `/register` | render | render |
//! | `/collect`, `/query`, `/assist`, `/history`, `/recommend` | render | redirect to `/login` |
//!
//! Paths that name no known route are decided as `/`.

use url::form_urlencoded;

use super::*;

/// Base used to resolve relative client paths; never contacted.
const ROUTE_BASE: &str = "http://paperdesk.invalid/";

/// A navigable client route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  /// `/`
  Root,
  /// `/login`
  Login,
  /// `/register`
  Register,
  /// `/collect`
  Collect,
  /// `/query`
  Query,
  /// `/assist`, optionally deep-linked to a paper
  Assist {
    /// Value of the `arxiv_id` query parameter, if non-empty
    arxiv_id: Option<String>,
  },
  /// `/history`
  History,
  /// `/recommend`
  Recommend,
}

impl Route {
  /// Parses a client path such as `/collect` or `/assist?arxiv_id=2305.03048`.
  pub fn parse(path: &str) -> Result<Self, PaperdeskError> {
    let url = Url::parse(ROUTE_BASE)?.join(path.trim())?;
    let route = match url.path().trim_end_matches('/') {
      "" => Route::Root,
      "/login" => Route::Login,
      "/register" => Route::Register,
      "/collect" => Route::Collect,
      "/query" => Route::Query,
      "/assist" => {
        let arxiv_id = url
          .query_pairs()
          .find(|(key, _)| key == "arxiv_id")
          .map(|(_, value)| value.trim().to_string())
          .filter(|value| !value.is_empty());
        Route::Assist { arxiv_id }
      },
      "/history" => Route::History,
      "/recommend" => Route::Recommend,
      other => return Err(PaperdeskError::InvalidRoute(other.to_string())),
    };
    Ok(route)
  }

  /// The analysis page deep-linked to `arxiv_id`.
  pub fn assist(arxiv_id: impl Into<String>) -> Self {
    Route::Assist { arxiv_id: Some(arxiv_id.into()) }
  }

  /// Link to the analysis page for `arxiv_id`, as history and recommendation entries use.
  pub fn assist_link(arxiv_id: &str) -> String { Route::assist(arxiv_id).to_string() }

  /// Path without query.
  pub fn path(&self) -> &'static str {
    match self {
      Route::Root => "/",
      Route::Login => "/login",
      Route::Register => "/register",
      Route::Collect => "/collect",
      Route::Query => "/query",
      Route::Assist { .. } => "/assist",
      Route::History => "/history",
      Route::Recommend => "/recommend",
    }
  }

  /// Whether rendering this route requires a credential.
  pub fn requires_login(&self) -> bool {
    !matches!(self, Route::Root | Route::Login | Route::Register)
  }
}

impl std::fmt::Display for Route {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Route::Assist { arxiv_id: Some(id) } => {
        let query =
          form_urlencoded::Serializer::new(String::new()).append_pair("arxiv_id", id).finish();
        write!(f, "{}?{query}", self.path())
      },
      _ => f.write_str(self.path()),
    }
  }
}

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  /// The route renders as requested
  Render(Route),
  /// The user is sent to `/login`
  RedirectToLogin,
  /// The user is sent to `/collect`
  RedirectToCollect,
}

impl Decision {
  /// The route the user ends up on.
  pub fn destination(&self) -> Route {
    match self {
      Decision::Render(route) => route.clone(),
      Decision::RedirectToLogin => Route::Login,
      Decision::RedirectToCollect => Route::Collect,
    }
  }

  /// Whether the navigation was redirected.
  pub fn is_redirect(&self) -> bool { !matches!(self, Decision::Render(_)) }
}

/// The access rule as a pure function of route and login status.
pub fn decide(route: &Route, logged_in: bool) -> Decision {
  match (route, logged_in) {
    (Route::Root, true) => Decision::RedirectToCollect,
    (Route::Root, false) => Decision::RedirectToLogin,
    (route, false) if route.requires_login() => Decision::RedirectToLogin,
    (route, _) => Decision::Render(route.clone()),
  }
}

/// Applies [`decide`] to the session's status at the moment of each navigation.
#[derive(Debug, Clone)]
pub struct RouteGuard {
  /// Shared session
  session: SessionStore,
}

impl RouteGuard {
  /// Guards navigation for `session`.
  pub fn new(session: SessionStore) -> Self { Self { session } }

  /// Decides a navigation to `path`.
  pub fn evaluate(&self, path: &str) -> Decision {
    let route = Route::parse(path).unwrap_or_else(|e| {
      debug!("{e}, deciding as /");
      Route::Root
    });
    self.evaluate_route(&route)
  }

  /// Decides a navigation to an already parsed route.
  pub fn evaluate_route(&self, route: &Route) -> Decision {
    let decision = decide(route, self.session.is_logged_in());
    trace!("navigation to {route} decided as {decision:?}");
    decision
  }
}
