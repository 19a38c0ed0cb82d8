//! The remote operations pages trigger, one [`Operation`] per service endpoint.
//!
//! | operation | endpoint | input | output |
//! |---|---|---|---|
//! | [`Login`] | `POST /auth/login` | [`Credentials`] | `()` (credential stored) |
//! | [`Register`] | `POST /auth/register` | [`Registration`] | server acknowledgement |
//! | [`Logout`] | `POST /auth/logout` | `()` | [`LogoutOutcome`] |
//! | [`Collect`] | `POST /api/collect/{monthly,daily}` | [`CollectRequest`] | [`CollectResponse`] |
//! | [`Query`] | `POST /api/query` | [`QueryBuilder`] | [`QueryRow`]s |
//! | [`Analyze`] | `POST /api/assist/read` | arXiv identifier | [`AnalyzeResponse`] |
//! | [`Recommend`] | `POST /api/recommend` | keywords | [`PaperSummary`]s |
//! | [`FetchHistory`] | `GET /api/history` | `()` | [`HistoryEntry`]s |

use lazy_static::lazy_static;
use regex::Regex;

use super::*;
use crate::{
  gateway::LogoutOutcome,
  models::{AnalyzeResponse, CollectResponse, HistoryEntry, PaperSummary, QueryRow},
  query::QueryBuilder,
  task::Operation,
};

lazy_static! {
  /// Short arXiv identifiers as the analysis endpoint accepts them, e.g. `2305.03048`.
  static ref ARXIV_ID: Regex = Regex::new(r"^[0-9]+\.[0-9]+$").unwrap();
}

/// Whether `candidate` is a short arXiv identifier (`<digits>.<digits>`).
pub fn is_arxiv_id(candidate: &str) -> bool { ARXIV_ID.is_match(candidate) }

/// Fails with a validation error naming `field` when `value` is blank.
fn require(value: &str, message: &str) -> Result<(), PaperdeskError> {
  if value.trim().is_empty() {
    return Err(PaperdeskError::Validation(message.to_string()));
  }
  Ok(())
}

/// Username and password for [`Login`].
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct Credentials {
  /// Account name
  pub username: String,
  /// Account password
  pub password: String,
}

impl Credentials {
  /// Bundles a username and password.
  pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
    Self { username: username.into(), password: password.into() }
  }
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials").field("username", &self.username).finish_non_exhaustive()
  }
}

/// Response of `/auth/login`.
#[derive(Debug, Deserialize)]
struct LoginResponse {
  /// The bearer token to hold
  access_token: String,
}

/// Exchanges credentials for a bearer token and stores it in the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Login;

impl Operation for Login {
  type Input = Credentials;
  type Output = ();

  const NAME: &'static str = "login";

  fn fallback_message(&self) -> &'static str { "Login failed" }

  fn validate(&self, input: &Credentials) -> Result<(), PaperdeskError> {
    require(&input.username, "Please enter your username")?;
    require(&input.password, "Please enter your password")
  }

  async fn call(&self, gateway: &Gateway, input: Credentials) -> Result<(), PaperdeskError> {
    let response: LoginResponse = gateway.post("/auth/login", &input).await?;
    if response.access_token.is_empty() {
      return Err(PaperdeskError::Remote { status: 200, message: None });
    }
    gateway.session().set_credential(response.access_token)?;
    debug!("Logged in as {}", input.username);
    Ok(())
  }
}

/// Fields of a new account for [`Register`].
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registration {
  /// Account name
  pub username: String,
  /// Account password
  pub password: String,
  /// Contact address; the service is the authority on its validity
  pub email:    String,
}

impl std::fmt::Debug for Registration {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Registration")
      .field("username", &self.username)
      .field("email", &self.email)
      .finish_non_exhaustive()
  }
}

/// Acknowledgement body of the auth endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Acknowledgement {
  /// Human-readable confirmation
  message: Option<String>,
}

/// Creates an account. Does not log in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Register;

impl Operation for Register {
  type Input = Registration;
  type Output = Option<String>;

  const NAME: &'static str = "register";

  fn fallback_message(&self) -> &'static str { "Registration failed" }

  fn validate(&self, input: &Registration) -> Result<(), PaperdeskError> {
    if [&input.username, &input.password, &input.email].iter().any(|v| v.trim().is_empty()) {
      return Err(PaperdeskError::Validation("Please fill in all fields".into()));
    }
    Ok(())
  }

  async fn call(
    &self,
    gateway: &Gateway,
    input: Registration,
  ) -> Result<Option<String>, PaperdeskError> {
    let ack: Option<Acknowledgement> = gateway.post("/auth/register", &input).await?;
    Ok(ack.and_then(|ack| ack.message))
  }
}

/// Ends the session: best effort remotely, always locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logout;

impl Operation for Logout {
  type Input = ();
  type Output = LogoutOutcome;

  const NAME: &'static str = "logout";

  fn fallback_message(&self) -> &'static str { "Logout failed" }

  fn validate(&self, _input: &()) -> Result<(), PaperdeskError> { Ok(()) }

  async fn call(&self, gateway: &Gateway, _input: ()) -> Result<LogoutOutcome, PaperdeskError> {
    gateway.logout().await
  }
}

/// Granularity of a collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectMode {
  /// Every paper of a month
  #[default]
  Monthly,
  /// Papers of a single day
  Daily,
}

impl CollectMode {
  /// Path segment of the endpoint.
  pub fn as_str(&self) -> &'static str {
    match self {
      CollectMode::Monthly => "monthly",
      CollectMode::Daily => "daily",
    }
  }
}

/// The date selection of the collection page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
  /// Monthly or daily run
  pub mode:  CollectMode,
  /// Selected year
  pub year:  i32,
  /// Selected month (1-12)
  pub month: Option<u32>,
  /// Selected day; daily runs fall back to the 1st when unset
  pub day:   Option<u32>,
}

impl CollectRequest {
  /// A monthly run.
  pub fn monthly(year: i32, month: u32) -> Self {
    Self { mode: CollectMode::Monthly, year, month: Some(month), day: None }
  }

  /// A daily run.
  pub fn daily(year: i32, month: u32, day: Option<u32>) -> Self {
    Self { mode: CollectMode::Daily, year, month: Some(month), day }
  }

  /// The day a daily run is sent with.
  pub fn effective_day(&self) -> u32 { self.day.unwrap_or(1) }
}

/// Asks the service to scrape and store a month's or a day's papers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collect;

impl Operation for Collect {
  type Input = CollectRequest;
  type Output = CollectResponse;

  const NAME: &'static str = "collect";

  fn fallback_message(&self) -> &'static str { "Collection failed" }

  fn validate(&self, input: &CollectRequest) -> Result<(), PaperdeskError> {
    if input.year <= 0 {
      return Err(PaperdeskError::Validation("Please select a year".into()));
    }
    match input.month {
      Some(month) if (1..=12).contains(&month) => {},
      _ => return Err(PaperdeskError::Validation("Please select a month".into())),
    }
    if input.mode == CollectMode::Daily && !(1..=31).contains(&input.effective_day()) {
      return Err(PaperdeskError::Validation("Please select a valid day".into()));
    }
    Ok(())
  }

  async fn call(
    &self,
    gateway: &Gateway,
    input: CollectRequest,
  ) -> Result<CollectResponse, PaperdeskError> {
    let month = input.month.unwrap_or(1);
    let body = match input.mode {
      CollectMode::Monthly => serde_json::json!({ "year": input.year, "month": month }),
      CollectMode::Daily =>
        serde_json::json!({ "year": input.year, "month": month, "day": input.effective_day() }),
    };
    let path = format!("/api/collect/{}", input.mode.as_str());
    let response: CollectResponse = gateway.post(&path, &body).await?;

    if response.info != "Success" {
      return Err(PaperdeskError::Remote {
        status:  200,
        message: Some(format!("Collection failed: {}", response.info)),
      });
    }
    Ok(response)
  }
}

/// Runs a structured query over stored paper metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query;

impl Operation for Query {
  type Input = QueryBuilder;
  type Output = Vec<QueryRow>;

  const NAME: &'static str = "query";

  fn fallback_message(&self) -> &'static str { "Query failed" }

  fn validate(&self, input: &QueryBuilder) -> Result<(), PaperdeskError> {
    if input.fields().is_empty() {
      return Err(PaperdeskError::Validation("Please select at least one field".into()));
    }
    if input.limit() == 0 {
      return Err(PaperdeskError::Validation("Limit must be a positive integer".into()));
    }
    Ok(())
  }

  async fn call(
    &self,
    gateway: &Gateway,
    input: QueryBuilder,
  ) -> Result<Vec<QueryRow>, PaperdeskError> {
    gateway.post("/api/query", &input.build()).await
  }
}

/// Requests an AI summary of one paper.
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyze;

impl Operation for Analyze {
  type Input = String;
  type Output = AnalyzeResponse;

  const NAME: &'static str = "analyze";

  fn fallback_message(&self) -> &'static str { "Analysis failed, please check ID or network" }

  fn validate(&self, input: &String) -> Result<(), PaperdeskError> {
    if !is_arxiv_id(input.trim()) {
      return Err(PaperdeskError::Validation(
        "Invalid identifier, please enter a valid arXiv ID (e.g., 2305.03048)".into(),
      ));
    }
    Ok(())
  }

  async fn call(
    &self,
    gateway: &Gateway,
    input: String,
  ) -> Result<AnalyzeResponse, PaperdeskError> {
    gateway.post("/api/assist/read", &serde_json::json!({ "arxiv_id": input.trim() })).await
  }
}

/// Ranks stored papers against the user's keywords.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recommend;

impl Operation for Recommend {
  type Input = String;
  type Output = Vec<PaperSummary>;

  const NAME: &'static str = "recommend";

  fn fallback_message(&self) -> &'static str { "Recommendation failed" }

  fn validate(&self, input: &String) -> Result<(), PaperdeskError> {
    require(input, "Please enter keywords")
  }

  async fn call(
    &self,
    gateway: &Gateway,
    input: String,
  ) -> Result<Vec<PaperSummary>, PaperdeskError> {
    gateway.post("/api/recommend", &serde_json::json!({ "keywords": input.trim() })).await
  }
}

/// Loads the user's reading history.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchHistory;

impl Operation for FetchHistory {
  type Input = ();
  type Output = Vec<HistoryEntry>;

  const NAME: &'static str = "history";

  fn fallback_message(&self) -> &'static str { "Failed to load history" }

  fn validate(&self, _input: &()) -> Result<(), PaperdeskError> { Ok(()) }

  async fn call(&self, gateway: &Gateway, _input: ()) -> Result<Vec<HistoryEntry>, PaperdeskError> {
    gateway.get("/api/history").await
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{
    task::{AsyncTask, Settlement, TaskStatus},
    testing::{gateway_with, MockTransport},
  };

  #[test]
  fn test_arxiv_id_pattern() {
    assert!(is_arxiv_id("2305.03048"));
    assert!(is_arxiv_id("1.2"));
    assert!(!is_arxiv_id("2305"));
    assert!(!is_arxiv_id("not-an-id"));
    assert!(!is_arxiv_id("2305.03048v2"));
    assert!(!is_arxiv_id("math.AG/0601001"));
    assert!(!is_arxiv_id("٢٣٠٥.٠٣٠٤٨"));
    assert!(!is_arxiv_id("２３０５.０３０４８"));
  }

  #[test]
  fn test_credentials_debug_hides_password() {
    let debug = format!("{:?}", Credentials::new("root", "hunter2"));
    assert!(debug.contains("root"));
    assert!(!debug.contains("hunter2"));
  }

  #[tokio::test]
  async fn test_login_stores_token() -> anyhow::Result<()> {
    let mock = MockTransport::new();
    mock.reply(200, json!({ "access_token": "tok" }));
    let session = SessionStore::in_memory();
    let gateway = gateway_with(&mock, session.clone());

    let task = AsyncTask::new(Login, Credentials::new("root", "123456"));
    assert_eq!(task.invoke(&gateway).await, Settlement::Applied);
    assert_eq!(session.credential().as_deref(), Some("tok"));
    assert_eq!(mock.requests()[0].body, Some(json!({ "username": "root", "password": "123456" })));
    Ok(())
  }

  #[tokio::test]
  async fn test_login_requires_fields() {
    let mock = MockTransport::new();
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Login, Credentials::new("root", ""));
    assert_eq!(task.invoke(&gateway).await, Settlement::Rejected);
    assert_eq!(task.error_message().as_deref(), Some("Please enter your password"));
    assert!(mock.requests().is_empty());
  }

  #[tokio::test]
  async fn test_register_requires_all_fields() {
    let mock = MockTransport::new();
    mock.reply(201, json!({ "message": "Registration successful" }));
    let session = SessionStore::in_memory();
    let gateway = gateway_with(&mock, session.clone());

    let mut registration = Registration {
      username: "ada".into(),
      password: "pw".into(),
      email:    " ".into(),
    };
    let task = AsyncTask::new(Register, registration.clone());
    assert_eq!(task.invoke(&gateway).await, Settlement::Rejected);
    assert_eq!(task.error_message().as_deref(), Some("Please fill in all fields"));

    registration.email = "ada@example.org".into();
    task.set_input(registration);
    assert_eq!(task.invoke(&gateway).await, Settlement::Applied);
    assert_eq!(task.output(), Some(Some("Registration successful".to_string())));
    assert!(!session.is_logged_in());
  }

  #[tokio::test]
  async fn test_register_surfaces_duplicate_username() {
    let mock = MockTransport::new();
    mock.reply(400, json!({ "error": "Username already exists" }));
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Register, Registration {
      username: "root".into(),
      password: "pw".into(),
      email:    "root@example.org".into(),
    });
    task.invoke(&gateway).await;
    assert_eq!(task.error_message().as_deref(), Some("Username already exists"));
  }

  #[tokio::test]
  async fn test_collect_validation_and_bodies() {
    let mock = MockTransport::new();
    mock.reply(200, json!({ "info": "Success", "result": [] }));
    mock.reply(200, json!({ "info": "Success", "result": [] }));
    mock.reply(200, json!({ "info": "Success", "result": [{ "id": "2509.00001", "title": "A" }] }));
    let gateway = gateway_with(&mock, SessionStore::in_memory());

    let task = AsyncTask::new(Collect, CollectRequest {
      mode:  CollectMode::Monthly,
      year:  2025,
      month: None,
      day:   None,
    });
    assert_eq!(task.invoke(&gateway).await, Settlement::Rejected);
    assert_eq!(task.error_message().as_deref(), Some("Please select a month"));

    task.set_input(CollectRequest::monthly(2025, 9));
    task.invoke(&gateway).await;
    task.set_input(CollectRequest::daily(2025, 9, Some(0)));
    assert_eq!(task.invoke(&gateway).await, Settlement::Rejected);
    assert_eq!(task.error_message().as_deref(), Some("Please select a valid day"));
    task.set_input(CollectRequest::daily(2025, 9, Some(32)));
    assert_eq!(task.invoke(&gateway).await, Settlement::Rejected);
    task.set_input(CollectRequest::daily(2025, 9, Some(17)));
    task.invoke(&gateway).await;
    task.set_input(CollectRequest::daily(2025, 9, None));
    task.invoke(&gateway).await;

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].url.path(), "/api/collect/monthly");
    assert_eq!(requests[0].body, Some(json!({ "year": 2025, "month": 9 })));
    assert_eq!(requests[1].url.path(), "/api/collect/daily");
    assert_eq!(requests[1].body, Some(json!({ "year": 2025, "month": 9, "day": 17 })));
    assert_eq!(requests[2].body, Some(json!({ "year": 2025, "month": 9, "day": 1 })));
    assert_eq!(task.output().unwrap().result[0].title, "A");
  }

  #[tokio::test]
  async fn test_collect_reports_unsuccessful_info() {
    let mock = MockTransport::new();
    mock.reply(200, json!({ "info": "Error", "result": [] }));
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Collect, CollectRequest::monthly(2025, 13));
    assert_eq!(task.invoke(&gateway).await, Settlement::Rejected);

    task.set_input(CollectRequest::monthly(1999, 1));
    task.invoke(&gateway).await;
    assert_eq!(task.error_message().as_deref(), Some("Collection failed: Error"));
  }

  #[tokio::test]
  async fn test_query_validation() {
    let mock = MockTransport::new();
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Query, QueryBuilder::new());

    task.invoke(&gateway).await;
    assert_eq!(task.error_message().as_deref(), Some("Please select at least one field"));

    task.update_input(|builder| {
      builder.add_field("title").set_limit(0);
    });
    task.invoke(&gateway).await;
    assert_eq!(task.error_message().as_deref(), Some("Limit must be a positive integer"));
    assert!(mock.requests().is_empty());
  }

  #[tokio::test]
  async fn test_recommend_rejects_blank_keywords() {
    let mock = MockTransport::new();
    mock.reply(200, json!([{ "arxiv_id": "2501.13106", "title": "sample", "suggest_score": 8 }]));
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Recommend, "   ".to_string());

    assert_eq!(task.invoke(&gateway).await, Settlement::Rejected);
    task.set_input("AI image generation".into());
    task.invoke(&gateway).await;
    assert_eq!(task.status(), TaskStatus::Succeeded);
    assert_eq!(task.output().unwrap()[0].suggest_score, Some(8.0));
    assert_eq!(mock.requests()[0].body, Some(json!({ "keywords": "AI image generation" })));
  }

  #[tokio::test]
  async fn test_history_failure_uses_fallback() {
    let mock = MockTransport::new();
    mock.reply_raw(500, "Internal Server Error");
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(FetchHistory, ());
    task.invoke(&gateway).await;
    assert_eq!(task.error_message().as_deref(), Some("Failed to load history"));
    assert_eq!(mock.requests()[0].method, gateway::Method::GET);
  }
}
