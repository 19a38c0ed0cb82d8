//! The asynchronous lifecycle of one user-triggered remote operation.
//!
//! Every page wraps its primary remote call in an [`AsyncTask`]:
//!
//! ```text
//!   Idle ──invoke──▶ Loading ──resolve──▶ Succeeded
//!                       │
//!                       └────reject────▶ Failed
//!   Succeeded | Failed ──invoke──▶ Loading
//! ```
//!
//! Input is validated locally before anything is sent; a rejected input moves the task straight
//! to `Failed` without touching the network. Invocations are numbered, and a settlement is only
//! applied if no newer invocation has been issued since, so a slow stale response can never
//! overwrite a newer one.
//!
//! # Examples
//!
//! ```no_run
//! use paperdesk::{gateway::Gateway, ops::Recommend, task::{AsyncTask, TaskStatus}};
//!
//! # async fn example(gateway: &Gateway) {
//! let task = AsyncTask::new(Recommend, "diffusion image editing".to_string());
//! task.invoke(gateway).await;
//! match task.status() {
//!   TaskStatus::Succeeded => println!("{} papers", task.output().unwrap_or_default().len()),
//!   TaskStatus::Failed => println!("{}", task.error_message().unwrap_or_default()),
//!   _ => unreachable!("invoke always settles"),
//! }
//! # }
//! ```

use super::*;

/// A remote operation a page can trigger.
///
/// Implementations describe how to validate their input and how to call the service; the
/// lifecycle around them is handled by [`AsyncTask`].
#[allow(async_fn_in_trait)]
pub trait Operation {
  /// What the user edits before triggering the operation.
  type Input: Clone;
  /// What a successful call produces.
  type Output: Clone;

  /// Short name used in logs.
  const NAME: &'static str;

  /// Message shown when a failure carries no server explanation.
  fn fallback_message(&self) -> &'static str;

  /// Checks the input locally. Errors should be [`PaperdeskError::Validation`].
  fn validate(&self, input: &Self::Input) -> Result<(), PaperdeskError>;

  /// Performs the remote call.
  async fn call(&self, gateway: &Gateway, input: Self::Input)
    -> Result<Self::Output, PaperdeskError>;
}

/// State of a task. Output exists only on success, a message only on failure.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState<T> {
  /// Nothing triggered yet, or the last error was dismissed
  Idle,
  /// A call is in flight
  Loading,
  /// The latest call succeeded
  Succeeded(T),
  /// The latest call or validation failed
  Failed(String),
}

/// Payload-free view of [`TaskState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
  /// See [`TaskState::Idle`]
  Idle,
  /// See [`TaskState::Loading`]
  Loading,
  /// See [`TaskState::Succeeded`]
  Succeeded,
  /// See [`TaskState::Failed`]
  Failed,
}

impl<T> TaskState<T> {
  /// The discriminant.
  pub fn status(&self) -> TaskStatus {
    match self {
      TaskState::Idle => TaskStatus::Idle,
      TaskState::Loading => TaskStatus::Loading,
      TaskState::Succeeded(_) => TaskStatus::Succeeded,
      TaskState::Failed(_) => TaskStatus::Failed,
    }
  }
}

/// What happened to one call of [`AsyncTask::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
  /// Local validation failed; nothing was sent
  Rejected,
  /// The call settled and its result is now the task's state
  Applied,
  /// The call settled after a newer invocation was issued and its result was dropped
  Superseded,
}

/// Mutable part of a task, guarded by one lock.
#[derive(Debug)]
struct Inner<I, O> {
  /// Current input
  input:     I,
  /// Current state
  state:     TaskState<O>,
  /// Most recent successful output, kept through later failures
  last_good: Option<O>,
  /// Sequence number of the most recent invocation
  issued:    u64,
}

/// One operation's lifecycle on one page.
///
/// All methods take `&self`; the task can be invoked again while a call is in flight.
pub struct AsyncTask<O: Operation> {
  /// The operation this task runs
  operation: O,
  /// Shared state
  inner:     Mutex<Inner<O::Input, O::Output>>,
}

impl<O: Operation> AsyncTask<O> {
  /// A new idle task with the given initial input.
  pub fn new(operation: O, input: O::Input) -> Self {
    Self {
      operation,
      inner: Mutex::new(Inner { input, state: TaskState::Idle, last_good: None, issued: 0 }),
    }
  }

  /// The operation this task runs.
  pub fn operation(&self) -> &O { &self.operation }

  /// Current input.
  pub fn input(&self) -> O::Input { self.lock().input.clone() }

  /// Replaces the input.
  pub fn set_input(&self, input: O::Input) { self.lock().input = input; }

  /// Edits the input in place.
  pub fn update_input(&self, edit: impl FnOnce(&mut O::Input)) { edit(&mut self.lock().input); }

  /// Replaces the input only if `accept` approves the current one, atomically.
  ///
  /// Returns whether the new input was committed.
  pub fn replace_input_if(&self, accept: impl FnOnce(&O::Input) -> bool, input: O::Input) -> bool {
    let mut inner = self.lock();
    if accept(&inner.input) {
      inner.input = input;
      true
    } else {
      false
    }
  }

  /// Current state.
  pub fn state(&self) -> TaskState<O::Output> { self.lock().state.clone() }

  /// Current status.
  pub fn status(&self) -> TaskStatus { self.lock().state.status() }

  /// Output of the latest call, only while the task is `Succeeded`.
  pub fn output(&self) -> Option<O::Output> {
    match &self.lock().state {
      TaskState::Succeeded(output) => Some(output.clone()),
      _ => None,
    }
  }

  /// Most recent successful output, even if a later call failed or is loading.
  pub fn last_output(&self) -> Option<O::Output> { self.lock().last_good.clone() }

  /// Failure message, only while the task is `Failed`.
  pub fn error_message(&self) -> Option<String> {
    match &self.lock().state {
      TaskState::Failed(message) => Some(message.clone()),
      _ => None,
    }
  }

  /// Dismisses a failure notice, returning the task to `Idle`. Other states are untouched.
  pub fn dismiss_error(&self) {
    let mut inner = self.lock();
    if matches!(inner.state, TaskState::Failed(_)) {
      inner.state = TaskState::Idle;
    }
  }

  /// Runs the operation on the current input.
  ///
  /// Validation failures settle synchronously as `Failed`. Otherwise the task is `Loading` until
  /// the call settles; the result is applied only if this is still the latest invocation.
  pub async fn invoke(&self, gateway: &Gateway) -> Settlement {
    let (sequence, input) = {
      let mut inner = self.lock();
      inner.issued += 1;
      let input = inner.input.clone();

      if let Err(e) = self.operation.validate(&input) {
        debug!("{} rejected locally: {e}", O::NAME);
        inner.state = TaskState::Failed(e.user_message(self.operation.fallback_message()));
        return Settlement::Rejected;
      }

      inner.state = TaskState::Loading;
      (inner.issued, input)
    };
    debug!("{} invocation #{sequence} started", O::NAME);

    let result = self.operation.call(gateway, input).await;

    let mut inner = self.lock();
    if inner.issued != sequence {
      debug!("{} invocation #{sequence} superseded by #{}, dropping result", O::NAME, inner.issued);
      return Settlement::Superseded;
    }

    inner.state = match result {
      Ok(output) => {
        inner.last_good = Some(output.clone());
        TaskState::Succeeded(output)
      },
      Err(e) => {
        warn!("{} invocation #{sequence} failed: {e}", O::NAME);
        TaskState::Failed(e.user_message(self.operation.fallback_message()))
      },
    };
    Settlement::Applied
  }

  /// Inner state; a poisoned lock still holds a consistent state.
  fn lock(&self) -> std::sync::MutexGuard<'_, Inner<O::Input, O::Output>> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::testing::{gateway_with, MockTransport};

  /// Echoes `/echo` and rejects empty input.
  struct Echo;

  impl Operation for Echo {
    type Input = String;
    type Output = Value;

    const NAME: &'static str = "echo";

    fn fallback_message(&self) -> &'static str { "Echo failed" }

    fn validate(&self, input: &String) -> Result<(), PaperdeskError> {
      if input.is_empty() {
        return Err(PaperdeskError::Validation("empty".into()));
      }
      Ok(())
    }

    async fn call(&self, gateway: &Gateway, input: String) -> Result<Value, PaperdeskError> {
      gateway.post("/echo", &json!({ "input": input })).await
    }
  }

  #[traced_test]
  #[tokio::test]
  async fn test_success_lifecycle() {
    let mock = MockTransport::new();
    mock.reply(200, json!({ "ok": 1 }));
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Echo, "hi".to_string());
    assert_eq!(task.status(), TaskStatus::Idle);

    assert_eq!(task.invoke(&gateway).await, Settlement::Applied);
    assert_eq!(task.state(), TaskState::Succeeded(json!({ "ok": 1 })));
    assert_eq!(task.error_message(), None);
    assert!(logs_contain("invocation #1 started"));
  }

  #[tokio::test]
  async fn test_validation_failure_never_sends() {
    let mock = MockTransport::new();
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Echo, String::new());

    assert_eq!(task.invoke(&gateway).await, Settlement::Rejected);
    assert_eq!(task.state(), TaskState::Failed("empty".into()));
    assert_eq!(task.output(), None);
    assert!(mock.requests().is_empty());
  }

  #[tokio::test]
  async fn test_failure_keeps_last_good_output() {
    let mock = MockTransport::new();
    mock.reply(200, json!([1, 2]));
    mock.reply(503, json!({}));
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Echo, "x".to_string());

    task.invoke(&gateway).await;
    task.invoke(&gateway).await;
    assert_eq!(task.error_message().as_deref(), Some("Echo failed"));
    assert_eq!(task.output(), None);
    assert_eq!(task.last_output(), Some(json!([1, 2])));

    task.dismiss_error();
    assert_eq!(task.status(), TaskStatus::Idle);
    assert_eq!(task.last_output(), Some(json!([1, 2])));
  }

  #[tokio::test]
  async fn test_stale_settlement_is_dropped() {
    let mock = MockTransport::new();
    let release_first = mock.reply_gated(200, json!("stale"));
    mock.reply(200, json!("fresh"));
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Echo, "first".to_string());

    let first = task.invoke(&gateway);
    let second = async {
      while mock.requests().is_empty() {
        tokio::task::yield_now().await;
      }
      assert_eq!(task.status(), TaskStatus::Loading);
      task.set_input("second".to_string());
      let settled = task.invoke(&gateway).await;
      release_first.send(()).unwrap();
      settled
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first, Settlement::Superseded);
    assert_eq!(second, Settlement::Applied);
    assert_eq!(task.output(), Some(json!("fresh")));
    assert_eq!(mock.requests().len(), 2);
  }

  #[tokio::test]
  async fn test_validation_supersedes_in_flight_call() {
    let mock = MockTransport::new();
    let release = mock.reply_gated(200, json!("late"));
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Echo, "x".to_string());

    let first = task.invoke(&gateway);
    let second = async {
      while mock.requests().is_empty() {
        tokio::task::yield_now().await;
      }
      task.set_input(String::new());
      let settled = task.invoke(&gateway).await;
      release.send(()).unwrap();
      settled
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(second, Settlement::Rejected);
    assert_eq!(first, Settlement::Superseded);
    assert_eq!(task.error_message().as_deref(), Some("empty"));
  }

  #[test]
  fn test_replace_input_if() {
    let task = AsyncTask::new(Echo, String::new());
    assert!(task.replace_input_if(|current| current.is_empty(), "a".into()));
    assert!(!task.replace_input_if(|current| current.is_empty(), "b".into()));
    assert_eq!(task.input(), "a");
  }
}
