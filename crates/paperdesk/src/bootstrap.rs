//! Seeds the analysis page from an `arxiv_id` deep link.
//!
//! The candidate is committed into the task's input with a compare-and-set that only succeeds
//! while the input is still blank. A successful commit is the signal that the value is in place,
//! so the automatic analysis runs right after it, once, and only for well-formed identifiers.

use super::*;
use crate::{
  guard::Route,
  ops::{is_arxiv_id, Analyze},
  task::{AsyncTask, Settlement},
};

/// What a bootstrap run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
  /// No deep link, or the input was already populated
  Ignored,
  /// The input was populated but the candidate is not a valid identifier
  Populated,
  /// The input was populated and analysis was triggered
  Triggered(Settlement),
}

/// The deep-link candidate of one analysis page render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bootstrapper {
  /// Candidate identifier from the URL
  arxiv_id: Option<String>,
}

impl Bootstrapper {
  /// Takes the candidate from a parsed route; routes other than `/assist` carry none.
  pub fn from_route(route: &Route) -> Self {
    match route {
      Route::Assist { arxiv_id } => Self { arxiv_id: arxiv_id.clone() },
      _ => Self::default(),
    }
  }

  /// Takes the candidate from a client path such as `/assist?arxiv_id=2305.03048`.
  pub fn from_path(path: &str) -> Result<Self, PaperdeskError> {
    Ok(Self::from_route(&Route::parse(path)?))
  }

  /// The candidate, if any.
  pub fn candidate(&self) -> Option<&str> { self.arxiv_id.as_deref() }

  /// Applies the deep link to `task`. Safe to call on every render.
  pub async fn run(&self, task: &AsyncTask<Analyze>, gateway: &Gateway) -> BootstrapOutcome {
    let Some(candidate) = self.arxiv_id.as_deref() else {
      return BootstrapOutcome::Ignored;
    };

    if !task.replace_input_if(|current| current.trim().is_empty(), candidate.to_string()) {
      trace!("analysis input already populated, ignoring deep link");
      return BootstrapOutcome::Ignored;
    }

    if !is_arxiv_id(candidate) {
      debug!("deep link {candidate:?} is not an arXiv identifier, not analysing");
      return BootstrapOutcome::Populated;
    }

    debug!("deep link {candidate} committed, analysing");
    BootstrapOutcome::Triggered(task.invoke(gateway).await)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{
    task::TaskStatus,
    testing::{gateway_with, MockTransport},
  };

  fn analysis() -> Value {
    json!({ "pdf_url": "u", "analysis": { "abstract_summary": "x" }, "download_info": {} })
  }

  #[tokio::test]
  async fn test_valid_deep_link_triggers_once() -> anyhow::Result<()> {
    let mock = MockTransport::new();
    mock.reply(200, analysis());
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Analyze, String::new());

    let bootstrapper = Bootstrapper::from_path("/assist?arxiv_id=2305.03048")?;
    let first = bootstrapper.run(&task, &gateway).await;
    assert_eq!(first, BootstrapOutcome::Triggered(Settlement::Applied));
    assert_eq!(bootstrapper.run(&task, &gateway).await, BootstrapOutcome::Ignored);
    assert_eq!(bootstrapper.run(&task, &gateway).await, BootstrapOutcome::Ignored);

    assert_eq!(mock.requests().len(), 1);
    assert_eq!(mock.requests()[0].body, Some(json!({ "arxiv_id": "2305.03048" })));
    assert_eq!(task.input(), "2305.03048");
    assert_eq!(task.status(), TaskStatus::Succeeded);
    Ok(())
  }

  #[tokio::test]
  async fn test_invalid_deep_link_only_populates() -> anyhow::Result<()> {
    let mock = MockTransport::new();
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Analyze, String::new());

    let bootstrapper = Bootstrapper::from_path("/assist?arxiv_id=not-an-id")?;
    assert_eq!(bootstrapper.run(&task, &gateway).await, BootstrapOutcome::Populated);
    assert_eq!(task.input(), "not-an-id");
    assert_eq!(task.status(), TaskStatus::Idle);
    assert!(mock.requests().is_empty());
    Ok(())
  }

  #[tokio::test]
  async fn test_existing_input_wins() {
    let mock = MockTransport::new();
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Analyze, "2401.00001".to_string());

    let bootstrapper = Bootstrapper::from_route(&Route::assist("2305.03048"));
    assert_eq!(bootstrapper.run(&task, &gateway).await, BootstrapOutcome::Ignored);
    assert_eq!(task.input(), "2401.00001");
    assert!(mock.requests().is_empty());
  }

  #[tokio::test]
  async fn test_no_candidate() -> anyhow::Result<()> {
    let mock = MockTransport::new();
    let gateway = gateway_with(&mock, SessionStore::in_memory());
    let task = AsyncTask::new(Analyze, String::new());

    let outcome = Bootstrapper::from_path("/assist")?.run(&task, &gateway).await;
    assert_eq!(outcome, BootstrapOutcome::Ignored);
    assert_eq!(Bootstrapper::from_route(&Route::History).candidate(), None);
    assert!(task.input().is_empty());
    Ok(())
  }
}
