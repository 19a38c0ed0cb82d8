//! A session-aware client for the paperdesk paper discovery service.
//!
//! The remote service collects arXiv papers, stores their metadata, produces AI summaries and
//! ranks recommendations. This crate is the client-side orchestration around it:
//! - [`session`] holds the bearer credential and persists it between runs
//! - [`gateway`] sends every request, attaching the credential when one is held
//! - [`task`] drives one remote operation through idle, loading, succeeded and failed
//! - [`query`] accumulates the fields and filters of a structured paper query
//! - [`guard`] decides whether a client route may render for the current session
//! - [`bootstrap`] seeds the analysis page from an `arxiv_id` deep link
//!
//! # Example
//! ```rust,no_run
//! use paperdesk::{
//!   config::Config,
//!   gateway::Gateway,
//!   ops::{Analyze, Credentials, Login},
//!   session::SessionStore,
//!   task::AsyncTask,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let config = Config::from_env()?;
//!   let session = SessionStore::open(&config.session_path)?;
//!   let gateway = Gateway::new(&config, session)?;
//!
//!   let login = AsyncTask::new(Login, Credentials::new("root", "123456"));
//!   login.invoke(&gateway).await;
//!
//!   let analyze = AsyncTask::new(Analyze, "2305.03048".to_string());
//!   analyze.invoke(&gateway).await;
//!   if let Some(result) = analyze.output() {
//!     println!("{}", result.analysis.value("abstract_summary"));
//!   }
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::{Arc, Mutex, RwLock},
  time::Duration,
};

use chrono::NaiveDateTime;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};
#[cfg(test)] use tracing_test::traced_test;
use url::Url;

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod format;
pub mod gateway;
pub mod guard;
pub mod models;
pub mod ops;
pub mod query;
pub mod session;
pub mod task;
#[cfg(test)] mod testing;

use config::Config;
use errors::PaperdeskError;
use gateway::Gateway;
use session::SessionStore;
