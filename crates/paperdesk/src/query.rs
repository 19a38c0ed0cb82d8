//! Incremental construction of structured paper queries.
//!
//! A [`QueryBuilder`] accumulates the output fields, row limit and filter predicates a user picks,
//! and [`QueryBuilder::build`] snapshots them into the [`QuerySpec`] sent to `/api/query`. The
//! builder never rejects anything; the query operation refuses to dispatch an empty field set.
//!
//! ```
//! use paperdesk::query::{FilterValue, QueryBuilder};
//!
//! let mut builder = QueryBuilder::new();
//! builder.add_field("title");
//! builder.add_field("title");
//! builder.set_limit(10);
//! builder.set_filter("year", FilterValue::Integer(2025));
//!
//! let spec = builder.build();
//! assert_eq!(spec.fields, vec!["title".to_string()]);
//! assert_eq!(
//!   serde_json::to_string(&spec).unwrap(),
//!   r#"{"fields":["title"],"limit":10,"where":{"year":2025}}"#
//! );
//! ```

use super::*;

/// Columns of the paper table the service can return and filter on.
pub const PAPER_FIELDS: [&str; 13] = [
  "id",
  "title",
  "authors",
  "abstract",
  "publish_time",
  "pdf_link",
  "year",
  "month",
  "like_num",
  "author_num",
  "github_num",
  "comment_num",
  "img_link",
];

/// Row limit a fresh builder starts with; the service never returns more.
pub const DEFAULT_LIMIT: u32 = 100;

/// A scalar filter predicate value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
  /// Whole number, e.g. a year
  Integer(i64),
  /// Floating point number
  Float(f64),
  /// Boolean flag
  Bool(bool),
  /// Free text
  Text(String),
}

impl FilterValue {
  /// Interprets user input as the narrowest scalar it can be.
  pub fn parse(input: &str) -> Self {
    let input = input.trim();
    if let Ok(i) = input.parse::<i64>() {
      FilterValue::Integer(i)
    } else if let Ok(f) = input.parse::<f64>() {
      FilterValue::Float(f)
    } else if let Ok(b) = input.parse::<bool>() {
      FilterValue::Bool(b)
    } else {
      FilterValue::Text(input.to_string())
    }
  }
}

impl std::fmt::Display for FilterValue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FilterValue::Integer(i) => write!(f, "{i}"),
      FilterValue::Float(x) => write!(f, "{x}"),
      FilterValue::Bool(b) => write!(f, "{b}"),
      FilterValue::Text(s) => write!(f, "{s}"),
    }
  }
}

/// The structured query dispatched to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
  /// Output fields, distinct and in selection order
  pub fields:  Vec<String>,
  /// Maximum number of rows
  pub limit:   u32,
  /// Equality predicates, keyed by field
  #[serde(rename = "where")]
  pub filters: BTreeMap<String, FilterValue>,
}

/// Accumulates a user's query selections.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
  /// Selected output fields
  fields:  Vec<String>,
  /// Row limit
  limit:   u32,
  /// Filter predicates
  filters: BTreeMap<String, FilterValue>,
}

impl Default for QueryBuilder {
  fn default() -> Self { Self::new() }
}

impl QueryBuilder {
  /// No fields, no filters, [`DEFAULT_LIMIT`] rows.
  pub fn new() -> Self {
    Self { fields: Vec::new(), limit: DEFAULT_LIMIT, filters: BTreeMap::new() }
  }

  /// Appends `name` unless it is already selected.
  pub fn add_field(&mut self, name: impl Into<String>) -> &mut Self {
    let name = name.into();
    if !self.fields.contains(&name) {
      self.fields.push(name);
    }
    self
  }

  /// Removes `name` if it is selected.
  pub fn remove_field(&mut self, name: &str) -> &mut Self {
    self.fields.retain(|field| field != name);
    self
  }

  /// Inserts or replaces the predicate on `key`.
  pub fn set_filter(&mut self, key: impl Into<String>, value: FilterValue) -> &mut Self {
    self.filters.insert(key.into(), value);
    self
  }

  /// Drops the predicate on `key` if there is one.
  pub fn remove_filter(&mut self, key: &str) -> &mut Self {
    self.filters.remove(key);
    self
  }

  /// Sets the row limit as entered; positivity is checked at dispatch.
  pub fn set_limit(&mut self, limit: u32) -> &mut Self {
    self.limit = limit;
    self
  }

  /// Currently selected fields.
  pub fn fields(&self) -> &[String] { &self.fields }

  /// Current row limit.
  pub fn limit(&self) -> u32 { self.limit }

  /// Current predicates.
  pub fn filters(&self) -> &BTreeMap<String, FilterValue> { &self.filters }

  /// Snapshot of the current selection.
  pub fn build(&self) -> QuerySpec {
    QuerySpec { fields: self.fields.clone(), limit: self.limit, filters: self.filters.clone() }
  }
}
