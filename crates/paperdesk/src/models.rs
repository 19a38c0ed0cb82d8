//! Records owned by the remote service, as the client reads them.
//!
//! The service is loose about numeric types (a like count may arrive as `12` or `"12"`, GitHub
//! star counts are free text) so the decoders here are lenient: anything missing becomes its
//! default rather than failing the whole response.

use super::*;

/// Timestamp format used by the history endpoint.
pub const ACCESS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keys the analysis endpoint fills, in the order pages present them.
pub const ANALYSIS_KEYS: [&str; 10] = [
  "abstract_summary",
  "research_problem",
  "core_contribution",
  "method_name",
  "method_innovation",
  "datasets",
  "experimental_results",
  "ablation_study",
  "limitations",
  "conclusion_and_future_work",
];

/// A paper row as returned by collection and recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperSummary {
  /// arXiv identifier, e.g. `2305.03048`
  #[serde(rename = "id", alias = "arxiv_id", deserialize_with = "lenient_string")]
  pub arxiv_id:      String,
  /// Paper title
  pub title:         String,
  /// Upvotes on the listing
  #[serde(rename = "like_num", deserialize_with = "lenient_count")]
  pub like_count:    u64,
  /// Author count as displayed by the listing
  #[serde(rename = "author_num", deserialize_with = "lenient_string")]
  pub author_count:  String,
  /// GitHub stars as displayed by the listing
  #[serde(rename = "github_num", deserialize_with = "lenient_string")]
  pub github_count:  String,
  /// Number of comments
  #[serde(rename = "comment_num", deserialize_with = "lenient_count")]
  pub comment_count: u64,
  /// Listing URL
  #[serde(deserialize_with = "lenient_string")]
  pub link:          String,
  /// Cover image URL
  #[serde(rename = "img_link", deserialize_with = "lenient_string")]
  pub image_link:    String,
  /// Publication time as shown on the listing
  #[serde(deserialize_with = "lenient_string")]
  pub publish_time:  String,
  /// Recommendation score (0-10), only present on recommendations
  #[serde(skip_serializing_if = "Option::is_none")]
  pub suggest_score: Option<f64>,
}

/// Response of the collection endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectResponse {
  /// `"Success"` or a reason the scrape failed
  pub info:   String,
  /// Papers collected
  pub result: Vec<PaperSummary>,
}

/// One row of a structured query, keyed by the requested field names.
pub type QueryRow = serde_json::Map<String, Value>;

/// Renders a single query cell, `N/A` when the field is absent or null.
pub fn cell(row: &QueryRow, field: &str) -> String { render_value(row.get(field)) }

/// AI-generated structured summary of a paper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(pub serde_json::Map<String, Value>);

impl AnalysisResult {
  /// Text for `key`: strings as-is, lists joined by `; `, nested objects as pretty JSON and
  /// `N/A` for anything missing.
  pub fn value(&self, key: &str) -> String { render_value(self.0.get(key)) }

  /// Whether the service returned no fields at all.
  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// Keys present in the result that are not among [`ANALYSIS_KEYS`].
  pub fn extra_keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str).filter(|key| !ANALYSIS_KEYS.iter().any(|known| known == key))
  }
}

/// Response of the analysis endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeResponse {
  /// Where the PDF can be fetched
  pub pdf_url:       String,
  /// Structured summary
  pub analysis:      AnalysisResult,
  /// Download details (title, authors, publication date) reported by the service
  pub download_info: serde_json::Map<String, Value>,
}

impl AnalyzeResponse {
  /// Paper title from the download details, if the service included one.
  pub fn title(&self) -> Option<&str> {
    self.download_info.get("title").and_then(Value::as_str).filter(|t| !t.trim().is_empty())
  }
}

/// A paper the user analyzed earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  /// Server-side record id
  pub id:           i64,
  /// arXiv identifier
  pub arxiv_id:     String,
  /// Paper title
  #[serde(default, deserialize_with = "lenient_string")]
  pub title:        String,
  /// Upvotes at the time of reading
  #[serde(rename = "like_num", default, deserialize_with = "lenient_count")]
  pub like_count:   u64,
  /// GitHub stars as displayed by the listing
  #[serde(rename = "github_num", default, deserialize_with = "lenient_string")]
  pub github_count: String,
  /// Cover image URL
  #[serde(rename = "img_link", default, deserialize_with = "lenient_string")]
  pub image_link:   String,
  /// When the paper was analyzed
  #[serde(with = "access_time")]
  pub access_time:  NaiveDateTime,
}

/// Column a [`HistoryView`] is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrderBy {
  /// Most recent reads first when descending
  AccessTime,
  /// Most liked first when descending
  LikeCount,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
  /// Smallest first
  Ascending,
  /// Largest first
  Descending,
}

/// A re-orderable view over history records that never mutates them.
#[derive(Debug, Clone)]
pub struct HistoryView<'a> {
  /// Source records, in server order
  entries:  &'a [HistoryEntry],
  /// Active column
  order_by: HistoryOrderBy,
  /// Active direction
  order:    SortOrder,
}

impl<'a> HistoryView<'a> {
  /// Most recent first, as the page opens.
  pub fn new(entries: &'a [HistoryEntry]) -> Self {
    Self { entries, order_by: HistoryOrderBy::AccessTime, order: SortOrder::Descending }
  }

  /// An explicit ordering.
  pub fn ordered(entries: &'a [HistoryEntry], order_by: HistoryOrderBy, order: SortOrder) -> Self {
    Self { entries, order_by, order }
  }

  /// Clicking a column header: the active ascending column flips to descending, anything else
  /// sorts ascending by the chosen column.
  pub fn toggle(&mut self, column: HistoryOrderBy) {
    self.order = if self.order_by == column && self.order == SortOrder::Ascending {
      SortOrder::Descending
    } else {
      SortOrder::Ascending
    };
    self.order_by = column;
  }

  /// Active column and direction.
  pub fn ordering(&self) -> (HistoryOrderBy, SortOrder) { (self.order_by, self.order) }

  /// The records in view order.
  pub fn sorted(&self) -> Vec<&'a HistoryEntry> {
    let mut rows: Vec<&HistoryEntry> = self.entries.iter().collect();
    rows.sort_by(|a, b| {
      let ordering = match self.order_by {
        HistoryOrderBy::AccessTime => a.access_time.cmp(&b.access_time),
        HistoryOrderBy::LikeCount => a.like_count.cmp(&b.like_count),
      };
      match self.order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
      }
    });
    rows
  }
}

/// Shared rendering of optional JSON values.
fn render_value(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => "N/A".to_string(),
    Some(Value::String(s)) => s.clone(),
    Some(Value::Array(items)) => items.iter().map(scalar_text).collect::<Vec<_>>().join("; "),
    Some(value @ Value::Object(_)) =>
      serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    Some(other) => other.to_string(),
  }
}

/// Text of a list item: strings without quotes, everything else as JSON.
fn scalar_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Accepts a number, a numeric string or null; anything unparsable counts as zero.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
  Ok(match Value::deserialize(deserializer)? {
    Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)).unwrap_or(0),
    Value::String(s) => s.trim().parse().unwrap_or(0),
    _ => 0,
  })
}

/// Accepts a string, a number or null.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(match Value::deserialize(deserializer)? {
    Value::String(s) => s,
    Value::Null => String::new(),
    other => other.to_string(),
  })
}

/// `access_time` as `YYYY-MM-DD HH:MM:SS`.
mod access_time {
  use super::*;

  /// Serializes in [`ACCESS_TIME_FORMAT`].
  pub fn serialize<S: serde::Serializer>(
    time: &NaiveDateTime,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format(ACCESS_TIME_FORMAT).to_string())
  }

  /// Parses [`ACCESS_TIME_FORMAT`].
  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<NaiveDateTime, D::Error> {
    let text = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&text, ACCESS_TIME_FORMAT).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn history() -> Vec<HistoryEntry> {
    serde_json::from_value(json!([
      { "id": 1, "arxiv_id": "2501.00001", "title": "Old", "like_num": 50,
        "github_num": "1.2k", "img_link": "", "access_time": "2025-01-01 10:00:00" },
      { "id": 2, "arxiv_id": "2501.00002", "title": "New", "like_num": 5,
        "github_num": null, "img_link": "", "access_time": "2025-03-01 09:30:00" },
      { "id": 3, "arxiv_id": "2501.00003", "title": "Mid", "like_num": 20,
        "github_num": "", "img_link": "", "access_time": "2025-02-01 00:00:00" },
    ]))
    .unwrap()
  }

  fn titles(rows: Vec<&HistoryEntry>) -> Vec<&str> {
    rows.into_iter().map(|e| e.title.as_str()).collect()
  }

  #[test]
  fn test_paper_summary_lenient_decoding() {
    let paper: PaperSummary = serde_json::from_value(json!({
      "id": "2305.03048", "title": "T", "like_num": "12", "author_num": 4,
      "github_num": "", "comment_num": null, "link": "https://huggingface.co/papers/2305.03048",
      "img_link": "https://img", "publish_time": "Published on May 4, 2023"
    }))
    .unwrap();
    assert_eq!(paper.arxiv_id, "2305.03048");
    assert_eq!(paper.like_count, 12);
    assert_eq!(paper.author_count, "4");
    assert_eq!(paper.comment_count, 0);
    assert_eq!(paper.suggest_score, None);

    let recommended: PaperSummary = serde_json::from_value(json!({
      "arxiv_id": "2501.13106", "title": "sample", "suggest_score": 8, "like_num": 3
    }))
    .unwrap();
    assert_eq!(recommended.arxiv_id, "2501.13106");
    assert_eq!(recommended.suggest_score, Some(8.0));
  }

  #[test]
  fn test_analysis_value_rendering() {
    let analysis: AnalysisResult = serde_json::from_value(json!({
      "abstract_summary": "x",
      "core_contribution": ["a", "b"],
      "datasets": { "train": "COCO" },
      "limitations": null
    }))
    .unwrap();
    assert_eq!(analysis.value("abstract_summary"), "x");
    assert_eq!(analysis.value("core_contribution"), "a; b");
    assert!(analysis.value("datasets").contains("\"train\": \"COCO\""));
    assert_eq!(analysis.value("limitations"), "N/A");
    assert_eq!(analysis.value("method_name"), "N/A");
    assert_eq!(analysis.extra_keys().count(), 0);
  }

  #[test]
  fn test_history_view_orderings() {
    let entries = history();
    let view = HistoryView::new(&entries);
    assert_eq!(titles(view.sorted()), ["New", "Mid", "Old"]);

    let view = HistoryView::ordered(&entries, HistoryOrderBy::LikeCount, SortOrder::Ascending);
    assert_eq!(titles(view.sorted()), ["New", "Mid", "Old"]);

    let view = HistoryView::ordered(&entries, HistoryOrderBy::LikeCount, SortOrder::Descending);
    assert_eq!(titles(view.sorted()), ["Old", "Mid", "New"]);

    // The source records keep server order.
    assert_eq!(entries[0].title, "Old");
  }

  #[test]
  fn test_history_toggle() {
    let entries = history();
    let mut view = HistoryView::new(&entries);

    view.toggle(HistoryOrderBy::LikeCount);
    assert_eq!(view.ordering(), (HistoryOrderBy::LikeCount, SortOrder::Ascending));
    view.toggle(HistoryOrderBy::LikeCount);
    assert_eq!(view.ordering(), (HistoryOrderBy::LikeCount, SortOrder::Descending));
    view.toggle(HistoryOrderBy::LikeCount);
    assert_eq!(view.ordering(), (HistoryOrderBy::LikeCount, SortOrder::Ascending));
    view.toggle(HistoryOrderBy::AccessTime);
    assert_eq!(view.ordering(), (HistoryOrderBy::AccessTime, SortOrder::Ascending));
    assert_eq!(titles(view.sorted()), ["Old", "Mid", "New"]);
  }

  #[test]
  fn test_history_entry_roundtrips_access_time() {
    let entries = history();
    let value = serde_json::to_value(&entries[0]).unwrap();
    assert_eq!(value["access_time"], "2025-01-01 10:00:00");
  }
}
