//! Text helpers for turning paper titles into filenames and terminal-width cells, and the PDF
//! download that uses them.
//!
//! ```
//! use paperdesk::format;
//!
//! assert_eq!(
//!   format::pdf_filename("Attention Is All You Need", "1706.03762", None),
//!   "attention_is_all_you_need.pdf"
//! );
//! assert_eq!(format::pdf_filename("  ", "2305.03048", None), "2305.03048.pdf");
//! assert_eq!(format::shorten("Attention Is All You Need", 12), "Attention...");
//! ```

use super::*;
use crate::models::AnalyzeResponse;

/// Longest filename stem produced when no limit is given.
pub const DEFAULT_STEM_LENGTH: usize = 50;

/// Lowercases `title`, drops characters unsafe in filenames and joins words with underscores,
/// cutting at a word boundary so the result fits `max_length` bytes.
pub fn format_title(title: &str, max_length: Option<usize>) -> String {
  let max_length = max_length.unwrap_or(DEFAULT_STEM_LENGTH);
  let mut result = String::new();

  let words = title.split_whitespace().map(|word| {
    word
      .chars()
      .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '.'))
      .flat_map(char::to_lowercase)
      .collect::<String>()
  });
  for word in words.filter(|word| !word.is_empty()) {
    let separator = usize::from(!result.is_empty());
    if result.len() + separator + word.len() > max_length {
      break;
    }
    if separator == 1 {
      result.push('_');
    }
    result.push_str(&word);
  }
  result
}

/// Filename for a downloaded PDF: the formatted title, or `fallback` when the title leaves
/// nothing usable.
pub fn pdf_filename(title: &str, fallback: &str, max_length: Option<usize>) -> String {
  let stem = format_title(title, max_length);
  let stem = if stem.is_empty() { format_title(fallback, max_length) } else { stem };
  let stem = if stem.is_empty() { "paper".to_string() } else { stem };
  format!("{stem}.pdf")
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn shorten(text: &str, max_chars: usize) -> String {
  if text.chars().count() <= max_chars {
    return text.to_string();
  }
  let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
  format!("{}...", kept.trim_end())
}

/// Downloads the PDF of an analysis into `dir` and returns the written path.
///
/// The PDF host is third party, so the request never carries the session credential.
pub async fn download_pdf(
  response: &AnalyzeResponse,
  arxiv_id: &str,
  dir: &Path,
) -> Result<PathBuf, PaperdeskError> {
  if response.pdf_url.trim().is_empty() {
    return Err(PaperdeskError::Validation("No PDF URL available".into()));
  }
  let url = Url::parse(response.pdf_url.trim())?;

  let pdf = reqwest::get(url).await?.error_for_status()?;
  trace!("pdf response: {pdf:?}");
  let bytes = pdf.bytes().await?;

  let filename = pdf_filename(response.title().unwrap_or_default(), arxiv_id, None);
  let path = dir.join(filename);
  debug!("Writing PDF to path: {path:?}");
  std::fs::create_dir_all(dir)?;
  std::fs::write(&path, bytes)?;
  Ok(path)
}
