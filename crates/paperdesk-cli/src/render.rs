//! Terminal rendering of the records each page shows.

use console::style;
use paperdesk::{
  format::shorten,
  guard::Route,
  models::{
    self, AnalyzeResponse, HistoryEntry, PaperSummary, QueryRow, ACCESS_TIME_FORMAT, ANALYSIS_KEYS,
  },
};

/// Titles are cut to this many characters in listings.
const TITLE_WIDTH: usize = 80;

/// Prints collected or recommended papers.
pub fn papers(papers: &[PaperSummary]) {
  for (i, paper) in papers.iter().enumerate() {
    let title = shorten(&paper.title, TITLE_WIDTH);
    println!("\n{}. {}", style(i + 1).yellow(), style(title).white().bold());
    println!(
      "   {} {}   {} {}   {} {}",
      style("Likes:").green(),
      style(paper.like_count).white(),
      style("Comments:").green(),
      style(paper.comment_count).white(),
      style("GitHub:").green(),
      style(or_na(&paper.github_count)).white()
    );
    if let Some(score) = paper.suggest_score {
      println!("   {} {}", style("Score:").green(), style(format!("{score:.1}/10")).yellow());
    }
    if !paper.publish_time.is_empty() {
      println!("   {} {}", style("Published:").green(), style(&paper.publish_time).white());
    }
    if !paper.arxiv_id.is_empty() {
      let link = Route::assist_link(&paper.arxiv_id);
      println!("   {} {}", style("Analyse:").green(), style(link).blue());
    }
  }
}

/// Prints query rows, one block per row with the requested fields in order.
pub fn rows(fields: &[String], rows: &[QueryRow]) {
  for (i, row) in rows.iter().enumerate() {
    println!("\n{}.", style(i + 1).yellow());
    for field in fields {
      let value = models::cell(row, field);
      println!("   {} {}", style(format!("{field}:")).green(), style(value).white());
    }
  }
}

/// Prints an analysis, known sections first, then anything else the service added.
pub fn analysis(response: &AnalyzeResponse) {
  if let Some(title) = response.title() {
    println!("   {} {}", style("Title:").green().bold(), style(title).white());
  }
  for key in ANALYSIS_KEYS {
    section(response, key);
  }
  for key in response.analysis.extra_keys() {
    section(response, key);
  }
  if !response.pdf_url.is_empty() {
    let url = style(&response.pdf_url).blue().underlined();
    println!("   {} {}", style("PDF URL:").green().bold(), url);
  }
}

/// Prints history entries in the given order.
pub fn history(entries: &[&HistoryEntry]) {
  for entry in entries {
    println!(
      "\n{} {}",
      style(entry.access_time.format(ACCESS_TIME_FORMAT)).dim(),
      style(shorten(&entry.title, TITLE_WIDTH)).white().bold()
    );
    println!(
      "   {} {}   {} {}   {} {}",
      style("arXiv:").green(),
      style(&entry.arxiv_id).yellow(),
      style("Likes:").green(),
      style(entry.like_count).white(),
      style("GitHub:").green(),
      style(or_na(&entry.github_count)).white()
    );
    let link = Route::assist_link(&entry.arxiv_id);
    println!("   {} {}", style("Analyse:").green(), style(link).blue());
  }
}

fn section(response: &AnalyzeResponse, key: &str) {
  let value = response.analysis.value(key);
  println!("   {} {}", style(label(key)).green().bold(), style(value).white());
}

/// `abstract_summary` becomes `Abstract summary:`.
fn label(key: &str) -> String {
  let text = key.replace('_', " ");
  let mut chars = text.chars();
  match chars.next() {
    Some(first) => format!("{}{}:", first.to_uppercase(), chars.as_str()),
    None => String::new(),
  }
}

/// `N/A` for blank listing fields.
fn or_na(text: &str) -> &str {
  if text.trim().is_empty() {
    "N/A"
  } else {
    text
  }
}
