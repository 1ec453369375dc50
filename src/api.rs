//! # Public API
//!
//! File-level entry points used by the `musicmerge` binary.
//!
//! ## Functions
//!
//! - [`load_score()`] / [`save_score()`] - Read and write MusicXML files
//! - [`diff_files()`] - Compare two MusicXML files and render the result
//! - [`render_report()`] - Render a [`DifferenceReport`] as text or JSON
//! - [`load_decision_log()`] / [`save_decision_log()`] - Persist merge decisions so a
//!   merge can be resumed
//!
//! ## Typical Usage
//!
//! ```rust,no_run
//! use musicmerge::{compare, load_score, save_score, MergeSession};
//!
//! let first = load_score("take1.musicxml")?;
//! let second = load_score("take2.musicxml")?;
//!
//! let report = compare(&first, &second)?;
//! let mut session = MergeSession::new(&first, report);
//! while !session.is_finished() {
//!     session.keep_second()?;
//! }
//! save_score(session.merged(), "merged.musicxml")?;
//! # Ok::<(), musicmerge::MergeError>(())
//! ```

use crate::{compare, parse_musicxml, to_musicxml, DecisionLog, DifferenceReport, MergeError, Score};
use serde::Serialize;
use std::path::Path;

/// Output format for [`render_report()`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Load a MusicXML (`score-partwise`) file.
///
/// # Errors
/// [`MergeError::Io`] if the file cannot be read, [`MergeError::MusicXml`] if it is
/// not a readable score.
pub fn load_score(path: impl AsRef<Path>) -> Result<Score, MergeError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
    let score = parse_musicxml(&xml)?;
    tracing::info!(
        path = %path.display(),
        parts = score.parts.len(),
        "score loaded"
    );
    Ok(score)
}

/// Write a score as MusicXML.
pub fn save_score(score: &Score, path: impl AsRef<Path>) -> Result<(), MergeError> {
    let path = path.as_ref();
    std::fs::write(path, to_musicxml(score)).map_err(|e| MergeError::io(path, e))?;
    tracing::info!(path = %path.display(), "score saved");
    Ok(())
}

/// Compare two MusicXML files and render the differences.
///
/// # Example
/// ```rust,no_run
/// use musicmerge::{diff_files, ReportFormat};
///
/// let text = diff_files("take1.musicxml", "take2.musicxml", ReportFormat::Text)?;
/// print!("{}", text);
/// # Ok::<(), musicmerge::MergeError>(())
/// ```
///
/// # Errors
/// Load errors, or [`MergeError::StructuralMismatch`] if the scores cannot be aligned.
pub fn diff_files(
    first: impl AsRef<Path>,
    second: impl AsRef<Path>,
    format: ReportFormat,
) -> Result<String, MergeError> {
    let first = load_score(first)?;
    let second = load_score(second)?;
    let report = compare(&first, &second)?;
    render_report(&report, format)
}

#[derive(Serialize)]
struct JsonReport<'r, 'a> {
    total: usize,
    #[serde(flatten)]
    report: &'r DifferenceReport<'a>,
}

/// Render a report for display.
///
/// The text form lists each differing measure with both versions on one line each:
///
/// ```text
/// Part Flute (P1): 1 differing measure
///   score 1: m.3 | D4 2 | r 2 |
///   score 2: m.3 | E4 2 | r 2 |
///
/// 1 differing measure in total
/// ```
pub fn render_report(report: &DifferenceReport<'_>, format: ReportFormat) -> Result<String, MergeError> {
    match format {
        ReportFormat::Json => {
            let json = JsonReport {
                total: report.len(),
                report,
            };
            Ok(serde_json::to_string_pretty(&json)?)
        }
        ReportFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &DifferenceReport<'_>) -> String {
    if report.is_empty() {
        return "No differences found. Scores are identical.\n".to_string();
    }

    let mut out = String::new();
    for part in &report.parts {
        out.push_str(&format!(
            "Part {} ({}): {}\n",
            part.part_name,
            part.part_id,
            plural(part.differences.len())
        ));
        for diff in &part.differences {
            out.push_str(&format!("  score 1: {}\n", diff.first));
            out.push_str(&format!("  score 2: {}\n", diff.second));
        }
        out.push('\n');
    }
    out.push_str(&format!("{} in total\n", plural(report.len())));
    out
}

fn plural(n: usize) -> String {
    if n == 1 {
        "1 differing measure".to_string()
    } else {
        format!("{} differing measures", n)
    }
}

/// Read a decision log written by [`save_decision_log()`].
pub fn load_decision_log(path: impl AsRef<Path>) -> Result<DecisionLog, MergeError> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
    DecisionLog::from_yaml(&yaml)
}

/// Write a decision log as YAML.
pub fn save_decision_log(log: &DecisionLog, path: impl AsRef<Path>) -> Result<(), MergeError> {
    let path = path.as_ref();
    std::fs::write(path, log.to_yaml()?).map_err(|e| MergeError::io(path, e))?;
    tracing::info!(path = %path.display(), decisions = log.decisions.len(), "decision log saved");
    Ok(())
}
