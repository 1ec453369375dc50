pub mod api;
pub mod config;
pub mod error;
pub mod materialize;
pub mod measure_diff;
pub mod model;
pub mod musicxml;
pub mod preview;
pub mod prompt;
pub mod score_diff;
pub mod session;
pub mod similarity;

pub use api::*;
pub use config::Config;
pub use error::*;
pub use materialize::{replace_at, replace_measure, MeasureSlot};
pub use measure_diff::{highlight, measures_differ};
pub use model::*;
pub use musicxml::{measure_to_score, parse_musicxml, to_musicxml};
pub use preview::{Preview, PreviewSet, TextPreview, ViewerPreview};
pub use prompt::{run_prompt, PromptOutcome};
pub use score_diff::*;
pub use session::*;
pub use similarity::{score_difference, score_events, Pitched, Severity};

/// Compare two MusicXML documents.
///
/// Returns the number of differing measures, or a structural mismatch.
pub fn count_differences(first_xml: &str, second_xml: &str) -> Result<usize, MergeError> {
    let first = parse_musicxml(first_xml)?;
    let second = parse_musicxml(second_xml)?;
    Ok(compare(&first, &second)?.len())
}
