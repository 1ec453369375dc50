//! MusicXML import and export
//!
//! Scores are read from and written to `score-partwise` documents. The reader keeps
//! what comparison and merging need (parts, measure attributes, notes, chords, rests,
//! articulations, stems and repeat barlines) and drops the rest.

mod reader;
mod writer;

pub use reader::parse_musicxml;
pub use writer::{to_musicxml, DIVISIONS};

use crate::model::{Measure, Metadata, Part, Score};

/// Wrap a single measure in a one-part score, so it can be shown on its own
///
/// The measure is written as the first bar of its part, so it always carries a
/// `divisions` element. Its own number is kept.
pub fn measure_to_score(part_id: &str, part_name: &str, measure: &Measure) -> Score {
    let mut part = Part::new(part_id, part_name);
    part.measures.push(measure.clone());
    Score {
        metadata: Metadata {
            title: Some(format!("{} m.{}", part_name, measure.number)),
            composer: None,
        },
        parts: vec![part],
    }
}
