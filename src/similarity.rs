//! # Similarity Scorer
//!
//! Measures how far apart two pitched events are, as a weighted sum of four feature
//! differences:
//!
//! | Feature      | Term                                   | Weight |
//! |--------------|----------------------------------------|--------|
//! | pitch        | 0 if the pitch sets are equal, else 1  | 0.8    |
//! | duration     | `min(|qlA - qlB| / 4.0, 1.0)`          | 0.5    |
//! | articulation | 0 if the sets are equal, else 1        | 0.2    |
//! | stem         | 0 if equal, else 1                     | 0.1    |
//!
//! The weights add up to 2.1 and the raw sum is returned as is. Severity buckets are
//! cut at 0.1 / 0.3 / 0.8 on that raw scale, so a pitch change alone is already
//! `Major`. These constants are editorial heuristics; keep them as they are.
//!
//! Rests are not scored. [`Event::as_pitched`] returns `None` for them and callers
//! decide what a rest-vs-note pair means.

use crate::model::{Articulation, Event, Pitch, Stem};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

pub const PITCH_WEIGHT: f64 = 0.8;
pub const DURATION_WEIGHT: f64 = 0.5;
pub const ARTICULATION_WEIGHT: f64 = 0.2;
pub const STEM_WEIGHT: f64 = 0.1;

/// Duration difference (in quarter notes) at which the duration term saturates
pub const DURATION_SATURATION: f64 = 4.0;

pub const MAJOR_THRESHOLD: f64 = 0.8;
pub const MODERATE_THRESHOLD: f64 = 0.3;
pub const MINOR_THRESHOLD: f64 = 0.1;

/// The features of a note or chord that take part in scoring
#[derive(Debug, Clone, PartialEq)]
pub struct Pitched<'a> {
    pub pitches: BTreeSet<Pitch>,
    pub quarter_length: f64,
    pub articulations: &'a BTreeSet<Articulation>,
    pub stem: Option<Stem>,
}

impl Event {
    /// Scoring view of a note or chord; `None` for a rest
    pub fn as_pitched(&self) -> Option<Pitched<'_>> {
        match self {
            Event::Note(note) => Some(Pitched {
                pitches: BTreeSet::from([note.pitch]),
                quarter_length: note.duration.quarter_length,
                articulations: &note.articulations,
                stem: note.stem,
            }),
            Event::Chord(chord) => Some(Pitched {
                pitches: chord.pitch_set(),
                quarter_length: chord.duration.quarter_length,
                articulations: &chord.articulations,
                stem: chord.stem,
            }),
            Event::Rest(_) => None,
        }
    }
}

/// Difference magnitude between two pitched events, `0.0` for identical events
pub fn score_difference(a: &Pitched<'_>, b: &Pitched<'_>) -> f64 {
    let pitch = if a.pitches == b.pitches { 0.0 } else { 1.0 };
    let duration =
        ((a.quarter_length - b.quarter_length).abs() / DURATION_SATURATION).min(1.0);
    let articulation = if a.articulations == b.articulations { 0.0 } else { 1.0 };
    let stem = if a.stem == b.stem { 0.0 } else { 1.0 };

    PITCH_WEIGHT * pitch
        + DURATION_WEIGHT * duration
        + ARTICULATION_WEIGHT * articulation
        + STEM_WEIGHT * stem
}

/// Score two events if both are pitched
pub fn score_events(a: &Event, b: &Event) -> Option<f64> {
    Some(score_difference(&a.as_pitched()?, &b.as_pitched()?))
}

/// Colour-coding bucket for a difference score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unchanged,
    Minor,
    Moderate,
    Major,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= MAJOR_THRESHOLD {
            Severity::Major
        } else if score >= MODERATE_THRESHOLD {
            Severity::Moderate
        } else if score >= MINOR_THRESHOLD {
            Severity::Minor
        } else {
            Severity::Unchanged
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unchanged => "unchanged",
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
        }
    }

    /// MusicXML `color` attribute value used when rendering a highlighted event
    pub fn color(&self) -> Option<&'static str> {
        match self {
            Severity::Unchanged => None,
            Severity::Minor => Some("#E6B800"),
            Severity::Moderate => Some("#FF8000"),
            Severity::Major => Some("#FF0000"),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
