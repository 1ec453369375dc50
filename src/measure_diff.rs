//! # Measure Differ
//!
//! Decides whether two measures differ and builds a highlighted copy of a measure for
//! display.
//!
//! ## Alignment
//! Events are paired strictly by position: the i-th event of one measure against the
//! i-th event of the other. There is no re-alignment, so one inserted note shifts every
//! following pair and all of them mismatch.
//!
//! ## What counts as a difference
//! - different event counts
//! - a pair of events of different kinds (note vs chord vs rest)
//! - a pair of notes or chords with different pitch sets or durations
//! - different clef or time signature written in the measure
//!
//! Articulation and stem changes alone do not make measures differ; they only affect
//! the severity shown by [`highlight`].
//!
//! Neither function mutates its inputs, so a preview running on another thread can
//! read the same measures safely.

use crate::model::{Event, Measure};
use crate::similarity::{score_events, Severity};

/// True when the two measures differ in events, clef or time signature
pub fn measures_differ(m1: &Measure, m2: &Measure) -> bool {
    if m1.clef != m2.clef || m1.time_signature != m2.time_signature {
        return true;
    }
    if m1.events.len() != m2.events.len() {
        return true;
    }
    m1.events
        .iter()
        .zip(m2.events.iter())
        .any(|(a, b)| events_differ(a, b))
}

fn events_differ(a: &Event, b: &Event) -> bool {
    if a.kind() != b.kind() {
        return true;
    }
    if !a.is_pitched() {
        return false;
    }
    a.pitch_set() != b.pitch_set()
        || a.duration().quarter_length != b.duration().quarter_length
}

/// Copy of `m1` with every event annotated by how much it differs from its partner in `m2`
///
/// When the event counts differ no pairing is attempted and every event is marked
/// `Major`. Otherwise same-kind pitched pairs are scored and bucketed; rests and
/// mismatched kinds are copied without annotation.
pub fn highlight(m1: &Measure, m2: &Measure) -> Measure {
    let mut out = m1.attributes_only();

    if m1.events.len() != m2.events.len() {
        tracing::debug!(
            measure = m1.number,
            first = m1.events.len(),
            second = m2.events.len(),
            "event counts differ, marking whole measure"
        );
        out.events = m1
            .events
            .iter()
            .map(|e| e.highlighted(Severity::Major))
            .collect();
        return out;
    }

    out.events = m1
        .events
        .iter()
        .zip(m2.events.iter())
        .map(|(a, b)| {
            if a.kind() != b.kind() {
                return a.clone();
            }
            match score_events(a, b) {
                Some(score) => a.highlighted(Severity::from_score(score)),
                None => a.clone(),
            }
        })
        .collect();
    out
}
