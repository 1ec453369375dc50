//! # Merge Session
//!
//! A stateful walk over a [`DifferenceReport`]. The session sits on one measure
//! difference at a time, waits for a keep-first or keep-second decision, applies it to
//! a working merged score (seeded from the first score) and moves on.
//!
//! ## States
//! ```text
//!                    keep_first / keep_second
//!                 ┌───────────────────────────┐
//!                 v                           │
//! new ──> AwaitingInput ──decision──> Advancing ──(no more differences)──> Complete
//!  │           │
//!  │           └──cancel──> Cancelled
//!  └──(empty report)──> Complete
//! ```
//!
//! `Advancing` only exists while a decision is being applied. Differences are visited
//! in part order, then measure order within the part, and an overall 1-based counter
//! increases by one per step. Show-style calls ([`MergeSession::query`],
//! [`MergeSession::highlighted`]) never change state.
//!
//! ## Resuming
//! Every decision is recorded. [`MergeSession::decision_log`] captures them and
//! [`MergeSession::replay`] rebuilds an identical session from the first score, the
//! same report and that log, so an interrupted merge can continue where it stopped.
//!
//! ## Example
//! ```rust
//! use musicmerge::*;
//!
//! let c4 = Event::Note(Note::new(Pitch::natural(NoteName::C, 4), Duration::of(NoteType::Quarter, 0)));
//! let d4 = Event::Note(Note::new(Pitch::natural(NoteName::D, 4), Duration::of(NoteType::Quarter, 0)));
//! let mut part_a = Part::new("P1", "Flute");
//! part_a.measures.push(Measure::with_events(1, vec![c4]));
//! let mut part_b = Part::new("P1", "Flute");
//! part_b.measures.push(Measure::with_events(1, vec![d4.clone()]));
//! let a = Score { metadata: Metadata::default(), parts: vec![part_a] };
//! let b = Score { metadata: Metadata::default(), parts: vec![part_b] };
//!
//! let report = compare(&a, &b)?;
//! let mut session = MergeSession::new(&a, report);
//! assert_eq!(session.state(), SessionState::AwaitingInput);
//!
//! session.keep_second()?;
//! assert_eq!(session.state(), SessionState::Complete);
//! assert_eq!(session.merged().parts[0].measures[0].events, vec![d4]);
//! # Ok::<(), MergeError>(())
//! ```

use crate::error::MergeError;
use crate::materialize::replace_at;
use crate::measure_diff::highlight;
use crate::model::{Measure, Score};
use crate::score_diff::{DifferenceReport, MeasureDifference, PartDifference};
use serde::{Deserialize, Serialize};

/// Which of the two input scores a measure comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Advancing,
    Complete,
    Cancelled,
}

/// What a decision did to the merged score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialization {
    /// Keep-first: the merged score already holds the first score's measure
    Kept,
    /// Keep-second: the second score's measure was copied in
    Replaced,
    /// Keep-second found no matching slot; the merged score is unchanged
    Missed,
}

/// Where the session currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position<'s> {
    pub part_id: &'s str,
    pub part_name: &'s str,
    pub measure_number: u32,
    /// 1-based index of this difference across the whole report
    pub counter: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    part: usize,
    difference: usize,
}

/// Decisions taken so far, in order, with the size of the report they were taken against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLog {
    pub total: usize,
    pub decisions: Vec<Source>,
}

impl DecisionLog {
    pub fn from_yaml(yaml: &str) -> Result<Self, MergeError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| MergeError::Replay(format!("invalid decision log: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, MergeError> {
        serde_yaml::to_string(self)
            .map_err(|e| MergeError::Replay(format!("cannot encode decision log: {}", e)))
    }
}

pub struct MergeSession<'a> {
    report: DifferenceReport<'a>,
    merged: Score,
    state: SessionState,
    cursor: Cursor,
    counter: usize,
    decisions: Vec<Source>,
}

impl<'a> MergeSession<'a> {
    /// Start a session; the merged score begins as a copy of `first`
    pub fn new(first: &Score, report: DifferenceReport<'a>) -> Self {
        let (state, counter) = if report.is_empty() {
            (SessionState::Complete, 0)
        } else {
            (SessionState::AwaitingInput, 1)
        };
        tracing::info!(differences = report.len(), "merge session started");
        Self {
            report,
            merged: first.clone(),
            state,
            cursor: Cursor::default(),
            counter,
            decisions: Vec::new(),
        }
    }

    /// Rebuild a session by re-applying a saved decision log
    ///
    /// # Errors
    /// [`MergeError::Replay`] when the log was written against a report of a different
    /// size or holds more decisions than there are differences.
    pub fn replay(
        first: &Score,
        report: DifferenceReport<'a>,
        log: &DecisionLog,
    ) -> Result<Self, MergeError> {
        if log.total != report.len() {
            return Err(MergeError::Replay(format!(
                "log was written for {} differences, report has {}",
                log.total,
                report.len()
            )));
        }
        let mut session = Self::new(first, report);
        for (i, source) in log.decisions.iter().enumerate() {
            if session.state != SessionState::AwaitingInput {
                return Err(MergeError::Replay(format!(
                    "log holds {} decisions, only {} differences to decide",
                    log.decisions.len(),
                    i
                )));
            }
            session.decide(*source)?;
        }
        tracing::info!(replayed = log.decisions.len(), "merge session resumed");
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Complete | SessionState::Cancelled)
    }

    pub fn report(&self) -> &DifferenceReport<'a> {
        &self.report
    }

    /// Overall 1-based counter of the current difference (0 for an empty report)
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn position(&self) -> Option<Position<'_>> {
        let (part, diff) = self.current().ok()?;
        Some(Position {
            part_id: &part.part_id,
            part_name: &part.part_name,
            measure_number: diff.number,
            counter: self.counter,
            total: self.report.len(),
        })
    }

    /// The measure difference the session is waiting on
    pub fn current(&self) -> Result<(&PartDifference<'a>, &MeasureDifference<'a>), MergeError> {
        if self.state != SessionState::AwaitingInput {
            return Err(MergeError::NoCurrentDifference);
        }
        let part = self
            .report
            .parts
            .get(self.cursor.part)
            .ok_or(MergeError::NoCurrentDifference)?;
        let diff = part
            .differences
            .get(self.cursor.difference)
            .ok_or(MergeError::NoCurrentDifference)?;
        Ok((part, diff))
    }

    /// The first- or second-score measure at the current position, for display
    pub fn query(&self, source: Source) -> Result<&'a Measure, MergeError> {
        let (_, diff) = self.current()?;
        Ok(match source {
            Source::First => diff.first,
            Source::Second => diff.second,
        })
    }

    /// Highlighted rendering of the current difference, for display
    pub fn highlighted(&self) -> Result<Measure, MergeError> {
        let (_, diff) = self.current()?;
        Ok(highlight(diff.first, diff.second))
    }

    pub fn keep_first(&mut self) -> Result<Materialization, MergeError> {
        self.decide(Source::First)
    }

    pub fn keep_second(&mut self) -> Result<Materialization, MergeError> {
        self.decide(Source::Second)
    }

    /// Apply a decision for the current difference and move to the next one
    pub fn decide(&mut self, source: Source) -> Result<Materialization, MergeError> {
        let (slot, second) = {
            let (part, diff) = self.current()?;
            (part.slot(diff), diff.second)
        };

        let outcome = match source {
            Source::First => Materialization::Kept,
            Source::Second => {
                if replace_at(&mut self.merged, &slot, second) {
                    Materialization::Replaced
                } else {
                    tracing::warn!(
                        part = %slot.part_id,
                        measure = slot.measure_number,
                        "no matching measure in merged score, keeping first score's content"
                    );
                    Materialization::Missed
                }
            }
        };
        tracing::debug!(
            part = %slot.part_id,
            measure = slot.measure_number,
            ?source,
            "decision applied"
        );

        self.decisions.push(source);
        self.state = SessionState::Advancing;
        self.advance();
        Ok(outcome)
    }

    fn advance(&mut self) {
        let Some(part) = self.report.parts.get(self.cursor.part) else {
            self.state = SessionState::Complete;
            return;
        };

        if self.cursor.difference + 1 < part.differences.len() {
            self.cursor.difference += 1;
            self.counter += 1;
            self.state = SessionState::AwaitingInput;
        } else if self.cursor.part + 1 < self.report.parts.len() {
            self.cursor = Cursor {
                part: self.cursor.part + 1,
                difference: 0,
            };
            self.counter += 1;
            self.state = SessionState::AwaitingInput;
        } else {
            self.state = SessionState::Complete;
            tracing::info!(decisions = self.decisions.len(), "merge complete");
        }
    }

    /// Stop early. The merged score keeps every decision made so far.
    ///
    /// Has no effect on a session that is already complete.
    pub fn cancel(&mut self) -> &Score {
        if self.state == SessionState::AwaitingInput {
            self.state = SessionState::Cancelled;
            tracing::info!(
                decided = self.decisions.len(),
                total = self.report.len(),
                "merge cancelled"
            );
        }
        &self.merged
    }

    pub fn merged(&self) -> &Score {
        &self.merged
    }

    pub fn decisions(&self) -> &[Source] {
        &self.decisions
    }

    pub fn decision_log(&self) -> DecisionLog {
        DecisionLog {
            total: self.report.len(),
            decisions: self.decisions.clone(),
        }
    }

    /// Hand off the merged score
    pub fn into_merged(self) -> Score {
        self.merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::score_diff::compare;
    use proptest::prelude::*;

    fn quarter(step: NoteName) -> Event {
        Event::Note(Note::new(Pitch::natural(step, 4), Duration::of(NoteType::Quarter, 0)))
    }

    fn score_of(parts: &[(&str, &[NoteName])]) -> Score {
        Score {
            metadata: Metadata::default(),
            parts: parts
                .iter()
                .map(|(id, steps)| Part {
                    id: id.to_string(),
                    name: format!("Part {}", id),
                    measures: steps
                        .iter()
                        .enumerate()
                        .map(|(i, s)| Measure::with_events(i as u32 + 1, vec![quarter(*s)]))
                        .collect(),
                })
                .collect(),
        }
    }

    fn two_part_pair() -> (Score, Score) {
        use NoteName::*;
        let a = score_of(&[("P1", &[C, D, E]), ("P2", &[F, G, A])]);
        let b = score_of(&[("P1", &[C, E, F]), ("P2", &[F, G, B])]);
        (a, b)
    }

    #[test]
    fn test_empty_report_starts_complete() {
        let a = score_of(&[("P1", &[NoteName::C])]);
        let report = compare(&a, &a).unwrap();
        let session = MergeSession::new(&a, report);
        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(session.counter(), 0);
        assert!(session.position().is_none());
        assert_eq!(session.merged(), &a);
    }

    #[test]
    fn test_single_note_scenario() {
        let a = score_of(&[("P1", &[NoteName::C])]);
        let b = score_of(&[("P1", &[NoteName::D])]);
        let report = compare(&a, &b).unwrap();
        let mut session = MergeSession::new(&a, report);

        let position = session.position().unwrap();
        assert_eq!(position.part_id, "P1");
        assert_eq!(position.measure_number, 1);
        assert_eq!(position.counter, 1);
        assert_eq!(position.total, 1);

        let shown = session.highlighted().unwrap();
        assert_eq!(shown.events[0].highlight(), Some(crate::Severity::Major));

        assert_eq!(session.keep_second().unwrap(), Materialization::Replaced);
        assert_eq!(session.state(), SessionState::Complete);
        let merged = session.into_merged();
        assert_eq!(merged.parts[0].measures[0].number, 1);
        assert_eq!(merged.parts[0].measures[0].events, vec![quarter(NoteName::D)]);
    }

    #[test]
    fn test_counter_runs_across_parts() {
        let (a, b) = two_part_pair();
        let report = compare(&a, &b).unwrap();
        let mut session = MergeSession::new(&a, report);

        let mut seen = Vec::new();
        while let Some(position) = session.position() {
            seen.push((position.part_id.to_string(), position.measure_number, position.counter));
            session.keep_first().unwrap();
        }
        assert_eq!(
            seen,
            vec![
                ("P1".to_string(), 2, 1),
                ("P1".to_string(), 3, 2),
                ("P2".to_string(), 3, 3),
            ]
        );
        assert_eq!(session.state(), SessionState::Complete);
    }

    #[test]
    fn test_keep_first_everywhere_reproduces_first_score() {
        let (a, b) = two_part_pair();
        let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
        while !session.is_finished() {
            assert_eq!(session.keep_first().unwrap(), Materialization::Kept);
        }
        assert_eq!(session.into_merged(), a);
    }

    #[test]
    fn test_keep_second_everywhere_takes_second_content() {
        let (a, b) = two_part_pair();
        let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
        while !session.is_finished() {
            session.keep_second().unwrap();
        }
        let merged = session.into_merged();
        assert!(compare(&merged, &b).unwrap().is_empty());
        for (part, other) in merged.parts.iter().zip(b.parts.iter()) {
            for (m, n) in part.measures.iter().zip(other.measures.iter()) {
                assert_eq!(m.events, n.events);
                assert_eq!(m.number, n.number);
            }
        }
    }

    #[test]
    fn test_cancel_keeps_decisions_so_far() {
        let (a, b) = two_part_pair();
        let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
        session.keep_second().unwrap();
        let merged = session.cancel().clone();
        assert_eq!(session.state(), SessionState::Cancelled);

        assert_eq!(merged.parts[0].measures[1].events, vec![quarter(NoteName::E)]);
        // Undecided differences still hold the first score's content
        assert_eq!(merged.parts[0].measures[2].events, vec![quarter(NoteName::E)]);
        assert_eq!(merged.parts[1].measures[2].events, vec![quarter(NoteName::A)]);
    }

    #[test]
    fn test_finished_session_has_no_current_difference() {
        let (a, b) = two_part_pair();
        let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
        session.cancel();
        assert!(matches!(session.query(Source::First), Err(MergeError::NoCurrentDifference)));
        assert!(matches!(session.highlighted(), Err(MergeError::NoCurrentDifference)));
        assert!(matches!(session.keep_first(), Err(MergeError::NoCurrentDifference)));
        assert!(session.decisions().is_empty());
    }

    #[test]
    fn test_cancel_after_completion_stays_complete() {
        let a = score_of(&[("P1", &[NoteName::C])]);
        let mut session = MergeSession::new(&a, compare(&a, &a).unwrap());
        session.cancel();
        assert_eq!(session.state(), SessionState::Complete);
    }

    #[test]
    fn test_query_returns_source_measures() {
        let (a, b) = two_part_pair();
        let session = MergeSession::new(&a, compare(&a, &b).unwrap());
        assert!(std::ptr::eq(session.query(Source::First).unwrap(), &a.parts[0].measures[1]));
        assert!(std::ptr::eq(session.query(Source::Second).unwrap(), &b.parts[0].measures[1]));
    }

    #[test]
    fn test_missed_materialization_still_advances() {
        let (a, b) = two_part_pair();
        let report = compare(&a, &b).unwrap();
        // A merged copy that has lost part P1
        let mut seed = a.clone();
        seed.parts.remove(0);
        let mut session = MergeSession::new(&seed, report);
        assert_eq!(session.keep_second().unwrap(), Materialization::Missed);
        assert_eq!(session.counter(), 2);
        assert_eq!(session.merged(), &seed);
    }

    #[test]
    fn test_keep_second_on_repeated_number_changes_that_bar() {
        use NoteName::*;
        let mut a = score_of(&[("P1", &[C, D, E])]);
        a.parts[0].measures[2].number = 2;
        let mut b = a.clone();
        b.parts[0].measures[2].events = vec![quarter(F)];

        let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
        assert_eq!(session.keep_second().unwrap(), Materialization::Replaced);

        let merged = session.into_merged();
        let numbers: Vec<u32> = merged.parts[0].measures.iter().map(|m| m.number).collect();
        assert_eq!(numbers, vec![1, 2, 2]);
        assert_eq!(merged.parts[0].measures[1].events, vec![quarter(D)]);
        assert_eq!(merged.parts[0].measures[2].events, vec![quarter(F)]);
        assert!(compare(&merged, &b).unwrap().is_empty());
    }

    #[test]
    fn test_keep_second_on_repeated_part_id_changes_that_part() {
        use NoteName::*;
        let a = score_of(&[("P1", &[C]), ("P1", &[E])]);
        let b = score_of(&[("P1", &[C]), ("P1", &[G])]);

        let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
        assert_eq!(session.keep_second().unwrap(), Materialization::Replaced);

        let merged = session.into_merged();
        assert_eq!(merged.parts[0].measures[0].events, vec![quarter(C)]);
        assert_eq!(merged.parts[1].measures[0].events, vec![quarter(G)]);
    }

    #[test]
    fn test_replay_restores_session() {
        let (a, b) = two_part_pair();
        let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
        session.keep_second().unwrap();
        session.keep_first().unwrap();
        let log = session.decision_log();

        let yaml = log.to_yaml().unwrap();
        let parsed = DecisionLog::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, log);

        let resumed = MergeSession::replay(&a, compare(&a, &b).unwrap(), &parsed).unwrap();
        assert_eq!(resumed.counter(), session.counter());
        assert_eq!(resumed.merged(), session.merged());
        assert_eq!(resumed.position(), session.position());
    }

    #[test]
    fn test_replay_rejects_foreign_log() {
        let (a, b) = two_part_pair();
        let log = DecisionLog {
            total: 7,
            decisions: vec![Source::First],
        };
        assert!(matches!(
            MergeSession::replay(&a, compare(&a, &b).unwrap(), &log),
            Err(MergeError::Replay(_))
        ));

        let too_long = DecisionLog {
            total: 3,
            decisions: vec![Source::First; 4],
        };
        assert!(matches!(
            MergeSession::replay(&a, compare(&a, &b).unwrap(), &too_long),
            Err(MergeError::Replay(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_cancel_reflects_exactly_the_decisions_made(
            choices in prop::collection::vec(any::<bool>(), 0..3)
        ) {
            let (a, b) = two_part_pair();
            let mut session = MergeSession::new(&a, compare(&a, &b).unwrap());
            let mut expected = a.clone();
            for keep_second in &choices {
                let (slot, second) = {
                    let (part, diff) = session.current().unwrap();
                    (part.slot(diff), diff.second.clone())
                };
                if *keep_second {
                    replace_at(&mut expected, &slot, &second);
                    session.keep_second().unwrap();
                } else {
                    session.keep_first().unwrap();
                }
            }
            let merged = session.cancel().clone();
            prop_assert_eq!(merged, expected);
        }
    }
}
