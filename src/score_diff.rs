//! # Score Differ
//!
//! Lines up two scores part-by-part and measure-by-measure, runs the measure differ on
//! each pair and collects the measures that differ into a [`DifferenceReport`].
//!
//! ## Alignment
//! - **Parts** are joined by id when every part of both scores has one and no id repeats
//!   within a score, and by position otherwise. The part counts must be equal either way.
//! - **Measures** are joined by measure number, not by list position, so a renumbered
//!   or re-ordered part still pairs each bar with its counterpart. When a number occurs
//!   more than once in a part, the k-th occurrence pairs with the k-th occurrence.
//!   The measure counts of each part pair must be equal.
//!
//! Each difference records which occurrence of its part id and measure number it is,
//! so a decision lands on the same slot the differ compared (see [`MeasureSlot`]).
//!
//! Any violation is a [`StructuralMismatch`] and no partial report is returned.
//!
//! ## Report
//! The report follows the part order and measure order of the first score, takes the
//! measure number from the first score and leaves out parts with no differing measures.
//! An empty report means the scores are equivalent for merging.

use crate::error::{MergeError, StructuralMismatch};
use crate::materialize::MeasureSlot;
use crate::measure_diff::measures_differ;
use crate::model::{Measure, Part, Score};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// A pair of measures that differ
#[derive(Debug, Clone, Serialize)]
pub struct MeasureDifference<'a> {
    pub number: u32,
    /// 0-based occurrence of `number` in the first score's part
    pub occurrence: usize,
    pub first: &'a Measure,
    pub second: &'a Measure,
}

/// The differing measures of one part
#[derive(Debug, Clone, Serialize)]
pub struct PartDifference<'a> {
    pub part_id: String,
    pub part_name: String,
    /// 0-based occurrence of `part_id` among the first score's parts
    pub occurrence: usize,
    pub differences: Vec<MeasureDifference<'a>>,
}

impl PartDifference<'_> {
    /// Where `difference` sits in the first score, and so in a merged copy of it
    pub fn slot(&self, difference: &MeasureDifference<'_>) -> MeasureSlot {
        MeasureSlot {
            part_id: self.part_id.clone(),
            part_occurrence: self.occurrence,
            measure_number: difference.number,
            measure_occurrence: difference.occurrence,
        }
    }
}

/// Result of comparing two scores. Borrows both scores and is read-only once built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DifferenceReport<'a> {
    pub parts: Vec<PartDifference<'a>>,
}

impl<'a> DifferenceReport<'a> {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Number of differing measures across all parts
    pub fn len(&self) -> usize {
        self.parts.iter().map(|p| p.differences.len()).sum()
    }

    /// Every measure difference in visiting order, with its part
    pub fn iter(&self) -> impl Iterator<Item = (&PartDifference<'a>, &MeasureDifference<'a>)> {
        self.parts
            .iter()
            .flat_map(|part| part.differences.iter().map(move |d| (part, d)))
    }
}

/// Compare two scores
///
/// # Errors
/// Returns [`MergeError::StructuralMismatch`] if the scores cannot be aligned.
pub fn compare<'a>(first: &'a Score, second: &'a Score) -> Result<DifferenceReport<'a>, MergeError> {
    let mut report = DifferenceReport::default();

    for (index, (part_a, part_b)) in align_parts(first, second)?.into_iter().enumerate() {
        let mut part_diff = PartDifference {
            part_id: part_a.id.clone(),
            part_name: part_a.name.clone(),
            occurrence: occurrence(&first.parts[..index], |p| p.id == part_a.id),
            differences: Vec::new(),
        };

        let pairs = align_measures(part_a, part_b)?;
        for (at, (measure_a, measure_b)) in pairs.into_iter().enumerate() {
            if measures_differ(measure_a, measure_b) {
                tracing::debug!(
                    part = %part_a.id,
                    measure = measure_a.number,
                    "measure differs"
                );
                part_diff.differences.push(MeasureDifference {
                    number: measure_a.number,
                    occurrence: occurrence(&part_a.measures[..at], |m| {
                        m.number == measure_a.number
                    }),
                    first: measure_a,
                    second: measure_b,
                });
            }
        }

        // Only keep parts with differences
        if !part_diff.differences.is_empty() {
            report.parts.push(part_diff);
        }
    }

    tracing::info!(
        parts = report.parts.len(),
        measures = report.len(),
        "comparison finished"
    );
    Ok(report)
}

fn align_parts<'a>(
    first: &'a Score,
    second: &'a Score,
) -> Result<Vec<(&'a Part, &'a Part)>, StructuralMismatch> {
    if first.parts.len() != second.parts.len() {
        return Err(StructuralMismatch::PartCount {
            first: first.parts.len(),
            second: second.parts.len(),
        });
    }

    if !(first.has_unique_part_ids() && second.has_unique_part_ids()) {
        tracing::debug!("part ids missing or repeated, aligning parts by position");
        return Ok(first.parts.iter().zip(second.parts.iter()).collect());
    }

    first
        .parts
        .iter()
        .map(|part| {
            second
                .part(&part.id)
                .map(|other| (part, other))
                .ok_or_else(|| StructuralMismatch::MissingPart {
                    part_id: part.id.clone(),
                })
        })
        .collect()
}

fn align_measures<'a>(
    first: &'a Part,
    second: &'a Part,
) -> Result<Vec<(&'a Measure, &'a Measure)>, StructuralMismatch> {
    if first.measures.len() != second.measures.len() {
        return Err(StructuralMismatch::MeasureCount {
            part: part_label(first),
            first: first.measures.len(),
            second: second.measures.len(),
        });
    }

    let mut by_number: HashMap<u32, VecDeque<&'a Measure>> = HashMap::new();
    for measure in &second.measures {
        by_number.entry(measure.number).or_default().push_back(measure);
    }

    first
        .measures
        .iter()
        .map(|measure| {
            by_number
                .get_mut(&measure.number)
                .and_then(|candidates| candidates.pop_front())
                .map(|other| (measure, other))
                .ok_or_else(|| StructuralMismatch::MissingMeasure {
                    part: part_label(first),
                    number: measure.number,
                })
        })
        .collect()
}

/// How many of `earlier` match; the occurrence index of the item that follows them
fn occurrence<T>(earlier: &[T], matches: impl Fn(&T) -> bool) -> usize {
    earlier.iter().filter(|item| matches(*item)).count()
}

fn part_label(part: &Part) -> String {
    if part.name.is_empty() {
        part.id.clone()
    } else {
        part.name.clone()
    }
}
