//! # Merged-Score Materializer
//!
//! Applies a keep-second decision: the chosen measure is copied into the working
//! merged score in place of the measure with the same part id and measure number.
//!
//! The copy takes the number of the slot it lands in, whatever number the source
//! measure carried, and keeps the slot's position in the part. It is a deep copy, so
//! later edits to the source score never reach the merged score.
//!
//! Part ids and measure numbers need not be unique. A [`MeasureSlot`] names the k-th
//! part with an id and the k-th measure with a number inside it, which is how the
//! score differ pairs repeated ids and numbers.

use crate::model::{Measure, Score};

/// Location of one measure in a score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureSlot {
    pub part_id: String,
    /// 0-based occurrence of `part_id` among the score's parts
    pub part_occurrence: usize,
    pub measure_number: u32,
    /// 0-based occurrence of `measure_number` among the part's measures
    pub measure_occurrence: usize,
}

impl MeasureSlot {
    /// The first part with `part_id` and its first measure numbered `measure_number`
    pub fn new(part_id: impl Into<String>, measure_number: u32) -> Self {
        Self {
            part_id: part_id.into(),
            part_occurrence: 0,
            measure_number,
            measure_occurrence: 0,
        }
    }
}

/// Replace measure `measure_number` of part `part_id` in `target` with a copy of `new_measure`
///
/// Returns `false` and leaves `target` untouched when the part or measure is not found.
/// With repeated ids or numbers the first match is replaced; use [`replace_at`] to
/// reach a later one.
pub fn replace_measure(
    target: &mut Score,
    part_id: &str,
    measure_number: u32,
    new_measure: &Measure,
) -> bool {
    replace_at(target, &MeasureSlot::new(part_id, measure_number), new_measure)
}

/// Replace the measure at `slot` in `target` with a copy of `new_measure`
///
/// Returns `false` and leaves `target` untouched when the slot does not exist.
pub fn replace_at(target: &mut Score, slot: &MeasureSlot, new_measure: &Measure) -> bool {
    let Some(part) = target
        .parts
        .iter_mut()
        .filter(|p| p.id == slot.part_id)
        .nth(slot.part_occurrence)
    else {
        return false;
    };
    let Some(measure) = part
        .measures
        .iter_mut()
        .filter(|m| m.number == slot.measure_number)
        .nth(slot.measure_occurrence)
    else {
        return false;
    };

    let mut replacement = new_measure.clone();
    replacement.number = slot.measure_number;
    *measure = replacement;
    true
}
