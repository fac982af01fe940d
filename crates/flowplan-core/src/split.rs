//! Split-task geometry: non-contiguous task parts, gaps, merge/split/visualise.
//!
//! A task's `split_parts` is an ordered list of disjoint `[start, end]`
//! segments. Operations here only ever construct new `Vec<SplitPart>`
//! values — nothing here mutates a `Task` in place.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::FlowplanError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPart {
    pub id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration: i64,
}

impl SplitPart {
    fn new(id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            duration: part_duration(start, end),
        }
    }
}

/// Exclusive day span `end - start`, not the inclusive day count: a part
/// that shares its boundary date with its neighbour (as
/// [`split_task_at`] produces) must not double-count that shared day when
/// parts are summed back together in [`merge_split_task`]. Floored at 1:
/// a part always spans at least one working day, even a degenerate
/// `start == end` part.
fn part_duration(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().max(1)
}

/// A gap between two adjacent parts, emitted only when its span is
/// positive (i.e. there actually is a day of separation between parts).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One element of a split-task visualisation: either a worked segment or
/// an idle gap between segments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualPart {
    Segment(SplitPart),
    Gap(Gap),
}

/// Build the ordered `SplitPart` list for `task_id` from raw `(start, end)`
/// spans; spans are taken in the order given. Part IDs are
/// `{task_id}_part_{i}` (1-based).
pub fn create_split_task(task_id: &str, spans: &[(NaiveDate, NaiveDate)]) -> Vec<SplitPart> {
    spans
        .iter()
        .enumerate()
        .map(|(i, (start, end))| SplitPart::new(format!("{task_id}_part_{}", i + 1), *start, *end))
        .collect()
}

/// Split a single contiguous `[start, end]` span at `date`, producing two
/// parts `[start, date]` and `[date, end]` sharing the split date as their
/// common boundary. Requires `start < date < end`.
pub fn split_task_at(
    task_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    date: NaiveDate,
) -> Result<Vec<SplitPart>, FlowplanError> {
    if !(start < date && date < end) {
        return Err(FlowplanError::InvalidSplit(format!(
            "split date {date} must be strictly between start {start} and end {end}"
        )));
    }
    Ok(create_split_task(task_id, &[(start, date), (date, end)]))
}

pub fn add_split_part(parts: &[SplitPart], new_part: SplitPart) -> Vec<SplitPart> {
    let mut next = parts.to_vec();
    next.push(new_part);
    next
}

pub fn remove_split_part(parts: &[SplitPart], part_id: &str) -> Vec<SplitPart> {
    parts.iter().filter(|p| p.id != part_id).cloned().collect()
}

pub fn update_split_part(
    parts: &[SplitPart],
    part_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<SplitPart> {
    parts
        .iter()
        .map(|p| {
            if p.id == part_id {
                SplitPart::new(p.id.clone(), start, end)
            } else {
                p.clone()
            }
        })
        .collect()
}

/// Collapse split parts into a single contiguous span: `start` is the
/// earliest part start, `end` the latest part end, `duration` the sum of
/// part durations (gaps removed).
pub fn merge_split_task(parts: &[SplitPart]) -> Option<(NaiveDate, NaiveDate, i64)> {
    if parts.is_empty() {
        return None;
    }
    let start = parts.iter().map(|p| p.start).min()?;
    let end = parts.iter().map(|p| p.end).max()?;
    let duration = parts.iter().map(|p| p.duration).sum();
    Some((start, end, duration))
}

/// Gaps between adjacent parts (parts assumed ordered by start), omitting
/// any adjacency with zero width.
pub fn calculate_gaps_in_split_task(parts: &[SplitPart]) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let mut gap_index = 1;
    for pair in parts.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let gap_start = prev.end.checked_add_days(Days::new(1)).expect("date overflow");
        let gap_end = next.start.checked_sub_days(Days::new(1)).expect("date overflow");
        if gap_start <= gap_end {
            gaps.push(Gap {
                id: format!("gap_{gap_index}"),
                start: gap_start,
                end: gap_end,
            });
            gap_index += 1;
        }
    }
    gaps
}

/// Alternating sequence of segments and gaps, in chronological order.
pub fn visualize_split_task(parts: &[SplitPart]) -> Vec<VisualPart> {
    let gaps = calculate_gaps_in_split_task(parts);
    let mut gap_iter = gaps.into_iter().peekable();
    let mut result = Vec::with_capacity(parts.len() * 2);
    for (i, part) in parts.iter().enumerate() {
        result.push(VisualPart::Segment(part.clone()));
        if i + 1 < parts.len() {
            if let Some(gap) = gap_iter.next() {
                result.push(VisualPart::Gap(gap));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn create_split_task_ids_are_one_based() {
        let parts = create_split_task("t1", &[(date(2026, 1, 1), date(2026, 1, 5))]);
        assert_eq!(parts[0].id, "t1_part_1");
        assert_eq!(parts[0].duration, 4);
    }

    #[test]
    fn split_task_at_requires_strict_interior_date() {
        let start = date(2026, 1, 1);
        let end = date(2026, 1, 10);
        assert!(split_task_at("t1", start, end, start).is_err());
        assert!(split_task_at("t1", start, end, end).is_err());
    }

    #[test]
    fn s3_split_round_trip() {
        let start = date(2026, 1, 1);
        let end = date(2026, 1, 10);
        let split_at = date(2026, 1, 5);
        let parts = split_task_at("t1", start, end, split_at).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].start, date(2026, 1, 1));
        assert_eq!(parts[0].end, date(2026, 1, 5));
        assert_eq!(parts[1].start, date(2026, 1, 5));
        assert_eq!(parts[1].end, date(2026, 1, 10));

        let (merged_start, merged_end, merged_duration) = merge_split_task(&parts).unwrap();
        assert_eq!(merged_start, start);
        assert_eq!(merged_end, end);
        assert_eq!(merged_duration, 9);

        // Parts share their split boundary day: zero-width gap, no gap emitted.
        let visual = visualize_split_task(&parts);
        assert_eq!(visual.len(), 2);
        assert!(matches!(visual[0], VisualPart::Segment(_)));
        assert!(matches!(visual[1], VisualPart::Segment(_)));
    }

    #[test]
    fn gap_is_detected_when_parts_are_not_adjacent() {
        let parts = create_split_task(
            "t1",
            &[
                (date(2026, 1, 1), date(2026, 1, 3)),
                (date(2026, 1, 6), date(2026, 1, 8)),
            ],
        );
        let gaps = calculate_gaps_in_split_task(&parts);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].id, "gap_1");
        assert_eq!(gaps[0].start, date(2026, 1, 4));
        assert_eq!(gaps[0].end, date(2026, 1, 5));
    }

    #[test]
    fn visualize_alternates_segment_and_gap() {
        let parts = create_split_task(
            "t1",
            &[
                (date(2026, 1, 1), date(2026, 1, 3)),
                (date(2026, 1, 6), date(2026, 1, 8)),
            ],
        );
        let visual = visualize_split_task(&parts);
        assert_eq!(visual.len(), 3);
        assert!(matches!(visual[0], VisualPart::Segment(_)));
        assert!(matches!(visual[1], VisualPart::Gap(_)));
        assert!(matches!(visual[2], VisualPart::Segment(_)));
    }

    #[test]
    fn merge_empty_returns_none() {
        assert_eq!(merge_split_task(&[]), None);
    }

    #[test]
    fn remove_and_update_split_part() {
        let parts = create_split_task(
            "t1",
            &[
                (date(2026, 1, 1), date(2026, 1, 3)),
                (date(2026, 1, 6), date(2026, 1, 8)),
            ],
        );
        let removed = remove_split_part(&parts, "t1_part_1");
        assert_eq!(removed.len(), 1);

        let updated = update_split_part(&parts, "t1_part_2", date(2026, 1, 6), date(2026, 1, 10));
        assert_eq!(updated[1].end, date(2026, 1, 10));
        assert_eq!(updated[1].duration, 4);
    }
}
