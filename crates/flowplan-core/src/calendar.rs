//! Working-time calendar and day arithmetic.
//!
//! All calendar operations are timezone-agnostic: dates are `NaiveDate`
//! (no time component), so there is nothing to normalise to midnight —
//! the representation itself has day granularity. Stepping through dates
//! is always done with whole-day increments, never by adding milliseconds,
//! so there is no possibility of DST-style drift (spec.md §9).

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Working hours within a day. Informational only — the core never uses
/// this for arithmetic, only for passthrough/display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkHours {
    pub start_minute: u16,
    pub end_minute: u16,
}

/// A working-time calendar: which weekdays are working days by default,
/// which specific dates are holidays (never working, regardless of
/// weekday), and which specific dates are extra workdays (working,
/// regardless of weekday).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Weekday indices (0 = Sunday .. 6 = Saturday) that are working days.
    pub workdays: BTreeSet<u8>,
    pub holidays: BTreeSet<NaiveDate>,
    pub extra_workdays: BTreeSet<NaiveDate>,
    pub work_hours: Option<WorkHours>,
}

impl Default for Calendar {
    /// Monday through Friday, no holidays, no exceptions.
    fn default() -> Self {
        Self {
            workdays: [1, 2, 3, 4, 5].into_iter().collect(),
            holidays: BTreeSet::new(),
            extra_workdays: BTreeSet::new(),
            work_hours: None,
        }
    }
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    fn weekday_index(date: NaiveDate) -> u8 {
        date.weekday().num_days_from_sunday() as u8
    }

    /// `true` iff `date` is not a holiday and either its weekday is a
    /// configured workday or it is an explicit extra workday. Holidays
    /// override everything; extra-workdays override the weekend default.
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        if self.holidays.contains(&date) {
            return false;
        }
        if self.extra_workdays.contains(&date) {
            return true;
        }
        self.workdays.contains(&Self::weekday_index(date))
    }

    /// Ordered list of workdays in `[start, end]` inclusive.
    pub fn get_workdays_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        let mut result = Vec::new();
        let mut cursor = start;
        while cursor <= end {
            if self.is_workday(cursor) {
                result.push(cursor);
            }
            cursor = cursor.checked_add_days(Days::new(1)).expect("date overflow");
        }
        result
    }

    /// Number of workdays in `[start, end]` inclusive.
    pub fn count_workdays(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        self.get_workdays_in_range(start, end).len() as i64
    }

    /// Advance `|n|` workdays from `date` in the sign of `n`. The returned
    /// date is itself a workday. `n == 0` snaps forward to the nearest
    /// workday on or after `date` (used by the scheduler to align an
    /// anchor date that may have landed on a non-working day).
    pub fn add_workdays(&self, date: NaiveDate, n: i64) -> NaiveDate {
        if n == 0 {
            let mut cursor = date;
            while !self.is_workday(cursor) {
                cursor = cursor.checked_add_days(Days::new(1)).expect("date overflow");
            }
            return cursor;
        }

        let step: i64 = if n > 0 { 1 } else { -1 };
        let mut remaining = n.abs();
        let mut cursor = date;
        while remaining > 0 {
            cursor = if step > 0 {
                cursor.checked_add_days(Days::new(1)).expect("date overflow")
            } else {
                cursor.checked_sub_days(Days::new(1)).expect("date overflow")
            };
            if self.is_workday(cursor) {
                remaining -= 1;
            }
        }
        cursor
    }

    /// First workday strictly after `date`.
    pub fn get_next_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut cursor = date.checked_add_days(Days::new(1)).expect("date overflow");
        while !self.is_workday(cursor) {
            cursor = cursor.checked_add_days(Days::new(1)).expect("date overflow");
        }
        cursor
    }

    /// First workday strictly before `date`.
    pub fn get_previous_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut cursor = date.checked_sub_days(Days::new(1)).expect("date overflow");
        while !self.is_workday(cursor) {
            cursor = cursor.checked_sub_days(Days::new(1)).expect("date overflow");
        }
        cursor
    }

    /// Shift `start` forward to the next workday if needed, then derive
    /// `end` as `addWorkdays(start, duration - 1)`.
    pub fn adjust_task_dates_to_workdays(
        &self,
        start: NaiveDate,
        duration: i64,
    ) -> (NaiveDate, NaiveDate) {
        let adjusted_start = self.add_workdays(start, 0);
        let end = self.add_workdays(adjusted_start, (duration - 1).max(0));
        (adjusted_start, end)
    }

    /// Returns a new calendar with `date` added as a holiday.
    pub fn add_holiday(&self, date: NaiveDate) -> Self {
        let mut next = self.clone();
        next.holidays.insert(date);
        next
    }

    /// Returns a new calendar with `date` removed from the holiday set.
    pub fn remove_holiday(&self, date: NaiveDate) -> Self {
        let mut next = self.clone();
        next.holidays.remove(&date);
        next
    }
}
