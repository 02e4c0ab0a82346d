use chrono::{NaiveDate, NaiveTime};

use crate::error::{Igreja360Error, Result};
use crate::models::VolunteerSchedule;

/// A half-open `[start, end)` shift on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(Igreja360Error::InvalidShift(format!(
                "end {} must be after start {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    /// Ranges that only touch (one ends when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| Igreja360Error::InvalidTime(raw.to_string()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| Igreja360Error::InvalidDate(raw.to_string()))
}

/// Existing schedules that would collide with the proposed shift.
pub fn conflicts<'a>(
    volunteer_id: i64,
    date: NaiveDate,
    shift: &'a TimeRange,
    existing: &'a [VolunteerSchedule],
    exclude_id: Option<i64>,
) -> impl Iterator<Item = &'a VolunteerSchedule> + 'a {
    existing.iter().filter(move |s| {
        Some(s.id) != exclude_id
            && s.volunteer_id == volunteer_id
            && s.date == date
            && shift.overlaps(&TimeRange {
                start: s.start_time,
                end: s.end_time,
            })
    })
}

/// Whether the volunteer already serves during any part of `shift` on `date`.
///
/// Pass the schedule's own id as `exclude_id` when editing it in place.
pub fn has_conflict(
    volunteer_id: i64,
    date: NaiveDate,
    shift: &TimeRange,
    existing: &[VolunteerSchedule],
    exclude_id: Option<i64>,
) -> bool {
    conflicts(volunteer_id, date, shift, existing, exclude_id)
        .next()
        .is_some()
}
