//! Working-hours window calculation across timezones.
//!
//! Converts a per-weekday working-hours preference into concrete instants
//! for a given day, re-expressed in the host's zone, and infers windows for
//! external attendees from their own event history. All functions take the
//! anchor date and both zones explicitly -- there is no ambient clock or
//! default zone anywhere in this crate.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::error::{PrepError, Result};
use crate::grid::{snap_down, snap_up};
use crate::types::{CalendarEvent, Grain, WorkingHoursPreference};

/// A concrete `[start, end)` working window for one day, in the host zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl WorkWindow {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn hours(&self) -> f64 {
        self.minutes() as f64 / 60.0
    }
}

/// Resolve a local wall-clock datetime in `tz` to an instant.
///
/// During a DST fall-back overlap the earlier of the two instants is used;
/// a datetime inside a spring-forward gap is a `Computation` error.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
    use chrono::offset::LocalResult;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier),
        LocalResult::None => Err(PrepError::Computation(format!(
            "{naive} does not exist in {tz} (DST gap)"
        ))),
    }
}

/// Compute the attendee's working window for the day containing `anchor`,
/// expressed in `host_tz`.
///
/// The weekday is taken from `anchor` as seen in the attendee's zone, the
/// preference's wall-clock hours are anchored to that local date, and the
/// resulting instants are converted to the host zone.
///
/// # Errors
/// [`PrepError::MissingWorkingHours`] if the preference has no entry for
/// that weekday.
pub fn work_window(
    anchor: DateTime<Tz>,
    pref: &WorkingHoursPreference,
    attendee_tz: Tz,
    host_tz: Tz,
) -> Result<WorkWindow> {
    let local_date = anchor.with_timezone(&attendee_tz).date_naive();
    let hours = pref.for_weekday(local_date.weekday())?;

    let start = localize(attendee_tz, local_date.and_time(hours.start))?.with_timezone(&host_tz);
    let end = localize(attendee_tz, local_date.and_time(hours.end))?.with_timezone(&host_tz);

    if end <= start {
        return Err(PrepError::Computation(format!(
            "working window collapsed for {local_date} ({attendee_tz} -> {host_tz})"
        )));
    }

    Ok(WorkWindow { start, end })
}

/// Total preference working hours for the weekday containing `anchor`, as
/// fractional hours. This is wall-clock length, deliberately independent of
/// any DST transition on that particular day.
pub fn total_working_hours(
    pref: &WorkingHoursPreference,
    anchor: DateTime<Tz>,
    attendee_tz: Tz,
) -> Result<f64> {
    let weekday = anchor.with_timezone(&attendee_tz).weekday();
    let hours = pref.for_weekday(weekday)?;
    Ok((hours.end - hours.start).num_minutes() as f64 / 60.0)
}

/// Infer an external attendee's working window for the day containing
/// `anchor` from their own event history.
///
/// The window spans from the earliest start to the latest end of any of the
/// attendee's events falling on that weekday (host zone), snapped down /
/// up to the grain. The snap-up always advances, so a history ending
/// exactly on a boundary widens the window past it. Returns `None` when
/// the attendee has no event on that weekday.
pub fn inferred_work_window(
    events: &[CalendarEvent],
    anchor: DateTime<Tz>,
    host_tz: Tz,
    grain: Grain,
) -> Result<Option<WorkWindow>> {
    let weekday = anchor.with_timezone(&host_tz).weekday();

    let same_weekday: Vec<&CalendarEvent> = events
        .iter()
        .filter(|e| e.start.with_timezone(&host_tz).weekday() == weekday)
        .collect();

    let (Some(earliest), Some(latest)) = (
        same_weekday.iter().map(|e| e.start).min(),
        same_weekday.iter().map(|e| e.end).max(),
    ) else {
        return Ok(None);
    };

    let start_time = snap_down(earliest.with_timezone(&host_tz).time(), grain);
    let end_time = snap_up(latest.with_timezone(&host_tz).time(), grain);

    let date = anchor.with_timezone(&host_tz).date_naive();
    let start = localize(host_tz, date.and_time(start_time))?;
    let end = localize(host_tz, date.and_time(end_time))?;

    if end <= start {
        return Ok(None);
    }

    Ok(Some(WorkWindow { start, end }))
}

/// Validate an internal attendee's event against interval sanity rules and
/// the attendee's working-hours window for that weekday.
///
/// Returns `false` when the event is zero/negative length, spans a full
/// calendar day, exceeds 23 hours, or starts/ends outside the weekday's
/// working window. Missing weekday preference is an error, not `false`.
pub fn validate_event_dates(event: &CalendarEvent, pref: &WorkingHoursPreference) -> Result<bool> {
    if !duration_is_sane(event) {
        return Ok(false);
    }

    let local_start = event.local_start();
    let hours = pref.for_weekday(local_start.weekday())?;

    let date = local_start.date_naive();
    let window_start = localize(event.timezone, date.and_time(hours.start))?;
    let window_end = localize(event.timezone, date.and_time(hours.end))?;

    Ok(event.start >= window_start.with_timezone(&chrono::Utc)
        && event.end <= window_end.with_timezone(&chrono::Utc))
}

/// External-attendee variant: interval sanity only, since externals have no
/// working-hours preference to check against.
pub fn validate_event_dates_external(event: &CalendarEvent) -> bool {
    duration_is_sane(event)
}

fn duration_is_sane(event: &CalendarEvent) -> bool {
    let duration = event.end - event.start;
    let minutes = duration.num_minutes();
    if minutes <= 0 {
        tracing::debug!(event = %event.id, "rejecting event: non-positive duration");
        return false;
    }
    if duration.num_days() >= 1 || duration.num_hours() > 23 {
        tracing::debug!(event = %event.id, "rejecting event: spans a calendar day or more");
        return false;
    }
    true
}

/// Anchor a host-zone instant to the same wall-clock date with a different
/// time of day. Used by slot and break generation to move within one day's
/// window without leaving the zone.
pub fn at_time(anchor: DateTime<Tz>, time: chrono::NaiveTime) -> Result<DateTime<Tz>> {
    let tz = anchor.timezone();
    localize(tz, anchor.date_naive().and_time(time))
}

/// Seconds-precision truncation helper: slot arithmetic works on whole
/// minutes, so anchors coming from "now" drop seconds first.
pub fn truncate_to_minute(anchor: DateTime<Tz>) -> DateTime<Tz> {
    anchor
        .with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(anchor)
}
