//! Time slot generation.
//!
//! Enumerates the discrete fixed-grain buckets the solver can assign event
//! parts into, one run per (attendee, day). Internal attendees get slots
//! over their preference window; external attendees over the window
//! inferred from their own event history. All slot labels are host-local
//! wall time.

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;
use itertools::Itertools;

use crate::error::Result;
use crate::grid::snap_down;
use crate::types::{
    CalendarEvent, Grain, MonthDay, TimeSlot, WorkTimeWindow, WorkingHoursPreference,
};
use crate::window::{inferred_work_window, localize, truncate_to_minute, work_window, WorkWindow};

/// Enumerate slots covering `[from, to)` at the given grain.
///
/// Produces `ceil(window_minutes / grain)` consecutive slots, each exactly
/// one grain long -- a ragged window tail still yields a full final slot,
/// since the solver only assigns whole buckets.
fn slot_range(from: DateTime<Tz>, to: DateTime<Tz>, host_id: &str, grain: Grain) -> Vec<TimeSlot> {
    let g = grain.minutes();
    let total = (to - from).num_minutes();
    if total <= 0 {
        return Vec::new();
    }

    let mut slots = Vec::with_capacity(((total + g - 1) / g) as usize);
    let mut offset = 0;
    while offset < total {
        let start = from + chrono::Duration::minutes(offset);
        let end = from + chrono::Duration::minutes(offset + g);
        slots.push(TimeSlot {
            day_of_week: start.weekday().into(),
            start_time: start.time(),
            end_time: end.time(),
            host_id: host_id.to_string(),
            month_day: MonthDay::from_date(start.date_naive()),
            date: start.date_naive(),
        });
        offset += g;
    }
    slots
}

/// Clip a day's window against the run start, first-day semantics:
///
/// * run start past the window -- no slots at all;
/// * run start before the window opens -- the full window;
/// * otherwise -- from the run start snapped down to the grain.
///
/// Returns `None` when the day yields no slots.
fn clip_first_day(window: &WorkWindow, day_start: DateTime<Tz>, grain: Grain) -> Option<DateTime<Tz>> {
    let now = truncate_to_minute(day_start);
    if now > window.end {
        return None;
    }
    if now <= window.start {
        return Some(window.start);
    }
    // Snapping down may step back up to grain-1 minutes before "now"; it
    // never escapes the working window because now > window.start here.
    // with_minute only fails on zone edge cases; fall back to the raw clock.
    let snapped = now
        .with_minute(snap_down(now.time(), grain).minute())
        .unwrap_or(now);
    Some(snapped)
}

/// Generate one day's slots for an internal (preference-driven) attendee.
///
/// `day_start` identifies the day in the host zone; on the first day of a
/// run its time of day is the run clock and the window is clipped to it.
pub fn time_slots_for_internal_attendee(
    day_start: DateTime<Tz>,
    pref: &WorkingHoursPreference,
    host_id: &str,
    attendee_tz: Tz,
    host_tz: Tz,
    grain: Grain,
    is_first_day: bool,
) -> Result<Vec<TimeSlot>> {
    let window = work_window(day_start, pref, attendee_tz, host_tz)?;

    let from = if is_first_day {
        match clip_first_day(&window, day_start.with_timezone(&host_tz), grain) {
            Some(from) => from,
            None => return Ok(Vec::new()),
        }
    } else {
        window.start
    };

    Ok(slot_range(from, window.end, host_id, grain))
}

/// Generate one day's slots for an external attendee, whose window comes
/// from their own event history instead of a preference.
pub fn time_slots_for_external_attendee(
    day_start: DateTime<Tz>,
    attendee_events: &[CalendarEvent],
    host_id: &str,
    host_tz: Tz,
    grain: Grain,
    is_first_day: bool,
) -> Result<Vec<TimeSlot>> {
    let Some(window) = inferred_work_window(attendee_events, day_start, host_tz, grain)? else {
        return Ok(Vec::new());
    };

    let from = if is_first_day {
        match clip_first_day(&window, day_start.with_timezone(&host_tz), grain) {
            Some(from) => from,
            None => return Ok(Vec::new()),
        }
    } else {
        window.start
    };

    Ok(slot_range(from, window.end, host_id, grain))
}

/// One [`WorkTimeWindow`] per ISO weekday for an internal attendee,
/// anchored to the week containing `anchor`. The weekday label is the
/// attendee's local weekday; the times are host-local wall clock.
pub fn work_windows_for_internal_attendee(
    pref: &WorkingHoursPreference,
    host_id: &str,
    user_id: &str,
    anchor: DateTime<Tz>,
    attendee_tz: Tz,
    host_tz: Tz,
) -> Result<Vec<WorkTimeWindow>> {
    let base = anchor.with_timezone(&attendee_tz).date_naive();
    let base_iso = base.weekday().number_from_monday() as i64;

    let mut windows = Vec::with_capacity(7);
    for day in crate::types::DayOfWeek::all() {
        let hours = pref.for_day(day)?;
        let date = base + chrono::Duration::days(day.iso() as i64 - base_iso);
        let start = localize(attendee_tz, date.and_time(hours.start))?.with_timezone(&host_tz);
        let end = localize(attendee_tz, date.and_time(hours.end))?.with_timezone(&host_tz);
        windows.push(WorkTimeWindow {
            day_of_week: day,
            start_time: start.time(),
            end_time: end.time(),
            host_id: host_id.to_string(),
            user_id: user_id.to_string(),
        });
    }
    Ok(windows)
}

/// Inferred [`WorkTimeWindow`]s for an external attendee: one per weekday
/// that actually has event history, min start snapped down and max end
/// snapped up to the grain.
pub fn work_windows_for_external_attendee(
    attendee_events: &[CalendarEvent],
    host_id: &str,
    user_id: &str,
    anchor: DateTime<Tz>,
    host_tz: Tz,
    grain: Grain,
) -> Result<Vec<WorkTimeWindow>> {
    let base = anchor.with_timezone(&host_tz).date_naive();
    let base_iso = base.weekday().number_from_monday() as i64;

    let mut windows = Vec::new();
    for day in crate::types::DayOfWeek::all() {
        let date = base + chrono::Duration::days(day.iso() as i64 - base_iso);
        // Noon anchor: midnight can fall in a DST gap in some zones.
        let noon = chrono::NaiveTime::from_hms_opt(12, 0, 0).expect("noon is valid");
        let day_anchor = localize(host_tz, date.and_time(noon))?;
        if let Some(window) = inferred_work_window(attendee_events, day_anchor, host_tz, grain)? {
            windows.push(WorkTimeWindow {
                day_of_week: day,
                start_time: window.start.time(),
                end_time: window.end.time(),
                host_id: host_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
    }
    Ok(windows)
}

/// Value-equality de-duplication, order preserving. Applied after merging
/// the per-attendee slot runs -- overlapping attendee windows produce
/// identical host-zone buckets.
pub fn dedup_time_slots(slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
    slots.into_iter().unique().collect()
}
