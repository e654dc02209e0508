//! Break synthesis: decide whether a day warrants rest breaks, budget
//! them, generate candidates, and place them into free gaps.
//!
//! Everything here is purely functional over one day's events, fetched
//! once by the caller. The multi-day driver with its calendar store reads
//! lives in the dispatch crate.

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::Result;
use crate::grid::intervals_overlap;
use crate::types::{BreakBudget, CalendarEvent, SchedulingPreferences};
use crate::window::{at_time, total_working_hours, truncate_to_minute, work_window};

/// Breaks shorter than this are widened; a 5-minute "break" is not rest.
const MIN_BREAK_LENGTH_MINUTES: i64 = 15;

/// Generating more than this many break-hours in one day means the inputs
/// are nonsense; bail rather than flood the calendar.
const MAX_BREAK_HOURS_PER_DAY: f64 = 6.0;

/// Derive the day's break accounting. `None` when the preference has no
/// break length configured (break generation disabled entirely).
pub fn break_budget(
    working_hours: f64,
    prefs: &SchedulingPreferences,
    day_events: &[CalendarEvent],
) -> Option<BreakBudget> {
    let break_length = prefs.break_length_minutes? as f64;

    let break_hours_from_min_breaks = (break_length / 60.0) * prefs.min_number_of_breaks as f64;
    let hours_must_be_break = working_hours * (1.0 - prefs.max_work_load_percent / 100.0);
    let break_hours_available = break_hours_from_min_breaks.max(hours_must_be_break);
    let break_hours_used = day_events
        .iter()
        .filter(|e| e.is_break)
        .map(CalendarEvent::duration_hours)
        .sum();

    Some(BreakBudget {
        hours_must_be_break,
        break_hours_from_min_breaks,
        break_hours_available,
        break_hours_used,
    })
}

/// Eligibility gate: does this (attendee, day) warrant synthesizing breaks
/// at all?
pub fn should_generate_breaks(
    working_hours: f64,
    prefs: &SchedulingPreferences,
    day_events: &[CalendarEvent],
) -> bool {
    if day_events.is_empty() {
        return false;
    }
    match break_budget(working_hours, prefs, day_events) {
        Some(budget) => budget.break_hours_used < budget.break_hours_available,
        None => false,
    }
}

/// Construct `count` break events, each the preference break length
/// (floored at 15 minutes), initially anchored at the mirror event's start.
/// Placement moves them into real gaps afterwards.
pub fn generate_breaks(
    prefs: &SchedulingPreferences,
    count: i64,
    mirror: &CalendarEvent,
    calendar_id: Option<&str>,
) -> Vec<CalendarEvent> {
    let Some(length) = prefs.break_length_minutes else {
        return Vec::new();
    };
    let length = length.max(MIN_BREAK_LENGTH_MINUTES);
    let calendar_id = calendar_id.unwrap_or(&mirror.calendar_id);

    (0..count)
        .map(|_| {
            let id = format!("{}#{}", Uuid::new_v4(), calendar_id);
            let mut event = CalendarEvent::new(
                id,
                prefs.user_id.clone(),
                calendar_id,
                mirror.start,
                mirror.start + chrono::Duration::minutes(length),
                mirror.timezone,
            )
            .with_title("Break")
            .with_is_break(true);
            event.user_modified_duration = true;
            event
        })
        .collect()
}

/// Run the full per-day pipeline: eligibility, budget, candidate count,
/// generation. Returns `Ok(None)` for every documented abort condition --
/// a day that needs no breaks is a normal outcome, not an error.
///
/// `day_start` identifies the day in `tz`; on the first day of a run its
/// time of day is the run clock and a day whose window has already closed
/// yields `None`.
pub fn generate_break_events_for_day(
    prefs: &SchedulingPreferences,
    day_start: DateTime<Tz>,
    tz: Tz,
    day_events: &[CalendarEvent],
    is_first_day: bool,
) -> Result<Option<Vec<CalendarEvent>>> {
    let Some(break_length) = prefs.break_length_minutes else {
        return Ok(None);
    };

    let window = work_window(day_start, &prefs.working_hours, tz, tz)?;
    if is_first_day && truncate_to_minute(day_start) > window.end {
        // The working day was already over when the run started.
        return Ok(None);
    }

    let working_hours = total_working_hours(&prefs.working_hours, day_start, tz)?;

    if day_events.is_empty() {
        return Ok(None);
    }
    if !should_generate_breaks(working_hours, prefs, day_events) {
        return Ok(None);
    }

    let hours_used: f64 = day_events.iter().map(CalendarEvent::duration_hours).sum();
    let hours_must_be_break = working_hours * (1.0 - prefs.max_work_load_percent / 100.0);
    let hours_available = (working_hours - hours_used).max(hours_must_be_break);
    if hours_available <= 0.0 {
        return Ok(None);
    }

    let break_length_hours = break_length as f64 / 60.0;
    let min_breaks_budget = break_length_hours * prefs.min_number_of_breaks as f64;

    let break_hours_to_generate = min_breaks_budget.min(hours_available);

    let day_date = day_start.date_naive();
    let break_hours_used: f64 = day_events
        .iter()
        .filter(|e| e.is_break && e.start.with_timezone(&tz).date_naive() == day_date)
        .map(CalendarEvent::duration_hours)
        .sum();

    let remainder = break_hours_to_generate - break_hours_used;
    if remainder > hours_available {
        return Ok(None);
    }

    let count = (remainder / break_length_hours).floor() as i64;
    if count < 1 {
        return Ok(None);
    }
    if break_hours_to_generate > MAX_BREAK_HOURS_PER_DAY {
        tracing::warn!(
            user = %prefs.user_id,
            hours = break_hours_to_generate,
            "break budget exceeds sanity ceiling; skipping day"
        );
        return Ok(None);
    }

    let Some(mirror) = day_events.iter().find(|e| !e.is_break) else {
        return Ok(None);
    };

    Ok(Some(generate_breaks(prefs, count, mirror, None)))
}

/// First-fit placement: for each candidate, scan the day's non-break
/// events in order and try to slot the break immediately before each one.
/// A position is accepted when it overlaps no existing event, overlaps no
/// break placed so far, and lies fully inside that weekday's working
/// window. A candidate with no feasible position is dropped -- logged,
/// never an error.
pub fn place_breaks_for_day(
    day_events: &[CalendarEvent],
    candidates: Vec<CalendarEvent>,
    prefs: &SchedulingPreferences,
    tz: Tz,
) -> Result<Vec<CalendarEvent>> {
    let Some(first) = day_events.first() else {
        return Ok(Vec::new());
    };
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let local_start = first.start.with_timezone(&tz);
    let hours = prefs.working_hours.for_weekday(local_start.weekday())?;
    let day_window_start = at_time(local_start, hours.start)?.with_timezone(&chrono::Utc);
    let day_window_end = at_time(local_start, hours.end)?.with_timezone(&chrono::Utc);

    let busy: Vec<&CalendarEvent> = day_events.iter().filter(|e| !e.is_break).collect();

    let mut placed: Vec<CalendarEvent> = Vec::new();
    'candidates: for candidate in candidates {
        let length = candidate.duration();
        for event in &busy {
            let possible_end = event.start;
            let possible_start = possible_end - length;

            let clear_of_events = busy
                .iter()
                .all(|e| !intervals_overlap(possible_start, possible_end, e.start, e.end));
            let clear_of_breaks = placed
                .iter()
                .all(|b| !intervals_overlap(possible_start, possible_end, b.start, b.end));
            let inside_window =
                possible_start >= day_window_start && possible_end <= day_window_end;

            if clear_of_events && clear_of_breaks && inside_window {
                let mut accepted = candidate.clone();
                accepted.start = possible_start;
                accepted.end = possible_end;
                placed.push(accepted);
                continue 'candidates;
            }
        }
        tracing::debug!(
            user = %candidate.user_id,
            "no free gap for break candidate; dropping it for this day"
        );
    }

    Ok(placed)
}
