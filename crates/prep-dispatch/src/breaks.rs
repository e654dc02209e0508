//! Multi-day break generation driver.
//!
//! Fetches each day's events through the calendar store and runs the pure
//! per-day pipeline from `prep_engine::breaks`. Day 0 is clipped to the
//! run clock; later days use the full preference window. Days are
//! independent, so they are computed concurrently and merged back in day
//! order.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;

use prep_engine::breaks::{generate_break_events_for_day, place_breaks_for_day};
use prep_engine::error::PrepError;
use prep_engine::types::{CalendarEvent, SchedulingPreferences};
use prep_engine::window::{truncate_to_minute, work_window};

use crate::error::{DispatchError, Result};
use crate::store::CalendarStore;

/// Generate and place break events for every day in `[window_start,
/// window_end)`.
///
/// A day whose computation hits an interval invariant violation is logged
/// and skipped -- it aborts that (attendee, day) unit only. Store
/// failures, timeouts, and missing weekday preferences abort the run.
pub async fn generate_break_events_for_window<S: CalendarStore + ?Sized>(
    store: &S,
    prefs: &SchedulingPreferences,
    user_id: &str,
    window_start: DateTime<Tz>,
    window_end: DateTime<Tz>,
    tz: Tz,
    call_timeout: std::time::Duration,
    cancel: &CancellationToken,
) -> Result<Vec<CalendarEvent>> {
    let total_days = (window_end - window_start).num_days();

    let day_runs = (0..total_days).map(|i| {
        let day_start = window_start + chrono::Duration::days(i);
        generate_breaks_for_one_day(store, prefs, user_id, day_start, tz, i == 0, call_timeout, cancel)
    });

    // Concurrent per-day computation, merged back in day order.
    let per_day = try_join_all(day_runs).await?;
    Ok(per_day.into_iter().flatten().collect())
}

#[allow(clippy::too_many_arguments)]
async fn generate_breaks_for_one_day<S: CalendarStore + ?Sized>(
    store: &S,
    prefs: &SchedulingPreferences,
    user_id: &str,
    day_start: DateTime<Tz>,
    tz: Tz,
    is_first_day: bool,
    call_timeout: std::time::Duration,
    cancel: &CancellationToken,
) -> Result<Vec<CalendarEvent>> {
    if cancel.is_cancelled() {
        return Err(DispatchError::Cancelled);
    }

    let window = work_window(day_start, &prefs.working_hours, tz, tz)?;

    let now = truncate_to_minute(day_start);
    if is_first_day && now > window.end {
        return Ok(Vec::new());
    }
    let fetch_start = if is_first_day && now > window.start {
        now
    } else {
        window.start
    };

    let day_events = fetch_day_events(store, user_id, fetch_start, window.end, tz, call_timeout).await?;

    let candidates = match generate_break_events_for_day(prefs, day_start, tz, &day_events, is_first_day) {
        Ok(Some(candidates)) => candidates,
        Ok(None) => return Ok(Vec::new()),
        Err(e @ PrepError::Computation(_)) => {
            tracing::warn!(user = user_id, day = %day_start.date_naive(), error = %e,
                "break generation failed for this day; skipping it");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    match place_breaks_for_day(&day_events, candidates, prefs, tz) {
        Ok(placed) => {
            tracing::debug!(user = user_id, day = %day_start.date_naive(),
                placed = placed.len(), "placed break events");
            Ok(placed)
        }
        Err(e @ PrepError::Computation(_)) => {
            tracing::warn!(user = user_id, day = %day_start.date_naive(), error = %e,
                "break placement failed for this day; skipping it");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

async fn fetch_day_events<S: CalendarStore + ?Sized>(
    store: &S,
    user_id: &str,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    tz: Tz,
    call_timeout: std::time::Duration,
) -> Result<Vec<CalendarEvent>> {
    let events = tokio::time::timeout(
        call_timeout,
        store.list_events_for_date(
            user_id,
            start.with_timezone(&Utc),
            end.with_timezone(&Utc),
            tz,
        ),
    )
    .await
    .map_err(|_| DispatchError::Timeout {
        call: "list_events_for_date",
        seconds: call_timeout.as_secs(),
    })?
    .map_err(|source| DispatchError::Store {
        call: "list_events_for_date",
        source,
    })?;
    Ok(events)
}
