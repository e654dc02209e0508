//! Minute-grid snapping and half-open interval predicates.
//!
//! Every snap in the engine goes through these two functions so the
//! boundary membership rules (`[)` going down, strict-next going up) are
//! decided in exactly one place.

use chrono::{NaiveTime, Timelike};

use crate::types::Grain;

/// Snap a wall-clock time *down* to the containing grid boundary.
///
/// Membership is half-open: a time already on a boundary stays put
/// (`10:15` at 15-minute grain stays `10:15`). Seconds are dropped.
pub fn snap_down(time: NaiveTime, grain: Grain) -> NaiveTime {
    let g = grain.minutes() as u32;
    let minute = (time.minute() / g) * g;
    NaiveTime::from_hms_opt(time.hour(), minute, 0).expect("hour/minute already in range")
}

/// Snap a wall-clock time *up* to the next grid boundary strictly after it.
///
/// A time exactly on a boundary still advances one full step -- this is
/// what widens an inferred work window whose last event ends exactly on a
/// boundary. Advancing past `:59` rolls into the next hour; at hour 23 the
/// result saturates at the day's final boundary instead of wrapping into
/// the next day.
pub fn snap_up(time: NaiveTime, grain: Grain) -> NaiveTime {
    let g = grain.minutes() as u32;
    let next = (time.minute() / g + 1) * g;
    if next < 60 {
        NaiveTime::from_hms_opt(time.hour(), next, 0).expect("minute < 60")
    } else if time.hour() < 23 {
        NaiveTime::from_hms_opt(time.hour() + 1, 0, 0).expect("hour < 24")
    } else {
        NaiveTime::from_hms_opt(23, 60 - g, 0).expect("final boundary of day")
    }
}

/// `value` lies within `[start, end)`.
pub fn within_start_inclusive<T: PartialOrd>(value: T, start: T, end: T) -> bool {
    value >= start && value < end
}

/// `value` lies within `(start, end]`.
pub fn within_end_inclusive<T: PartialOrd>(value: T, start: T, end: T) -> bool {
    value > start && value <= end
}

/// Two half-open intervals `[a_start, a_end)` and `[b_start, b_end)`
/// overlap. Adjacent intervals (one ends exactly where the other starts)
/// do not.
pub fn intervals_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}
