//! Core data model for scheduling preparation.
//!
//! Everything here is either caller-supplied input (attendees, preferences,
//! calendar events) or an in-memory product of the preparation pipeline
//! (time slots, work windows, event parts, the planning request). Nothing
//! in this crate persists any of it -- synthesized events only become
//! durable if the caller writes them through the calendar store.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PrepError, Result};

/// ISO weekday as the solver wire contract spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// ISO weekday number, 1 = Monday .. 7 = Sunday.
    pub fn iso(self) -> u8 {
        match self {
            DayOfWeek::Monday => 1,
            DayOfWeek::Tuesday => 2,
            DayOfWeek::Wednesday => 3,
            DayOfWeek::Thursday => 4,
            DayOfWeek::Friday => 5,
            DayOfWeek::Saturday => 6,
            DayOfWeek::Sunday => 7,
        }
    }

    pub fn all() -> [DayOfWeek; 7] {
        [
            DayOfWeek::Monday,
            DayOfWeek::Tuesday,
            DayOfWeek::Wednesday,
            DayOfWeek::Thursday,
            DayOfWeek::Friday,
            DayOfWeek::Saturday,
            DayOfWeek::Sunday,
        ]
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(d: DayOfWeek) -> Self {
        match d {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

/// Timezone-free month/day calendar key ("--MM-DD"), used to bucket time
/// slots by calendar day without dragging a zone along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn from_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        MonthDay {
            month: date.month(),
            day: date.day(),
        }
    }
}

impl std::fmt::Display for MonthDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--{:02}-{:02}", self.month, self.day)
    }
}

impl Serialize for MonthDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let rest = s
            .strip_prefix("--")
            .ok_or_else(|| serde::de::Error::custom("expected \"--MM-DD\""))?;
        let (m, d) = rest
            .split_once('-')
            .ok_or_else(|| serde::de::Error::custom("expected \"--MM-DD\""))?;
        let month: u32 = m.parse().map_err(serde::de::Error::custom)?;
        let day: u32 = d.parse().map_err(serde::de::Error::custom)?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(serde::de::Error::custom("month/day out of range"));
        }
        Ok(MonthDay { month, day })
    }
}

/// Partition granularity the solver operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Grain {
    /// 15-minute slots and parts ("full" planning).
    #[default]
    Fine,
    /// 30-minute slots and parts ("lite" planning).
    Coarse,
}

impl Grain {
    pub fn minutes(self) -> i64 {
        match self {
            Grain::Fine => 15,
            Grain::Coarse => 30,
        }
    }
}

/// One weekday's schedulable hours for an attendee, in the attendee's own
/// timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub day: DayOfWeek,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Per-attendee working-hours table.
///
/// Invariant: exactly one entry per ISO weekday. Looking up a weekday with
/// no entry is a fatal [`PrepError::MissingWorkingHours`], never a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursPreference {
    entries: Vec<WorkingHours>,
}

impl WorkingHoursPreference {
    pub fn new(entries: Vec<WorkingHours>) -> Result<Self> {
        let mut seen = [false; 7];
        for e in &entries {
            let idx = (e.day.iso() - 1) as usize;
            if seen[idx] {
                return Err(PrepError::Validation(format!(
                    "duplicate working hours entry for {:?}",
                    e.day
                )));
            }
            seen[idx] = true;
            if e.end <= e.start {
                return Err(PrepError::Validation(format!(
                    "working hours end before start for {:?}",
                    e.day
                )));
            }
        }
        Ok(WorkingHoursPreference { entries })
    }

    /// The same `start`/`end` applied to all seven weekdays.
    pub fn uniform(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        Self::new(
            DayOfWeek::all()
                .into_iter()
                .map(|day| WorkingHours { day, start, end })
                .collect(),
        )
    }

    pub fn for_day(&self, day: DayOfWeek) -> Result<&WorkingHours> {
        self.entries
            .iter()
            .find(|e| e.day == day)
            .ok_or(PrepError::MissingWorkingHours(day.into()))
    }

    pub fn for_weekday(&self, weekday: Weekday) -> Result<&WorkingHours> {
        self.for_day(weekday.into())
    }
}

/// Per-user workload policy driving break synthesis and solver constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingPreferences {
    pub user_id: String,
    pub working_hours: WorkingHoursPreference,
    /// Fraction of a working day (percent) that may be meetings before
    /// breaks become mandatory.
    pub max_work_load_percent: f64,
    pub min_number_of_breaks: i64,
    /// Unset disables break generation entirely. Values under 15 are
    /// clamped up to 15 at generation time.
    pub break_length_minutes: Option<i64>,
    pub back_to_back_meetings: bool,
    pub max_number_of_meetings: i64,
    /// Preference-level source of the buffer cascade.
    pub copy_time_blocking: bool,
    pub default_time_blocking: Option<BufferSpec>,
    pub default_reminders: Vec<i64>,
}

/// A meeting participant. Internal attendees carry a working-hours
/// preference; external attendees have their work window inferred from
/// their own event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: String,
    pub user_id: String,
    pub host_id: String,
    pub timezone: Tz,
    pub is_external: bool,
}

/// Pre/post transition minutes reserved around an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BufferSpec {
    #[serde(rename = "beforeEvent")]
    pub before_minutes: i64,
    #[serde(rename = "afterEvent")]
    pub after_minutes: i64,
}

impl BufferSpec {
    pub fn new(before_minutes: i64, after_minutes: i64) -> Self {
        BufferSpec {
            before_minutes,
            after_minutes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before_minutes <= 0 && self.after_minutes <= 0
    }
}

/// A calendar event as this engine sees it: instants plus the flags that
/// drive break accounting, buffer linkage, and partitioning. Owned by the
/// calendar store; the engine only reads these and proposes new instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    pub calendar_id: String,
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: Tz,
    pub duration_minutes: i64,
    pub is_break: bool,
    pub is_pre_event: bool,
    pub is_post_event: bool,
    pub is_meeting: bool,
    pub modifiable: bool,
    pub priority: i64,
    /// Set on buffer events: the meeting this buffer belongs to.
    pub for_event_id: Option<String>,
    pub pre_event_id: Option<String>,
    pub post_event_id: Option<String>,
    pub category_ids: Vec<String>,
    pub time_blocking: Option<BufferSpec>,
    /// Severs the previous-event link; a linked-but-unlinked event never
    /// contributes to the buffer cascade.
    pub unlink: bool,
    pub copy_time_blocking: bool,
    pub copy_reminders: bool,
    pub copy_categories: bool,
    pub user_modified_time_blocking: bool,
    pub user_modified_reminders: bool,
    pub user_modified_categories: bool,
    pub user_modified_duration: bool,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        calendar_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timezone: Tz,
    ) -> Self {
        CalendarEvent {
            id: id.into(),
            user_id: user_id.into(),
            calendar_id: calendar_id.into(),
            title: None,
            start,
            end,
            timezone,
            duration_minutes: (end - start).num_minutes(),
            is_break: false,
            is_pre_event: false,
            is_post_event: false,
            is_meeting: false,
            modifiable: true,
            priority: 1,
            for_event_id: None,
            pre_event_id: None,
            post_event_id: None,
            category_ids: Vec::new(),
            time_blocking: None,
            unlink: false,
            copy_time_blocking: false,
            copy_reminders: false,
            copy_categories: false,
            user_modified_time_blocking: false,
            user_modified_reminders: false,
            user_modified_categories: false,
            user_modified_duration: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_is_break(mut self, is_break: bool) -> Self {
        self.is_break = is_break;
        self
    }

    pub fn with_is_meeting(mut self, is_meeting: bool) -> Self {
        self.is_meeting = is_meeting;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_for_event_id(mut self, for_event_id: impl Into<String>) -> Self {
        self.for_event_id = Some(for_event_id.into());
        self
    }

    pub fn with_pre_event_id(mut self, pre_event_id: impl Into<String>) -> Self {
        self.pre_event_id = Some(pre_event_id.into());
        self
    }

    pub fn with_post_event_id(mut self, post_event_id: impl Into<String>) -> Self {
        self.post_event_id = Some(post_event_id.into());
        self
    }

    pub fn with_time_blocking(mut self, spec: BufferSpec) -> Self {
        self.time_blocking = Some(spec);
        self
    }

    pub fn with_copy_time_blocking(mut self, copy: bool) -> Self {
        self.copy_time_blocking = copy;
        self
    }

    pub fn with_user_modified_time_blocking(mut self, modified: bool) -> Self {
        self.user_modified_time_blocking = modified;
        self
    }

    /// The event's start expressed in its own zone.
    pub fn local_start(&self) -> DateTime<Tz> {
        self.start.with_timezone(&self.timezone)
    }

    pub fn local_end(&self) -> DateTime<Tz> {
        self.end.with_timezone(&self.timezone)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Fractional hours, the unit break budgets are accounted in.
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_minutes() as f64 / 60.0
    }
}

/// One assignable solver bucket: a fixed-grain interval in host-local wall
/// time, tagged with its weekday and calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: DayOfWeek,
    #[serde(rename = "startTime")]
    pub start_time: NaiveTime,
    #[serde(rename = "endTime")]
    pub end_time: NaiveTime,
    #[serde(rename = "hostId")]
    pub host_id: String,
    #[serde(rename = "monthDay")]
    pub month_day: MonthDay,
    pub date: NaiveDate,
}

/// One attendee's usable hours for one weekday, in host-local wall time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkTimeWindow {
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: DayOfWeek,
    #[serde(rename = "startTime")]
    pub start_time: NaiveTime,
    #[serde(rename = "endTime")]
    pub end_time: NaiveTime,
    #[serde(rename = "hostId")]
    pub host_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Per-day break accounting, derived fresh for every (attendee, day) and
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakBudget {
    /// `workingHours * (1 - maxWorkLoadPercent/100)`.
    pub hours_must_be_break: f64,
    /// `(breakLength/60) * minNumberOfBreaks`.
    pub break_hours_from_min_breaks: f64,
    /// `max(hours_must_be_break, break_hours_from_min_breaks)`.
    pub break_hours_available: f64,
    /// Hours already consumed by existing break events that day.
    pub break_hours_used: f64,
}

/// One fixed-duration piece of an event, numbered within its group.
///
/// Invariants: parts of one group are numbered 1..N with no gaps, share
/// `last_part`, and concatenated in part order reconstruct the source
/// event's `[start, end)` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPart {
    pub group_id: String,
    pub event_id: String,
    pub user_id: String,
    pub host_id: String,
    pub part: u32,
    pub last_part: u32,
    /// Numbering within the meeting itself, untouched by buffer splicing.
    pub meeting_part: u32,
    pub meeting_last_part: u32,
    #[serde(rename = "startDate")]
    pub start: chrono::NaiveDateTime,
    #[serde(rename = "endDate")]
    pub end: chrono::NaiveDateTime,
    pub is_pre_event: bool,
    pub is_post_event: bool,
    pub for_event_id: Option<String>,
    pub pre_event_id: Option<String>,
    pub post_event_id: Option<String>,
    pub priority: i64,
    pub modifiable: bool,
    pub is_meeting: bool,
    /// True for synthesized gap events (breaks).
    pub gap: bool,
}

/// One user's entry in the solver request, carrying workload constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverUser {
    pub id: String,
    pub host_id: String,
    pub max_work_load_percent: f64,
    pub back_to_back_meetings: bool,
    pub max_number_of_meetings: i64,
    pub min_number_of_breaks: i64,
    pub work_times: Vec<WorkTimeWindow>,
}

impl SolverUser {
    /// The fixed permissive constraint set external attendees always get:
    /// full workload, effectively unlimited meetings, no required breaks.
    pub fn external(user_id: impl Into<String>, host_id: impl Into<String>, work_times: Vec<WorkTimeWindow>) -> Self {
        SolverUser {
            id: user_id.into(),
            host_id: host_id.into(),
            max_work_load_percent: 100.0,
            back_to_back_meetings: false,
            max_number_of_meetings: 99,
            min_number_of_breaks: 0,
            work_times,
        }
    }
}

/// The assembled payload handed to the external scheduling solver. Built
/// fresh per run; never persisted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRequest {
    pub singleton_id: Uuid,
    pub host_id: String,
    pub timeslots: Vec<TimeSlot>,
    pub user_list: Vec<SolverUser>,
    pub event_parts: Vec<EventPart>,
    pub file_key: String,
    pub delay: i64,
    #[serde(rename = "callBackUrl")]
    pub callback_url: String,
}

/// A user-defined event category; its defaults feed the buffer and
/// reminder cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// When set, the category copies buffers from event history instead of
    /// supplying `default_time_blocking`.
    pub copy_time_blocking: bool,
    pub default_time_blocking: Option<BufferSpec>,
    pub default_reminders: Vec<i64>,
}

/// An alarm offset attached to an event, synthesized in memory from
/// category/preference defaults and committed only by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: String,
    pub event_id: String,
    pub timezone: Tz,
    pub minutes: i64,
    pub use_default: bool,
}
