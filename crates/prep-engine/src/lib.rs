//! # prep-engine
//!
//! Timezone-correct scheduling preparation: the pure computation core that
//! turns calendar events, working-hour preferences, and workload budgets
//! into solver-ready material -- time slots, work windows, synthesized
//! break and buffer events, and fixed-grain event parts.
//!
//! Everything in this crate is synchronous, CPU-bound, and side-effect
//! free over caller-supplied data; independent (attendee, day) units can
//! run in parallel with no shared state. The async boundary (calendar
//! store reads, classifier calls, solver submission) lives in
//! `prep-dispatch`.
//!
//! ## Modules
//!
//! - [`window`] -- working-hours windows across timezones, event validation
//! - [`slots`] -- fixed-grain time slot and work window enumeration
//! - [`breaks`] -- break budgets, candidate generation, first-fit placement
//! - [`buffers`] -- pre/post buffer synthesis with cascading sources
//! - [`parts`] -- event partitioning and buffer-part splicing
//! - [`grid`] -- minute-grid snapping and interval predicates
//! - [`types`] -- the shared data model
//! - [`error`] -- error types

pub mod breaks;
pub mod buffers;
pub mod error;
pub mod grid;
pub mod parts;
pub mod slots;
pub mod types;
pub mod window;

pub use buffers::{create_buffer, resolve_buffer_spec, BufferOutcome};
pub use error::PrepError;
pub use parts::partition;
pub use slots::{dedup_time_slots, time_slots_for_external_attendee, time_slots_for_internal_attendee};
pub use types::{
    Attendee, BreakBudget, BufferSpec, CalendarEvent, Category, DayOfWeek, EventPart, Grain,
    MonthDay, PlanningRequest, Reminder, SchedulingPreferences, SolverUser, TimeSlot,
    WorkTimeWindow, WorkingHours, WorkingHoursPreference,
};
pub use window::{validate_event_dates, validate_event_dates_external, work_window, WorkWindow};
