//! Calendar store boundary.
//!
//! The engine never talks to a database directly; it consumes this trait.
//! Implementations are expected to be remote (and therefore fallible and
//! slow) -- every call site in this crate runs store calls under a
//! per-call timeout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use prep_engine::types::{CalendarEvent, Category, Reminder, SchedulingPreferences};

/// Tagged store failure, mirroring the store's wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    Validation,
    Store,
    NotFound,
}

#[derive(Error, Debug)]
#[error("{code:?}: {message}")]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        StoreError {
            code,
            message: message.into(),
            details: None,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read/write operations the preparation pipeline needs from the calendar
/// store. All reads return typed data or a typed error, never defaults.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Events for one user intersecting `[start, end)`, interpreted in `tz`.
    async fn list_events_for_date(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: Tz,
    ) -> StoreResult<Vec<CalendarEvent>>;

    /// `None` when the user has never configured preferences; what that
    /// means is the caller's decision (fatal for internal attendees).
    async fn get_scheduling_preferences(
        &self,
        user_id: &str,
    ) -> StoreResult<Option<SchedulingPreferences>>;

    async fn get_user_categories(&self, user_id: &str) -> StoreResult<Vec<Category>>;

    async fn list_reminders_for_event(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> StoreResult<Vec<Reminder>>;

    async fn link_category(&self, event_id: &str, category_id: &str) -> StoreResult<()>;

    async fn create_reminder(&self, reminder: Reminder) -> StoreResult<()>;
}
