//! Integration tests for planning request assembly, driven by an
//! in-memory calendar store fake.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use prep_dispatch::assembler::{Assembler, AssemblyInputs};
use prep_dispatch::classifier::{ClassificationScores, Classifier, ClassifierError};
use prep_dispatch::solver::{SolverClient, SolverConfig};
use prep_dispatch::store::{CalendarStore, StoreResult};
use prep_dispatch::DispatchError;
use prep_engine::types::{
    Attendee, BufferSpec, CalendarEvent, Category, Grain, Reminder, SchedulingPreferences,
    WorkingHoursPreference,
};

// ── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeStore {
    events: Vec<CalendarEvent>,
    prefs: HashMap<String, SchedulingPreferences>,
    categories: Vec<Category>,
}

#[async_trait]
impl CalendarStore for FakeStore {
    async fn list_events_for_date(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        _tz: Tz,
    ) -> StoreResult<Vec<CalendarEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.start < end && e.end > start)
            .cloned()
            .collect())
    }

    async fn get_scheduling_preferences(
        &self,
        user_id: &str,
    ) -> StoreResult<Option<SchedulingPreferences>> {
        Ok(self.prefs.get(user_id).cloned())
    }

    async fn get_user_categories(&self, _user_id: &str) -> StoreResult<Vec<Category>> {
        Ok(self.categories.clone())
    }

    async fn list_reminders_for_event(
        &self,
        _event_id: &str,
        _user_id: &str,
    ) -> StoreResult<Vec<Reminder>> {
        Ok(Vec::new())
    }

    async fn link_category(&self, _event_id: &str, _category_id: &str) -> StoreResult<()> {
        Ok(())
    }

    async fn create_reminder(&self, _reminder: Reminder) -> StoreResult<()> {
        Ok(())
    }
}

/// A classifier that always fails; categories must degrade to "none".
struct BrokenClassifier;

#[async_trait]
impl Classifier for BrokenClassifier {
    async fn classify(
        &self,
        _text: &str,
        _labels: &[String],
    ) -> Result<ClassificationScores, ClassifierError> {
        Err(ClassifierError("connection refused".to_string()))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn prefs_8_to_16() -> SchedulingPreferences {
    SchedulingPreferences {
        user_id: "host-1".to_string(),
        working_hours: WorkingHoursPreference::uniform(t(8, 0), t(16, 0)).unwrap(),
        max_work_load_percent: 80.0,
        min_number_of_breaks: 2,
        break_length_minutes: None,
        back_to_back_meetings: false,
        max_number_of_meetings: 6,
        copy_time_blocking: false,
        default_time_blocking: None,
        default_reminders: Vec::new(),
    }
}

fn internal_attendee(user_id: &str) -> Attendee {
    Attendee {
        id: format!("att-{user_id}"),
        user_id: user_id.to_string(),
        host_id: "host-1".to_string(),
        timezone: chrono_tz::UTC,
        is_external: false,
    }
}

fn meeting(id: &str, user_id: &str, start: &str, end: &str) -> CalendarEvent {
    CalendarEvent::new(
        id,
        user_id,
        "cal-1",
        start.parse::<DateTime<Utc>>().unwrap(),
        end.parse::<DateTime<Utc>>().unwrap(),
        chrono_tz::UTC,
    )
    .with_is_meeting(true)
}

fn solver_client() -> SolverClient {
    SolverClient::new(SolverConfig::new("http://127.0.0.1:1", "user", "pass"))
}

fn inputs(attendees: Vec<Attendee>, events: Vec<CalendarEvent>) -> AssemblyInputs {
    AssemblyInputs {
        host_id: "host-1".to_string(),
        host_timezone: chrono_tz::UTC,
        // Mon Mar 16 07:00 UTC through Tue Mar 17 17:00 UTC.
        window_start: "2026-03-16T07:00:00Z".parse().unwrap(),
        window_end: "2026-03-17T17:00:00Z".parse().unwrap(),
        attendees,
        events,
        file_key: "host-1/run-1.json".to_string(),
        callback_url: "https://callbacks.test/plan-done".to_string(),
        grain: Grain::Fine,
    }
}

fn assembler(store: FakeStore) -> Assembler<FakeStore, BrokenClassifier> {
    Assembler::new(Arc::new(store), None, solver_client())
}

// ── Test 1: Basic assembly ──────────────────────────────────────────────────

#[tokio::test]
async fn assembles_slots_users_and_parts_for_an_internal_attendee() {
    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs_8_to_16());

    let meeting = meeting("m1", "host-1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    let request = assembler(store)
        .assemble(&inputs(vec![internal_attendee("host-1")], vec![meeting]))
        .await
        .unwrap();

    // Two days of 8h windows at 15-minute grain, run start before the
    // window so day 0 is not clipped.
    assert_eq!(request.timeslots.len(), 64);

    assert_eq!(request.user_list.len(), 1);
    let user = &request.user_list[0];
    assert_eq!(user.id, "host-1");
    assert_eq!(user.max_work_load_percent, 80.0);
    assert_eq!(user.min_number_of_breaks, 2);
    assert_eq!(user.work_times.len(), 7);

    // One 60-minute meeting -> 4 fine parts.
    assert_eq!(request.event_parts.len(), 4);
    assert!(request.event_parts.iter().all(|p| p.event_id == "m1"));

    assert_eq!(request.host_id, "host-1");
    assert_eq!(request.file_key, "host-1/run-1.json");
    assert_eq!(request.callback_url, "https://callbacks.test/plan-done");
}

#[tokio::test]
async fn timeslots_are_deduplicated_and_sorted() {
    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs_8_to_16());
    let mut second = prefs_8_to_16();
    second.user_id = "host-2".to_string();
    store.prefs.insert("host-2".to_string(), second);

    let meeting = meeting("m1", "host-1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    let request = assembler(store)
        .assemble(&inputs(
            vec![internal_attendee("host-1"), internal_attendee("host-2")],
            vec![meeting],
        ))
        .await
        .unwrap();

    // Identical windows collapse to one set of host-zone buckets.
    assert_eq!(request.timeslots.len(), 64);
    for pair in request.timeslots.windows(2) {
        assert!(
            (pair[0].date, pair[0].start_time) <= (pair[1].date, pair[1].start_time),
            "timeslots must be sorted by (date, start)"
        );
    }
}

// ── Test 2: External attendees ──────────────────────────────────────────────

#[tokio::test]
async fn external_attendees_get_the_permissive_constraint_set() {
    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs_8_to_16());
    // External history inside the planning window: Monday 09:30-11:00.
    store.events.push(
        meeting("ext-e1", "ext-1", "2026-03-16T09:30:00Z", "2026-03-16T11:00:00Z"),
    );

    let external = Attendee {
        id: "att-ext".to_string(),
        user_id: "ext-1".to_string(),
        host_id: "host-1".to_string(),
        timezone: chrono_tz::UTC,
        is_external: true,
    };
    let meeting = meeting("m1", "host-1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");

    let request = assembler(store)
        .assemble(&inputs(
            vec![internal_attendee("host-1"), external],
            vec![meeting],
        ))
        .await
        .unwrap();

    let ext_user = request.user_list.iter().find(|u| u.id == "ext-1").unwrap();
    assert_eq!(ext_user.max_work_load_percent, 100.0);
    assert_eq!(ext_user.max_number_of_meetings, 99);
    assert_eq!(ext_user.min_number_of_breaks, 0);
    // Only Monday has history, so only Monday gets an inferred window.
    assert_eq!(ext_user.work_times.len(), 1);

    // The inferred Monday window 09:30-11:15 contributes slots beyond the
    // host's own; value-dedup keeps the merged set consistent.
    assert!(request.timeslots.len() >= 64);
}

// ── Test 3: Buffers flow into spliced parts ─────────────────────────────────

#[tokio::test]
async fn preference_buffers_splice_into_one_group() {
    let mut prefs = prefs_8_to_16();
    prefs.copy_time_blocking = true;
    prefs.default_time_blocking = Some(BufferSpec::new(15, 15));

    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs);

    let meeting = meeting("m1", "host-1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    let request = assembler(store)
        .assemble(&inputs(vec![internal_attendee("host-1")], vec![meeting]))
        .await
        .unwrap();

    // 1 pre part + 4 meeting parts + 1 post part, one shared group.
    assert_eq!(request.event_parts.len(), 6);

    let group = &request.event_parts[0].group_id;
    assert!(request.event_parts.iter().all(|p| &p.group_id == group));

    let mut parts = request.event_parts.clone();
    parts.sort_by_key(|p| p.part);
    assert!(parts[0].is_pre_event);
    assert!(parts[5].is_post_event);
    for (i, p) in parts.iter().enumerate() {
        assert_eq!(p.part, i as u32 + 1);
        assert_eq!(p.last_part, 6);
    }
}

#[tokio::test]
async fn a_broken_classifier_degrades_to_no_category() {
    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs_8_to_16());
    store.categories.push(Category {
        id: "cat-1".to_string(),
        name: "Client call".to_string(),
        copy_time_blocking: false,
        default_time_blocking: Some(BufferSpec::new(30, 30)),
        default_reminders: Vec::new(),
    });

    let meeting = meeting("m1", "host-1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    let assembler: Assembler<FakeStore, BrokenClassifier> = Assembler::new(
        Arc::new(store),
        Some(Arc::new(BrokenClassifier)),
        solver_client(),
    );

    let request = assembler
        .assemble(&inputs(vec![internal_attendee("host-1")], vec![meeting]))
        .await
        .unwrap();

    // Classifier failure means no category buffers: just the 4 meeting
    // parts, and the run still succeeds.
    assert_eq!(request.event_parts.len(), 4);
}

// ── Test 4: Break synthesis flows into gap parts ────────────────────────────

#[tokio::test]
async fn synthesized_breaks_become_gap_parts() {
    let mut prefs = prefs_8_to_16();
    prefs.break_length_minutes = Some(15);

    let busy = meeting("m1", "host-1", "2026-03-16T08:30:00Z", "2026-03-16T14:30:00Z");

    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs);
    store.events.push(busy.clone());

    let request = assembler(store)
        .assemble(&inputs(vec![internal_attendee("host-1")], vec![busy]))
        .await
        .unwrap();

    // 6h meeting -> 24 fine parts; one 15-minute break found a gap
    // (08:15-08:30) and the second candidate was dropped.
    let gap_parts: Vec<_> = request.event_parts.iter().filter(|p| p.gap).collect();
    assert_eq!(gap_parts.len(), 1);
    assert_eq!(request.event_parts.len(), 25);
}

// ── Test 5: Failure modes ───────────────────────────────────────────────────

#[tokio::test]
async fn missing_preferences_for_an_internal_attendee_is_fatal() {
    let store = FakeStore::default();
    let meeting = meeting("m1", "ghost", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");

    let err = assembler(store)
        .assemble(&inputs(vec![internal_attendee("ghost")], vec![meeting]))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::MissingPreferences(user) if user == "ghost"));
}

#[tokio::test]
async fn no_attendees_is_an_empty_assembly() {
    let err = assembler(FakeStore::default())
        .assemble(&inputs(vec![], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::EmptyAssembly("no attendees")));
}

#[tokio::test]
async fn no_plannable_events_is_an_empty_assembly() {
    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs_8_to_16());

    let err = assembler(store)
        .assemble(&inputs(vec![internal_attendee("host-1")], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::EmptyAssembly("no event parts")));
}

#[tokio::test]
async fn events_outside_working_hours_are_excluded() {
    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs_8_to_16());

    // 18:00-19:00 lies outside the 08:00-16:00 preference window.
    let after_hours = meeting("m1", "host-1", "2026-03-16T18:00:00Z", "2026-03-16T19:00:00Z");
    let err = assembler(store)
        .assemble(&inputs(vec![internal_attendee("host-1")], vec![after_hours]))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::EmptyAssembly("no event parts")));
}

// ── Test 6: Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn a_cancelled_run_submits_nothing() {
    let mut store = FakeStore::default();
    store.prefs.insert("host-1".to_string(), prefs_8_to_16());
    let meeting = meeting("m1", "host-1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");

    let cancel = CancellationToken::new();
    cancel.cancel();

    let assembler = assembler(store).with_cancellation(cancel);
    let err = assembler
        .assemble(&inputs(vec![internal_attendee("host-1")], vec![meeting]))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Cancelled));
}
