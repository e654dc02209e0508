//! Planning request assembly.
//!
//! Aggregates per-attendee time slots, work windows, synthesized breaks
//! and buffers, and partitioned events into one [`PlanningRequest`], then
//! hands it to the external solver. The solver's answer arrives later via
//! the callback URL and is out of scope here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use prep_engine::buffers::{create_buffer, resolve_buffer_spec};
use prep_engine::parts::{merge_all_post_buffer_parts, merge_all_pre_buffer_parts, partition};
use prep_engine::slots::{
    dedup_time_slots, time_slots_for_external_attendee, time_slots_for_internal_attendee,
    work_windows_for_external_attendee, work_windows_for_internal_attendee,
};
use prep_engine::types::{
    Attendee, CalendarEvent, EventPart, Grain, PlanningRequest, SchedulingPreferences, SolverUser,
    TimeSlot,
};
use prep_engine::window::{validate_event_dates, validate_event_dates_external};
use prep_engine::PrepError;

use crate::breaks::generate_break_events_for_window;
use crate::classifier::{best_match_category, Classifier};
use crate::error::{DispatchError, Result};
use crate::solver::SolverClient;
use crate::store::{CalendarStore, StoreResult};

/// One assembly run's inputs. Everything is explicit -- no ambient clock,
/// no default zone.
#[derive(Debug, Clone)]
pub struct AssemblyInputs {
    pub host_id: String,
    pub host_timezone: Tz,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub attendees: Vec<Attendee>,
    /// The in-scope events to plan, across all attendees.
    pub events: Vec<CalendarEvent>,
    pub file_key: String,
    pub callback_url: String,
    pub grain: Grain,
}

/// Assembles planning requests and submits them to the solver.
pub struct Assembler<S: CalendarStore + ?Sized, C: Classifier + ?Sized> {
    store: Arc<S>,
    classifier: Option<Arc<C>>,
    solver: SolverClient,
    call_timeout: Duration,
    cancel: CancellationToken,
}

impl<S: CalendarStore + ?Sized, C: Classifier + ?Sized> Assembler<S, C> {
    pub fn new(store: Arc<S>, classifier: Option<Arc<C>>, solver: SolverClient) -> Self {
        Assembler {
            store,
            classifier,
            solver,
            call_timeout: Duration::from_secs(10),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Install a cancellation signal. Cancelling aborts remaining
    /// attendee/day iterations and the pending submission; partial results
    /// are discarded, never partially submitted.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build the planning request without submitting it.
    pub async fn assemble(&self, inputs: &AssemblyInputs) -> Result<PlanningRequest> {
        if inputs.window_end <= inputs.window_start {
            return Err(PrepError::Validation(
                "planning window end must be after its start".to_string(),
            )
            .into());
        }
        if inputs.attendees.is_empty() {
            return Err(DispatchError::EmptyAssembly("no attendees"));
        }

        let host_tz = inputs.host_timezone;
        let window_start = inputs.window_start.with_timezone(&host_tz);
        let window_end = inputs.window_end.with_timezone(&host_tz);
        let slot_days = (window_end.date_naive() - window_start.date_naive()).num_days();

        let mut timeslots: Vec<TimeSlot> = Vec::new();
        let mut user_list: Vec<SolverUser> = Vec::new();
        let mut all_events: Vec<CalendarEvent> = inputs.events.clone();
        let mut prefs_by_user: HashMap<String, SchedulingPreferences> = HashMap::new();

        for attendee in &inputs.attendees {
            if self.cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            if attendee.is_external {
                self.prepare_external_attendee(
                    attendee,
                    inputs,
                    window_start,
                    slot_days,
                    &mut timeslots,
                    &mut user_list,
                )
                .await?;
            } else {
                self.prepare_internal_attendee(
                    attendee,
                    inputs,
                    window_start,
                    window_end,
                    slot_days,
                    &mut timeslots,
                    &mut user_list,
                    &mut all_events,
                    &mut prefs_by_user,
                )
                .await?;
            }
        }

        if self.cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        self.apply_buffers(inputs, &mut all_events, &prefs_by_user)
            .await?;

        let event_parts = self.build_event_parts(inputs, &all_events, &prefs_by_user)?;

        let mut timeslots = dedup_time_slots(timeslots);
        timeslots.sort_by(|a, b| {
            (a.date, a.start_time, a.end_time).cmp(&(b.date, b.start_time, b.end_time))
        });

        let mut event_parts: Vec<EventPart> = event_parts.into_iter().unique().collect();
        event_parts.sort_by(|a, b| {
            (a.start.date(), &a.user_id, &a.group_id, a.part)
                .cmp(&(b.start.date(), &b.user_id, &b.group_id, b.part))
        });

        if event_parts.is_empty() {
            return Err(DispatchError::EmptyAssembly("no event parts"));
        }
        if timeslots.is_empty() {
            return Err(DispatchError::EmptyAssembly("no timeslots"));
        }

        Ok(PlanningRequest {
            singleton_id: Uuid::new_v4(),
            host_id: inputs.host_id.clone(),
            timeslots,
            user_list,
            event_parts,
            file_key: inputs.file_key.clone(),
            delay: self.solver.delay_millis(),
            callback_url: inputs.callback_url.clone(),
        })
    }

    /// Assemble and submit in one step. Cancellation between the two
    /// discards the request.
    pub async fn assemble_and_submit(&self, inputs: &AssemblyInputs) -> Result<PlanningRequest> {
        let request = self.assemble(inputs).await?;
        if self.cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        self.solver.submit(&request).await?;
        Ok(request)
    }

    #[allow(clippy::too_many_arguments)]
    async fn prepare_internal_attendee(
        &self,
        attendee: &Attendee,
        inputs: &AssemblyInputs,
        window_start: DateTime<Tz>,
        window_end: DateTime<Tz>,
        slot_days: i64,
        timeslots: &mut Vec<TimeSlot>,
        user_list: &mut Vec<SolverUser>,
        all_events: &mut Vec<CalendarEvent>,
        prefs_by_user: &mut HashMap<String, SchedulingPreferences>,
    ) -> Result<()> {
        let prefs = self
            .store_call(
                "get_scheduling_preferences",
                self.store.get_scheduling_preferences(&attendee.user_id),
            )
            .await?
            .ok_or_else(|| DispatchError::MissingPreferences(attendee.user_id.clone()))?;

        for day in 0..=slot_days {
            let day_start = window_start + chrono::Duration::days(day);
            timeslots.extend(time_slots_for_internal_attendee(
                day_start,
                &prefs.working_hours,
                &inputs.host_id,
                attendee.timezone,
                inputs.host_timezone,
                inputs.grain,
                day == 0,
            )?);
        }

        let work_times = work_windows_for_internal_attendee(
            &prefs.working_hours,
            &inputs.host_id,
            &attendee.user_id,
            window_start,
            attendee.timezone,
            inputs.host_timezone,
        )?;

        user_list.push(SolverUser {
            id: attendee.user_id.clone(),
            host_id: inputs.host_id.clone(),
            max_work_load_percent: prefs.max_work_load_percent,
            back_to_back_meetings: prefs.back_to_back_meetings,
            max_number_of_meetings: prefs.max_number_of_meetings,
            min_number_of_breaks: prefs.min_number_of_breaks,
            work_times,
        });

        let breaks = generate_break_events_for_window(
            self.store.as_ref(),
            &prefs,
            &attendee.user_id,
            window_start,
            window_end,
            inputs.host_timezone,
            self.call_timeout,
            &self.cancel,
        )
        .await?;
        all_events.extend(breaks);

        prefs_by_user.insert(attendee.user_id.clone(), prefs);
        Ok(())
    }

    async fn prepare_external_attendee(
        &self,
        attendee: &Attendee,
        inputs: &AssemblyInputs,
        window_start: DateTime<Tz>,
        slot_days: i64,
        timeslots: &mut Vec<TimeSlot>,
        user_list: &mut Vec<SolverUser>,
    ) -> Result<()> {
        // External attendees bring no preference; their windows come from
        // their own event history over the planning horizon.
        let history = self
            .store_call(
                "list_events_for_date",
                self.store.list_events_for_date(
                    &attendee.user_id,
                    inputs.window_start,
                    inputs.window_end,
                    attendee.timezone,
                ),
            )
            .await?;

        for day in 0..=slot_days {
            let day_start = window_start + chrono::Duration::days(day);
            timeslots.extend(time_slots_for_external_attendee(
                day_start,
                &history,
                &inputs.host_id,
                inputs.host_timezone,
                inputs.grain,
                day == 0,
            )?);
        }

        let work_times = work_windows_for_external_attendee(
            &history,
            &inputs.host_id,
            &attendee.user_id,
            window_start,
            inputs.host_timezone,
            inputs.grain,
        )?;

        user_list.push(SolverUser::external(
            attendee.user_id.clone(),
            inputs.host_id.clone(),
            work_times,
        ));
        Ok(())
    }

    /// Resolve and attach buffers to the meeting events of internal
    /// attendees, pushing the synthesized pre/post events into the pool.
    async fn apply_buffers(
        &self,
        inputs: &AssemblyInputs,
        all_events: &mut Vec<CalendarEvent>,
        prefs_by_user: &HashMap<String, SchedulingPreferences>,
    ) -> Result<()> {
        let categories = self
            .store_call(
                "get_user_categories",
                self.store.get_user_categories(&inputs.host_id),
            )
            .await?;

        let mut synthesized: Vec<CalendarEvent> = Vec::new();
        for event in all_events.iter_mut() {
            if !event.is_meeting {
                continue;
            }
            let Some(prefs) = prefs_by_user.get(&event.user_id) else {
                continue;
            };

            let category = match &self.classifier {
                Some(classifier) if !categories.is_empty() => {
                    best_match_category(classifier.as_ref(), event, &categories).await
                }
                _ => None,
            };

            let Some(spec) = resolve_buffer_spec(event.time_blocking, None, category, Some(prefs))
            else {
                continue;
            };
            let Some(outcome) = create_buffer(event, spec) else {
                continue;
            };

            *event = outcome.parent;
            synthesized.extend(outcome.pre);
            synthesized.extend(outcome.post);
        }

        all_events.extend(synthesized);
        Ok(())
    }

    fn build_event_parts(
        &self,
        inputs: &AssemblyInputs,
        all_events: &[CalendarEvent],
        prefs_by_user: &HashMap<String, SchedulingPreferences>,
    ) -> Result<Vec<EventPart>> {
        let mut parts: Vec<EventPart> = Vec::new();
        for event in all_events {
            let valid = match prefs_by_user.get(&event.user_id) {
                Some(prefs) => validate_event_dates(event, &prefs.working_hours)?,
                None => validate_event_dates_external(event),
            };
            if !valid {
                tracing::debug!(event = %event.id, "event failed date validation; excluding it");
                continue;
            }
            parts.extend(partition(event, &inputs.host_id, inputs.grain)?);
        }

        let parts = merge_all_pre_buffer_parts(parts);
        let parts = merge_all_post_buffer_parts(parts);
        Ok(parts)
    }

    async fn store_call<T>(
        &self,
        call: &'static str,
        fut: impl std::future::Future<Output = StoreResult<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| DispatchError::Timeout {
                call,
                seconds: self.call_timeout.as_secs(),
            })?
            .map_err(|source| DispatchError::Store { call, source })
    }
}
