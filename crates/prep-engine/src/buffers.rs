//! Buffer time synthesis: pre-/post-event transition blocks.
//!
//! The buffer amount comes from a priority cascade of sources; whichever
//! source wins, the same construction runs: a pre event ending exactly at
//! the parent's start, a post event starting exactly at the parent's end,
//! and the parent relinked to both.

use uuid::Uuid;

use crate::types::{BufferSpec, CalendarEvent, Category, SchedulingPreferences};

/// A synthesized buffer pair plus the parent updated with linkage.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferOutcome {
    pub parent: CalendarEvent,
    pub pre: Option<CalendarEvent>,
    pub post: Option<CalendarEvent>,
}

/// Resolve the buffer amount for an event from its configuration sources,
/// tried in priority order; the first source that produces a non-empty
/// spec wins:
///
/// 1. an explicit override supplied by the caller;
/// 2. the previous linked event's own buffer, when that event copies its
///    time blocking forward and the link is intact;
/// 3. the category default, unless the category itself copies from history;
/// 4. the user-preference default, when the preference copies forward.
pub fn resolve_buffer_spec(
    override_spec: Option<BufferSpec>,
    previous_event: Option<&CalendarEvent>,
    category: Option<&Category>,
    prefs: Option<&SchedulingPreferences>,
) -> Option<BufferSpec> {
    let from_override = || override_spec.filter(|s| !s.is_empty());

    let from_previous = || {
        previous_event
            .filter(|p| p.copy_time_blocking && !p.unlink)
            .and_then(|p| p.time_blocking)
            .filter(|s| !s.is_empty())
    };

    let from_category = || {
        category
            .filter(|c| !c.copy_time_blocking)
            .and_then(|c| c.default_time_blocking)
            .filter(|s| !s.is_empty())
    };

    let from_prefs = || {
        prefs
            .filter(|p| p.copy_time_blocking)
            .and_then(|p| p.default_time_blocking)
            .filter(|s| !s.is_empty())
    };

    let sources: [&dyn Fn() -> Option<BufferSpec>; 4] =
        [&from_override, &from_previous, &from_category, &from_prefs];
    sources.iter().find_map(|source| source())
}

/// Synthesize buffer events around `event` per `spec`.
///
/// Returns `None` when the user has modified the event's time blocking by
/// hand (deliberate no-op, regardless of any cascade source) or when the
/// spec reserves nothing. Existing `pre_event_id`/`post_event_id` values
/// on the parent are reused so re-running the generator updates the same
/// buffer events instead of minting new ones.
pub fn create_buffer(event: &CalendarEvent, spec: BufferSpec) -> Option<BufferOutcome> {
    if event.user_modified_time_blocking {
        return None;
    }
    if spec.is_empty() {
        return None;
    }

    let mut parent = event.clone();
    let mut pre = None;
    let mut post = None;
    let mut applied = BufferSpec::default();

    if spec.before_minutes > 0 {
        let pre_id = parent
            .pre_event_id
            .clone()
            .unwrap_or_else(|| format!("{}#{}", Uuid::new_v4(), event.calendar_id));
        let before = chrono::Duration::minutes(spec.before_minutes);

        let mut pre_event = CalendarEvent::new(
            pre_id.clone(),
            event.user_id.clone(),
            event.calendar_id.clone(),
            event.start - before,
            event.start,
            event.timezone,
        )
        .with_title("Buffer time")
        .with_for_event_id(event.id.clone());
        pre_event.is_pre_event = true;
        pre = Some(pre_event);

        parent.pre_event_id = Some(pre_id);
        applied.before_minutes = spec.before_minutes;
    }

    if spec.after_minutes > 0 {
        let post_id = parent
            .post_event_id
            .clone()
            .unwrap_or_else(|| format!("{}#{}", Uuid::new_v4(), event.calendar_id));
        let after = chrono::Duration::minutes(spec.after_minutes);

        let mut post_event = CalendarEvent::new(
            post_id.clone(),
            event.user_id.clone(),
            event.calendar_id.clone(),
            event.end,
            event.end + after,
            event.timezone,
        )
        .with_title("Buffer time")
        .with_for_event_id(event.id.clone());
        post_event.is_post_event = true;
        post = Some(post_event);

        parent.post_event_id = Some(post_id);
        applied.after_minutes = spec.after_minutes;
    }

    parent.time_blocking = Some(applied);

    Some(BufferOutcome { parent, pre, post })
}

/// Call site: buffers from a matched category's defaults. Skipped when the
/// previous linked event copies its own buffer forward (that source owns
/// the decision) or when the category copies from history.
pub fn buffer_from_category_defaults(
    event: &CalendarEvent,
    category: &Category,
    previous_event: Option<&CalendarEvent>,
) -> Option<BufferOutcome> {
    if previous_event.is_some_and(|p| p.copy_time_blocking) {
        return None;
    }
    let spec = resolve_buffer_spec(None, None, Some(category), None)?;
    create_buffer(event, spec)
}

/// Call site: buffers copied from the previous linked event.
pub fn buffer_from_previous_event(
    event: &CalendarEvent,
    previous_event: &CalendarEvent,
) -> Option<BufferOutcome> {
    let spec = resolve_buffer_spec(None, Some(previous_event), None, None)?;
    create_buffer(event, spec)
}
