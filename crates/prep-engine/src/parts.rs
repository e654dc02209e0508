//! Event partitioning: split events into fixed-grain, chronologically
//! numbered parts, and re-splice buffer parts into their parent's group.
//!
//! The solver schedules parts, not events; part numbering is what lets it
//! keep a meeting contiguous. Parts of one group are numbered 1..N with no
//! gaps, agree on `last_part`, and concatenated in order reconstruct the
//! source interval exactly.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::{PrepError, Result};
use crate::types::{CalendarEvent, EventPart, Grain};

fn part_from(
    event: &CalendarEvent,
    host_id: &str,
    part: u32,
    last_part: u32,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> EventPart {
    EventPart {
        group_id: event.id.clone(),
        event_id: event.id.clone(),
        user_id: event.user_id.clone(),
        host_id: host_id.to_string(),
        part,
        last_part,
        meeting_part: part,
        meeting_last_part: last_part,
        start,
        end,
        is_pre_event: event.is_pre_event,
        is_post_event: event.is_post_event,
        for_event_id: event.for_event_id.clone(),
        pre_event_id: event.pre_event_id.clone(),
        post_event_id: event.post_event_id.clone(),
        priority: event.priority,
        modifiable: event.modifiable,
        is_meeting: event.is_meeting,
        gap: event.is_break,
    }
}

/// Split an event into `floor(duration/grain)` full parts plus one
/// remainder part when the duration is not grain-aligned. Part times are
/// the event's local wall clock.
///
/// # Errors
/// [`PrepError::Computation`] for zero- or negative-duration events.
pub fn partition(event: &CalendarEvent, host_id: &str, grain: Grain) -> Result<Vec<EventPart>> {
    let minutes = (event.end - event.start).num_minutes();
    if minutes <= 0 {
        return Err(PrepError::Computation(format!(
            "cannot partition event {} with non-positive duration ({minutes}m)",
            event.id
        )));
    }

    let g = grain.minutes();
    let full = (minutes / g) as u32;
    let remainder = minutes % g;
    let total = if remainder > 0 { full + 1 } else { full };

    let local_start = event.local_start().naive_local();

    let mut parts = Vec::with_capacity(total as usize);
    for i in 0..full {
        let start = local_start + chrono::Duration::minutes(i as i64 * g);
        parts.push(part_from(
            event,
            host_id,
            i + 1,
            total,
            start,
            start + chrono::Duration::minutes(g),
        ));
    }
    if remainder > 0 {
        let start = local_start + chrono::Duration::minutes(full as i64 * g);
        parts.push(part_from(
            event,
            host_id,
            full + 1,
            total,
            start,
            start + chrono::Duration::minutes(remainder),
        ));
    }

    Ok(parts)
}

fn sorted_by_part(mut parts: Vec<EventPart>, group_id: &str) -> Vec<EventPart> {
    for p in &mut parts {
        p.group_id = group_id.to_string();
    }
    parts.sort_by_key(|p| p.part);
    parts
}

/// Splice one event's pre-buffer parts in front of the event's own parts:
/// both sets move into a fresh shared group and are renumbered 1..total.
pub fn merge_parts_for_pre_buffer(parts: &[EventPart], for_event_id: &str) -> Vec<EventPart> {
    let group_id = Uuid::new_v4().to_string();

    let buffer_parts: Vec<EventPart> = parts
        .iter()
        .filter(|p| p.is_pre_event && p.for_event_id.as_deref() == Some(for_event_id))
        .cloned()
        .collect();
    let parent_parts: Vec<EventPart> = parts
        .iter()
        .filter(|p| p.event_id == for_event_id)
        .cloned()
        .collect();

    let mut merged = sorted_by_part(buffer_parts, &group_id);
    merged.extend(sorted_by_part(parent_parts, &group_id));

    let total = merged.len() as u32;
    for (i, p) in merged.iter_mut().enumerate() {
        p.part = i as u32 + 1;
        p.last_part = total;
    }
    merged
}

/// Splice one event's post-buffer parts after the event's own parts.
///
/// When the parent already carries a renumbered pre-buffer chain (its
/// `pre_event_id` is set), the existing numbering is preserved: post parts
/// continue after the parent's previous `last_part`, and the whole
/// pre+event+post group -- including the already-merged pre chain -- gets
/// one consistent `last_part`.
pub fn merge_parts_for_post_buffer(parts: &[EventPart], for_event_id: &str) -> Vec<EventPart> {
    let group_id = Uuid::new_v4().to_string();

    let parent_parts: Vec<EventPart> = parts
        .iter()
        .filter(|p| p.event_id == for_event_id)
        .cloned()
        .collect();
    let buffer_parts: Vec<EventPart> = parts
        .iter()
        .filter(|p| p.is_post_event && p.for_event_id.as_deref() == Some(for_event_id))
        .cloned()
        .collect();

    let buffer_count = buffer_parts.len() as u32;
    let mut combined = sorted_by_part(parent_parts, &group_id);
    let parent_count = combined.len();
    combined.extend(sorted_by_part(buffer_parts, &group_id));

    let Some(first_parent) = combined.first() else {
        return combined;
    };
    let pre_event_id = if parent_count > 0 {
        first_parent.pre_event_id.clone()
    } else {
        None
    };
    let previous_last = first_parent.last_part;

    match pre_event_id {
        Some(pre_id) => {
            // Parent parts keep the numbering the pre-buffer merge gave
            // them; post parts continue the sequence.
            let new_last = previous_last + buffer_count;
            for p in &mut combined {
                p.last_part = new_last;
            }
            for (i, p) in combined[parent_count..].iter_mut().enumerate() {
                p.part = previous_last + i as u32 + 1;
            }

            let mut pre_chain: Vec<EventPart> = parts
                .iter()
                .filter(|p| p.event_id == pre_id)
                .cloned()
                .collect();
            for p in &mut pre_chain {
                p.group_id = group_id.clone();
                p.last_part = new_last;
            }

            pre_chain.extend(combined);
            pre_chain
        }
        None => {
            let total = combined.len() as u32;
            for (i, p) in combined.iter_mut().enumerate() {
                p.part = i as u32 + 1;
                p.last_part = total;
            }
            combined
        }
    }
}

fn unique_buffer_targets(parts: &[EventPart], pre: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for p in parts {
        let is_buffer = if pre { p.is_pre_event } else { p.is_post_event };
        if let (true, Some(id)) = (is_buffer, p.for_event_id.as_deref()) {
            if seen.insert(id.to_string()) {
                targets.push(id.to_string());
            }
        }
    }
    targets
}

fn replace_rewritten(parts: Vec<EventPart>, rewritten: Vec<EventPart>) -> Vec<EventPart> {
    let rewritten_events: HashSet<&str> = rewritten.iter().map(|p| p.event_id.as_str()).collect();
    let mut out: Vec<EventPart> = parts
        .into_iter()
        .filter(|p| !rewritten_events.contains(p.event_id.as_str()))
        .collect();
    out.extend(rewritten);
    out
}

/// Apply the pre-buffer splice across all events, one rewrite per distinct
/// buffer target: stale copies of the rewritten groups are dropped before
/// the merged versions are appended.
pub fn merge_all_pre_buffer_parts(parts: Vec<EventPart>) -> Vec<EventPart> {
    let targets = unique_buffer_targets(&parts, true);

    let mut rewritten = Vec::new();
    for target in &targets {
        rewritten.extend(merge_parts_for_pre_buffer(&parts, target));
    }

    replace_rewritten(parts, rewritten)
}

/// Post-buffer counterpart of [`merge_all_pre_buffer_parts`]. Run after
/// the pre pass so already-renumbered pre chains are corrected rather than
/// renumbered from scratch.
pub fn merge_all_post_buffer_parts(parts: Vec<EventPart>) -> Vec<EventPart> {
    let targets = unique_buffer_targets(&parts, false);

    let mut rewritten = Vec::new();
    for target in &targets {
        rewritten.extend(merge_parts_for_post_buffer(&parts, target));
    }

    replace_rewritten(parts, rewritten)
}
