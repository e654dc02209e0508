//! Tests for event partitioning and buffer-part splicing.

use chrono::{DateTime, NaiveDateTime, Utc};

use prep_engine::parts::{
    merge_all_post_buffer_parts, merge_all_pre_buffer_parts, merge_parts_for_post_buffer,
    merge_parts_for_pre_buffer, partition,
};
use prep_engine::types::{CalendarEvent, EventPart, Grain};
use prep_engine::PrepError;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn event(id: &str, start: &str, end: &str) -> CalendarEvent {
    CalendarEvent::new(
        id,
        "user-1",
        "cal-1",
        start.parse::<DateTime<Utc>>().unwrap(),
        end.parse::<DateTime<Utc>>().unwrap(),
        chrono_tz::UTC,
    )
}

fn naive(s: &str) -> NaiveDateTime {
    s.parse().unwrap()
}

/// Check the group invariant: gap-free 1..N numbering, uniform
/// `last_part`, and contiguous chronology in part order.
fn assert_group_invariant(parts: &[EventPart]) {
    let mut sorted = parts.to_vec();
    sorted.sort_by_key(|p| p.part);

    let total = sorted.len() as u32;
    for (i, p) in sorted.iter().enumerate() {
        assert_eq!(p.part, i as u32 + 1, "part numbering has a gap");
        assert_eq!(p.last_part, total, "last_part disagrees within the group");
    }
    for pair in sorted.windows(2) {
        assert_eq!(pair[0].end, pair[1].start, "parts are not contiguous");
    }
}

// ── Test 1: Plain partitioning ──────────────────────────────────────────────

#[test]
fn one_hour_event_splits_into_four_fine_parts() {
    let e = event("m1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    let parts = partition(&e, "host-1", Grain::Fine).unwrap();

    assert_eq!(parts.len(), 4);
    for (i, p) in parts.iter().enumerate() {
        assert_eq!(p.part, i as u32 + 1);
        assert_eq!(p.last_part, 4);
        assert_eq!(p.meeting_part, i as u32 + 1);
        assert_eq!(p.meeting_last_part, 4);
        assert_eq!((p.end - p.start).num_minutes(), 15);
        assert_eq!(p.group_id, "m1");
        assert_eq!(p.event_id, "m1");
        assert_eq!(p.host_id, "host-1");
    }
    assert_eq!(parts[0].start, naive("2026-03-16T09:00:00"));
    assert_eq!(parts[3].end, naive("2026-03-16T10:00:00"));
    assert_group_invariant(&parts);
}

#[test]
fn remainders_become_a_shorter_final_part() {
    let e = event("m1", "2026-03-16T09:00:00Z", "2026-03-16T09:50:00Z");
    let parts = partition(&e, "host-1", Grain::Fine).unwrap();

    assert_eq!(parts.len(), 4);
    assert_eq!((parts[3].end - parts[3].start).num_minutes(), 5);
    assert_eq!(parts[3].last_part, 4);
    assert_group_invariant(&parts);

    let total: i64 = parts.iter().map(|p| (p.end - p.start).num_minutes()).sum();
    assert_eq!(total, 50);
}

#[test]
fn sub_grain_events_get_a_single_part() {
    let e = event("m1", "2026-03-16T09:00:00Z", "2026-03-16T09:10:00Z");
    let parts = partition(&e, "host-1", Grain::Fine).unwrap();

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].part, 1);
    assert_eq!(parts[0].last_part, 1);
    assert_eq!((parts[0].end - parts[0].start).num_minutes(), 10);
}

#[test]
fn coarse_grain_partitioning() {
    let e = event("m1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    let parts = partition(&e, "host-1", Grain::Coarse).unwrap();
    assert_eq!(parts.len(), 2);
    assert_group_invariant(&parts);
}

#[test]
fn zero_or_negative_duration_is_a_computation_error() {
    let zero = event("z", "2026-03-16T09:00:00Z", "2026-03-16T09:00:00Z");
    assert!(matches!(
        partition(&zero, "host-1", Grain::Fine),
        Err(PrepError::Computation(_))
    ));

    let negative = event("n", "2026-03-16T10:00:00Z", "2026-03-16T09:00:00Z");
    assert!(matches!(
        partition(&negative, "host-1", Grain::Fine),
        Err(PrepError::Computation(_))
    ));
}

#[test]
fn parts_use_the_event_local_wall_clock() {
    let mut e = event("m1", "2026-03-16T14:00:00Z", "2026-03-16T15:00:00Z");
    e.timezone = "America/New_York".parse().unwrap();
    let parts = partition(&e, "host-1", Grain::Fine).unwrap();

    // 14:00 UTC is 10:00 in New York in March 2026.
    assert_eq!(parts[0].start, naive("2026-03-16T10:00:00"));
}

// ── Test 2: Pre-buffer splicing ─────────────────────────────────────────────

fn meeting_with_pre_buffer() -> Vec<EventPart> {
    let mut meeting = event("m1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    meeting.pre_event_id = Some("pre1".to_string());

    let mut pre = event("pre1", "2026-03-16T08:30:00Z", "2026-03-16T09:00:00Z");
    pre.is_pre_event = true;
    pre.for_event_id = Some("m1".to_string());

    let mut parts = partition(&meeting, "host-1", Grain::Fine).unwrap();
    parts.extend(partition(&pre, "host-1", Grain::Fine).unwrap());
    parts
}

#[test]
fn pre_buffer_parts_are_spliced_in_front_and_renumbered() {
    let parts = meeting_with_pre_buffer();
    let merged = merge_parts_for_pre_buffer(&parts, "m1");

    assert_eq!(merged.len(), 6);
    assert_group_invariant(&merged);

    // Buffer first, parent after.
    assert!(merged[0].is_pre_event);
    assert!(merged[1].is_pre_event);
    assert_eq!(merged[2].event_id, "m1");
    assert_eq!(merged[2].part, 3);

    // All parts share the fresh group id.
    let group = &merged[0].group_id;
    assert_ne!(group, "m1");
    assert!(merged.iter().all(|p| &p.group_id == group));

    // Meeting-internal numbering is untouched by the splice.
    assert_eq!(merged[2].meeting_part, 1);
    assert_eq!(merged[5].meeting_part, 4);
}

#[test]
fn multi_event_pre_merge_rewrites_each_group_once() {
    let parts = meeting_with_pre_buffer();
    let standalone = partition(
        &event("m2", "2026-03-16T11:00:00Z", "2026-03-16T11:30:00Z"),
        "host-1",
        Grain::Fine,
    )
    .unwrap();

    let mut all = parts;
    all.extend(standalone);
    let merged = merge_all_pre_buffer_parts(all);

    // 2 pre + 4 meeting + 2 standalone.
    assert_eq!(merged.len(), 8);

    // The standalone event keeps its own numbering and group.
    let m2: Vec<&EventPart> = merged.iter().filter(|p| p.event_id == "m2").collect();
    assert_eq!(m2.len(), 2);
    assert!(m2.iter().all(|p| p.group_id == "m2" && p.last_part == 2));

    // No duplicated copies of the rewritten group survive.
    let m1_count = merged.iter().filter(|p| p.event_id == "m1").count();
    assert_eq!(m1_count, 4);
}

// ── Test 3: Post-buffer splicing ────────────────────────────────────────────

#[test]
fn post_buffer_parts_are_appended_and_renumbered() {
    let meeting = event("m1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    let mut post = event("post1", "2026-03-16T10:00:00Z", "2026-03-16T10:30:00Z");
    post.is_post_event = true;
    post.for_event_id = Some("m1".to_string());

    let mut parts = partition(&meeting, "host-1", Grain::Fine).unwrap();
    parts.extend(partition(&post, "host-1", Grain::Fine).unwrap());

    let merged = merge_parts_for_post_buffer(&parts, "m1");
    assert_eq!(merged.len(), 6);
    assert_group_invariant(&merged);
    assert_eq!(merged[0].event_id, "m1");
    assert!(merged[4].is_post_event);
    assert!(merged[5].is_post_event);
}

// ── Test 4: Pre + post chains agree on one last_part ────────────────────────

#[test]
fn post_merge_corrects_an_already_merged_pre_chain() {
    let mut meeting = event("m1", "2026-03-16T09:00:00Z", "2026-03-16T10:00:00Z");
    meeting.pre_event_id = Some("pre1".to_string());
    meeting.post_event_id = Some("post1".to_string());

    let mut pre = event("pre1", "2026-03-16T08:30:00Z", "2026-03-16T09:00:00Z");
    pre.is_pre_event = true;
    pre.for_event_id = Some("m1".to_string());

    let mut post = event("post1", "2026-03-16T10:00:00Z", "2026-03-16T10:30:00Z");
    post.is_post_event = true;
    post.for_event_id = Some("m1".to_string());

    let mut parts = partition(&meeting, "host-1", Grain::Fine).unwrap();
    parts.extend(partition(&pre, "host-1", Grain::Fine).unwrap());
    parts.extend(partition(&post, "host-1", Grain::Fine).unwrap());

    let merged = merge_all_post_buffer_parts(merge_all_pre_buffer_parts(parts));

    // 2 pre + 4 meeting + 2 post in one consistent group.
    assert_eq!(merged.len(), 8);
    assert_group_invariant(&merged);

    let group = &merged[0].group_id;
    assert!(merged.iter().all(|p| &p.group_id == group));

    // Chronology across the whole chain: pre parts lead, post parts trail.
    let mut sorted = merged.clone();
    sorted.sort_by_key(|p| p.part);
    assert!(sorted[0].is_pre_event && sorted[1].is_pre_event);
    assert_eq!(sorted[2].event_id, "m1");
    assert_eq!(sorted[5].event_id, "m1");
    assert!(sorted[6].is_post_event && sorted[7].is_post_event);
    assert_eq!(sorted[0].start, naive("2026-03-16T08:30:00"));
    assert_eq!(sorted[7].end, naive("2026-03-16T10:30:00"));
}
