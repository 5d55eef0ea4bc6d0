use chrono::NaiveDate;
use ulid::Ulid;

use crate::interval;
use crate::model::{EmployeeState, MINUTES_PER_DAY, Min, Span};

/// Spans occupied by an employee's blocking appointments on `date`, each
/// expanded by its own service's buffers. Buffers protect the existing
/// appointment's setup/cleanup time, so they come from the booked service,
/// not the one being newly requested. Returns spans sorted by start; edges
/// may extend past the day and are clamped later.
pub(super) fn occupied_spans<F>(emp: &EmployeeState, date: NaiveDate, service_buffers: F) -> Vec<Span>
where
    F: Fn(Ulid) -> (Min, Min),
{
    let mut occupied = Vec::new();
    for appt in &emp.appointments {
        if !appt.status.blocks() {
            continue;
        }
        let Some(span) = appt.span_on(date) else { continue };
        let (before, after) = service_buffers(appt.service_id);
        occupied.push(Span::new(span.start - before, span.end + after));
    }
    occupied.sort_by_key(|s| s.start);
    occupied
}

/// Subtract occupied time from the available spans. Occupied edges are
/// clamped to the day window first; partial overlaps clip, never drop.
pub(super) fn free_spans(available: &[Span], occupied: &[Span]) -> Vec<Span> {
    if occupied.is_empty() {
        return available.to_vec();
    }
    let day = Span::new(0, MINUTES_PER_DAY);
    let clamped: Vec<Span> = occupied
        .iter()
        .filter_map(|o| interval::intersect(*o, day))
        .collect();
    let merged = interval::merge_sorted(&clamped);
    interval::subtract(available, &merged)
}

/// Commit-time check: the whole slot must sit inside one free span.
pub(super) fn slot_fits(free: &[Span], slot: &Span) -> bool {
    free.iter().any(|f| f.contains_span(slot))
}
