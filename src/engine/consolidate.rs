use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{ConsolidatedExceptionGroup, ExceptionRange, ExceptionTag, ScheduleException};

/// Group raw exception rows by `(date, kind, reason)`. A `None` reason is a
/// distinct key, not equal to the empty string. Output is sorted by date,
/// then kind, then reason, and is independent of input order.
pub(super) fn group_exceptions(
    rows: &[(ScheduleException, String)],
) -> Vec<ConsolidatedExceptionGroup> {
    type Key = (NaiveDate, ExceptionTag, Option<String>);
    let mut groups: HashMap<Key, Vec<(Ulid, String, Ulid)>> = HashMap::new();

    for (row, employee_name) in rows {
        groups
            .entry((row.date, row.kind.tag(), row.reason.clone()))
            .or_default()
            .push((row.employee_id, employee_name.clone(), row.id));
    }

    let mut out: Vec<ConsolidatedExceptionGroup> = groups
        .into_iter()
        .map(|((date, kind, reason), mut members)| {
            members.sort_by_key(|(employee_id, _, _)| *employee_id);
            ConsolidatedExceptionGroup {
                date,
                kind,
                reason,
                employee_ids: members.iter().map(|(id, _, _)| *id).collect(),
                employee_names: members.iter().map(|(_, name, _)| name.clone()).collect(),
                source_exception_ids: members.iter().map(|(_, _, ex)| *ex).collect(),
            }
        })
        .collect();

    out.sort_by(|a, b| {
        (a.date, a.kind, &a.reason).cmp(&(b.date, b.kind, &b.reason))
    });
    out
}

/// Merge groups into contiguous date ranges. A range extends only while
/// `(kind, reason)` match and the next date is exactly one day later; a
/// single-day gap or a reason change starts a new range.
pub fn merge_ranges(groups: &[ConsolidatedExceptionGroup]) -> Vec<ExceptionRange> {
    type Key = (ExceptionTag, Option<String>);
    let mut by_key: HashMap<Key, Vec<&ConsolidatedExceptionGroup>> = HashMap::new();
    for g in groups {
        by_key.entry((g.kind, g.reason.clone())).or_default().push(g);
    }

    let mut out = Vec::new();
    for ((kind, reason), mut run) in by_key {
        run.sort_by_key(|g| g.date);

        let mut current: Option<(NaiveDate, NaiveDate, Vec<&ConsolidatedExceptionGroup>)> = None;
        for g in run {
            match current.as_mut() {
                Some((_, end, members)) if g.date == *end + chrono::Duration::days(1) => {
                    *end = g.date;
                    members.push(g);
                }
                _ => {
                    if let Some(range) = current.take() {
                        out.push(build_range(kind, reason.clone(), range));
                    }
                    current = Some((g.date, g.date, vec![g]));
                }
            }
        }
        if let Some(range) = current.take() {
            out.push(build_range(kind, reason.clone(), range));
        }
    }

    out.sort_by(|a, b| {
        (a.start_date, a.kind, &a.reason).cmp(&(b.start_date, b.kind, &b.reason))
    });
    out
}

fn build_range(
    kind: ExceptionTag,
    reason: Option<String>,
    (start_date, end_date, members): (NaiveDate, NaiveDate, Vec<&ConsolidatedExceptionGroup>),
) -> ExceptionRange {
    // Union of employees across the range's days, keyed by id.
    let mut employees: BTreeMap<Ulid, String> = BTreeMap::new();
    let mut source_exception_ids = Vec::new();
    for g in members {
        for (id, name) in g.employee_ids.iter().zip(&g.employee_names) {
            employees.entry(*id).or_insert_with(|| name.clone());
        }
        source_exception_ids.extend_from_slice(&g.source_exception_ids);
    }
    ExceptionRange {
        start_date,
        end_date,
        kind,
        reason,
        employee_ids: employees.keys().copied().collect(),
        employee_names: employees.values().cloned().collect(),
        source_exception_ids,
    }
}
