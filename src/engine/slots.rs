use std::collections::BTreeMap;

use crate::model::{EmployeeRef, Min, Span, TimeSlot};

/// Discretize free spans into candidate start times. Starts are aligned to
/// multiples of `step` from midnight; a slot is only offered if the entire
/// service duration fits inside one free span.
pub(super) fn generate_slots(free: &[Span], step: Min, duration: Min) -> Vec<Min> {
    debug_assert!(step > 0 && duration > 0);
    let mut out = Vec::new();
    for span in free {
        let mut t = next_boundary(span.start, step);
        while t + duration <= span.end {
            out.push(t);
            t += step;
        }
    }
    out
}

/// Round `t` up to the next multiple of `step`.
fn next_boundary(t: Min, step: Min) -> Min {
    (t + step - 1) / step * step
}

/// Merge per-employee slot lists into one time-keyed list. Each slot carries
/// the employees free at that time, sorted by id for determinism.
pub(super) fn merge_employee_slots(per_employee: Vec<(EmployeeRef, Vec<Min>)>) -> Vec<TimeSlot> {
    let mut by_time: BTreeMap<Min, Vec<EmployeeRef>> = BTreeMap::new();
    for (emp, times) in per_employee {
        for t in times {
            by_time.entry(t).or_default().push(emp.clone());
        }
    }
    by_time
        .into_iter()
        .map(|(time, mut employees)| {
            employees.sort_by_key(|e| e.id);
            let count = employees.len();
            TimeSlot {
                time,
                available: count > 0,
                available_employees: employees,
                available_employee_count: count,
            }
        })
        .collect()
}
