use crate::model::{ExceptionKind, ScheduleException, Span};

use super::EngineError;

/// Overlay the day's exception (if any) onto the resolved working spans.
///
/// `Unavailable` wipes the day. `ModifiedHours` replaces the resolved spans
/// outright — an exception can grant hours on a day the schedule is closed.
/// The data model permits at most one row per employee/date; seeing more
/// means the upstream store is corrupt and the request must fail loudly.
pub(super) fn apply_exceptions(
    resolved: Vec<Span>,
    rows: &[ScheduleException],
) -> Result<Vec<Span>, EngineError> {
    match rows {
        [] => Ok(resolved),
        [row] => Ok(match &row.kind {
            ExceptionKind::Unavailable => Vec::new(),
            ExceptionKind::ModifiedHours(span) => vec![*span],
        }),
        _ => {
            tracing::error!(
                employee = %rows[0].employee_id,
                date = %rows[0].date,
                rows = rows.len(),
                "multiple schedule exceptions for one employee/date"
            );
            Err(EngineError::InvariantViolation(
                "more than one schedule exception for employee/date",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ulid::Ulid;

    fn row(kind: ExceptionKind) -> ScheduleException {
        ScheduleException {
            id: Ulid::new(),
            employee_id: Ulid::new(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            kind,
            reason: None,
        }
    }

    #[test]
    fn no_exception_passes_through() {
        let resolved = vec![Span::new(540, 720), Span::new(780, 1080)];
        assert_eq!(
            apply_exceptions(resolved.clone(), &[]).unwrap(),
            resolved
        );
    }

    #[test]
    fn unavailable_wipes_the_day() {
        let resolved = vec![Span::new(540, 1080)];
        let rows = [row(ExceptionKind::Unavailable)];
        assert!(apply_exceptions(resolved, &rows).unwrap().is_empty());
    }

    #[test]
    fn modified_hours_replaces_not_intersects() {
        // Day resolved closed — the exception still grants 10:00–14:00.
        let rows = [row(ExceptionKind::ModifiedHours(Span::new(600, 840)))];
        assert_eq!(
            apply_exceptions(Vec::new(), &rows).unwrap(),
            vec![Span::new(600, 840)]
        );
        // And it replaces a wider resolved day rather than intersecting.
        let rows = [row(ExceptionKind::ModifiedHours(Span::new(600, 840)))];
        assert_eq!(
            apply_exceptions(vec![Span::new(480, 1200)], &rows).unwrap(),
            vec![Span::new(600, 840)]
        );
    }

    #[test]
    fn duplicate_rows_are_an_invariant_violation() {
        let rows = [
            row(ExceptionKind::Unavailable),
            row(ExceptionKind::ModifiedHours(Span::new(600, 840))),
        ];
        let err = apply_exceptions(vec![Span::new(540, 1080)], &rows).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }
}
