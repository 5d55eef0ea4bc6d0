use chrono::Weekday;

use crate::model::{DayHours, MINUTES_PER_DAY, Span, WeeklyHours, WeeklyOverride};

use super::EngineError;

/// Resolve the open spans for one date. The employee's weekday override wins
/// over the business default; a lunch break splits the day in two.
pub(super) fn resolve_day(
    business: &WeeklyHours,
    employee: Option<&WeeklyOverride>,
    weekday: Weekday,
) -> Vec<Span> {
    let day = employee
        .and_then(|o| o.day(weekday))
        .unwrap_or_else(|| business.day(weekday));
    day_spans(day)
}

/// Expand one `DayHours` into zero, one, or two open spans.
pub(super) fn day_spans(day: &DayHours) -> Vec<Span> {
    match day {
        DayHours::Closed => Vec::new(),
        DayHours::Open { open, close, lunch } => match lunch {
            Some(l) => {
                let mut spans = Vec::with_capacity(2);
                if *open < l.start {
                    spans.push(Span::new(*open, l.start));
                }
                if l.end < *close {
                    spans.push(Span::new(l.end, *close));
                }
                spans
            }
            None => vec![Span::new(*open, *close)],
        },
    }
}

pub(super) fn validate_day_hours(day: &DayHours) -> Result<(), EngineError> {
    let DayHours::Open { open, close, lunch } = day else {
        return Ok(());
    };
    if *open < 0 || *close > MINUTES_PER_DAY {
        return Err(EngineError::Validation("day hours outside 00:00..24:00"));
    }
    if open >= close {
        return Err(EngineError::Validation("open must be before close"));
    }
    if let Some(l) = lunch {
        if l.start >= l.end {
            return Err(EngineError::Validation("lunch start must be before lunch end"));
        }
        if l.start < *open || l.end > *close {
            return Err(EngineError::Validation("lunch must lie within open hours"));
        }
    }
    Ok(())
}
