//! Hard input limits. Exceeding any of these is a caller error, not a
//! capacity tuning knob.

/// Max length of business/employee/service names.
pub const MAX_NAME_LEN: usize = 256;

/// Max length of a schedule-exception reason.
pub const MAX_REASON_LEN: usize = 512;

/// Max employees qualified for one service (aggregator fan-out bound).
pub const MAX_EMPLOYEES_PER_SERVICE: usize = 64;

/// Max width of a consolidation query window, in days.
pub const MAX_CONSOLIDATION_DAYS: i64 = 366;

/// Upper bound for a business's advance-booking horizon, in days.
pub const MAX_ADVANCE_DAYS_CAP: u32 = 365;

/// Max appointments held per employee.
pub const MAX_APPOINTMENTS_PER_EMPLOYEE: usize = 10_000;
