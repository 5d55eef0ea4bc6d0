use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minutes since local midnight — the time unit of the whole pipeline.
pub type Min = i32;

pub const MINUTES_PER_DAY: Min = 24 * 60;

/// Half-open interval `[start, end)` in minutes of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Min,
    pub end: Min,
}

impl Span {
    pub fn new(start: Min, end: Min) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_min(&self) -> Min {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Minute of day for a wall-clock time. Seconds are truncated.
pub fn minute_of_day(t: NaiveTime) -> Min {
    (t.hour() * 60 + t.minute()) as Min
}

/// Local datetime at `minute` past midnight of `date`. Minute 1440 rolls
/// over to midnight of the next day.
pub fn datetime_at(date: NaiveDate, minute: Min) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + chrono::Duration::minutes(minute as i64)
}

// ── Weekly hours ─────────────────────────────────────────────────

/// One weekday's schedule. The closed case is explicit so consumers can't
/// fall through on absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayHours {
    #[default]
    Closed,
    Open {
        open: Min,
        close: Min,
        /// Lunch break inside `[open, close)`; splits the day in two.
        lunch: Option<Span>,
    },
}

/// Business-level default schedule — total over all seven weekdays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHours {
    days: [DayHours; 7],
}

impl WeeklyHours {
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn day(&self, weekday: Weekday) -> &DayHours {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn set_day(&mut self, weekday: Weekday, hours: DayHours) {
        self.days[weekday.num_days_from_monday() as usize] = hours;
    }

    pub fn days(&self) -> &[DayHours; 7] {
        &self.days
    }
}

/// Employee-level schedule override — sparse, only overridden weekdays set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyOverride {
    days: [Option<DayHours>; 7],
}

impl WeeklyOverride {
    pub fn day(&self, weekday: Weekday) -> Option<&DayHours> {
        self.days[weekday.num_days_from_monday() as usize].as_ref()
    }

    pub fn set_day(&mut self, weekday: Weekday, hours: Option<DayHours>) {
        self.days[weekday.num_days_from_monday() as usize] = hours;
    }
}

// ── Schedule exceptions ──────────────────────────────────────────

/// Dated one-off override for a single employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// Whole day off regardless of working hours.
    Unavailable,
    /// Replaces (not intersects) the resolved working hours for the day.
    ModifiedHours(Span),
}

impl ExceptionKind {
    pub fn tag(&self) -> ExceptionTag {
        match self {
            ExceptionKind::Unavailable => ExceptionTag::Unavailable,
            ExceptionKind::ModifiedHours(_) => ExceptionTag::ModifiedHours,
        }
    }
}

/// Kind discriminant used as a consolidation grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExceptionTag {
    Unavailable,
    ModifiedHours,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleException {
    pub id: Ulid,
    pub employee_id: Ulid,
    pub date: NaiveDate,
    pub kind: ExceptionKind,
    pub reason: Option<String>,
}

// ── Appointments & services ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    NoShow,
    Completed,
}

impl AppointmentStatus {
    /// Only pending and confirmed appointments occupy the calendar.
    pub fn blocks(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Ulid,
    pub employee_id: Ulid,
    pub service_id: Ulid,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: AppointmentStatus,
}

impl Appointment {
    /// The portion of this appointment falling on `date`, as a minute span.
    /// Appointments crossing midnight contribute their on-date part only.
    pub fn span_on(&self, date: NaiveDate) -> Option<Span> {
        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = day_start + chrono::Duration::days(1);
        let s = self.start.max(day_start);
        let e = self.end.min(day_end);
        if s >= e {
            return None;
        }
        let start = (s - day_start).num_minutes() as Min;
        let end = (e - day_start).num_minutes() as Min;
        Some(Span::new(start, end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Ulid,
    pub business_id: Ulid,
    pub name: String,
    pub duration_min: Min,
    /// Setup time reserved before each booked interval of this service.
    pub buffer_before_min: Min,
    /// Cleanup time reserved after each booked interval of this service.
    pub buffer_after_min: Min,
    /// Employees qualified to perform this service.
    pub employee_ids: Vec<Ulid>,
}

/// Slot discretization granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotInterval {
    Fifteen,
    Thirty,
    Sixty,
}

impl SlotInterval {
    pub fn minutes(self) -> Min {
        match self {
            SlotInterval::Fifteen => 15,
            SlotInterval::Thirty => 30,
            SlotInterval::Sixty => 60,
        }
    }
}

// ── Engine state ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BusinessState {
    pub id: Ulid,
    pub name: String,
    pub weekly_hours: WeeklyHours,
    /// Booking horizon: bookable dates are `[today, today + max_advance_days]`.
    pub max_advance_days: u32,
}

/// Per-employee mutable state — the unit of locking for booking commits.
#[derive(Debug, Clone)]
pub struct EmployeeState {
    pub id: Ulid,
    pub business_id: Ulid,
    pub name: String,
    pub weekly_override: WeeklyOverride,
    /// Exception rows as delivered by upstream, keyed by date. More than one
    /// row per date is upstream corruption; the applier rejects it.
    pub exceptions: BTreeMap<NaiveDate, Vec<ScheduleException>>,
    /// All appointments, sorted by start.
    pub appointments: Vec<Appointment>,
}

impl EmployeeState {
    pub fn new(id: Ulid, business_id: Ulid, name: String) -> Self {
        Self {
            id,
            business_id,
            name,
            weekly_override: WeeklyOverride::default(),
            exceptions: BTreeMap::new(),
            appointments: Vec::new(),
        }
    }

    /// Insert appointment maintaining sort order by start.
    pub fn insert_appointment(&mut self, appointment: Appointment) {
        let pos = self
            .appointments
            .binary_search_by_key(&appointment.start, |a| a.start)
            .unwrap_or_else(|e| e);
        self.appointments.insert(pos, appointment);
    }

    pub fn appointment_mut(&mut self, id: Ulid) -> Option<&mut Appointment> {
        self.appointments.iter_mut().find(|a| a.id == id)
    }

    pub fn exceptions_on(&self, date: NaiveDate) -> &[ScheduleException] {
        self.exceptions.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Confirmed appointments touching `date` — the load-balancing signal.
    pub fn confirmed_count_on(&self, date: NaiveDate) -> usize {
        self.appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Confirmed && a.span_on(date).is_some())
            .count()
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub id: Ulid,
    pub name: String,
}

/// One bookable start time, with the employees free at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Minute of day.
    pub time: Min,
    pub available: bool,
    pub available_employees: Vec<EmployeeRef>,
    pub available_employee_count: usize,
}

/// Exceptions sharing `(date, kind, reason)`, collapsed into one row for
/// bulk administration. A view over the source rows, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedExceptionGroup {
    pub date: NaiveDate,
    pub kind: ExceptionTag,
    pub reason: Option<String>,
    pub employee_ids: Vec<Ulid>,
    pub employee_names: Vec<String>,
    pub source_exception_ids: Vec<Ulid>,
}

/// Contiguous run of consecutive dates whose groups share `(kind, reason)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: ExceptionTag,
    pub reason: Option<String>,
    pub employee_ids: Vec<Ulid>,
    pub employee_names: Vec<String>,
    pub source_exception_ids: Vec<Ulid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn span_basics() {
        let s = Span::new(540, 1080);
        assert_eq!(s.duration_min(), 540);
        assert!(s.contains_span(&Span::new(600, 700)));
        assert!(!s.contains_span(&Span::new(500, 700)));
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(540, 600);
        let b = Span::new(570, 630);
        let c = Span::new(600, 660);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn minute_of_day_truncates_seconds() {
        let t = NaiveTime::from_hms_opt(9, 30, 59).unwrap();
        assert_eq!(minute_of_day(t), 9 * 60 + 30);
    }

    #[test]
    fn datetime_at_rolls_over_midnight() {
        let d = date(2025, 3, 10);
        let dt = datetime_at(d, MINUTES_PER_DAY);
        assert_eq!(dt.date(), date(2025, 3, 11));
        assert_eq!(dt.time(), NaiveTime::MIN);
    }

    #[test]
    fn weekly_hours_set_and_get() {
        let mut wh = WeeklyHours::closed();
        assert_eq!(*wh.day(Weekday::Mon), DayHours::Closed);
        wh.set_day(
            Weekday::Mon,
            DayHours::Open { open: 540, close: 1080, lunch: None },
        );
        assert!(matches!(wh.day(Weekday::Mon), DayHours::Open { .. }));
        assert_eq!(*wh.day(Weekday::Tue), DayHours::Closed);
    }

    #[test]
    fn appointment_span_on_same_day() {
        let d = date(2025, 3, 10);
        let appt = Appointment {
            id: Ulid::new(),
            employee_id: Ulid::new(),
            service_id: Ulid::new(),
            start: datetime_at(d, 600),
            end: datetime_at(d, 660),
            status: AppointmentStatus::Confirmed,
        };
        assert_eq!(appt.span_on(d), Some(Span::new(600, 660)));
        assert_eq!(appt.span_on(date(2025, 3, 11)), None);
    }

    #[test]
    fn appointment_span_on_clips_midnight_crossing() {
        let d = date(2025, 3, 10);
        let appt = Appointment {
            id: Ulid::new(),
            employee_id: Ulid::new(),
            service_id: Ulid::new(),
            start: datetime_at(d, 1410), // 23:30
            end: datetime_at(d, 1470),   // 00:30 next day
            status: AppointmentStatus::Pending,
        };
        assert_eq!(appt.span_on(d), Some(Span::new(1410, 1440)));
        assert_eq!(appt.span_on(date(2025, 3, 11)), Some(Span::new(0, 30)));
    }

    #[test]
    fn appointment_ordering() {
        let d = date(2025, 3, 10);
        let mut emp = EmployeeState::new(Ulid::new(), Ulid::new(), "A".into());
        for (s, e) in [(700, 760), (540, 600), (620, 680)] {
            emp.insert_appointment(Appointment {
                id: Ulid::new(),
                employee_id: emp.id,
                service_id: Ulid::new(),
                start: datetime_at(d, s),
                end: datetime_at(d, e),
                status: AppointmentStatus::Confirmed,
            });
        }
        assert_eq!(emp.appointments[0].span_on(d).unwrap().start, 540);
        assert_eq!(emp.appointments[1].span_on(d).unwrap().start, 620);
        assert_eq!(emp.appointments[2].span_on(d).unwrap().start, 700);
    }

    #[test]
    fn confirmed_count_ignores_cancelled() {
        let d = date(2025, 3, 10);
        let mut emp = EmployeeState::new(Ulid::new(), Ulid::new(), "A".into());
        for (s, status) in [
            (540, AppointmentStatus::Confirmed),
            (600, AppointmentStatus::Cancelled),
            (660, AppointmentStatus::Pending),
            (720, AppointmentStatus::Confirmed),
        ] {
            emp.insert_appointment(Appointment {
                id: Ulid::new(),
                employee_id: emp.id,
                service_id: Ulid::new(),
                start: datetime_at(d, s),
                end: datetime_at(d, s + 30),
                status,
            });
        }
        assert_eq!(emp.confirmed_count_on(d), 2);
    }

    #[test]
    fn status_blocking() {
        assert!(AppointmentStatus::Pending.blocks());
        assert!(AppointmentStatus::Confirmed.blocks());
        assert!(!AppointmentStatus::Cancelled.blocks());
        assert!(!AppointmentStatus::NoShow.blocks());
        assert!(!AppointmentStatus::Completed.blocks());
    }

    #[test]
    fn timeslot_serializes_for_api_consumers() {
        let slot = TimeSlot {
            time: 540,
            available: true,
            available_employees: vec![EmployeeRef { id: Ulid::new(), name: "Anna".into() }],
            available_employee_count: 1,
        };
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["time"], 540);
        assert_eq!(json["available_employee_count"], 1);
        let back: TimeSlot = serde_json::from_value(json).unwrap();
        assert_eq!(back, slot);
    }
}
