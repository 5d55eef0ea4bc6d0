use chrono::{Datelike, Local, NaiveDate};
use ulid::Ulid;

use crate::limits::MAX_CONSOLIDATION_DAYS;
use crate::model::{
    Appointment, BusinessState, ConsolidatedExceptionGroup, EmployeeRef, EmployeeState, Min,
    Service, SlotInterval, Span, TimeSlot,
};
use crate::observability;

use super::{Engine, EngineError, SharedEmployeeState, conflict, consolidate, exceptions, hours, slots};

/// Bookable dates are `[today, today + max_advance_days]`, inclusive.
pub(super) fn within_horizon(date: NaiveDate, today: NaiveDate, max_advance_days: u32) -> bool {
    date >= today && date <= today + chrono::Duration::days(max_advance_days as i64)
}

impl Engine {
    /// Aggregated bookable slots for a service on one date. With an explicit
    /// employee the result covers only that employee; otherwise every
    /// qualified employee contributes. Dates outside the booking horizon
    /// yield an empty list, not an error.
    pub async fn available_slots(
        &self,
        business_id: Ulid,
        service_id: Ulid,
        date: NaiveDate,
        employee: Option<Ulid>,
        slot_interval: SlotInterval,
    ) -> Result<Vec<TimeSlot>, EngineError> {
        self.available_slots_as_of(
            business_id,
            service_id,
            date,
            employee,
            slot_interval,
            Local::now().date_naive(),
        )
        .await
    }

    /// `available_slots` with an explicit "today", so horizon behavior is
    /// deterministic under test.
    pub async fn available_slots_as_of(
        &self,
        business_id: Ulid,
        service_id: Ulid,
        date: NaiveDate,
        employee: Option<Ulid>,
        slot_interval: SlotInterval,
        today: NaiveDate,
    ) -> Result<Vec<TimeSlot>, EngineError> {
        let business = self.business(business_id)?;
        let service = self.service(service_id)?;
        if service.business_id != business_id {
            return Err(EngineError::NotFound(service_id));
        }
        metrics::counter!(observability::AVAILABILITY_QUERIES_TOTAL).increment(1);

        // Qualification is checked before the horizon so the error surface
        // does not depend on the date.
        let candidates: Vec<Ulid> = match employee {
            Some(id) => {
                if !service.employee_ids.contains(&id) {
                    return Err(EngineError::Validation("employee not qualified for service"));
                }
                vec![id]
            }
            None => service.employee_ids.clone(),
        };

        if !within_horizon(date, today, business.max_advance_days) {
            return Ok(Vec::new());
        }

        let mut per_employee = Vec::with_capacity(candidates.len());
        for id in candidates {
            let emp = self.get_employee(&id).ok_or(EngineError::NotFound(id))?;
            let guard = emp.read().await;
            if guard.business_id != business_id {
                return Err(EngineError::NotFound(id));
            }
            let times =
                self.employee_slot_times(&business, &service, &guard, date, slot_interval)?;
            per_employee.push((
                EmployeeRef { id: guard.id, name: guard.name.clone() },
                times,
            ));
        }

        let merged = slots::merge_employee_slots(per_employee);
        metrics::histogram!(observability::SLOTS_RETURNED).record(merged.len() as f64);
        Ok(merged)
    }

    /// Resolver → exception applier → conflict filter for one employee/date.
    /// Pure over the locked snapshot; also re-run under write locks at
    /// commit time.
    pub(super) fn employee_free_spans(
        &self,
        business: &BusinessState,
        emp: &EmployeeState,
        date: NaiveDate,
    ) -> Result<Vec<Span>, EngineError> {
        let resolved = hours::resolve_day(
            &business.weekly_hours,
            Some(&emp.weekly_override),
            date.weekday(),
        );
        let available = exceptions::apply_exceptions(resolved, emp.exceptions_on(date))?;
        if available.is_empty() {
            return Ok(Vec::new());
        }
        let occupied = conflict::occupied_spans(emp, date, |sid| self.service_buffers(sid));
        Ok(conflict::free_spans(&available, &occupied))
    }

    /// Candidate start times for one employee, mirroring what the merged
    /// listing would show for them.
    pub(super) fn employee_slot_times(
        &self,
        business: &BusinessState,
        service: &Service,
        emp: &EmployeeState,
        date: NaiveDate,
        slot_interval: SlotInterval,
    ) -> Result<Vec<Min>, EngineError> {
        let free = self.employee_free_spans(business, emp, date)?;
        Ok(slots::generate_slots(&free, slot_interval.minutes(), service.duration_min))
    }

    /// Exception rows in `[date_from, date_to]` collapsed into one group per
    /// `(date, kind, reason)`. Feed the result to [`super::merge_ranges`]
    /// for the date-range view.
    pub async fn consolidate_exceptions(
        &self,
        business_id: Ulid,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<ConsolidatedExceptionGroup>, EngineError> {
        if date_to < date_from {
            return Err(EngineError::InvalidRange("date_to before date_from"));
        }
        if date_to.signed_duration_since(date_from).num_days() >= MAX_CONSOLIDATION_DAYS {
            return Err(EngineError::LimitExceeded("consolidation window too wide"));
        }
        if !self.businesses.contains_key(&business_id) {
            return Err(EngineError::NotFound(business_id));
        }
        metrics::counter!(observability::CONSOLIDATION_QUERIES_TOTAL).increment(1);

        // Clone the Arcs out first so no shard lock is held across an await.
        let emps: Vec<SharedEmployeeState> =
            self.employees.iter().map(|e| e.value().clone()).collect();

        let mut rows = Vec::new();
        for emp in emps {
            let guard = emp.read().await;
            if guard.business_id != business_id {
                continue;
            }
            for (_, day_rows) in guard.exceptions.range(date_from..=date_to) {
                for row in day_rows {
                    rows.push((row.clone(), guard.name.clone()));
                }
            }
        }
        Ok(consolidate::group_exceptions(&rows))
    }

    /// All appointments touching `date` for one employee, any status.
    pub async fn appointments_on(
        &self,
        employee_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, EngineError> {
        let emp = self
            .get_employee(&employee_id)
            .ok_or(EngineError::NotFound(employee_id))?;
        let guard = emp.read().await;
        Ok(guard
            .appointments
            .iter()
            .filter(|a| a.span_on(date).is_some())
            .cloned()
            .collect())
    }
}
