use std::sync::Arc;

use chrono::{Local, NaiveDate, Weekday};
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::{
    Appointment, AppointmentStatus, BusinessState, DayHours, EmployeeState, MINUTES_PER_DAY, Min,
    ScheduleException, Service, Span, WeeklyHours, datetime_at,
};
use crate::observability;

use super::queries::within_horizon;
use super::{Engine, EngineError, conflict, hours};

impl Engine {
    // ── Snapshot maintenance (stand-in for the external CRUD layer) ──

    pub fn create_business(
        &self,
        id: Ulid,
        name: String,
        weekly_hours: WeeklyHours,
        max_advance_days: u32,
    ) -> Result<(), EngineError> {
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("business name too long"));
        }
        if max_advance_days > MAX_ADVANCE_DAYS_CAP {
            return Err(EngineError::LimitExceeded("booking horizon too far out"));
        }
        for day in weekly_hours.days() {
            hours::validate_day_hours(day)?;
        }
        if self.businesses.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        self.businesses
            .insert(id, BusinessState { id, name, weekly_hours, max_advance_days });
        Ok(())
    }

    pub fn set_business_hours(&self, id: Ulid, weekly_hours: WeeklyHours) -> Result<(), EngineError> {
        for day in weekly_hours.days() {
            hours::validate_day_hours(day)?;
        }
        let mut business = self.businesses.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        business.weekly_hours = weekly_hours;
        Ok(())
    }

    pub fn create_employee(&self, id: Ulid, business_id: Ulid, name: String) -> Result<(), EngineError> {
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("employee name too long"));
        }
        if !self.businesses.contains_key(&business_id) {
            return Err(EngineError::NotFound(business_id));
        }
        if self.employees.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        let state = EmployeeState::new(id, business_id, name);
        self.employees.insert(id, Arc::new(RwLock::new(state)));
        Ok(())
    }

    pub async fn set_employee_day_hours(
        &self,
        employee_id: Ulid,
        weekday: Weekday,
        day_hours: Option<DayHours>,
    ) -> Result<(), EngineError> {
        if let Some(d) = &day_hours {
            hours::validate_day_hours(d)?;
        }
        let emp = self
            .get_employee(&employee_id)
            .ok_or(EngineError::NotFound(employee_id))?;
        let mut guard = emp.write().await;
        guard.weekly_override.set_day(weekday, day_hours);
        Ok(())
    }

    pub async fn create_service(&self, service: Service) -> Result<(), EngineError> {
        if service.name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("service name too long"));
        }
        if service.duration_min <= 0 {
            return Err(EngineError::Validation("service duration must be positive"));
        }
        if service.buffer_before_min < 0 || service.buffer_after_min < 0 {
            return Err(EngineError::Validation("service buffers must be non-negative"));
        }
        if service.employee_ids.len() > MAX_EMPLOYEES_PER_SERVICE {
            return Err(EngineError::LimitExceeded("too many employees for service"));
        }
        if !self.businesses.contains_key(&service.business_id) {
            return Err(EngineError::NotFound(service.business_id));
        }
        for emp_id in &service.employee_ids {
            let emp = self
                .get_employee(emp_id)
                .ok_or(EngineError::NotFound(*emp_id))?;
            let guard = emp.read().await;
            if guard.business_id != service.business_id {
                return Err(EngineError::Validation("employee belongs to another business"));
            }
        }
        if self.services.contains_key(&service.id) {
            return Err(EngineError::AlreadyExists(service.id));
        }
        self.services.insert(service.id, service);
        Ok(())
    }

    /// Insert or replace the exception for `(employee, date)`. The admin
    /// write path is what keeps the one-row-per-date invariant.
    pub async fn upsert_exception(&self, exception: ScheduleException) -> Result<(), EngineError> {
        if let Some(reason) = &exception.reason
            && reason.len() > MAX_REASON_LEN
        {
            return Err(EngineError::LimitExceeded("exception reason too long"));
        }
        if let crate::model::ExceptionKind::ModifiedHours(span) = &exception.kind
            && (span.start < 0 || span.end > MINUTES_PER_DAY || span.start >= span.end)
        {
            return Err(EngineError::Validation("modified hours outside the day"));
        }
        let emp = self
            .get_employee(&exception.employee_id)
            .ok_or(EngineError::NotFound(exception.employee_id))?;
        let mut guard = emp.write().await;
        let rows = guard.exceptions.entry(exception.date).or_default();
        for old in rows.drain(..) {
            self.exception_to_employee.remove(&old.id);
        }
        self.exception_to_employee
            .insert(exception.id, exception.employee_id);
        rows.push(exception);
        Ok(())
    }

    pub async fn remove_exception(&self, id: Ulid) -> Result<(), EngineError> {
        let (_, employee_id) = self
            .exception_to_employee
            .remove(&id)
            .ok_or(EngineError::NotFound(id))?;
        let emp = self
            .get_employee(&employee_id)
            .ok_or(EngineError::NotFound(employee_id))?;
        let mut guard = emp.write().await;

        let mut emptied_date = None;
        for (date, rows) in guard.exceptions.iter_mut() {
            if let Some(pos) = rows.iter().position(|r| r.id == id) {
                rows.remove(pos);
                if rows.is_empty() {
                    emptied_date = Some(*date);
                }
                break;
            }
        }
        if let Some(date) = emptied_date {
            guard.exceptions.remove(&date);
        }
        Ok(())
    }

    /// Bulk delete backing a consolidated group or range: every source row
    /// is removed. Ids already gone (concurrent edit) are skipped; returns
    /// how many rows were actually deleted.
    pub async fn delete_exceptions(&self, ids: &[Ulid]) -> Result<usize, EngineError> {
        let mut deleted = 0;
        for id in ids {
            if self.remove_exception(*id).await.is_ok() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    // ── Booking commit ───────────────────────────────────────────

    /// Book a slot. With `employee = None` the engine auto-assigns the
    /// least-loaded qualified employee free at that time (fewest confirmed
    /// appointments on the date, tie-break lowest id). The availability
    /// pipeline is re-run under write locks, so a listing gone stale
    /// surfaces as `SlotUnavailable` rather than a double booking.
    pub async fn commit_booking(
        &self,
        business_id: Ulid,
        service_id: Ulid,
        employee: Option<Ulid>,
        date: NaiveDate,
        time: Min,
    ) -> Result<Appointment, EngineError> {
        self.commit_booking_as_of(business_id, service_id, employee, date, time, Local::now().date_naive())
            .await
    }

    /// `commit_booking` with an explicit "today" for deterministic horizon
    /// checks under test.
    pub async fn commit_booking_as_of(
        &self,
        business_id: Ulid,
        service_id: Ulid,
        employee: Option<Ulid>,
        date: NaiveDate,
        time: Min,
        today: NaiveDate,
    ) -> Result<Appointment, EngineError> {
        let business = self.business(business_id)?;
        let service = self.service(service_id)?;
        if service.business_id != business_id {
            return Err(EngineError::NotFound(service_id));
        }
        if !within_horizon(date, today, business.max_advance_days) {
            return Err(EngineError::InvalidRange("date outside booking horizon"));
        }
        if time < 0 || time >= MINUTES_PER_DAY {
            return Err(EngineError::Validation("slot time outside the day"));
        }

        let mut candidate_ids: Vec<Ulid> = match employee {
            Some(id) => {
                if !service.employee_ids.contains(&id) {
                    return Err(EngineError::Validation("employee not qualified for service"));
                }
                vec![id]
            }
            None => service.employee_ids.clone(),
        };
        candidate_ids.sort();
        candidate_ids.dedup();
        if candidate_ids.is_empty() {
            return Err(EngineError::SlotUnavailable);
        }

        // Acquire write locks in sorted id order to prevent deadlocks
        // between concurrent commits over overlapping employee sets.
        let mut guards = Vec::with_capacity(candidate_ids.len());
        for id in &candidate_ids {
            let emp = self.get_employee(id).ok_or(EngineError::NotFound(*id))?;
            let guard = emp.write_owned().await;
            if guard.business_id != business_id {
                return Err(EngineError::NotFound(*id));
            }
            guards.push(guard);
        }

        let slot = Span::new(time, time + service.duration_min);

        // Re-run the pipeline under the locks; the listing the caller saw
        // may be stale.
        let mut best: Option<(usize, Ulid, usize)> = None;
        for (idx, guard) in guards.iter().enumerate() {
            let free = self.employee_free_spans(&business, guard, date)?;
            if !conflict::slot_fits(&free, &slot) {
                continue;
            }
            let load = guard.confirmed_count_on(date);
            if best.is_none_or(|(b_load, b_id, _)| (load, guard.id) < (b_load, b_id)) {
                best = Some((load, guard.id, idx));
            }
        }

        let Some((_, _, idx)) = best else {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            tracing::warn!(%service_id, %date, time, "booking lost the race for its slot");
            return Err(EngineError::SlotUnavailable);
        };

        let guard = &mut guards[idx];
        if guard.appointments.len() >= MAX_APPOINTMENTS_PER_EMPLOYEE {
            return Err(EngineError::LimitExceeded("too many appointments for employee"));
        }

        let appointment = Appointment {
            id: Ulid::new(),
            employee_id: guard.id,
            service_id,
            start: datetime_at(date, slot.start),
            end: datetime_at(date, slot.end),
            status: AppointmentStatus::Confirmed,
        };
        guard.insert_appointment(appointment.clone());
        self.appointment_to_employee.insert(appointment.id, guard.id);

        metrics::counter!(observability::BOOKINGS_COMMITTED_TOTAL).increment(1);
        tracing::info!(
            appointment = %appointment.id,
            employee = %guard.id,
            %date,
            time,
            "booking committed"
        );
        Ok(appointment)
    }

    /// Cancel an appointment. The row stays (history), but no longer blocks
    /// availability.
    pub async fn cancel_booking(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let employee_id = self
            .appointment_to_employee
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(id))?;
        let emp = self
            .get_employee(&employee_id)
            .ok_or(EngineError::NotFound(employee_id))?;
        let mut guard = emp.write().await;
        let appointment = guard.appointment_mut(id).ok_or(EngineError::NotFound(id))?;
        appointment.status = AppointmentStatus::Cancelled;
        metrics::counter!(observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
        tracing::info!(appointment = %id, employee = %employee_id, "booking cancelled");
        Ok(employee_id)
    }
}
