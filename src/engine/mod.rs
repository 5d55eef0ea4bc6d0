mod conflict;
mod consolidate;
mod error;
mod exceptions;
mod hours;
mod mutations;
mod queries;
mod slots;

pub use consolidate::merge_ranges;
pub use error::EngineError;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::{BusinessState, EmployeeState, Min, Service};

pub type SharedEmployeeState = Arc<RwLock<EmployeeState>>;

/// In-memory scheduling engine. Businesses and services are plain records;
/// each employee's schedule state sits behind its own lock, which is the
/// unit of isolation for booking commits.
pub struct Engine {
    businesses: DashMap<Ulid, BusinessState>,
    services: DashMap<Ulid, Service>,
    employees: DashMap<Ulid, SharedEmployeeState>,
    /// Reverse lookup: appointment id → employee id.
    appointment_to_employee: DashMap<Ulid, Ulid>,
    /// Reverse lookup: exception id → employee id.
    exception_to_employee: DashMap<Ulid, Ulid>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            businesses: DashMap::new(),
            services: DashMap::new(),
            employees: DashMap::new(),
            appointment_to_employee: DashMap::new(),
            exception_to_employee: DashMap::new(),
        }
    }

    pub fn get_employee(&self, id: &Ulid) -> Option<SharedEmployeeState> {
        self.employees.get(id).map(|e| e.value().clone())
    }

    pub(super) fn business(&self, id: Ulid) -> Result<BusinessState, EngineError> {
        self.businesses
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::NotFound(id))
    }

    pub(super) fn service(&self, id: Ulid) -> Result<Service, EngineError> {
        self.services
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::NotFound(id))
    }

    /// Buffer minutes of the service behind an existing appointment. A
    /// service deleted upstream contributes no buffers rather than failing
    /// the whole listing.
    pub(super) fn service_buffers(&self, service_id: Ulid) -> (Min, Min) {
        self.services
            .get(&service_id)
            .map(|s| (s.buffer_before_min, s.buffer_after_min))
            .unwrap_or((0, 0))
    }
}
