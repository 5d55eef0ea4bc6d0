//! slotwise — appointment availability & scheduling engine.
//!
//! Turns business hours, per-employee overrides, dated schedule exceptions,
//! existing bookings, and service buffer times into a correct set of bookable
//! time slots, load-balanced across qualified employees. Also consolidates
//! per-employee/per-date exception rows into date ranges for bulk
//! administration. Library-level contract: no wire surface, no persistence.

pub mod engine;
pub mod interval;
pub mod limits;
pub mod model;
pub mod observability;

pub use engine::{Engine, EngineError, merge_ranges};
