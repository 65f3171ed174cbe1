//! Appointment scheduling core for a single medical center.
//!
//! The `Center` aggregate keeps patients, professionals, specialties and
//! booked appointments, computes open slots from the center's and each
//! professional's weekly schedule, and exports or imports its state as XML
//! or JSON documents.

pub mod availability;
pub mod center;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod schedule;
pub mod store;

pub use center::{instance, AppointmentCriterion, Center, CenterSnapshot, SubscriptionId};
pub use config::CenterConfig;
pub use error::{CenterError, CenterResult, EntityKind};
pub use models::{Appointment, Patient, Person, PersonKind, PersonRecord, Professional};
pub use schedule::{AppointmentDuration, DaySchedule, WeeklySchedule};
pub use store::{CenterStore, MemoryStore, PersonAttribute};
