//! The medical center aggregate.
//!
//! `Center` owns the patients, professionals and appointments of a single
//! medical center. Every mutation goes through the persistence adapter first;
//! the in-memory collections are only touched once the adapter has accepted
//! the change, and subscribers are notified afterwards.

mod appointments;
pub mod instance;
mod transfer;

pub use appointments::AppointmentCriterion;
pub use transfer::CenterSnapshot;

use crate::availability::AvailabilityEngine;
use crate::config::CenterConfig;
use crate::error::{CenterError, CenterResult, StoreError};
use crate::models::{
    validate_identity, Appointment, Patient, Person, PersonKind, PersonRecord, Professional,
};
use crate::schedule::{AppointmentDuration, WeeklySchedule};
use crate::store::{CenterStore, MemoryStore, PersonAttribute};
use chrono::{NaiveDate, NaiveTime, Weekday};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Callback run after every successful mutation.
pub type Subscriber = Box<dyn Fn() + Send>;

/// Handle returned by `Center::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Center {
    name: String,
    weekly_schedule: WeeklySchedule,
    appointment_duration: AppointmentDuration,
    specialties: BTreeSet<String>,
    patients: Vec<Patient>,
    professionals: Vec<Professional>,
    appointments: Vec<Appointment>,
    store: Box<dyn CenterStore + Send>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Center {
    /// A center with default configuration and an empty in-memory store.
    pub fn new(name: impl Into<String>) -> Self {
        let config = CenterConfig {
            name: name.into(),
            ..CenterConfig::default()
        };
        Center::empty(&config, Box::new(MemoryStore::new()))
    }

    /// Build a center from configuration, loading the people already held by `store`.
    pub fn from_config(
        config: &CenterConfig,
        store: Box<dyn CenterStore + Send>,
    ) -> CenterResult<Self> {
        let mut center = Center::empty(config, store);

        let load_error =
            |e: StoreError| CenterError::OperationFailed(format!("could not load center: {}", e));
        center.patients = center.store.fetch_all_patients().map_err(load_error)?;
        center.professionals = center.store.fetch_all_professionals().map_err(load_error)?;
        center.specialties = center
            .store
            .fetch_specialties()
            .map_err(load_error)?
            .into_iter()
            .collect();

        info!(
            center = %center.name,
            patients = center.patients.len(),
            professionals = center.professionals.len(),
            "center loaded"
        );
        Ok(center)
    }

    fn empty(config: &CenterConfig, store: Box<dyn CenterStore + Send>) -> Self {
        Center {
            name: config.name.clone(),
            weekly_schedule: config.weekly_schedule,
            appointment_duration: config.appointment_duration,
            specialties: BTreeSet::new(),
            patients: Vec::new(),
            professionals: Vec::new(),
            appointments: Vec::new(),
            store,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn weekly_schedule(&self) -> &WeeklySchedule {
        &self.weekly_schedule
    }

    pub fn set_weekly_schedule(&mut self, schedule: WeeklySchedule) {
        self.weekly_schedule = schedule;
    }

    pub fn appointment_duration(&self) -> AppointmentDuration {
        self.appointment_duration
    }

    pub fn set_appointment_duration(&mut self, duration: AppointmentDuration) {
        self.appointment_duration = duration;
    }

    pub fn specialties(&self) -> &BTreeSet<String> {
        &self.specialties
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn professionals(&self) -> &[Professional] {
        &self.professionals
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    // ---- change notification ----

    /// Register a callback, run synchronously after each successful mutation.
    ///
    /// Callbacks must not call back into a mutating `Center` method.
    pub fn subscribe(&mut self, callback: impl Fn() + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn notify(&self) {
        for (_, subscriber) in &self.subscribers {
            subscriber();
        }
    }

    // ---- people ----

    /// Check if a person with the same kind and document is registered.
    pub fn exists(&self, person: &dyn Person) -> CenterResult<bool> {
        let document = person.document();
        let found = match person.kind() {
            PersonKind::Patient => self.store.patient_exists(document),
            PersonKind::Professional => self.store.professional_exists(document),
        };
        found.map_err(|e| {
            CenterError::SearchFailed(format!(
                "could not look up {} {}: {}",
                person.kind().name(),
                document,
                e
            ))
        })
    }

    /// Register a person; `false` if the document is already taken for its kind.
    pub fn add_person(&mut self, person: impl Into<PersonRecord>) -> CenterResult<bool> {
        let added = self.insert_person(person.into())?;
        if added {
            self.notify();
        }
        Ok(added)
    }

    /// Register every person in `people`, notifying once at the end.
    ///
    /// Returns how many were newly added. Either every record is applied or
    /// none is: all records are validated before the store is touched, and a
    /// store failure part way through undoes the records already saved.
    pub fn add_persons<I, P>(&mut self, people: I) -> CenterResult<usize>
    where
        I: IntoIterator<Item = P>,
        P: Into<PersonRecord>,
    {
        let records: Vec<PersonRecord> = people.into_iter().map(Into::into).collect();
        for record in &records {
            check_identity(record)?;
        }

        let patients_before = self.patients.len();
        let professionals_before = self.professionals.len();
        let mut saved: Vec<(PersonKind, String)> = Vec::new();
        for record in records {
            let key = (record.kind(), record.document().to_string());
            match self.insert_person(record) {
                Ok(true) => saved.push(key),
                Ok(false) => {}
                Err(e) => {
                    for (kind, document) in saved.iter().rev() {
                        if let Err(undo) = self.store.delete_person(*kind, document) {
                            warn!(%document, error = %undo, "could not undo partial import");
                        }
                    }
                    self.patients.truncate(patients_before);
                    self.professionals.truncate(professionals_before);
                    return Err(e);
                }
            }
        }

        if !saved.is_empty() {
            self.notify();
        }
        Ok(saved.len())
    }

    fn insert_person(&mut self, person: PersonRecord) -> CenterResult<bool> {
        check_identity(&person)?;

        let saved = self.store.save_person(&person).map_err(|e| {
            warn!(%person, error = %e, "store rejected person");
            CenterError::OperationFailed(format!("could not add {}: {}", person, e))
        })?;
        if !saved {
            debug!(%person, "person already registered");
            return Ok(false);
        }

        info!(%person, "person added");
        match person {
            PersonRecord::Patient(patient) => self.patients.push(patient),
            PersonRecord::Professional(professional) => self.professionals.push(professional),
        }
        Ok(true)
    }

    /// Unregister a person; `false` if nobody with that kind and document exists.
    ///
    /// A person with booked appointments cannot be removed.
    pub fn remove_person(&mut self, person: &dyn Person) -> CenterResult<bool> {
        let kind = person.kind();
        let document = person.document().to_string();

        let booked = self.appointments.iter().any(|apt| match kind {
            PersonKind::Patient => apt.patient_document == document,
            PersonKind::Professional => apt.professional_document == document,
        });
        if booked {
            return Err(CenterError::InvalidInput(format!(
                "{} {} still has booked appointments",
                kind.name(),
                document
            )));
        }

        let removed = self.store.delete_person(kind, &document).map_err(|e| {
            warn!(kind = kind.name(), %document, error = %e, "store failed to delete person");
            CenterError::OperationFailed(format!(
                "could not remove {} {}: {}",
                kind.name(),
                document,
                e
            ))
        })?;
        if !removed {
            return Ok(false);
        }

        match kind {
            PersonKind::Patient => self.patients.retain(|p| p.document != document),
            PersonKind::Professional => self.professionals.retain(|p| p.document != document),
        }
        info!(kind = kind.name(), %document, "person removed");
        self.notify();
        Ok(true)
    }

    /// Add a specialty to the center's catalogue.
    ///
    /// The name is stored with its first letter capitalised and the rest in
    /// lowercase. Returns whether it was newly added.
    pub fn add_specialty(&mut self, name: &str) -> CenterResult<bool> {
        let normalized = capitalize(name);
        if normalized.is_empty() {
            return Err(CenterError::InvalidInput(
                "Specialty name cannot be empty".to_string(),
            ));
        }

        let saved = self.store.save_specialty(&normalized).map_err(|e| {
            CenterError::OperationFailed(format!("could not add specialty {}: {}", normalized, e))
        })?;
        if !saved {
            return Ok(false);
        }

        info!(specialty = %normalized, "specialty added");
        self.specialties.insert(normalized);
        self.notify();
        Ok(true)
    }

    /// Exact lookup of a patient by document.
    pub fn find_patient(&self, document: &str) -> CenterResult<Patient> {
        let candidates = self
            .store
            .find_patients_by(PersonAttribute::Document, document)
            .map_err(|e| {
                CenterError::SearchFailed(format!("could not look up patient {}: {}", document, e))
            })?;

        candidates
            .into_iter()
            .find(|patient| patient.document == document)
            .ok_or_else(|| CenterError::person_not_found(document))
    }

    /// Patients matching `query` on `attribute`; unsupported attributes match nobody.
    pub fn find_patients(&self, query: &str, attribute: &str) -> CenterResult<Vec<Patient>> {
        let attribute = match PersonAttribute::parse(attribute) {
            Some(attribute) => attribute,
            None => return Ok(Vec::new()),
        };

        debug!(%attribute, query, "searching patients");
        self.store
            .find_patients_by(attribute, query)
            .map_err(|e| CenterError::SearchFailed(format!("could not search patients: {}", e)))
    }

    /// Exact lookup of a professional by document.
    pub fn find_professional(&self, document: &str) -> CenterResult<Professional> {
        self.professionals
            .iter()
            .find(|professional| professional.document == document)
            .cloned()
            .ok_or_else(|| CenterError::person_not_found(document))
    }

    /// Professionals matching `query` on `attribute`; unsupported attributes match nobody.
    pub fn find_professionals(&self, query: &str, attribute: &str) -> Vec<Professional> {
        let attribute = match PersonAttribute::parse(attribute) {
            Some(attribute) => attribute,
            None => return Vec::new(),
        };

        self.professionals
            .iter()
            .filter(|professional| {
                attribute.matches(*professional, Some(&professional.specialties), query)
            })
            .cloned()
            .collect()
    }

    // ---- availability ----

    /// Engine over this center's schedule and appointment duration.
    pub fn availability(&self) -> AvailabilityEngine<'_> {
        AvailabilityEngine::new(&self.weekly_schedule, self.appointment_duration)
    }

    pub fn attends(&self, professional: &Professional, weekday: Weekday) -> bool {
        self.availability().attends(professional, weekday)
    }

    /// Dates in `[from, to]` with at least one open slot for `professional`.
    pub fn available_dates_for(
        &self,
        professional: &Professional,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CenterResult<Vec<NaiveDate>> {
        let registered = self.registered_professional(professional)?;
        let booked = self.appointments_for_professional(registered);
        Ok(self
            .availability()
            .available_dates(Some(registered), from, to, &booked))
    }

    /// Open start times for `professional` on `date`.
    pub fn available_slots_for(
        &self,
        professional: &Professional,
        date: NaiveDate,
    ) -> CenterResult<Vec<NaiveTime>> {
        let registered = self.registered_professional(professional)?;
        let booked = self.appointments_on_for(date, registered);
        let slots = self.availability().available_slots(registered, date, &booked);
        debug!(
            professional = %registered.document,
            %date,
            open_slots = slots.len(),
            "computed available slots"
        );
        Ok(slots)
    }

    fn registered_professional(&self, professional: &Professional) -> CenterResult<&Professional> {
        self.professionals
            .iter()
            .find(|p| p.document == professional.document)
            .ok_or_else(|| {
                CenterError::SearchFailed(format!(
                    "professional {} is not registered in {}",
                    professional.document, self.name
                ))
            })
    }
}

fn check_identity(record: &PersonRecord) -> CenterResult<()> {
    let person = record.as_person();
    validate_identity(person.document(), person.name(), person.surname())
}

/// First letter uppercase, the rest lowercase.
fn capitalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for Center {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Center({}, patients={}, professionals={}, appointments={})",
            self.name,
            self.patients.len(),
            self.professionals.len(),
            self.appointments.len()
        )
    }
}

impl fmt::Debug for Center {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Center")
            .field("name", &self.name)
            .field("appointment_duration", &self.appointment_duration)
            .field("patients", &self.patients.len())
            .field("professionals", &self.professionals.len())
            .field("appointments", &self.appointments.len())
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}
