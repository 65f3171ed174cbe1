//! Data models for the medical center.
//!
//! This module defines the people and bookings the center keeps track of:
//! - Person: capability shared by patients and professionals
//! - Patient: someone who books appointments
//! - Professional: staff member with a weekly schedule and specialties
//! - PersonRecord: a person tagged with its kind, as stored by the center
//! - Appointment: a booked pairing of patient, professional and date-time

use crate::error::{CenterError, CenterResult};
use crate::schedule::WeeklySchedule;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Which collection a person belongs to.
///
/// Patients and professionals are separate namespaces: the same document
/// may appear once in each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonKind {
    Patient,
    Professional,
}

impl PersonKind {
    pub fn name(&self) -> &str {
        match self {
            PersonKind::Patient => "patient",
            PersonKind::Professional => "professional",
        }
    }
}

/// Identity and contact data shared by every person.
pub trait Person {
    fn document(&self) -> &str;
    fn name(&self) -> &str;
    fn surname(&self) -> &str;
    fn phone(&self) -> &str;
    fn kind(&self) -> PersonKind;

    fn full_name(&self) -> String {
        format!("{} {}", self.name(), self.surname())
    }
}

pub(crate) fn validate_identity(document: &str, name: &str, surname: &str) -> CenterResult<()> {
    if document.trim().is_empty() {
        return Err(CenterError::InvalidInput(
            "Person document cannot be empty".to_string(),
        ));
    }
    if name.trim().is_empty() {
        return Err(CenterError::InvalidInput(
            "Person name cannot be empty".to_string(),
        ));
    }
    if surname.trim().is_empty() {
        return Err(CenterError::InvalidInput(
            "Person surname cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// A patient registered in the center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub document: String,
    pub name: String,
    pub surname: String,
    pub phone: String,
}

impl Patient {
    /// Create a new patient with validation.
    pub fn new(
        document: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        phone: impl Into<String>,
    ) -> CenterResult<Self> {
        let patient = Patient {
            document: document.into(),
            name: name.into(),
            surname: surname.into(),
            phone: phone.into(),
        };
        validate_identity(&patient.document, &patient.name, &patient.surname)?;
        Ok(patient)
    }
}

impl Person for Patient {
    fn document(&self) -> &str {
        &self.document
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn surname(&self) -> &str {
        &self.surname
    }

    fn phone(&self) -> &str {
        &self.phone
    }

    fn kind(&self) -> PersonKind {
        PersonKind::Patient
    }
}

/// A professional working at the center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professional {
    pub document: String,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub weekly_schedule: WeeklySchedule,
    #[serde(rename = "specialty", default)]
    pub specialties: BTreeSet<String>,
}

impl Professional {
    /// Create a new professional with validation.
    pub fn new(
        document: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        phone: impl Into<String>,
        weekly_schedule: WeeklySchedule,
    ) -> CenterResult<Self> {
        let professional = Professional {
            document: document.into(),
            name: name.into(),
            surname: surname.into(),
            phone: phone.into(),
            weekly_schedule,
            specialties: BTreeSet::new(),
        };
        validate_identity(
            &professional.document,
            &professional.name,
            &professional.surname,
        )?;
        Ok(professional)
    }

    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialties.insert(specialty.into());
        self
    }

    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialties.contains(specialty)
    }
}

impl Person for Professional {
    fn document(&self) -> &str {
        &self.document
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn surname(&self) -> &str {
        &self.surname
    }

    fn phone(&self) -> &str {
        &self.phone
    }

    fn kind(&self) -> PersonKind {
        PersonKind::Professional
    }
}

/// A person together with the collection it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonRecord {
    Patient(Patient),
    Professional(Professional),
}

impl PersonRecord {
    pub fn as_person(&self) -> &dyn Person {
        match self {
            PersonRecord::Patient(patient) => patient,
            PersonRecord::Professional(professional) => professional,
        }
    }

    pub fn kind(&self) -> PersonKind {
        self.as_person().kind()
    }

    pub fn document(&self) -> &str {
        self.as_person().document()
    }
}

impl From<Patient> for PersonRecord {
    fn from(patient: Patient) -> Self {
        PersonRecord::Patient(patient)
    }
}

impl From<Professional> for PersonRecord {
    fn from(professional: Professional) -> Self {
        PersonRecord::Professional(professional)
    }
}

impl fmt::Display for PersonRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let person = self.as_person();
        write!(
            f,
            "{} {} ({})",
            person.kind().name(),
            person.full_name(),
            person.document()
        )
    }
}

/// A booked appointment ("turno").
///
/// The patient and professional are referenced by document; the center
/// resolves them against its own collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub date_time: NaiveDateTime,
    pub patient_document: String,
    pub professional_document: String,
}

impl Appointment {
    /// Create a new appointment with a fresh id.
    pub fn new(patient: &Patient, professional: &Professional, date_time: NaiveDateTime) -> Self {
        Appointment {
            id: Uuid::new_v4(),
            date_time,
            patient_document: patient.document.clone(),
            professional_document: professional.document.clone(),
        }
    }

    /// Check if this appointment books the given professional.
    pub fn is_for_professional(&self, professional: &Professional) -> bool {
        self.professional_document == professional.document
    }

    /// Check if this appointment belongs to the given patient.
    pub fn is_for_patient(&self, patient: &Patient) -> bool {
        self.patient_document == patient.document
    }

    /// Check if this appointment occupies the same professional slot as `other`.
    pub fn collides_with(&self, other: &Appointment) -> bool {
        self.professional_document == other.professional_document
            && self.date_time == other.date_time
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Appointment({}, {}, patient={}, professional={})",
            self.id,
            self.date_time.format("%Y-%m-%d %H:%M"),
            self.patient_document,
            self.professional_document
        )
    }
}
