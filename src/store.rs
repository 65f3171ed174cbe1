//! Persistence adapter for the medical center.
//!
//! `CenterStore` is the capability set the `Center` relies on for durable
//! storage. `MemoryStore` implements it in-process and is what the center uses
//! unless another adapter is supplied.

use crate::error::{StoreError, StoreResult};
use crate::models::{Appointment, Patient, Person, PersonKind, PersonRecord, Professional};
use std::collections::BTreeSet;
use std::fmt;

/// Attribute a person search is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonAttribute {
    Document,
    Surname,
    Name,
    Phone,
    Specialty,
    All,
}

impl PersonAttribute {
    /// Parse an attribute label, case-insensitive.
    ///
    /// Returns `None` for unsupported attributes, which searches treat as
    /// "no matches" rather than an error.
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_lowercase().trim() {
            "document" | "documento" => Some(PersonAttribute::Document),
            "surname" | "apellido" => Some(PersonAttribute::Surname),
            "name" | "nombre" => Some(PersonAttribute::Name),
            "phone" | "telefono" | "teléfono" => Some(PersonAttribute::Phone),
            "specialty" | "especialidad" => Some(PersonAttribute::Specialty),
            "all" | "todos" => Some(PersonAttribute::All),
            _ => None,
        }
    }

    /// Check if `person` matches `query` on this attribute.
    ///
    /// Text attributes match by substring. People without specialties never
    /// match a specialty query.
    pub fn matches(
        &self,
        person: &dyn Person,
        specialties: Option<&BTreeSet<String>>,
        query: &str,
    ) -> bool {
        match self {
            PersonAttribute::Document => person.document().contains(query),
            PersonAttribute::Surname => person.surname().contains(query),
            PersonAttribute::Name => person.name().contains(query),
            PersonAttribute::Phone => person.phone().contains(query),
            PersonAttribute::Specialty => specialties.map_or(false, |set| set.contains(query)),
            PersonAttribute::All => true,
        }
    }
}

impl fmt::Display for PersonAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PersonAttribute::Document => "document",
            PersonAttribute::Surname => "surname",
            PersonAttribute::Name => "name",
            PersonAttribute::Phone => "phone",
            PersonAttribute::Specialty => "specialty",
            PersonAttribute::All => "all",
        };
        f.write_str(label)
    }
}

/// Durable storage used by the center.
///
/// `save_*` return `Ok(false)` when the record already exists and `delete_*`
/// return `Ok(false)` when it does not; `Err` is reserved for storage failures.
pub trait CenterStore {
    /// Persist an appointment; `false` if its id or its
    /// `(professional, date_time)` pair is already taken.
    fn save_appointment(&mut self, appointment: &Appointment) -> StoreResult<bool>;

    fn delete_appointment(&mut self, appointment: &Appointment) -> StoreResult<bool>;

    fn save_person(&mut self, person: &PersonRecord) -> StoreResult<bool>;

    fn delete_person(&mut self, kind: PersonKind, document: &str) -> StoreResult<bool>;

    fn find_patients_by(&self, attribute: PersonAttribute, value: &str)
        -> StoreResult<Vec<Patient>>;

    fn professional_exists(&self, document: &str) -> StoreResult<bool>;

    fn patient_exists(&self, document: &str) -> StoreResult<bool>;

    fn fetch_all_patients(&self) -> StoreResult<Vec<Patient>>;

    fn fetch_all_professionals(&self) -> StoreResult<Vec<Professional>>;

    fn save_specialty(&mut self, name: &str) -> StoreResult<bool>;

    fn fetch_specialties(&self) -> StoreResult<Vec<String>>;

    /// Drop every record. Used when a whole center is imported.
    fn clear(&mut self) -> StoreResult<()>;
}

/// In-process `CenterStore`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    patients: Vec<Patient>,
    professionals: Vec<Professional>,
    appointments: Vec<Appointment>,
    specialties: BTreeSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn appointment_count(&self) -> usize {
        self.appointments.len()
    }
}

impl CenterStore for MemoryStore {
    fn save_appointment(&mut self, appointment: &Appointment) -> StoreResult<bool> {
        let taken = self
            .appointments
            .iter()
            .any(|existing| existing.id == appointment.id || existing.collides_with(appointment));
        if taken {
            return Ok(false);
        }
        self.appointments.push(appointment.clone());
        Ok(true)
    }

    fn delete_appointment(&mut self, appointment: &Appointment) -> StoreResult<bool> {
        let before = self.appointments.len();
        self.appointments.retain(|existing| existing.id != appointment.id);
        Ok(self.appointments.len() != before)
    }

    fn save_person(&mut self, person: &PersonRecord) -> StoreResult<bool> {
        match person {
            PersonRecord::Patient(patient) => {
                if self.patient_exists(&patient.document)? {
                    return Ok(false);
                }
                self.patients.push(patient.clone());
            }
            PersonRecord::Professional(professional) => {
                if self.professional_exists(&professional.document)? {
                    return Ok(false);
                }
                self.professionals.push(professional.clone());
            }
        }
        Ok(true)
    }

    fn delete_person(&mut self, kind: PersonKind, document: &str) -> StoreResult<bool> {
        let removed = match kind {
            PersonKind::Patient => {
                let before = self.patients.len();
                self.patients.retain(|p| p.document != document);
                self.patients.len() != before
            }
            PersonKind::Professional => {
                let before = self.professionals.len();
                self.professionals.retain(|p| p.document != document);
                self.professionals.len() != before
            }
        };
        Ok(removed)
    }

    fn find_patients_by(
        &self,
        attribute: PersonAttribute,
        value: &str,
    ) -> StoreResult<Vec<Patient>> {
        Ok(self
            .patients
            .iter()
            .filter(|patient| attribute.matches(*patient, None, value))
            .cloned()
            .collect())
    }

    fn professional_exists(&self, document: &str) -> StoreResult<bool> {
        Ok(self.professionals.iter().any(|p| p.document == document))
    }

    fn patient_exists(&self, document: &str) -> StoreResult<bool> {
        Ok(self.patients.iter().any(|p| p.document == document))
    }

    fn fetch_all_patients(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.patients.clone())
    }

    fn fetch_all_professionals(&self) -> StoreResult<Vec<Professional>> {
        Ok(self.professionals.clone())
    }

    fn save_specialty(&mut self, name: &str) -> StoreResult<bool> {
        if name.is_empty() {
            return Err(StoreError::Corrupted("specialty name is empty".to_string()));
        }
        Ok(self.specialties.insert(name.to_string()))
    }

    fn fetch_specialties(&self) -> StoreResult<Vec<String>> {
        Ok(self.specialties.iter().cloned().collect())
    }

    fn clear(&mut self) -> StoreResult<()> {
        *self = MemoryStore::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::WeeklySchedule;
    use chrono::NaiveDate;

    fn patient(document: &str, surname: &str) -> Patient {
        Patient::new(document, "Ana", surname, "011-4555").unwrap()
    }

    fn professional(document: &str) -> Professional {
        Professional::new(document, "Luis", "Perez", "444", WeeklySchedule::default()).unwrap()
    }

    #[test]
    fn attribute_labels_parse_in_both_languages() {
        assert_eq!(PersonAttribute::parse("Documento"), Some(PersonAttribute::Document));
        assert_eq!(PersonAttribute::parse("surname"), Some(PersonAttribute::Surname));
        assert_eq!(PersonAttribute::parse("TODOS"), Some(PersonAttribute::All));
        assert_eq!(PersonAttribute::parse("email"), None);
    }

    #[test]
    fn person_namespaces_are_separate() {
        let mut store = MemoryStore::new();
        assert!(store.save_person(&patient("100", "Lopez").into()).unwrap());
        assert!(!store.save_person(&patient("100", "Garcia").into()).unwrap());
        assert!(store.save_person(&professional("100").into()).unwrap());

        assert!(store.patient_exists("100").unwrap());
        assert!(store.professional_exists("100").unwrap());
        assert!(store.delete_person(PersonKind::Patient, "100").unwrap());
        assert!(!store.delete_person(PersonKind::Patient, "100").unwrap());
        assert!(store.professional_exists("100").unwrap());
    }

    #[test]
    fn patient_search_uses_substring_matching() {
        let mut store = MemoryStore::new();
        store.save_person(&patient("30111222", "Lopez").into()).unwrap();
        store.save_person(&patient("30999000", "Lorenzo").into()).unwrap();

        let found = store.find_patients_by(PersonAttribute::Surname, "Lo").unwrap();
        assert_eq!(found.len(), 2);
        let found = store.find_patients_by(PersonAttribute::Document, "111").unwrap();
        assert_eq!(found.len(), 1);
        assert!(store
            .find_patients_by(PersonAttribute::Specialty, "Lopez")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn appointment_slot_conflicts_are_reported() {
        let mut store = MemoryStore::new();
        let doctor = professional("9");
        let at = NaiveDate::from_ymd_opt(2030, 1, 7)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let first = Appointment::new(&patient("1", "Lopez"), &doctor, at);
        let second = Appointment::new(&patient("2", "Gomez"), &doctor, at);

        assert!(store.save_appointment(&first).unwrap());
        assert!(!store.save_appointment(&second).unwrap());
        assert!(!store.save_appointment(&first).unwrap());
        assert_eq!(store.appointment_count(), 1);

        assert!(store.delete_appointment(&first).unwrap());
        assert!(!store.delete_appointment(&first).unwrap());
    }

    #[test]
    fn specialties_are_deduplicated_and_clear_resets() {
        let mut store = MemoryStore::new();
        assert!(store.save_specialty("Cardiologia").unwrap());
        assert!(!store.save_specialty("Cardiologia").unwrap());
        assert!(store.save_specialty("").is_err());
        assert_eq!(store.fetch_specialties().unwrap(), vec!["Cardiologia".to_string()]);

        store.clear().unwrap();
        assert!(store.fetch_specialties().unwrap().is_empty());
    }
}
