//! Export and import of people lists and whole centers.
//!
//! The document format follows the file extension; encoding is delegated to
//! `crate::codec`. Nothing is read or written before the path is validated.

use super::Center;
use crate::availability::AvailabilityEngine;
use crate::codec::{self, Format, Roster, Shape};
use crate::error::{CenterError, CenterResult, StoreError, StoreResult};
use crate::models::{Appointment, Patient, PersonRecord, Professional};
use crate::schedule::{AppointmentDuration, WeeklySchedule};
use crate::store::CenterStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Everything a center holds, as written to and read from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterSnapshot {
    pub name: String,
    pub weekly_schedule: WeeklySchedule,
    pub appointment_duration: AppointmentDuration,
    #[serde(rename = "specialty", default)]
    pub specialties: BTreeSet<String>,
    #[serde(rename = "patient", default)]
    pub patients: Vec<Patient>,
    #[serde(rename = "professional", default)]
    pub professionals: Vec<Professional>,
    #[serde(rename = "appointment", default)]
    pub appointments: Vec<Appointment>,
}

impl Shape for CenterSnapshot {
    const NAME: &'static str = "Center";
}

impl Shape for Roster<Patient> {
    const NAME: &'static str = "Patient";
}

impl Shape for Roster<Professional> {
    const NAME: &'static str = "Professional";
}

impl CenterSnapshot {
    /// Check the aggregate invariants before the snapshot replaces a center.
    pub fn validate(&self) -> CenterResult<()> {
        let mut patients = HashSet::new();
        for patient in &self.patients {
            if !patients.insert(patient.document.as_str()) {
                return Err(CenterError::person_already_exists(&patient.document));
            }
        }

        let mut professionals = HashMap::new();
        for professional in &self.professionals {
            if professionals
                .insert(professional.document.as_str(), professional)
                .is_some()
            {
                return Err(CenterError::person_already_exists(&professional.document));
            }
        }

        let engine = AvailabilityEngine::new(&self.weekly_schedule, self.appointment_duration);
        let mut ids = HashSet::new();
        let mut slots = HashSet::new();
        for apt in &self.appointments {
            if !patients.contains(apt.patient_document.as_str()) {
                return Err(CenterError::person_not_found(&apt.patient_document));
            }
            let professional = professionals
                .get(apt.professional_document.as_str())
                .ok_or_else(|| CenterError::person_not_found(&apt.professional_document))?;
            if !engine.fits(professional, apt.date_time) {
                return Err(CenterError::InvalidInput(format!(
                    "appointment {} at {} is not an open slot of professional {}",
                    apt.id,
                    apt.date_time.format("%Y-%m-%d %H:%M"),
                    apt.professional_document
                )));
            }
            if !ids.insert(apt.id) {
                return Err(CenterError::appointment_already_exists(apt.id));
            }
            if !slots.insert((apt.professional_document.as_str(), apt.date_time)) {
                return Err(CenterError::appointment_already_exists(format!(
                    "{} at {}",
                    apt.professional_document,
                    apt.date_time.format("%Y-%m-%d %H:%M")
                )));
            }
        }
        Ok(())
    }
}

fn document_format(path: &Path) -> CenterResult<Format> {
    if path.as_os_str().is_empty() {
        return Err(CenterError::InvalidInput("path is empty".to_string()));
    }
    Format::from_path(path).ok_or_else(|| {
        CenterError::InvalidInput(format!(
            "unsupported file extension (expected .xml or .json): {}",
            path.display()
        ))
    })
}

fn write_document<T: Shape>(path: &Path, format: Format, value: &T) -> CenterResult<()> {
    let bytes =
        codec::encode(value, format).map_err(|e| CenterError::SerializationFailed(e.to_string()))?;
    fs::write(path, bytes).map_err(|e| {
        CenterError::SerializationFailed(format!("cannot write {}: {}", path.display(), e))
    })?;
    info!(path = %path.display(), %format, shape = T::NAME, "document exported");
    Ok(())
}

fn read_document<T: Shape>(path: &Path) -> CenterResult<T> {
    let format = document_format(path)?;
    let bytes = fs::read(path).map_err(|e| {
        let message = if e.kind() == io::ErrorKind::NotFound {
            format!("file not found: {}", path.display())
        } else {
            format!("cannot read {}: {}", path.display(), e)
        };
        CenterError::DeserializationFailed(message)
    })?;
    let value = codec::decode(&bytes, format)
        .map_err(|e| CenterError::DeserializationFailed(e.to_string()))?;
    info!(path = %path.display(), %format, shape = T::NAME, "document read");
    Ok(value)
}

fn export_error(e: StoreError) -> CenterError {
    CenterError::OperationFailed(format!("could not fetch records for export: {}", e))
}

impl Center {
    pub fn snapshot(&self) -> CenterSnapshot {
        CenterSnapshot {
            name: self.name.clone(),
            weekly_schedule: self.weekly_schedule,
            appointment_duration: self.appointment_duration,
            specialties: self.specialties.clone(),
            patients: self.patients.clone(),
            professionals: self.professionals.clone(),
            appointments: self.appointments.clone(),
        }
    }

    pub fn export_patients(&self, path: impl AsRef<Path>) -> CenterResult<()> {
        let path = path.as_ref();
        let format = document_format(path)?;
        let patients = self.store.fetch_all_patients().map_err(export_error)?;
        write_document(path, format, &Roster::new(patients))
    }

    pub fn export_professionals(&self, path: impl AsRef<Path>) -> CenterResult<()> {
        let path = path.as_ref();
        let format = document_format(path)?;
        let professionals = self.store.fetch_all_professionals().map_err(export_error)?;
        write_document(path, format, &Roster::new(professionals))
    }

    pub fn export_center(&self, path: impl AsRef<Path>) -> CenterResult<()> {
        let path = path.as_ref();
        let format = document_format(path)?;
        write_document(path, format, &self.snapshot())
    }

    /// Add the patients listed in a document; returns how many were new.
    pub fn import_patients(&mut self, path: impl AsRef<Path>) -> CenterResult<usize> {
        let roster: Roster<Patient> = read_document(path.as_ref())?;
        self.add_persons(roster.items)
    }

    /// Add the professionals listed in a document; returns how many were new.
    pub fn import_professionals(&mut self, path: impl AsRef<Path>) -> CenterResult<usize> {
        let roster: Roster<Professional> = read_document(path.as_ref())?;
        self.add_persons(roster.items)
    }

    /// Replace this center's whole state with the one stored in a document.
    pub fn import_center(&mut self, path: impl AsRef<Path>) -> CenterResult<()> {
        let snapshot: CenterSnapshot = read_document(path.as_ref())?;
        self.restore(snapshot)
    }

    /// Replace this center's whole state with `snapshot`.
    ///
    /// The snapshot is validated and written to the store before the
    /// in-memory collections change; subscribers are kept and notified. If
    /// the store fails part way, it is rewritten from the current state.
    pub fn restore(&mut self, snapshot: CenterSnapshot) -> CenterResult<()> {
        snapshot.validate()?;

        if let Err(e) = write_all(
            &mut *self.store,
            &snapshot.patients,
            &snapshot.professionals,
            &snapshot.specialties,
            &snapshot.appointments,
        ) {
            warn!(error = %e, "could not persist imported center, restoring store");
            if let Err(undo) = write_all(
                &mut *self.store,
                &self.patients,
                &self.professionals,
                &self.specialties,
                &self.appointments,
            ) {
                warn!(error = %undo, "store left out of sync with center");
            }
            return Err(CenterError::OperationFailed(format!(
                "could not persist imported center: {}",
                e
            )));
        }

        self.name = snapshot.name;
        self.weekly_schedule = snapshot.weekly_schedule;
        self.appointment_duration = snapshot.appointment_duration;
        self.specialties = snapshot.specialties;
        self.patients = snapshot.patients;
        self.professionals = snapshot.professionals;
        self.appointments = snapshot.appointments;

        info!(center = %self, "center state replaced");
        self.notify();
        Ok(())
    }
}

/// Clear `store` and fill it with the given records.
fn write_all(
    store: &mut (dyn CenterStore + Send),
    patients: &[Patient],
    professionals: &[Professional],
    specialties: &BTreeSet<String>,
    appointments: &[Appointment],
) -> StoreResult<()> {
    store.clear()?;
    for patient in patients {
        store.save_person(&PersonRecord::Patient(patient.clone()))?;
    }
    for professional in professionals {
        store.save_person(&PersonRecord::Professional(professional.clone()))?;
    }
    for specialty in specialties {
        store.save_specialty(specialty)?;
    }
    for apt in appointments {
        store.save_appointment(apt)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CenterConfig;
    use crate::error::EntityKind;
    use crate::models::PersonKind;
    use crate::store::{MemoryStore, PersonAttribute};
    use chrono::{NaiveDate, NaiveTime, Weekday};

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn snapshot() -> CenterSnapshot {
        let patient = Patient::new("1", "Ana", "Lopez", "").unwrap();
        let professional = Professional::new(
            "9",
            "Luis",
            "Perez",
            "",
            WeeklySchedule::attending(&[Weekday::Mon], hm(9, 0), hm(12, 0)).unwrap(),
        )
        .unwrap();
        let at = NaiveDate::from_ymd_opt(2030, 1, 7)
            .unwrap()
            .and_time(hm(9, 0));
        CenterSnapshot {
            name: "Importado".to_string(),
            weekly_schedule: WeeklySchedule::attending(&[Weekday::Mon], hm(8, 0), hm(13, 0))
                .unwrap(),
            appointment_duration: AppointmentDuration::Short,
            specialties: BTreeSet::from(["Clinica".to_string()]),
            appointments: vec![Appointment::new(&patient, &professional, at)],
            patients: vec![patient],
            professionals: vec![professional],
        }
    }

    #[test]
    fn empty_or_unknown_paths_fail_before_io() {
        let center = Center::new("Centro");
        assert!(matches!(
            center.export_center(""),
            Err(CenterError::InvalidInput(_))
        ));
        assert!(matches!(
            center.export_patients("patients.csv"),
            Err(CenterError::InvalidInput(_))
        ));

        let mut center = center;
        assert!(matches!(
            center.import_center(""),
            Err(CenterError::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_file_is_a_deserialization_failure() {
        let mut center = Center::new("Centro");
        let err = center
            .import_patients("/nonexistent/medcenter/patients.json")
            .unwrap_err();
        match err {
            CenterError::DeserializationFailed(message) => {
                assert!(message.contains("file not found"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn restore_replaces_state_and_keeps_store_in_sync() {
        crate::logging::init_test();
        let mut center = Center::new("Centro");
        center
            .add_person(Patient::new("old", "Old", "Patient", "").unwrap())
            .unwrap();

        center.restore(snapshot()).unwrap();
        assert_eq!(center.name(), "Importado");
        assert_eq!(center.appointment_duration(), AppointmentDuration::Short);
        assert_eq!(center.patients().len(), 1);
        assert_eq!(center.appointments().len(), 1);
        assert!(center.find_patient("old").is_err());
        assert_eq!(center.find_patient("1").unwrap().surname, "Lopez");
        assert_eq!(center.snapshot(), snapshot_with_ids(&center));
    }

    fn snapshot_with_ids(center: &Center) -> CenterSnapshot {
        let mut expected = snapshot();
        expected.appointments = center.appointments().to_vec();
        expected
    }

    #[test]
    fn invalid_snapshots_leave_the_center_untouched() {
        let mut center = Center::new("Centro");
        center
            .add_person(Patient::new("old", "Old", "Patient", "").unwrap())
            .unwrap();

        let mut duplicated = snapshot();
        duplicated.patients.push(duplicated.patients[0].clone());
        let err = center.restore(duplicated).unwrap_err();
        assert!(err.is_already_exists(EntityKind::Person));

        let mut dangling = snapshot();
        dangling.professionals.clear();
        let err = center.restore(dangling).unwrap_err();
        assert!(err.is_not_found(EntityKind::Person));

        let mut double_booked = snapshot();
        let mut twin = double_booked.appointments[0].clone();
        twin.id = uuid::Uuid::new_v4();
        double_booked.appointments.push(twin);
        let err = center.restore(double_booked).unwrap_err();
        assert!(err.is_already_exists(EntityKind::Appointment));

        assert_eq!(center.name(), "Centro");
        assert_eq!(center.patients().len(), 1);
        assert!(center.find_patient("old").is_ok());
    }

    #[test]
    fn snapshot_appointments_must_sit_on_open_slots() {
        let mut center = Center::new("Centro");
        let monday = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();

        for at in [
            monday.succ_opt().unwrap().and_time(hm(9, 0)),
            monday.and_time(hm(9, 7)),
            monday.and_time(hm(12, 0)),
            monday.and_time(hm(8, 30)),
        ] {
            let mut off_slot = snapshot();
            off_slot.appointments[0].date_time = at;
            let err = center.restore(off_slot).unwrap_err();
            assert!(matches!(err, CenterError::InvalidInput(_)), "{at}");
        }

        let mut closed = snapshot();
        closed.weekly_schedule =
            WeeklySchedule::attending(&[Weekday::Tue], hm(8, 0), hm(13, 0)).unwrap();
        assert!(matches!(
            center.restore(closed),
            Err(CenterError::InvalidInput(_))
        ));

        let mut longer = snapshot();
        longer.appointment_duration = AppointmentDuration::Long;
        longer.appointments[0].date_time = monday.and_time(hm(9, 10));
        assert!(matches!(
            center.restore(longer),
            Err(CenterError::InvalidInput(_))
        ));

        assert_eq!(center.name(), "Centro");
        assert!(center.appointments().is_empty());
    }

    /// Memory store that refuses every appointment.
    struct NoAppointmentsStore(MemoryStore);

    impl CenterStore for NoAppointmentsStore {
        fn save_appointment(&mut self, _: &Appointment) -> StoreResult<bool> {
            Err(StoreError::Unavailable("appointments table locked".to_string()))
        }
        fn delete_appointment(&mut self, appointment: &Appointment) -> StoreResult<bool> {
            self.0.delete_appointment(appointment)
        }
        fn save_person(&mut self, person: &PersonRecord) -> StoreResult<bool> {
            self.0.save_person(person)
        }
        fn delete_person(&mut self, kind: PersonKind, document: &str) -> StoreResult<bool> {
            self.0.delete_person(kind, document)
        }
        fn find_patients_by(
            &self,
            attribute: PersonAttribute,
            value: &str,
        ) -> StoreResult<Vec<Patient>> {
            self.0.find_patients_by(attribute, value)
        }
        fn professional_exists(&self, document: &str) -> StoreResult<bool> {
            self.0.professional_exists(document)
        }
        fn patient_exists(&self, document: &str) -> StoreResult<bool> {
            self.0.patient_exists(document)
        }
        fn fetch_all_patients(&self) -> StoreResult<Vec<Patient>> {
            self.0.fetch_all_patients()
        }
        fn fetch_all_professionals(&self) -> StoreResult<Vec<Professional>> {
            self.0.fetch_all_professionals()
        }
        fn save_specialty(&mut self, name: &str) -> StoreResult<bool> {
            self.0.save_specialty(name)
        }
        fn fetch_specialties(&self) -> StoreResult<Vec<String>> {
            self.0.fetch_specialties()
        }
        fn clear(&mut self) -> StoreResult<()> {
            self.0.clear()
        }
    }

    #[test]
    fn failed_restore_puts_the_store_back() {
        let store = NoAppointmentsStore(MemoryStore::new());
        let mut center = Center::from_config(&CenterConfig::default(), Box::new(store)).unwrap();
        center
            .add_person(Patient::new("old", "Old", "Patient", "").unwrap())
            .unwrap();

        let mut incoming = snapshot();
        incoming.patients[0].document = "new".to_string();
        incoming.appointments[0].patient_document = "new".to_string();

        let err = center.restore(incoming).unwrap_err();
        assert!(matches!(err, CenterError::OperationFailed(_)));
        let documents: Vec<&str> = center.patients().iter().map(|p| p.document.as_str()).collect();
        assert_eq!(documents, vec!["old"]);
        assert!(center.find_patient("old").is_ok());
        assert!(center.find_patient("new").unwrap_err().is_not_found(EntityKind::Person));
    }
}
