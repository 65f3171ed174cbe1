//! Appointment booking, removal and search.

use super::Center;
use crate::error::{CenterError, CenterResult};
use crate::models::{Appointment, Patient, Professional};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Criterion for `Center::find_appointments`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentCriterion {
    /// Exact appointment id.
    Id,
    /// Substring of the patient's document.
    PatientDocument,
    /// Substring of the professional's surname.
    ProfessionalSurname,
    All,
}

impl AppointmentCriterion {
    /// Parse a criterion label, case-insensitive; `None` when unsupported.
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_lowercase().trim() {
            "id" | "appointment id" | "id turno" => Some(AppointmentCriterion::Id),
            "patient document" | "documento paciente" => {
                Some(AppointmentCriterion::PatientDocument)
            }
            "professional surname" | "apellido profesional" => {
                Some(AppointmentCriterion::ProfessionalSurname)
            }
            "all" | "todos" => Some(AppointmentCriterion::All),
            _ => None,
        }
    }
}

impl Center {
    /// Book an appointment.
    ///
    /// Both people must be registered, the start must be one of the
    /// professional's slots on a day the center is open, and the professional
    /// must not already be booked at that exact date-time.
    pub fn add_appointment(&mut self, appointment: Appointment) -> CenterResult<bool> {
        if appointment.patient_document.trim().is_empty()
            || appointment.professional_document.trim().is_empty()
        {
            return Err(CenterError::InvalidInput(
                "Appointment must reference a patient and a professional".to_string(),
            ));
        }

        if !self
            .patients
            .iter()
            .any(|p| p.document == appointment.patient_document)
        {
            return Err(CenterError::person_not_found(&appointment.patient_document));
        }

        let within_window = {
            let professional = self
                .professionals
                .iter()
                .find(|p| p.document == appointment.professional_document)
                .ok_or_else(|| CenterError::person_not_found(&appointment.professional_document))?;
            self.availability().fits(professional, appointment.date_time)
        };
        if !within_window {
            warn!(%appointment, "appointment outside attendance window");
            return Err(CenterError::InvalidInput(format!(
                "{} is not an open slot of professional {}",
                appointment.date_time.format("%Y-%m-%d %H:%M"),
                appointment.professional_document
            )));
        }

        let slot_key = format!(
            "{} at {}",
            appointment.professional_document,
            appointment.date_time.format("%Y-%m-%d %H:%M")
        );
        if self
            .appointments
            .iter()
            .any(|existing| existing.id == appointment.id || existing.collides_with(&appointment))
        {
            warn!(%appointment, "appointment slot already booked");
            return Err(CenterError::appointment_already_exists(slot_key));
        }

        let saved = self.store.save_appointment(&appointment).map_err(|e| {
            warn!(%appointment, error = %e, "store failed to save appointment");
            CenterError::OperationFailed(format!("could not add appointment: {}", e))
        })?;
        if !saved {
            warn!(%appointment, "store reported a booking conflict");
            return Err(CenterError::appointment_already_exists(slot_key));
        }

        info!(%appointment, "appointment booked");
        self.appointments.push(appointment);
        self.notify();
        Ok(true)
    }

    /// Cancel an appointment.
    pub fn remove_appointment(&mut self, appointment: &Appointment) -> CenterResult<()> {
        let deleted = self.store.delete_appointment(appointment).map_err(|e| {
            warn!(%appointment, error = %e, "store failed to delete appointment");
            CenterError::OperationFailed(format!(
                "could not remove appointment {}: {}",
                appointment.id, e
            ))
        })?;
        if !deleted {
            return Err(CenterError::appointment_not_found(appointment.id));
        }

        self.appointments.retain(|existing| existing.id != appointment.id);
        info!(%appointment, "appointment removed");
        self.notify();
        Ok(())
    }

    pub fn find_appointment(&self, id: Uuid) -> CenterResult<Appointment> {
        self.appointments
            .iter()
            .find(|apt| apt.id == id)
            .cloned()
            .ok_or_else(|| CenterError::appointment_not_found(id))
    }

    /// Appointments matching `query` on the criterion named by `criterion`.
    ///
    /// An unsupported criterion yields an empty list.
    pub fn find_appointments(&self, query: &str, criterion: &str) -> CenterResult<Vec<Appointment>> {
        match AppointmentCriterion::parse(criterion) {
            Some(criterion) => self.search_appointments(query, criterion),
            None => Ok(Vec::new()),
        }
    }

    pub fn search_appointments(
        &self,
        query: &str,
        criterion: AppointmentCriterion,
    ) -> CenterResult<Vec<Appointment>> {
        debug!(?criterion, query, "searching appointments");

        match criterion {
            AppointmentCriterion::Id => {
                let id = match Uuid::parse_str(query.trim()) {
                    Ok(id) => id,
                    Err(_) => return Ok(Vec::new()),
                };
                Ok(self
                    .appointments
                    .iter()
                    .filter(|apt| apt.id == id)
                    .take(1)
                    .cloned()
                    .collect())
            }
            AppointmentCriterion::PatientDocument => Ok(self
                .appointments
                .iter()
                .filter(|apt| apt.patient_document.contains(query))
                .cloned()
                .collect()),
            AppointmentCriterion::ProfessionalSurname => {
                let mut matches = Vec::new();
                for apt in &self.appointments {
                    let professional = self
                        .professionals
                        .iter()
                        .find(|p| p.document == apt.professional_document)
                        .ok_or_else(|| {
                            CenterError::SearchFailed(format!(
                                "appointment {} references unknown professional {}",
                                apt.id, apt.professional_document
                            ))
                        })?;
                    if professional.surname.contains(query) {
                        matches.push(apt.clone());
                    }
                }
                Ok(matches)
            }
            AppointmentCriterion::All => Ok(self.appointments.clone()),
        }
    }

    /// Matching appointments dated today or later.
    pub fn find_future_appointments(
        &self,
        query: &str,
        criterion: &str,
    ) -> CenterResult<Vec<Appointment>> {
        let (future, _) = self.split_at_day(Local::now().date_naive(), query, criterion)?;
        Ok(future)
    }

    /// Matching appointments dated before today.
    pub fn find_past_appointments(
        &self,
        query: &str,
        criterion: &str,
    ) -> CenterResult<Vec<Appointment>> {
        let (_, past) = self.split_at_day(Local::now().date_naive(), query, criterion)?;
        Ok(past)
    }

    /// Run a search and split it into `(on or after today, before today)`.
    pub fn split_at_day(
        &self,
        today: NaiveDate,
        query: &str,
        criterion: &str,
    ) -> CenterResult<(Vec<Appointment>, Vec<Appointment>)> {
        let found = self
            .find_appointments(query, criterion)
            .map_err(as_search_failure)?;
        Ok(found
            .into_iter()
            .partition(|apt| apt.date_time.date() >= today))
    }

    pub fn appointments_for_professional(&self, professional: &Professional) -> Vec<Appointment> {
        self.filter_appointments(|apt| apt.is_for_professional(professional))
    }

    pub fn appointments_for_patient(&self, patient: &Patient) -> Vec<Appointment> {
        self.filter_appointments(|apt| apt.is_for_patient(patient))
    }

    pub fn appointments_between(
        &self,
        professional: &Professional,
        patient: &Patient,
    ) -> Vec<Appointment> {
        self.filter_appointments(|apt| {
            apt.is_for_professional(professional) && apt.is_for_patient(patient)
        })
    }

    pub fn appointments_on(&self, date: NaiveDate) -> Vec<Appointment> {
        self.filter_appointments(|apt| apt.date_time.date() == date)
    }

    pub fn appointments_on_for(
        &self,
        date: NaiveDate,
        professional: &Professional,
    ) -> Vec<Appointment> {
        self.filter_appointments(|apt| {
            apt.date_time.date() == date && apt.is_for_professional(professional)
        })
    }

    pub fn appointments_on_for_patient(
        &self,
        date: NaiveDate,
        professional: &Professional,
        patient_document: &str,
    ) -> Vec<Appointment> {
        self.filter_appointments(|apt| {
            apt.date_time.date() == date
                && apt.is_for_professional(professional)
                && apt.patient_document == patient_document
        })
    }

    fn filter_appointments(&self, predicate: impl Fn(&Appointment) -> bool) -> Vec<Appointment> {
        self.appointments
            .iter()
            .filter(|apt| predicate(*apt))
            .cloned()
            .collect()
    }
}

fn as_search_failure(error: CenterError) -> CenterError {
    match error {
        CenterError::SearchFailed(_) => error,
        other => CenterError::SearchFailed(other.to_string()),
    }
}
