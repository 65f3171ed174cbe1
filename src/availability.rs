//! Availability computation for professionals.
//!
//! `AvailabilityEngine` answers which dates and which start times are still
//! open for a professional, given the center's own weekly schedule, the
//! professional's schedule, the configured appointment duration and the
//! appointments already booked. It holds only borrowed data and never mutates
//! anything.

use crate::models::{Appointment, Professional};
use crate::schedule::{AppointmentDuration, WeeklySchedule};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::HashSet;
use tracing::debug;

pub struct AvailabilityEngine<'a> {
    center_schedule: &'a WeeklySchedule,
    duration: AppointmentDuration,
}

impl<'a> AvailabilityEngine<'a> {
    pub fn new(center_schedule: &'a WeeklySchedule, duration: AppointmentDuration) -> Self {
        AvailabilityEngine {
            center_schedule,
            duration,
        }
    }

    pub fn duration(&self) -> AppointmentDuration {
        self.duration
    }

    /// True when both the center and the professional attend on `weekday`.
    pub fn attends(&self, professional: &Professional, weekday: Weekday) -> bool {
        self.center_schedule.attended_weekdays().contains(&weekday)
            && professional
                .weekly_schedule
                .attended_weekdays()
                .contains(&weekday)
    }

    /// True when a booking at `at` starts on one of the professional's slots
    /// on a day both the center and the professional attend.
    pub fn fits(&self, professional: &Professional, at: NaiveDateTime) -> bool {
        let weekday = at.date().weekday();
        self.attends(professional, weekday)
            && professional
                .weekly_schedule
                .day(weekday)
                .contains_slot(at.time(), self.duration)
    }

    /// Open start times for `professional` on `date`, ascending.
    ///
    /// Returns an empty list when the day is not attended.
    pub fn available_slots(
        &self,
        professional: &Professional,
        date: NaiveDate,
        booked: &[Appointment],
    ) -> Vec<NaiveTime> {
        if !self.attends(professional, date.weekday()) {
            return Vec::new();
        }

        let taken: HashSet<NaiveTime> = booked
            .iter()
            .filter(|apt| apt.is_for_professional(professional) && apt.date_time.date() == date)
            .map(|apt| apt.date_time.time())
            .collect();

        professional
            .weekly_schedule
            .day(date.weekday())
            .slot_starts(self.duration)
            .into_iter()
            .filter(|slot| !taken.contains(slot))
            .collect()
    }

    /// Dates in `[from, to]` on which `professional` still has an open slot.
    ///
    /// An absent professional or an inverted range yields an empty list.
    pub fn available_dates(
        &self,
        professional: Option<&Professional>,
        from: NaiveDate,
        to: NaiveDate,
        booked: &[Appointment],
    ) -> Vec<NaiveDate> {
        let professional = match professional {
            Some(p) => p,
            None => return Vec::new(),
        };

        let dates: Vec<NaiveDate> = from
            .iter_days()
            .take_while(|date| *date <= to)
            .filter(|date| self.attends(professional, date.weekday()))
            .filter(|date| !self.available_slots(professional, *date, booked).is_empty())
            .collect();

        debug!(
            professional = %professional.document,
            %from,
            %to,
            open_dates = dates.len(),
            "computed available dates"
        );
        dates
    }
}
