//! Weekly attendance schedules and slot granularity.
//!
//! A `DaySchedule` is one day's attendance window; a `WeeklySchedule` holds
//! seven of them, Monday first. Both the center and every professional own a
//! `WeeklySchedule`, and candidate appointment starts are enumerated from a
//! window at the granularity given by `AppointmentDuration`.

use crate::error::{CenterError, CenterResult};
use chrono::{Duration, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar order used whenever weekdays are listed.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Slot granularity for appointments, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum AppointmentDuration {
    Short = 10,
    Medium = 15,
    #[default]
    Long = 30,
}

impl AppointmentDuration {
    pub fn minutes(&self) -> u16 {
        *self as u16
    }

    pub fn as_delta(&self) -> Duration {
        Duration::minutes(i64::from(self.minutes()))
    }

    pub fn name(&self) -> &str {
        match self {
            AppointmentDuration::Short => "SHORT",
            AppointmentDuration::Medium => "MEDIUM",
            AppointmentDuration::Long => "LONG",
        }
    }
}

impl From<AppointmentDuration> for u16 {
    fn from(duration: AppointmentDuration) -> Self {
        duration.minutes()
    }
}

impl TryFrom<u16> for AppointmentDuration {
    type Error = String;

    fn try_from(minutes: u16) -> Result<Self, Self::Error> {
        match minutes {
            10 => Ok(AppointmentDuration::Short),
            15 => Ok(AppointmentDuration::Medium),
            30 => Ok(AppointmentDuration::Long),
            other => Err(format!(
                "Invalid appointment duration: {} minutes. Must be one of: 10, 15, 30",
                other
            )),
        }
    }
}

impl FromStr for AppointmentDuration {
    type Err = String;

    /// Accepts a variant name (English or the legacy Spanish one) or a minute count.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().trim() {
            "short" | "corto" => Ok(AppointmentDuration::Short),
            "medium" | "mediano" => Ok(AppointmentDuration::Medium),
            "long" | "largo" => Ok(AppointmentDuration::Long),
            other => other
                .parse::<u16>()
                .map_err(|_| {
                    format!(
                        "Invalid appointment duration: '{}'. Must be one of: short, medium, long",
                        value
                    )
                })
                .and_then(AppointmentDuration::try_from),
        }
    }
}

impl fmt::Display for AppointmentDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} min)", self.name(), self.minutes())
    }
}

/// Attendance window for a single weekday.
///
/// `start` and `end` are only meaningful when `attends` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub attends: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DaySchedule {
    /// A day without attendance.
    pub fn closed() -> Self {
        DaySchedule {
            attends: false,
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
        }
    }

    /// An attended day with validation.
    pub fn open(start: NaiveTime, end: NaiveTime) -> CenterResult<Self> {
        if end <= start {
            return Err(CenterError::InvalidInput(format!(
                "attendance window must end after it starts ({} - {})",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }

        Ok(DaySchedule {
            attends: true,
            start,
            end,
        })
    }

    /// Length of the window in minutes, zero when the day is not attended.
    pub fn window_minutes(&self) -> i64 {
        if !self.attends || self.end <= self.start {
            return 0;
        }
        (self.end - self.start).num_minutes()
    }

    /// Candidate appointment starts for this day, ascending.
    ///
    /// Steps from `start` in increments of `duration`; a slot whose end would
    /// pass `end` (or midnight) is dropped.
    pub fn slot_starts(&self, duration: AppointmentDuration) -> Vec<NaiveTime> {
        let mut slots = Vec::new();
        if !self.attends {
            return slots;
        }

        let step = duration.as_delta();
        let mut current = self.start;

        loop {
            let (slot_end, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 || slot_end > self.end {
                break;
            }
            slots.push(current);
            current = slot_end;
        }

        slots
    }

    /// Check if `time` is one of the slot starts for `duration`.
    pub fn contains_slot(&self, time: NaiveTime, duration: AppointmentDuration) -> bool {
        if !self.attends || time < self.start || time >= self.end {
            return false;
        }
        let offset = (time - self.start).num_minutes();
        let (slot_end, wrapped) = time.overflowing_add_signed(duration.as_delta());
        offset % i64::from(duration.minutes()) == 0
            && time.second() == 0
            && wrapped == 0
            && slot_end <= self.end
    }
}

impl Default for DaySchedule {
    fn default() -> Self {
        DaySchedule::closed()
    }
}

/// Attendance windows for the seven weekdays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
}

impl WeeklySchedule {
    /// Build a schedule attending `days` with the same window, every other day closed.
    pub fn attending(days: &[Weekday], start: NaiveTime, end: NaiveTime) -> CenterResult<Self> {
        let window = DaySchedule::open(start, end)?;
        let mut schedule = WeeklySchedule::default();
        for day in days {
            schedule.set_day(*day, window);
        }
        Ok(schedule)
    }

    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn set_day(&mut self, weekday: Weekday, schedule: DaySchedule) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = schedule;
    }

    pub fn attends(&self, weekday: Weekday) -> bool {
        self.day(weekday).attends
    }

    /// Weekdays with attendance, Monday first.
    pub fn attended_weekdays(&self) -> Vec<Weekday> {
        WEEK.iter()
            .copied()
            .filter(|day| self.attends(*day))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn slots_step_by_duration_and_stop_at_window_end() {
        let day = DaySchedule::open(hm(9, 0), hm(12, 0)).unwrap();

        let slots = day.slot_starts(AppointmentDuration::Medium);
        assert_eq!(slots.len(), 12);
        assert_eq!(slots.first(), Some(&hm(9, 0)));
        assert_eq!(slots.last(), Some(&hm(11, 45)));

        assert_eq!(day.slot_starts(AppointmentDuration::Long).len(), 6);
        assert_eq!(day.slot_starts(AppointmentDuration::Short).len(), 18);
    }

    #[test]
    fn partial_trailing_slot_is_dropped() {
        let day = DaySchedule::open(hm(9, 0), hm(9, 50)).unwrap();
        let slots = day.slot_starts(AppointmentDuration::Long);
        assert_eq!(slots, vec![hm(9, 0)]);
        assert_eq!(day.window_minutes(), 50);
    }

    #[test]
    fn slots_never_wrap_past_midnight() {
        let day = DaySchedule::open(hm(23, 0), hm(23, 59)).unwrap();
        let slots = day.slot_starts(AppointmentDuration::Long);
        assert_eq!(slots, vec![hm(23, 0)]);
        assert!(!day.contains_slot(hm(23, 45), AppointmentDuration::Long));
    }

    #[test]
    fn closed_day_has_no_slots() {
        let day = DaySchedule::closed();
        assert!(day.slot_starts(AppointmentDuration::Short).is_empty());
        assert_eq!(day.window_minutes(), 0);
        assert!(!day.contains_slot(hm(0, 0), AppointmentDuration::Short));
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(DaySchedule::open(hm(12, 0), hm(9, 0)).is_err());
        assert!(DaySchedule::open(hm(9, 0), hm(9, 0)).is_err());
    }

    #[test]
    fn contains_slot_respects_window_bounds() {
        let day = DaySchedule::open(hm(9, 0), hm(12, 0)).unwrap();
        assert!(day.contains_slot(hm(9, 0), AppointmentDuration::Long));
        assert!(day.contains_slot(hm(11, 30), AppointmentDuration::Long));
        assert!(!day.contains_slot(hm(11, 45), AppointmentDuration::Long));
        assert!(!day.contains_slot(hm(8, 30), AppointmentDuration::Long));
    }

    #[test]
    fn contains_slot_rejects_off_grid_starts() {
        let day = DaySchedule::open(hm(9, 0), hm(12, 0)).unwrap();
        assert!(day.contains_slot(hm(9, 15), AppointmentDuration::Medium));
        assert!(!day.contains_slot(hm(9, 5), AppointmentDuration::Medium));
        assert!(!day.contains_slot(hm(9, 15), AppointmentDuration::Long));
        assert!(!day.contains_slot(
            NaiveTime::from_hms_opt(9, 0, 30).unwrap(),
            AppointmentDuration::Short
        ));
        for slot in day.slot_starts(AppointmentDuration::Short) {
            assert!(day.contains_slot(slot, AppointmentDuration::Short));
        }
    }

    #[test]
    fn attended_weekdays_follow_calendar_order() {
        let schedule = WeeklySchedule::attending(
            &[Weekday::Fri, Weekday::Mon, Weekday::Wed],
            hm(9, 0),
            hm(12, 0),
        )
        .unwrap();

        assert_eq!(
            schedule.attended_weekdays(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
        assert!(!schedule.attends(Weekday::Tue));
        assert_eq!(schedule.day(Weekday::Wed).start, hm(9, 0));
    }

    #[test]
    fn duration_parses_names_and_minutes() {
        assert_eq!("medium".parse(), Ok(AppointmentDuration::Medium));
        assert_eq!("Largo".parse(), Ok(AppointmentDuration::Long));
        assert_eq!("10".parse(), Ok(AppointmentDuration::Short));
        assert!("45".parse::<AppointmentDuration>().is_err());
        assert!("weekly".parse::<AppointmentDuration>().is_err());
        assert_eq!(AppointmentDuration::default(), AppointmentDuration::Long);
    }
}
