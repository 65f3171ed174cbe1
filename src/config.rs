//! Center configuration.
//!
//! Loaded from a JSON file, from environment variables, or both (file first,
//! then environment overrides).

use crate::error::{CenterError, CenterResult};
use crate::schedule::{AppointmentDuration, WeeklySchedule};
use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

pub const ENV_NAME: &str = "MEDCENTER_NAME";
pub const ENV_DURATION: &str = "MEDCENTER_DURATION";
pub const ENV_LOG: &str = "MEDCENTER_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CenterConfig {
    /// Display name of the center.
    pub name: String,
    /// Slot granularity, in minutes (10, 15 or 30).
    pub appointment_duration: AppointmentDuration,
    /// The center's own operating calendar.
    pub weekly_schedule: WeeklySchedule,
    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for CenterConfig {
    fn default() -> Self {
        CenterConfig {
            name: "Centro Medico".to_string(),
            appointment_duration: AppointmentDuration::default(),
            weekly_schedule: default_week(),
            log_filter: "info".to_string(),
        }
    }
}

/// Monday to Friday, 08:00 to 18:00.
fn default_week() -> WeeklySchedule {
    let open = NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN);
    let close = NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN);
    WeeklySchedule::attending(
        &[
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ],
        open,
        close,
    )
    .unwrap_or_default()
}

impl CenterConfig {
    /// Defaults with environment overrides applied.
    ///
    /// # Environment Variables
    /// - `MEDCENTER_NAME` (optional): center name
    /// - `MEDCENTER_DURATION` (optional): `short` | `medium` | `long` or 10 / 15 / 30
    /// - `MEDCENTER_LOG` (optional): fallback log filter
    pub fn from_env() -> CenterResult<Self> {
        CenterConfig::default().with_env_overrides()
    }

    /// Read a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> CenterResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CenterError::InvalidInput(format!(
                "cannot read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            CenterError::InvalidInput(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Apply `MEDCENTER_*` variables on top of `self`.
    pub fn with_env_overrides(mut self) -> CenterResult<Self> {
        if let Ok(name) = env::var(ENV_NAME) {
            if !name.trim().is_empty() {
                self.name = name;
            }
        }
        if let Ok(duration) = env::var(ENV_DURATION) {
            self.appointment_duration = duration
                .parse()
                .map_err(CenterError::InvalidInput)?;
        }
        if let Ok(filter) = env::var(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_open_on_weekdays() {
        let config = CenterConfig::default();
        assert_eq!(config.appointment_duration, AppointmentDuration::Long);
        assert_eq!(config.weekly_schedule.attended_weekdays().len(), 5);
        assert!(!config.weekly_schedule.attends(Weekday::Sat));
    }

    #[test]
    fn json_file_overrides_only_given_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "name": "Clinica Norte", "appointment_duration": 15 }}"#
        )
        .unwrap();

        let config = CenterConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.name, "Clinica Norte");
        assert_eq!(config.appointment_duration, AppointmentDuration::Medium);
        assert_eq!(config.weekly_schedule, default_week());
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn invalid_duration_in_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "appointment_duration": 45 }}"#).unwrap();

        let err = CenterConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, CenterError::InvalidInput(_)));
    }

    #[test]
    fn missing_file_is_invalid_input() {
        let err = CenterConfig::from_json_file("/nonexistent/medcenter.json").unwrap_err();
        assert!(matches!(err, CenterError::InvalidInput(_)));
    }
}
