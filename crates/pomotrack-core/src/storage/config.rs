//! Timer settings.
//!
//! All intervals are whole seconds. Settings are replaced as a whole value;
//! [`Settings::with_value`] produces a new validated copy rather than
//! editing in place, so a rejected update leaves the current value intact.
//!
//! Stored as `settings.toml` by the file gateway.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::session::BreakKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_work_interval")]
    pub work_interval: u64,
    #[serde(default = "default_short_break")]
    pub short_break_interval: u64,
    #[serde(default = "default_long_break")]
    pub long_break_interval: u64,
    /// Completed sessions per long break. Zero disables long breaks.
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
}

fn default_work_interval() -> u64 {
    25 * 60
}
fn default_short_break() -> u64 {
    5 * 60
}
fn default_long_break() -> u64 {
    15 * 60
}
fn default_sessions_until_long_break() -> u32 {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_interval: default_work_interval(),
            short_break_interval: default_short_break(),
            long_break_interval: default_long_break(),
            sessions_until_long_break: default_sessions_until_long_break(),
        }
    }
}

impl Settings {
    pub const KEYS: [&'static str; 4] = [
        "work_interval",
        "short_break_interval",
        "long_break_interval",
        "sessions_until_long_break",
    ];

    pub fn break_interval(&self, kind: BreakKind) -> u64 {
        match kind {
            BreakKind::Short => self.short_break_interval,
            BreakKind::Long => self.long_break_interval,
        }
    }

    /// Reject zero-length intervals.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let intervals = [
            ("work_interval", self.work_interval),
            ("short_break_interval", self.short_break_interval),
            ("long_break_interval", self.long_break_interval),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    message: "interval must be at least one second".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Get a value as a string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "work_interval" => self.work_interval,
            "short_break_interval" => self.short_break_interval,
            "long_break_interval" => self.long_break_interval,
            "sessions_until_long_break" => u64::from(self.sessions_until_long_break),
            _ => return None,
        };
        Some(value.to_string())
    }

    /// Copy of these settings with one key replaced, validated as a whole.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Settings, ValidationError> {
        let parsed: u64 = value
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidValue {
                field: key.to_string(),
                message: format!("cannot parse '{value}' as a non-negative integer"),
            })?;

        let mut next = *self;
        match key {
            "work_interval" => next.work_interval = parsed,
            "short_break_interval" => next.short_break_interval = parsed,
            "long_break_interval" => next.long_break_interval = parsed,
            "sessions_until_long_break" => {
                next.sessions_until_long_break =
                    u32::try_from(parsed).map_err(|_| ValidationError::InvalidValue {
                        field: key.to_string(),
                        message: format!("{parsed} is too large"),
                    })?;
            }
            _ => return Err(ValidationError::UnknownKey(key.to_string())),
        }
        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn default_values() {
        let settings = Settings::default();
        assert_eq!(settings.work_interval, 1500);
        assert_eq!(settings.short_break_interval, 300);
        assert_eq!(settings.long_break_interval, 900);
        assert_eq!(settings.sessions_until_long_break, 4);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: Settings = toml::from_str("work_interval = 60").unwrap();
        assert_eq!(parsed.work_interval, 60);
        assert_eq!(parsed.short_break_interval, 300);
    }

    #[test]
    fn get_supports_every_key() {
        let settings = Settings::default();
        for key in Settings::KEYS {
            assert!(settings.get(key).is_some(), "missing {key}");
        }
        assert_eq!(settings.get("long_break_interval").as_deref(), Some("900"));
        assert!(settings.get("volume").is_none());
    }

    #[test]
    fn with_value_replaces_one_key() {
        let settings = Settings::default();
        let next = settings.with_value("short_break_interval", "120").unwrap();
        assert_eq!(next.short_break_interval, 120);
        assert_eq!(next.work_interval, settings.work_interval);
        assert_eq!(settings.short_break_interval, 300);
    }

    #[test]
    fn with_value_rejects_bad_input() {
        let settings = Settings::default();
        assert!(matches!(
            settings.with_value("volume", "3"),
            Err(ValidationError::UnknownKey(_))
        ));
        assert!(settings.with_value("work_interval", "soon").is_err());
        assert!(settings.with_value("work_interval", "0").is_err());
        assert!(settings.with_value("sessions_until_long_break", "0").is_ok());
    }

    #[test]
    fn break_interval_by_kind() {
        let settings = Settings::default();
        assert_eq!(settings.break_interval(BreakKind::Short), 300);
        assert_eq!(settings.break_interval(BreakKind::Long), 900);
    }
}
