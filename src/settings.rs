use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// Persistent settings kept in the database `meta` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    ActivityLimit,
    UrgentLimit,
}

impl Setting {
    pub const ALL: [Setting; 2] = [Setting::ActivityLimit, Setting::UrgentLimit];

    pub fn key(self) -> &'static str {
        match self {
            Setting::ActivityLimit => "activity_limit",
            Setting::UrgentLimit => "urgent_limit",
        }
    }

    pub fn default_value(self) -> usize {
        match self {
            Setting::ActivityLimit => crate::activity::DEFAULT_ACTIVITY_LIMIT,
            Setting::UrgentLimit => 3,
        }
    }

    /// Both settings are counts; zero is rejected.
    pub fn parse_value(self, raw: &str) -> Result<usize, SettingError> {
        match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(SettingError::InvalidValue {
                key: self.key(),
                value: raw.to_string(),
            }),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Setting {
    type Err = SettingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Setting::ALL
            .into_iter()
            .find(|setting| setting.key() == normalized)
            .ok_or_else(|| SettingError::UnknownKey(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingError {
    UnknownKey(String),
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(
                f,
                "unknown setting '{}': expected one of {}",
                key,
                Setting::ALL
                    .iter()
                    .map(|setting| setting.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            SettingError::InvalidValue { key, value } => {
                write!(f, "invalid value '{}' for {}: expected a positive integer", value, key)
            }
        }
    }
}

impl Error for SettingError {}
