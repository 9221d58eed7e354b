//! Picker limits, loadable from TOML

use crate::BookingError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    pub calendar: CalendarConfig,
    pub rooms: RoomLimits,
}

/// Calendar navigation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// How far past the current month the picker may navigate
    pub max_years_ahead: u32,
    /// Months rendered side by side
    pub visible_months: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            max_years_ahead: 2,
            visible_months: 2,
        }
    }
}

/// Caps and defaults for the room/guest editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomLimits {
    pub max_rooms: usize,
    pub max_adults_per_room: u32,
    pub max_children_per_room: u32,
    pub max_child_age: u32,
    /// Age given to a newly added child
    pub default_child_age: u32,
}

impl Default for RoomLimits {
    fn default() -> Self {
        Self {
            max_rooms: 6,
            max_adults_per_room: 6,
            max_children_per_room: 4,
            max_child_age: 17,
            default_child_age: 1,
        }
    }
}

impl RoomLimits {
    /// Reject a requested room count outside `1..=max_rooms`
    pub fn check_room_count(&self, room_count: u32) -> Result<(), BookingError> {
        let within = usize::try_from(room_count).map_or(false, |count| count <= self.max_rooms);
        if room_count == 0 || !within {
            return Err(BookingError::InvalidConfig(format!(
                "room count must be between 1 and {}, got {}",
                self.max_rooms, room_count
            )));
        }
        Ok(())
    }
}

impl BookingConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BookingError> {
        debug!(path = %path.as_ref().display(), "Loading configuration file");
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string. Missing
    /// sections and keys fall back to the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, BookingError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BookingError> {
        let rooms = &self.rooms;
        let checks = [
            (rooms.max_rooms >= 1, "rooms.max_rooms must be at least 1"),
            (rooms.max_adults_per_room >= 1, "rooms.max_adults_per_room must be at least 1"),
            (
                rooms.default_child_age <= rooms.max_child_age,
                "rooms.default_child_age must not exceed rooms.max_child_age",
            ),
            (self.calendar.visible_months >= 1, "calendar.visible_months must be at least 1"),
            (self.calendar.max_years_ahead <= 100, "calendar.max_years_ahead must be at most 100"),
        ];

        for (ok, message) in checks {
            if !ok {
                warn!(reason = message, "Rejecting configuration");
                return Err(BookingError::InvalidConfig(message.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BookingConfig::default();
        assert_eq!(config.calendar.max_years_ahead, 2);
        assert_eq!(config.calendar.visible_months, 2);
        assert_eq!(config.rooms.max_rooms, 6);
        assert_eq!(config.rooms.default_child_age, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BookingConfig::from_toml_str(
            r#"
            [rooms]
            max_rooms = 4

            [calendar]
            max_years_ahead = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.rooms.max_rooms, 4);
        assert_eq!(config.rooms.max_children_per_room, 4);
        assert_eq!(config.calendar.max_years_ahead, 1);
        assert_eq!(config.calendar.visible_months, 2);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(BookingConfig::from_toml_str("").unwrap(), BookingConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = BookingConfig::from_toml_str("[rooms]\nmax_rooms = 0\n").unwrap_err();
        assert!(matches!(err, BookingError::InvalidConfig(_)));

        let err = BookingConfig::from_toml_str("[rooms]\ndefault_child_age = 30\n").unwrap_err();
        assert!(matches!(err, BookingError::InvalidConfig(_)));
    }

    #[test]
    fn test_room_count_bounds() {
        let limits = RoomLimits::default();
        assert!(limits.check_room_count(1).is_ok());
        assert!(limits.check_room_count(6).is_ok());
        assert!(limits.check_room_count(0).is_err());
        assert!(limits.check_room_count(7).is_err());
        assert!(limits.check_room_count(4_000_000_000).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = BookingConfig::from_toml_str("[rooms\nmax_rooms = ").unwrap_err();
        assert!(matches!(err, BookingError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = BookingConfig::from_file("/nonexistent/booking.toml").unwrap_err();
        assert!(matches!(err, BookingError::ConfigIo(_)));
    }
}
