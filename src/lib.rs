//! # Rust Booking Library
//!
//! Pure booking-form logic for flight and hotel search front-ends: the
//! calendar date-range picker and the multi-room guest editor. Every
//! operation takes the current state (and `today`) as input and returns a
//! new state, so any rendering surface can drive it from its event loop.

pub mod calendar;
pub mod config;
pub mod persisted;
pub mod rooms;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Re-export main types for convenience
pub use calendar::{
    day_state, generate_grid, is_selectable, select_date, CalendarDate, CalendarGrid, DateRange,
    DayState, MonthNavigator, Selection, YearMonth,
};
pub use config::{BookingConfig, CalendarConfig, RoomLimits};
pub use persisted::{search_payload, PersistedGuests, RoomPayload};
pub use rooms::{
    add_room, aggregate, distribute_flat, remove_room, set_child_age, update_room_guests,
    GuestAggregate, GuestField, GuestStep, RoomGuestSpec,
};

/// Error types for the booking library
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid date format: {0}")]
    DateParseError(String),

    #[error("Date out of supported range: year {year}, month index {month_index}")]
    DateOutOfRange { year: i32, month_index: i32 },

    #[error("Parsing failed: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Trip mode enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TripMode {
    OneWay,
    RoundTrip,
}

impl FromStr for TripMode {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round-trip" | "roundtrip" => Ok(TripMode::RoundTrip),
            "one-way" | "oneway" => Ok(TripMode::OneWay),
            _ => Err(BookingError::ParseError(format!("Invalid trip mode: {}", s))),
        }
    }
}

impl fmt::Display for TripMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripMode::OneWay => write!(f, "one-way"),
            TripMode::RoundTrip => write!(f, "round-trip"),
        }
    }
}

/// What the calendar is picking dates for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDomain {
    /// Departure with an optional return date
    Flight,
    /// Check-in and check-out, always a pair
    Hotel,
}

impl SearchDomain {
    /// Hotels always pick a check-in/check-out pair regardless of the toggle.
    pub fn effective_trip_mode(self, requested: TripMode) -> TripMode {
        match self {
            SearchDomain::Hotel => TripMode::RoundTrip,
            SearchDomain::Flight => requested,
        }
    }
}

impl FromStr for SearchDomain {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flight" | "flights" => Ok(SearchDomain::Flight),
            "hotel" | "hotels" => Ok(SearchDomain::Hotel),
            _ => Err(BookingError::ParseError(format!("Invalid search domain: {}", s))),
        }
    }
}

impl fmt::Display for SearchDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchDomain::Flight => write!(f, "flight"),
            SearchDomain::Hotel => write!(f, "hotel"),
        }
    }
}
