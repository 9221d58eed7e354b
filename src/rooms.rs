//! Multi-room guest editor: per-room adults, children and child ages

use crate::config::RoomLimits;
use crate::BookingError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Age used when a child is added or an age is missing
pub const DEFAULT_CHILD_AGE: u32 = 1;

/// Occupancy of one room. `child_ages` always holds one entry per child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomGuestSpec {
    pub adults: u32,
    pub children: u32,
    #[serde(default)]
    pub child_ages: Vec<u32>,
}

impl Default for RoomGuestSpec {
    fn default() -> Self {
        Self {
            adults: 1,
            children: 0,
            child_ages: Vec::new(),
        }
    }
}

impl RoomGuestSpec {
    /// Repair a record read from storage: at least one adult, and exactly
    /// one age per child (padded with the default age, extras dropped).
    pub fn normalized(mut self) -> Self {
        self.adults = self.adults.max(1);
        self.child_ages.resize(self.children as usize, DEFAULT_CHILD_AGE);
        self
    }

    /// Like `normalized`, and also caps the counts and ages at `limits`
    pub fn clamped(mut self, limits: &RoomLimits) -> Self {
        self.adults = self.adults.clamp(1, limits.max_adults_per_room.max(1));
        self.children = self.children.min(limits.max_children_per_room);
        let mut room = self.normalized();
        for age in &mut room.child_ages {
            *age = (*age).min(limits.max_child_age);
        }
        room
    }

    pub fn guests(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }
}

/// Totals across all rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GuestAggregate {
    pub total_adults: u32,
    pub total_children: u32,
    pub room_count: usize,
}

/// Which counter a stepper button changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestField {
    Adults,
    Children,
}

impl FromStr for GuestField {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "adults" | "adult" => Ok(GuestField::Adults),
            "children" | "child" => Ok(GuestField::Children),
            _ => Err(BookingError::ParseError(format!("Invalid guest field: {}", s))),
        }
    }
}

/// One press of a +/- stepper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestStep {
    Increment,
    Decrement,
}

impl FromStr for GuestStep {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "increment" | "inc" | "+" | "+1" => Ok(GuestStep::Increment),
            "decrement" | "dec" | "-" | "-1" => Ok(GuestStep::Decrement),
            _ => Err(BookingError::ParseError(format!("Invalid guest step: {}", s))),
        }
    }
}

/// Append a room with one adult, unless the room cap is reached
pub fn add_room(rooms: &[RoomGuestSpec], limits: &RoomLimits) -> Vec<RoomGuestSpec> {
    let mut next = rooms.to_vec();
    if next.len() >= limits.max_rooms {
        debug!(rooms = next.len(), max_rooms = limits.max_rooms, "Room cap reached");
        return next;
    }
    next.push(RoomGuestSpec::default());
    next
}

/// Remove the room at `index`; the last remaining room is never removed
pub fn remove_room(rooms: &[RoomGuestSpec], index: usize) -> Vec<RoomGuestSpec> {
    let mut next = rooms.to_vec();
    if next.len() <= 1 || index >= next.len() {
        debug!(rooms = next.len(), index, "Ignoring room removal");
        return next;
    }
    next.remove(index);
    next
}

/// Step the adult or child count of one room, keeping child ages in sync.
///
/// Adults stay within `1..=max_adults_per_room`, children within
/// `0..=max_children_per_room`. A new child gets the default age; removing
/// a child drops the last age.
pub fn update_room_guests(
    rooms: &[RoomGuestSpec],
    index: usize,
    field: GuestField,
    step: GuestStep,
    limits: &RoomLimits,
) -> Vec<RoomGuestSpec> {
    let mut next = rooms.to_vec();
    if index >= next.len() {
        debug!(index, rooms = rooms.len(), "Ignoring update for unknown room");
        return next;
    }
    let room = &mut next[index];

    match (field, step) {
        (GuestField::Adults, GuestStep::Increment) => {
            if room.adults < limits.max_adults_per_room {
                room.adults += 1;
            }
        }
        (GuestField::Adults, GuestStep::Decrement) => {
            if room.adults > 1 {
                room.adults -= 1;
            }
        }
        (GuestField::Children, GuestStep::Increment) => {
            if room.children < limits.max_children_per_room {
                room.children += 1;
                room.child_ages.push(limits.default_child_age);
            }
        }
        (GuestField::Children, GuestStep::Decrement) => {
            if room.children > 0 {
                room.children -= 1;
                room.child_ages.pop();
            }
        }
    }

    next
}

/// Set the age of one child, clamped to `0..=max_child_age`
pub fn set_child_age(
    rooms: &[RoomGuestSpec],
    room_index: usize,
    child_index: usize,
    age: u32,
    limits: &RoomLimits,
) -> Vec<RoomGuestSpec> {
    let mut next = rooms.to_vec();
    if let Some(slot) = next
        .get_mut(room_index)
        .and_then(|room| room.child_ages.get_mut(child_index))
    {
        *slot = age.min(limits.max_child_age);
    }
    next
}

/// Spread flat totals over `room_count` rooms.
///
/// Every room gets the floor share and room 0 also takes the whole
/// remainder, for adults and children alike. Ages are handed out in order
/// across rooms; missing ones become the default age. A zero room count
/// yields no rooms.
pub fn distribute_flat(
    total_adults: u32,
    total_children: u32,
    room_count: u32,
    existing_child_ages: &[u32],
) -> Vec<RoomGuestSpec> {
    if room_count == 0 {
        return Vec::new();
    }

    let adults_per_room = total_adults / room_count;
    let adults_remainder = total_adults % room_count;
    let children_per_room = total_children / room_count;
    let children_remainder = total_children % room_count;

    let mut ages = existing_child_ages.iter().copied();
    let rooms: Vec<RoomGuestSpec> = (0..room_count)
        .map(|i| {
            let (adults, children) = if i == 0 {
                (adults_per_room + adults_remainder, children_per_room + children_remainder)
            } else {
                (adults_per_room, children_per_room)
            };
            let child_ages = (0..children)
                .map(|_| ages.next().unwrap_or(DEFAULT_CHILD_AGE))
                .collect();
            RoomGuestSpec {
                adults,
                children,
                child_ages,
            }
        })
        .collect();

    debug!(
        total_adults,
        total_children,
        room_count,
        provided_ages = existing_child_ages.len(),
        "Distributed flat guest totals across rooms"
    );
    rooms
}

/// Sum the rooms. Totals saturate at `u32::MAX` instead of wrapping.
pub fn aggregate(rooms: &[RoomGuestSpec]) -> GuestAggregate {
    rooms.iter().fold(
        GuestAggregate {
            room_count: rooms.len(),
            ..GuestAggregate::default()
        },
        |acc, room| GuestAggregate {
            total_adults: acc.total_adults.saturating_add(room.adults),
            total_children: acc.total_children.saturating_add(room.children),
            ..acc
        },
    )
}
