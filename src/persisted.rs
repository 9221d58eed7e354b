//! Stored guest selections and the search request room payload

use crate::config::RoomLimits;
use crate::rooms::{distribute_flat, RoomGuestSpec};
use crate::BookingError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A guest selection as it was saved by the client.
///
/// Current records carry a `rooms` list. Older records only kept flat
/// totals (`adults`, `children`, `roomCount`, `childAges`) and are upgraded
/// on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedGuests {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<Vec<RoomGuestSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adults: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_ages: Option<Vec<u32>>,
}

impl PersistedGuests {
    pub fn from_json(json: &str) -> Result<Self, BookingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Record in the current format
    pub fn from_rooms(rooms: &[RoomGuestSpec]) -> Self {
        Self {
            rooms: Some(rooms.to_vec()),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<String, BookingError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_legacy(&self) -> bool {
        !matches!(&self.rooms, Some(rooms) if !rooms.is_empty())
    }

    /// Per-room breakdown, repairing stored rooms or distributing legacy
    /// totals. Always yields between 1 and `max_rooms` rooms, each with at
    /// least one adult; a legacy record with fewer adults than rooms is
    /// upgraded to one room per adult.
    pub fn into_rooms(self, limits: &RoomLimits) -> Vec<RoomGuestSpec> {
        let max_rooms = limits.max_rooms.max(1);

        if let Some(rooms) = self.rooms.filter(|rooms| !rooms.is_empty()) {
            if rooms.len() > max_rooms {
                warn!(stored = rooms.len(), max_rooms, "Dropping rooms beyond the cap");
            }
            return rooms
                .into_iter()
                .take(max_rooms)
                .map(RoomGuestSpec::normalized)
                .collect();
        }

        let adults = self.adults.unwrap_or(1);
        let room_count = self
            .room_count
            .unwrap_or(1)
            .clamp(1, u32::try_from(max_rooms).unwrap_or(u32::MAX))
            .min(adults.max(1));
        let children = self.children.unwrap_or(0);
        let ages = self.child_ages.unwrap_or_default();

        debug!(adults, children, room_count, "Upgrading legacy flat guest record");
        distribute_flat(adults, children, room_count, &ages)
            .into_iter()
            .map(RoomGuestSpec::normalized)
            .collect()
    }
}

/// Per-room block of the hotel search request. The backend expects every
/// count as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub adults: String,
    pub children: String,
    pub child_ages: Vec<String>,
}

impl From<&RoomGuestSpec> for RoomPayload {
    fn from(room: &RoomGuestSpec) -> Self {
        Self {
            adults: room.adults.to_string(),
            children: room.children.to_string(),
            child_ages: room.child_ages.iter().map(u32::to_string).collect(),
        }
    }
}

pub fn search_payload(rooms: &[RoomGuestSpec]) -> Vec<RoomPayload> {
    rooms.iter().map(RoomPayload::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::aggregate;

    #[test]
    fn test_current_format() {
        let json = r#"{"rooms":[{"adults":2,"children":1,"childAges":[6]},{"adults":1,"children":0,"childAges":[]}]}"#;
        let stored = PersistedGuests::from_json(json).unwrap();
        assert!(!stored.is_legacy());

        let rooms = stored.into_rooms(&RoomLimits::default());
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].child_ages, vec![6]);
    }

    #[test]
    fn test_current_format_repaired() {
        let json = r#"{"rooms":[{"adults":0,"children":2}]}"#;
        let rooms = PersistedGuests::from_json(json)
            .unwrap()
            .into_rooms(&RoomLimits::default());
        assert_eq!(rooms[0].adults, 1);
        assert_eq!(rooms[0].child_ages, vec![1, 1]);
    }

    #[test]
    fn test_legacy_flat_upgrade() {
        let json = r#"{"adults":5,"children":2,"roomCount":2,"childAges":[7]}"#;
        let stored = PersistedGuests::from_json(json).unwrap();
        assert!(stored.is_legacy());

        let rooms = stored.into_rooms(&RoomLimits::default());
        assert_eq!(rooms.len(), 2);
        assert_eq!((rooms[0].adults, rooms[0].children), (3, 1));
        assert_eq!(rooms[0].child_ages, vec![7]);
        assert_eq!(rooms[1].child_ages, vec![1]);
        assert_eq!(aggregate(&rooms).total_adults, 5);
    }

    #[test]
    fn test_legacy_missing_fields_default() {
        let rooms = PersistedGuests::from_json("{}")
            .unwrap()
            .into_rooms(&RoomLimits::default());
        assert_eq!(rooms, vec![RoomGuestSpec::default()]);
    }

    #[test]
    fn test_legacy_room_count_clamped() {
        let json = r#"{"adults":2,"roomCount":0}"#;
        let rooms = PersistedGuests::from_json(json)
            .unwrap()
            .into_rooms(&RoomLimits::default());
        assert_eq!(rooms.len(), 1);

        let json = r#"{"adults":12,"roomCount":9}"#;
        let rooms = PersistedGuests::from_json(json)
            .unwrap()
            .into_rooms(&RoomLimits::default());
        assert_eq!(rooms.len(), 6);
        assert_eq!(aggregate(&rooms).total_adults, 12);
    }

    #[test]
    fn test_legacy_fewer_adults_than_rooms() {
        let json = r#"{"adults":1,"children":2,"roomCount":3,"childAges":[4,6]}"#;
        let rooms = PersistedGuests::from_json(json)
            .unwrap()
            .into_rooms(&RoomLimits::default());
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].adults, 1);
        assert_eq!(rooms[0].child_ages, vec![4, 6]);

        let json = r#"{"adults":2,"roomCount":3}"#;
        let rooms = PersistedGuests::from_json(json)
            .unwrap()
            .into_rooms(&RoomLimits::default());
        assert_eq!(rooms.len(), 2);
        assert!(rooms.iter().all(|room| room.adults >= 1));

        let json = r#"{"adults":0,"roomCount":2}"#;
        let rooms = PersistedGuests::from_json(json)
            .unwrap()
            .into_rooms(&RoomLimits::default());
        assert_eq!(rooms, vec![RoomGuestSpec::default()]);
    }

    #[test]
    fn test_empty_rooms_list_treated_as_legacy() {
        let json = r#"{"rooms":[],"adults":3,"roomCount":1}"#;
        let stored = PersistedGuests::from_json(json).unwrap();
        assert!(stored.is_legacy());
        assert_eq!(stored.into_rooms(&RoomLimits::default())[0].adults, 3);
    }

    #[test]
    fn test_save_current_format() {
        let rooms = vec![RoomGuestSpec::default()];
        let json = PersistedGuests::from_rooms(&rooms).to_json().unwrap();
        assert_eq!(json, r#"{"rooms":[{"adults":1,"children":0,"childAges":[]}]}"#);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            PersistedGuests::from_json("not json"),
            Err(BookingError::JsonError(_))
        ));
    }

    #[test]
    fn test_search_payload_strings() {
        let rooms = vec![RoomGuestSpec {
            adults: 2,
            children: 1,
            child_ages: vec![7],
        }];
        let json = serde_json::to_string(&search_payload(&rooms)).unwrap();
        assert_eq!(json, r#"[{"adults":"2","children":"1","childAges":["7"]}]"#);
    }
}
