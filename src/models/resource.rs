//! Resource model.
//!
//! Resources are what a session occupies while it meets: classrooms,
//! instructors, equipment, campus facilities and online meeting slots.
//! Each resource has a closed type, an optional seating capacity, a
//! concurrency limit and a capability map matched against request
//! requirements.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AttributeValue, Attributes, Requirements, TimeWindow};

/// A bookable resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Resource classification.
    pub resource_type: ResourceType,
    /// Seats (rooms) or headcount limit; `None` for non-capacity resources.
    pub capacity: Option<u32>,
    /// Simultaneous bookings tolerated (default: 1).
    pub concurrency_capacity: u32,
    /// Capability map.
    pub attributes: Attributes,
    /// Building the resource is located in.
    pub building_id: Option<String>,
    /// Floor within the building.
    pub floor_number: Option<i32>,
    /// Calendar governing availability (weak reference by id).
    pub availability_calendar_id: Option<String>,
    /// Resource-specific unavailable periods.
    pub blackout_periods: Vec<TimeWindow>,
}

/// Resource type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Physical teaching room.
    Classroom,
    /// Teaching staff.
    Instructor,
    /// Movable equipment (projectors, lab kits).
    Equipment,
    /// Campus-level facility.
    Campus,
    /// Virtual meeting room.
    OnlineSlot,
}

impl ResourceType {
    /// All resource types in canonical order.
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Classroom,
        ResourceType::Instructor,
        ResourceType::Equipment,
        ResourceType::Campus,
        ResourceType::OnlineSlot,
    ];

    /// Snake-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classroom => "classroom",
            Self::Instructor => "instructor",
            Self::Equipment => "equipment",
            Self::Campus => "campus",
            Self::OnlineSlot => "online_slot",
        }
    }

    /// Parses a snake-case identifier.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Resource {
    /// Creates a resource with concurrency 1 and no attributes.
    pub fn new(id: impl Into<String>, resource_type: ResourceType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            resource_type,
            capacity: None,
            concurrency_capacity: 1,
            attributes: Attributes::new(),
            building_id: None,
            floor_number: None,
            availability_calendar_id: None,
            blackout_periods: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the seating capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the concurrency limit.
    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency_capacity = concurrency;
        self
    }

    /// Adds an attribute.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the building (and optionally floor).
    pub fn with_building(mut self, building_id: impl Into<String>, floor: Option<i32>) -> Self {
        self.building_id = Some(building_id.into());
        self.floor_number = floor;
        self
    }

    /// Sets the availability calendar reference.
    pub fn with_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.availability_calendar_id = Some(calendar_id.into());
        self
    }

    /// Adds a blackout period.
    pub fn with_blackout(mut self, window: TimeWindow) -> Self {
        self.blackout_periods.push(window);
        self
    }

    /// Whether the resource's attributes satisfy every required entry.
    ///
    /// A `capacity` requirement is also matched against the seating
    /// capacity when no explicit `capacity` attribute exists.
    pub fn can_satisfy(&self, requirements: &Requirements) -> bool {
        requirements.iter().all(|(key, req)| {
            let seats = self.capacity.map(|c| AttributeValue::Int(i64::from(c)));
            let actual = self
                .attributes
                .get(key)
                .or(if key == "capacity" { seats.as_ref() } else { None });
            req.is_satisfied_by(actual)
        })
    }

    /// Number of optional requirements this resource happens to match.
    pub fn preference_matches(&self, requirements: &Requirements) -> usize {
        requirements
            .iter()
            .filter(|(key, req)| !req.is_required() && req.is_matched_by(self.attributes.get(*key)))
            .count()
    }

    /// First own blackout overlapping `window`.
    pub fn blackout_overlapping(&self, window: &TimeWindow) -> Option<&TimeWindow> {
        self.blackout_periods.iter().find(|b| b.overlaps(window))
    }
}
