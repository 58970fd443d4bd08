//! Room capacity fitting.
//!
//! A room fits a request when it seats the required headcount plus a
//! fractional buffer and does not exceed the request's maximum. Among
//! fitting rooms, the efficiency score prefers the one closest to the
//! ideal ratio so large halls are kept for large classes.

use crate::models::{Resource, SessionRequest};

/// Headcount a room must seat before buffering:
/// `max(enrollment, min_capacity)`.
pub fn required_capacity(request: &SessionRequest) -> u32 {
    request
        .min_capacity
        .map_or(request.enrollment_count, |m| m.max(request.enrollment_count))
}

/// Required headcount with the buffer applied (rounded down).
pub fn required_with_buffer(required: u32, buffer: f64) -> u32 {
    (f64::from(required) * (1.0 + buffer.max(0.0))).floor() as u32
}

/// Why a room does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityMismatch {
    /// The room has no capacity at all.
    Unknown,
    /// Fewer seats than required (buffer included).
    TooSmall {
        /// Room seats.
        capacity: u32,
        /// Seats needed.
        needed: u32,
    },
    /// More seats than the request allows.
    TooLarge {
        /// Room seats.
        capacity: u32,
        /// Request maximum.
        max: u32,
    },
}

/// Checks whether `room` fits `request`.
pub fn check_room(
    room: &Resource,
    request: &SessionRequest,
    buffer: f64,
) -> Result<(), CapacityMismatch> {
    let capacity = room.capacity.ok_or(CapacityMismatch::Unknown)?;
    let needed = required_with_buffer(required_capacity(request), buffer);
    if capacity < needed {
        return Err(CapacityMismatch::TooSmall { capacity, needed });
    }
    if let Some(max) = request.max_capacity {
        if capacity > max {
            return Err(CapacityMismatch::TooLarge { capacity, max });
        }
    }
    Ok(())
}

/// Closeness of fit between a room and the required headcount.
///
/// 0 below the requirement; rises linearly to 1 at `ideal_ratio`;
/// decays as `1 / (1 + excess²)` above it.
pub fn efficiency_score(capacity: u32, required: u32, ideal_ratio: f64) -> f64 {
    if required == 0 {
        return 1.0;
    }
    if capacity < required {
        return 0.0;
    }
    let ratio = f64::from(capacity) / f64::from(required);
    let score = if ratio <= ideal_ratio {
        1.0 - (ideal_ratio - ratio) * 0.5
    } else {
        let excess = ratio - ideal_ratio;
        1.0 / (1.0 + excess * excess)
    };
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;
    use chrono::{TimeZone, Utc};

    fn request(enrollment: u32) -> SessionRequest {
        let s = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let e = Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap();
        SessionRequest::new("r", 60, 1, s, e).with_enrollment(enrollment)
    }

    #[test]
    fn test_required_capacity() {
        assert_eq!(required_capacity(&request(45)), 45);
        assert_eq!(
            required_capacity(&request(20).with_capacity_range(Some(30), None)),
            30
        );
        assert_eq!(required_with_buffer(45, 0.1), 49);
    }

    #[test]
    fn test_check_room() {
        let room = Resource::new("R1", ResourceType::Classroom).with_capacity(50);
        assert!(check_room(&room, &request(45), 0.1).is_ok());
        assert!(matches!(
            check_room(&room, &request(48), 0.1),
            Err(CapacityMismatch::TooSmall { needed: 52, .. })
        ));
        let capped = request(10).with_capacity_range(None, Some(40));
        assert!(matches!(check_room(&room, &capped, 0.1), Err(CapacityMismatch::TooLarge { .. })));
        let unknown = Resource::new("R2", ResourceType::Classroom);
        assert_eq!(check_room(&unknown, &request(1), 0.1), Err(CapacityMismatch::Unknown));
    }

    #[test]
    fn test_efficiency_score() {
        assert!((efficiency_score(55, 50, 1.1) - 1.0).abs() < 1e-10);
        assert!((efficiency_score(50, 50, 1.1) - 0.95).abs() < 1e-10);
        assert_eq!(efficiency_score(40, 50, 1.1), 0.0);
        // 100 seats for 50: ratio 2.0, excess 0.9
        assert!((efficiency_score(100, 50, 1.1) - 1.0 / 1.81).abs() < 1e-10);
        assert!(efficiency_score(60, 50, 1.1) > efficiency_score(200, 50, 1.1));
    }
}
