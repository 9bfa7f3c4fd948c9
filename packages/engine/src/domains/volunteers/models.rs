use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::{UserId, VolunteerId};
use crate::domains::requests::models::Coordinates;
use crate::error::EngineError;

/// Availability of a volunteer.
///
/// `Available`/`Offline` are set by the volunteer; the arbiter flips
/// `Available <-> Busy` on match accept and complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerStatus {
    Available,
    Busy,
    Offline,
}

impl VolunteerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }
}

impl FromStr for VolunteerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "busy" => Ok(Self::Busy),
            "offline" => Ok(Self::Offline),
            other => Err(format!("unknown volunteer status: {other}")),
        }
    }
}

/// A volunteer's matching profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolunteerProfile {
    pub id: VolunteerId,
    pub user_id: UserId,
    pub skills: Vec<String>,
    /// Maximum service radius in kilometers (widened for SOS requests).
    pub max_distance_km: f64,
    /// Last known location; a volunteer without one is never eligible.
    pub location: Option<Coordinates>,
    pub status: VolunteerStatus,
    pub total_helps: i32,
    /// Running average in [0, 5]; rating updates come from an external
    /// collaborator.
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VolunteerProfile {
    /// Case-insensitive skill membership.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill))
    }
}

/// Input for registering a volunteer profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVolunteerProfile {
    pub user_id: UserId,
    pub skills: Vec<String>,
    pub max_distance_km: f64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl NewVolunteerProfile {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.max_distance_km.is_finite() && self.max_distance_km > 0.0) {
            return Err(EngineError::Validation(
                "max_distance_km must be positive".into(),
            ));
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                if !Coordinates::new(lat, lng).is_valid() {
                    return Err(EngineError::Validation(
                        "volunteer coordinates are invalid".into(),
                    ));
                }
            }
            (None, None) => {}
            _ => {
                return Err(EngineError::Validation(
                    "latitude and longitude must be provided together".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn location(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_skill_is_case_insensitive() {
        let profile = VolunteerProfile {
            id: VolunteerId::new(),
            user_id: UserId::new(),
            skills: vec!["First Aid".into(), "rescue".into()],
            max_distance_km: 10.0,
            location: Some(Coordinates::new(12.97, 77.59)),
            status: VolunteerStatus::Available,
            total_helps: 0,
            rating: 4.5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(profile.has_skill("first aid"));
        assert!(profile.has_skill("RESCUE"));
        assert!(!profile.has_skill("driving"));
    }

    #[test]
    fn negative_radius_rejected() {
        let input = NewVolunteerProfile {
            user_id: UserId::new(),
            skills: vec![],
            max_distance_km: -1.0,
            latitude: None,
            longitude: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn lone_latitude_rejected() {
        let input = NewVolunteerProfile {
            user_id: UserId::new(),
            skills: vec![],
            max_distance_km: 5.0,
            latitude: Some(12.9),
            longitude: None,
        };
        assert!(input.validate().is_err());
    }
}
