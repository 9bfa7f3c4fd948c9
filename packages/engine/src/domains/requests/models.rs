use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::{RequestId, StatusLogId, UserId};
use crate::error::EngineError;

/// Category of help being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpType {
    Food,
    Shelter,
    Blood,
    Transport,
    Medical,
    Rescue,
    Other,
}

impl HelpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Shelter => "shelter",
            Self::Blood => "blood",
            Self::Transport => "transport",
            Self::Medical => "medical",
            Self::Rescue => "rescue",
            Self::Other => "other",
        }
    }
}

impl FromStr for HelpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "food" => Ok(Self::Food),
            "shelter" => Ok(Self::Shelter),
            "blood" => Ok(Self::Blood),
            "transport" => Ok(Self::Transport),
            "medical" => Ok(Self::Medical),
            "rescue" => Ok(Self::Rescue),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown help type: {other}")),
        }
    }
}

/// Urgency level of a request. Drives offer deadlines and the score boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Normalized boost factor used by the scorer.
    pub fn factor(&self) -> f64 {
        match self {
            Self::Low => 0.25,
            Self::Medium => 0.5,
            Self::High => 0.75,
            Self::Critical => 1.0,
        }
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown urgency: {other}")),
        }
    }
}

/// Lifecycle status of a help request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    Matched,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Matched => "matched",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal requests are retained for audit, never deleted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "matched" => Ok(Self::Matched),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic point in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// In-range, finite, and not the (0, 0) placeholder that un-geocoded
    /// client requests used to carry.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

/// A request for emergency assistance.
///
/// `status` is written only by the lifecycle controller; terminal rows are
/// retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub help_type: HelpType,
    pub urgency: Urgency,
    pub title: String,
    pub description: Option<String>,
    pub location: Coordinates,
    pub address: Option<String>,
    /// Skill tags a volunteer should bring; drives the overlap score.
    pub required_skills: Vec<String>,
    pub status: RequestStatus,
    pub required_by: Option<DateTime<Utc>>,
    pub people_affected: i32,
    pub is_sos: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHelpRequest {
    pub requester_id: UserId,
    pub help_type: HelpType,
    pub urgency: Urgency,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub required_by: Option<DateTime<Utc>>,
    pub people_affected: i32,
    #[serde(default)]
    pub is_sos: bool,
}

impl NewHelpRequest {
    /// Rejects malformed input before anything touches storage.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.title.trim().is_empty() {
            return Err(EngineError::Validation("title must not be empty".into()));
        }
        if self.people_affected < 1 {
            return Err(EngineError::Validation(
                "people_affected must be at least 1".into(),
            ));
        }
        if self.required_skills.iter().all(|s| s.trim().is_empty()) {
            return Err(EngineError::Validation(
                "at least one required skill must be provided".into(),
            ));
        }
        let coords = Coordinates::new(self.latitude, self.longitude);
        if !coords.is_valid() {
            return Err(EngineError::Validation(
                "request coordinates are missing or invalid".into(),
            ));
        }
        Ok(())
    }
}

/// Filter for listing requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    #[serde(default)]
    pub requester_id: Option<UserId>,
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub help_type: Option<HelpType>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub sos_only: bool,
}

/// One immutable entry in a request's audit trail.
///
/// `seq` is a monotonic per-request sequence assigned at write time, so the
/// log stays totally ordered even under coarse timestamp resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLog {
    pub id: StatusLogId,
    pub request_id: RequestId,
    pub seq: i64,
    /// `None` for the creation entry.
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    pub changed_by: UserId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> NewHelpRequest {
        NewHelpRequest {
            requester_id: UserId::new(),
            help_type: HelpType::Rescue,
            urgency: Urgency::Critical,
            title: "Trapped after flooding".into(),
            description: None,
            latitude: 12.97,
            longitude: 77.59,
            address: None,
            required_skills: vec!["rescue".into()],
            required_by: None,
            people_affected: 3,
            is_sos: false,
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn zero_coordinates_rejected() {
        let mut input = valid_input();
        input.latitude = 0.0;
        input.longitude = 0.0;
        assert!(matches!(
            input.validate(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_coordinates_rejected() {
        let mut input = valid_input();
        input.latitude = 91.0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn nonpositive_people_affected_rejected() {
        let mut input = valid_input();
        input.people_affected = 0;
        assert!(input.validate().is_err());
        input.people_affected = -2;
        assert!(input.validate().is_err());
    }

    #[test]
    fn empty_skill_list_rejected() {
        let mut input = valid_input();
        input.required_skills = vec![];
        assert!(input.validate().is_err());
        input.required_skills = vec!["   ".into()];
        assert!(input.validate().is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            RequestStatus::Open,
            RequestStatus::Matched,
            RequestStatus::InProgress,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }

    #[test]
    fn client_json_deserializes_with_optional_fields_defaulted() {
        let input: NewHelpRequest = serde_json::from_str(
            r#"{
                "requester_id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
                "help_type": "rescue",
                "urgency": "critical",
                "title": "Trapped after flooding",
                "latitude": 12.97,
                "longitude": 77.59,
                "required_skills": ["rescue"],
                "people_affected": 3
            }"#,
        )
        .unwrap();
        assert!(input.validate().is_ok());
        assert!(!input.is_sos);
        assert!(input.description.is_none());
        assert!(input.required_by.is_none());
    }

    #[test]
    fn empty_filter_deserializes_to_no_constraints() {
        let filter: RequestFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.requester_id.is_none());
        assert!(filter.status.is_none());
        assert!(filter.help_type.is_none());
        assert!(filter.urgency.is_none());
        assert!(!filter.sos_only);
    }

    #[test]
    fn urgency_factor_is_monotonic() {
        assert!(Urgency::Low.factor() < Urgency::Medium.factor());
        assert!(Urgency::Medium.factor() < Urgency::High.factor());
        assert!(Urgency::High.factor() < Urgency::Critical.factor());
    }
}
