use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::{MatchId, RequestId, VolunteerId};

/// State of a match offer.
///
/// `pending -> accepted -> completed`, or `pending -> rejected | expired`.
/// Rejected and expired are terminal for the row; the next offer in the
/// cycle is a new row, never a reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Completed => "completed",
        }
    }

    /// Active matches are what the at-most-one-per-request invariant counts.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

/// A single offer of a request to a volunteer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub request_id: RequestId,
    pub volunteer_id: VolunteerId,
    pub score: f64,
    pub distance_km: f64,
    pub status: MatchStatus,
    /// Response deadline while pending; scales inversely with urgency.
    pub deadline_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A volunteer's answer to a pending offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDecision {
    Accept,
    Reject,
}

/// Output of the geospatial scorer for one admissible volunteer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub volunteer_id: VolunteerId,
    pub score: f64,
    pub distance_km: f64,
}
