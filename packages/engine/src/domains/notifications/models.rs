use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::{NotificationId, UserId};

/// Type tag on a notification, used by clients for routing and icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MatchOffered,
    MatchAccepted,
    MatchRejected,
    RequestUnmatched,
    RequestCompleted,
    RequestCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MatchOffered => "match_offered",
            Self::MatchAccepted => "match_accepted",
            Self::MatchRejected => "match_rejected",
            Self::RequestUnmatched => "request_unmatched",
            Self::RequestCompleted => "request_completed",
            Self::RequestCancelled => "request_cancelled",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match_offered" => Ok(Self::MatchOffered),
            "match_accepted" => Ok(Self::MatchAccepted),
            "match_rejected" => Ok(Self::MatchRejected),
            "request_unmatched" => Ok(Self::RequestUnmatched),
            "request_completed" => Ok(Self::RequestCompleted),
            "request_cancelled" => Ok(Self::RequestCancelled),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// An in-app notification record.
///
/// The engine only produces these; delivery transport (push, email) is an
/// external collaborator. The recipient owns the read flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}
