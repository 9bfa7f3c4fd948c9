//! Notification emitter.
//!
//! A pure mapping from lifecycle/match events to notification records for
//! the affected users. No IO here; the engine persists the records after its
//! per-request critical section releases.

use chrono::{DateTime, Utc};

use crate::common::{MatchId, NotificationId, RequestId, UserId};
use crate::domains::notifications::models::{Notification, NotificationKind};
use crate::domains::requests::models::Urgency;

/// Events the arbiter and lifecycle controller produce.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    MatchOffered {
        match_id: MatchId,
        request_id: RequestId,
        request_title: String,
        urgency: Urgency,
        is_sos: bool,
        volunteer_user: UserId,
        distance_km: f64,
        deadline_at: DateTime<Utc>,
    },
    MatchAccepted {
        request_id: RequestId,
        request_title: String,
        requester: UserId,
    },
    MatchRejected {
        request_id: RequestId,
        request_title: String,
        requester: UserId,
        /// True when the offer expired rather than being declined.
        timed_out: bool,
    },
    RequestUnmatched {
        request_id: RequestId,
        request_title: String,
        requester: UserId,
    },
    RequestCompleted {
        request_id: RequestId,
        request_title: String,
        requester: UserId,
        volunteer_user: Option<UserId>,
    },
    RequestCancelled {
        request_id: RequestId,
        request_title: String,
        requester: UserId,
        volunteer_user: Option<UserId>,
    },
}

fn request_link(request_id: RequestId) -> Option<String> {
    Some(format!("/requests/{request_id}"))
}

fn record(
    user_id: UserId,
    kind: NotificationKind,
    title: String,
    message: String,
    link: Option<String>,
    now: DateTime<Utc>,
) -> Notification {
    Notification {
        id: NotificationId::new(),
        user_id,
        title,
        message,
        kind,
        is_read: false,
        link,
        created_at: now,
    }
}

/// Fans one event out to notification records for the affected users.
pub fn notifications_for(event: &DomainEvent, now: DateTime<Utc>) -> Vec<Notification> {
    match event {
        DomainEvent::MatchOffered {
            match_id,
            request_title,
            urgency,
            is_sos,
            volunteer_user,
            distance_km,
            deadline_at,
            ..
        } => {
            let headline = if *is_sos {
                "SOS: help needed near you"
            } else {
                "You have a new help request"
            };
            vec![record(
                *volunteer_user,
                NotificationKind::MatchOffered,
                headline.to_string(),
                format!(
                    "\"{}\" ({} urgency, {:.1} km away). Please respond by {}.",
                    request_title,
                    urgency.as_str(),
                    distance_km,
                    deadline_at.format("%H:%M UTC")
                ),
                // Deep link to the offer itself so the volunteer lands on the
                // respond screen.
                Some(format!("/matches/{match_id}")),
                now,
            )]
        }
        DomainEvent::MatchAccepted {
            request_id,
            request_title,
            requester,
        } => vec![record(
            *requester,
            NotificationKind::MatchAccepted,
            "A volunteer accepted your request".to_string(),
            format!("A volunteer is on the way for \"{request_title}\"."),
            request_link(*request_id),
            now,
        )],
        DomainEvent::MatchRejected {
            request_id,
            request_title,
            requester,
            timed_out,
        } => {
            let message = if *timed_out {
                format!("A volunteer did not respond in time for \"{request_title}\". Looking for the next one.")
            } else {
                format!("A volunteer declined \"{request_title}\". Looking for the next one.")
            };
            vec![record(
                *requester,
                NotificationKind::MatchRejected,
                "Still searching for a volunteer".to_string(),
                message,
                request_link(*request_id),
                now,
            )]
        }
        DomainEvent::RequestUnmatched {
            request_id,
            request_title,
            requester,
        } => vec![record(
            *requester,
            NotificationKind::RequestUnmatched,
            "No volunteers available right now".to_string(),
            format!(
                "We could not find an available volunteer for \"{request_title}\" yet. We will keep trying."
            ),
            request_link(*request_id),
            now,
        )],
        DomainEvent::RequestCompleted {
            request_id,
            request_title,
            requester,
            volunteer_user,
        } => {
            let mut out = vec![record(
                *requester,
                NotificationKind::RequestCompleted,
                "Your request was completed".to_string(),
                format!("\"{request_title}\" has been marked completed."),
                request_link(*request_id),
                now,
            )];
            if let Some(volunteer) = volunteer_user {
                out.push(record(
                    *volunteer,
                    NotificationKind::RequestCompleted,
                    "Thank you for helping".to_string(),
                    format!("\"{request_title}\" is complete. Your help count went up."),
                    request_link(*request_id),
                    now,
                ));
            }
            out
        }
        DomainEvent::RequestCancelled {
            request_id,
            request_title,
            requester,
            volunteer_user,
        } => {
            let mut out = vec![record(
                *requester,
                NotificationKind::RequestCancelled,
                "Request cancelled".to_string(),
                format!("\"{request_title}\" was cancelled."),
                request_link(*request_id),
                now,
            )];
            if let Some(volunteer) = volunteer_user {
                out.push(record(
                    *volunteer,
                    NotificationKind::RequestCancelled,
                    "Request no longer needs help".to_string(),
                    format!("\"{request_title}\" was cancelled by the requester."),
                    request_link(*request_id),
                    now,
                ));
            }
            out
        }
    }
}
