//! In-memory store.
//!
//! Backs the engine's test suite and local development. A single mutex over
//! the whole state makes every method atomic, which is exactly what the
//! conditional-write contract requires; the lock is never held across an
//! await.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::common::{MatchId, NotificationId, RequestId, StatusLogId, UserId, VolunteerId};
use crate::domains::matching::models::{Match, MatchStatus};
use crate::domains::notifications::models::Notification;
use crate::domains::requests::models::{HelpRequest, RequestFilter, RequestStatus, StatusLog};
use crate::domains::volunteers::models::{VolunteerProfile, VolunteerStatus};
use crate::store::{NewStatusLog, Store};

#[derive(Default)]
struct Inner {
    requests: HashMap<RequestId, HelpRequest>,
    volunteers: HashMap<VolunteerId, VolunteerProfile>,
    // Vecs keep insertion order, which is the audit order.
    matches: Vec<Match>,
    status_logs: Vec<StatusLog>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_request(&self, request: &HelpRequest) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn request(&self, id: RequestId) -> Result<Option<HelpRequest>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.requests.get(&id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<HelpRequest>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<HelpRequest> = inner
            .requests
            .values()
            .filter(|r| {
                filter.requester_id.map_or(true, |id| r.requester_id == id)
                    && filter.status.map_or(true, |s| r.status == s)
                    && filter.help_type.map_or(true, |t| r.help_type == t)
                    && filter.urgency.map_or(true, |u| r.urgency == u)
                    && (!filter.sos_only || r.is_sos)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn update_request_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<HelpRequest>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.requests.get_mut(&id) {
            Some(request) if request.status == expected => {
                request.status = new;
                request.updated_at = now;
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_volunteer(&self, volunteer: &VolunteerProfile) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.volunteers.insert(volunteer.id, volunteer.clone());
        Ok(())
    }

    async fn volunteer(&self, id: VolunteerId) -> Result<Option<VolunteerProfile>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.volunteers.get(&id).cloned())
    }

    async fn volunteer_by_user(&self, user_id: UserId) -> Result<Option<VolunteerProfile>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .volunteers
            .values()
            .find(|v| v.user_id == user_id)
            .cloned())
    }

    async fn available_volunteers(&self) -> Result<Vec<VolunteerProfile>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<VolunteerProfile> = inner
            .volunteers
            .values()
            .filter(|v| v.status == VolunteerStatus::Available)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn update_volunteer_status(
        &self,
        id: VolunteerId,
        expected: VolunteerStatus,
        new: VolunteerStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<VolunteerProfile>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.volunteers.get_mut(&id) {
            Some(volunteer) if volunteer.status == expected => {
                volunteer.status = new;
                volunteer.updated_at = now;
                Ok(Some(volunteer.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_volunteer_status(
        &self,
        id: VolunteerId,
        new: VolunteerStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<VolunteerProfile>> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.volunteers.get_mut(&id).map(|volunteer| {
            volunteer.status = new;
            volunteer.updated_at = now;
            volunteer.clone()
        }))
    }

    async fn record_completed_help(&self, id: VolunteerId, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(volunteer) = inner.volunteers.get_mut(&id) {
            volunteer.total_helps += 1;
            volunteer.updated_at = now;
        }
        Ok(())
    }

    async fn insert_match_if_no_active(&self, offer: &Match) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let has_active = inner
            .matches
            .iter()
            .any(|m| m.request_id == offer.request_id && m.status.is_active());
        if has_active {
            return Ok(false);
        }
        inner.matches.push(offer.clone());
        Ok(true)
    }

    async fn match_by_id(&self, id: MatchId) -> Result<Option<Match>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.matches.iter().find(|m| m.id == id).cloned())
    }

    async fn update_match_status(
        &self,
        id: MatchId,
        expected: MatchStatus,
        new: MatchStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.matches.iter_mut().find(|m| m.id == id) {
            Some(offer) if offer.status == expected => {
                offer.status = new;
                offer.updated_at = now;
                match new {
                    MatchStatus::Accepted => offer.accepted_at = Some(now),
                    MatchStatus::Completed => offer.completed_at = Some(now),
                    _ => {}
                }
                Ok(Some(offer.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn active_match_for_request(&self, id: RequestId) -> Result<Option<Match>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .matches
            .iter()
            .find(|m| m.request_id == id && m.status.is_active())
            .cloned())
    }

    async fn matches_for_request(&self, id: RequestId) -> Result<Vec<Match>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .matches
            .iter()
            .filter(|m| m.request_id == id)
            .cloned()
            .collect())
    }

    async fn volunteer_has_active_match(&self, id: VolunteerId) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .matches
            .iter()
            .any(|m| m.volunteer_id == id && m.status.is_active()))
    }

    async fn declined_volunteers(
        &self,
        request_id: RequestId,
        since: DateTime<Utc>,
    ) -> Result<Vec<VolunteerId>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<VolunteerId> = inner
            .matches
            .iter()
            .filter(|m| {
                m.request_id == request_id
                    && matches!(m.status, MatchStatus::Rejected | MatchStatus::Expired)
                    && m.updated_at >= since
            })
            .map(|m| m.volunteer_id)
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    async fn due_pending_matches(&self, now: DateTime<Utc>) -> Result<Vec<Match>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Pending && m.deadline_at <= now)
            .cloned()
            .collect())
    }

    async fn append_status_log(&self, entry: NewStatusLog) -> Result<StatusLog> {
        let mut inner = self.inner.lock().unwrap();
        let seq = inner
            .status_logs
            .iter()
            .filter(|l| l.request_id == entry.request_id)
            .count() as i64
            + 1;
        let log = StatusLog {
            id: StatusLogId::new(),
            request_id: entry.request_id,
            seq,
            old_status: entry.old_status,
            new_status: entry.new_status,
            changed_by: entry.changed_by,
            notes: entry.notes,
            created_at: entry.created_at,
        };
        inner.status_logs.push(log.clone());
        Ok(log)
    }

    async fn status_history(&self, id: RequestId) -> Result<Vec<StatusLog>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .status_logs
            .iter()
            .filter(|l| l.request_id == id)
            .cloned()
            .collect())
    }

    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.notifications.extend_from_slice(notifications);
        Ok(())
    }

    async fn notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<Option<Notification>> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.notifications.iter_mut().find(|n| n.id == id).map(
            |notification| {
                notification.is_read = true;
                notification.clone()
            },
        ))
    }
}
