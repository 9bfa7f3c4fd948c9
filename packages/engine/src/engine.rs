//! Engine facade.
//!
//! The single entry point collaborators call. Owns the per-request lock
//! registry that serializes `offer`, `respond`, `expire` and `cancel` for a
//! given request; cross-request operations proceed fully in parallel.
//! Notifications are persisted only after the critical section releases
//! (eventual consistency is fine for them; the audit trail is not deferred).

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as TokioMutex;
use tracing::{error, info};

use crate::common::{Clock, MatchId, NotificationId, RequestId, UserId, VolunteerId};
use crate::config::MatchConfig;
use crate::domains::matching::arbiter::MatchArbiter;
use crate::domains::matching::models::{Match, MatchDecision};
use crate::domains::notifications::emitter::{notifications_for, DomainEvent};
use crate::domains::notifications::models::Notification;
use crate::domains::requests::lifecycle::LifecycleController;
use crate::domains::requests::models::{
    Coordinates, HelpRequest, NewHelpRequest, RequestFilter, RequestStatus, StatusLog,
};
use crate::domains::volunteers::models::{NewVolunteerProfile, VolunteerProfile, VolunteerStatus};
use crate::error::EngineError;
use crate::store::Store;

/// One async mutex per request id. Entries are created on first use and kept
/// for the life of the process; requests are terminal long before the map
/// matters for memory.
#[derive(Default)]
struct RequestLocks {
    inner: StdMutex<HashMap<RequestId, Arc<TokioMutex<()>>>>,
}

impl RequestLocks {
    fn for_request(&self, id: RequestId) -> Arc<TokioMutex<()>> {
        let mut map = self.inner.lock().expect("request lock registry poisoned");
        map.entry(id).or_default().clone()
    }
}

pub struct Engine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    arbiter: MatchArbiter,
    lifecycle: LifecycleController,
    locks: RequestLocks,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: MatchConfig) -> Self {
        let arbiter = MatchArbiter::new(store.clone(), clock.clone(), config);
        let lifecycle = LifecycleController::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            arbiter,
            lifecycle,
            locks: RequestLocks::default(),
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Creates a request and synchronously runs the first match cycle.
    ///
    /// "No eligible candidates" is not an error: the request stays open and
    /// the requester is notified.
    pub async fn create_request(&self, input: NewHelpRequest) -> Result<HelpRequest, EngineError> {
        input.validate()?;
        let now = self.clock.now();
        let request = HelpRequest {
            id: RequestId::new(),
            requester_id: input.requester_id,
            help_type: input.help_type,
            urgency: input.urgency,
            title: input.title.trim().to_string(),
            description: input.description,
            location: Coordinates::new(input.latitude, input.longitude),
            address: input.address,
            required_skills: input
                .required_skills
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            status: RequestStatus::Open,
            required_by: input.required_by,
            people_affected: input.people_affected,
            is_sos: input.is_sos,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_request(&request).await?;
        self.lifecycle.record_created(&request).await?;
        info!(
            request_id = %request.id,
            help_type = request.help_type.as_str(),
            urgency = request.urgency.as_str(),
            is_sos = request.is_sos,
            "Help request created"
        );

        let events = {
            let lock = self.locks.for_request(request.id);
            let _guard = lock.lock().await;
            let (_, events) = self.arbiter.offer(&request).await?;
            events
        };
        self.publish(&events).await;

        Ok(request)
    }

    pub async fn request(&self, id: RequestId) -> Result<HelpRequest, EngineError> {
        self.store
            .request(id)
            .await?
            .ok_or_else(|| EngineError::not_found("request", id))
    }

    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<HelpRequest>, EngineError> {
        Ok(self.store.list_requests(filter).await?)
    }

    /// Explicitly advances a request: `matched -> in_progress` when work
    /// starts, `in_progress -> completed` which drives the arbiter's
    /// completion of the accepted match. All other targets are driven by the
    /// engine itself and are rejected here.
    pub async fn advance_request(
        &self,
        request_id: RequestId,
        target: RequestStatus,
        actor: UserId,
        note: Option<String>,
    ) -> Result<HelpRequest, EngineError> {
        match target {
            RequestStatus::InProgress => {
                let lock = self.locks.for_request(request_id);
                let _guard = lock.lock().await;
                let request = self.request(request_id).await?;
                self.lifecycle
                    .transition(&request, RequestStatus::InProgress, actor, note)
                    .await
            }
            RequestStatus::Completed => {
                let events = {
                    let lock = self.locks.for_request(request_id);
                    let _guard = lock.lock().await;
                    let request = self.request(request_id).await?;
                    let active =
                        self.store.active_match_for_request(request.id).await?.ok_or_else(
                            || {
                                EngineError::InvalidState(format!(
                                    "request {request_id} has no active match to complete"
                                ))
                            },
                        )?;
                    let (_, events) = self.arbiter.complete(active.id, actor).await?;
                    events
                };
                self.publish(&events).await;
                self.request(request_id).await
            }
            other => Err(EngineError::InvalidState(format!(
                "requests cannot be advanced to {other} directly"
            ))),
        }
    }

    /// Cancels a request (requester- or admin-initiated; authorization is
    /// the caller's concern). Releases the active match, if any, and writes
    /// exactly one status-log row.
    pub async fn cancel_request(
        &self,
        request_id: RequestId,
        actor: UserId,
        note: Option<String>,
    ) -> Result<HelpRequest, EngineError> {
        let (updated, events) = {
            let lock = self.locks.for_request(request_id);
            let _guard = lock.lock().await;
            let request = self.request(request_id).await?;
            if request.status.is_terminal() {
                return Err(EngineError::InvalidState(format!(
                    "request {request_id} is already {}",
                    request.status
                )));
            }
            let volunteer_user = self.arbiter.release_active_match(&request).await?;
            let updated = self
                .lifecycle
                .transition(&request, RequestStatus::Cancelled, actor, note)
                .await?;
            let events = vec![DomainEvent::RequestCancelled {
                request_id: request.id,
                request_title: request.title.clone(),
                requester: request.requester_id,
                volunteer_user,
            }];
            (updated, events)
        };
        self.publish(&events).await;
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    /// A volunteer accepts or declines a pending offer.
    pub async fn respond_to_match(
        &self,
        match_id: MatchId,
        decision: MatchDecision,
        actor: UserId,
    ) -> Result<Match, EngineError> {
        // Resolve the owning request outside the lock, then re-load inside.
        let offer = self
            .store
            .match_by_id(match_id)
            .await?
            .ok_or_else(|| EngineError::not_found("match", match_id))?;

        let (updated, events) = {
            let lock = self.locks.for_request(offer.request_id);
            let _guard = lock.lock().await;
            self.arbiter.respond(match_id, decision, actor).await?
        };
        self.publish(&events).await;
        Ok(updated)
    }

    /// Expires every pending match past its deadline. Idempotent; invoked by
    /// the timer collaborator and safe under duplicate firings.
    pub async fn expire_due_matches(&self) -> Result<usize, EngineError> {
        let due = self.store.due_pending_matches(self.clock.now()).await?;
        let mut expired = 0;
        for offer in due {
            let outcome = {
                let lock = self.locks.for_request(offer.request_id);
                let _guard = lock.lock().await;
                self.arbiter.expire(offer.id).await
            };
            match outcome {
                Ok((Some(_), events)) => {
                    expired += 1;
                    self.publish(&events).await;
                }
                Ok((None, _)) => {} // already resolved; duplicate firing
                Err(e) => {
                    error!(match_id = %offer.id, error = %e, "Failed to expire match");
                }
            }
        }
        if expired > 0 {
            info!(count = expired, "Expired overdue match offers");
        }
        Ok(expired)
    }

    pub async fn match_history(&self, request_id: RequestId) -> Result<Vec<Match>, EngineError> {
        Ok(self.store.matches_for_request(request_id).await?)
    }

    pub async fn status_history(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<StatusLog>, EngineError> {
        Ok(self.store.status_history(request_id).await?)
    }

    // ------------------------------------------------------------------
    // Volunteers
    // ------------------------------------------------------------------

    pub async fn register_volunteer(
        &self,
        input: NewVolunteerProfile,
    ) -> Result<VolunteerProfile, EngineError> {
        input.validate()?;
        let now = self.clock.now();
        let profile = VolunteerProfile {
            id: VolunteerId::new(),
            user_id: input.user_id,
            skills: input
                .skills
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            max_distance_km: input.max_distance_km,
            location: input.location(),
            status: VolunteerStatus::Available,
            total_helps: 0,
            rating: 0.0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_volunteer(&profile).await?;
        info!(volunteer_id = %profile.id, "Volunteer registered");
        Ok(profile)
    }

    /// A volunteer toggles their own availability.
    pub async fn set_volunteer_availability(
        &self,
        volunteer_id: VolunteerId,
        status: VolunteerStatus,
        actor: UserId,
    ) -> Result<VolunteerProfile, EngineError> {
        let profile = self
            .store
            .volunteer(volunteer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("volunteer", volunteer_id))?;
        if profile.user_id != actor {
            return Err(EngineError::Forbidden(format!(
                "actor {actor} does not own volunteer profile {volunteer_id}"
            )));
        }
        self.store
            .set_volunteer_status(volunteer_id, status, self.clock.now())
            .await?
            .ok_or_else(|| EngineError::not_found("volunteer", volunteer_id))
    }

    pub async fn volunteer(&self, id: VolunteerId) -> Result<VolunteerProfile, EngineError> {
        self.store
            .volunteer(id)
            .await?
            .ok_or_else(|| EngineError::not_found("volunteer", id))
    }

    /// Looks up a user's volunteer profile, if they have registered one.
    pub async fn volunteer_for_user(
        &self,
        user_id: UserId,
    ) -> Result<VolunteerProfile, EngineError> {
        self.store
            .volunteer_by_user(user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("volunteer profile for user", user_id))
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub async fn notifications_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Notification>, EngineError> {
        Ok(self.store.notifications_for_user(user_id).await?)
    }

    /// Marks a notification read; only the recipient may.
    pub async fn mark_notification_read(
        &self,
        id: NotificationId,
        actor: UserId,
    ) -> Result<Notification, EngineError> {
        let existing = self
            .store
            .notification(id)
            .await?
            .ok_or_else(|| EngineError::not_found("notification", id))?;
        if existing.user_id != actor {
            return Err(EngineError::Forbidden(format!(
                "actor {actor} is not the recipient of notification {id}"
            )));
        }
        self.store
            .mark_notification_read(id)
            .await?
            .ok_or_else(|| EngineError::not_found("notification", id))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Best-effort persistence of the notification fan-out. Failures are
    /// logged, never bubbled: the state change already committed.
    async fn publish(&self, events: &[DomainEvent]) {
        let now = self.clock.now();
        let records: Vec<Notification> = events
            .iter()
            .flat_map(|event| notifications_for(event, now))
            .collect();
        if records.is_empty() {
            return;
        }
        if let Err(e) = self.store.insert_notifications(&records).await {
            error!(error = %e, count = records.len(), "Failed to persist notifications");
        }
    }
}
