//! Match arbiter.
//!
//! Creates ranked offers and drives each match through
//! `pending -> accepted -> completed` or `pending -> rejected | expired`.
//! Every method here must be called while the engine holds the per-request
//! lock; the conditional store writes are the backstop if that ever fails.
//! Methods return the domain events to emit; the engine persists
//! notifications after the lock releases.

use std::sync::Arc;

use tracing::{info, warn};

use crate::common::{Clock, MatchId, UserId};
use crate::config::MatchConfig;
use crate::domains::matching::eligibility::eligible_candidates;
use crate::domains::matching::models::{Match, MatchDecision, MatchStatus, ScoredCandidate};
use crate::domains::notifications::emitter::DomainEvent;
use crate::domains::requests::lifecycle::LifecycleController;
use crate::domains::requests::models::{HelpRequest, RequestStatus};
use crate::domains::volunteers::models::VolunteerStatus;
use crate::error::EngineError;
use crate::store::Store;

pub struct MatchArbiter {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: MatchConfig,
    lifecycle: LifecycleController,
}

impl MatchArbiter {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: MatchConfig) -> Self {
        let lifecycle = LifecycleController::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            config,
            lifecycle,
        }
    }

    /// Offers the request to the top eligible candidate.
    ///
    /// Returns the created pending match, or `None` when nobody is eligible
    /// (the request stays open and the requester gets an "unmatched"
    /// notification). A concurrent-write conflict is retried once; a second
    /// failure surfaces as `Conflict`.
    pub async fn offer(
        &self,
        request: &HelpRequest,
    ) -> Result<(Option<Match>, Vec<DomainEvent>), EngineError> {
        let now = self.clock.now();
        let candidates = eligible_candidates(self.store.as_ref(), request, &self.config, now).await?;

        let Some(top) = candidates.first() else {
            info!(request_id = %request.id, "No eligible candidates; request stays open");
            return Ok((
                None,
                vec![DomainEvent::RequestUnmatched {
                    request_id: request.id,
                    request_title: request.title.clone(),
                    requester: request.requester_id,
                }],
            ));
        };

        let mut attempts = 0;
        loop {
            if let Some(active) = self.store.active_match_for_request(request.id).await? {
                return Err(EngineError::Conflict(format!(
                    "request {} already has an active match {}",
                    request.id, active.id
                )));
            }

            let offer = self.build_offer(request, top);
            if self.store.insert_match_if_no_active(&offer).await? {
                info!(
                    request_id = %request.id,
                    match_id = %offer.id,
                    volunteer_id = %offer.volunteer_id,
                    score = offer.score,
                    distance_km = offer.distance_km,
                    "Offered match to top candidate"
                );
                let volunteer_user = self.volunteer_user(&offer).await?;
                let event = DomainEvent::MatchOffered {
                    match_id: offer.id,
                    request_id: request.id,
                    request_title: request.title.clone(),
                    urgency: request.urgency,
                    is_sos: request.is_sos,
                    volunteer_user,
                    distance_km: offer.distance_km,
                    deadline_at: offer.deadline_at,
                };
                return Ok((Some(offer), vec![event]));
            }

            attempts += 1;
            if attempts > self.config.offer_conflict_retries {
                return Err(EngineError::Conflict(format!(
                    "could not create offer for request {} after {attempts} attempts",
                    request.id
                )));
            }
            warn!(
                request_id = %request.id,
                attempt = attempts,
                "Offer hit a concurrent write; re-reading and retrying"
            );
        }
    }

    /// Handles a volunteer's accept/reject on a pending match.
    pub async fn respond(
        &self,
        match_id: MatchId,
        decision: MatchDecision,
        actor: UserId,
    ) -> Result<(Match, Vec<DomainEvent>), EngineError> {
        let offer = self
            .store
            .match_by_id(match_id)
            .await?
            .ok_or_else(|| EngineError::not_found("match", match_id))?;
        let volunteer = self
            .store
            .volunteer(offer.volunteer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("volunteer", offer.volunteer_id))?;

        if volunteer.user_id != actor {
            return Err(EngineError::Forbidden(format!(
                "actor {actor} is not the volunteer offered match {match_id}"
            )));
        }
        if offer.status != MatchStatus::Pending {
            return Err(EngineError::InvalidState(format!(
                "match {match_id} is {}, not pending",
                offer.status.as_str()
            )));
        }

        match decision {
            MatchDecision::Accept => self.accept(offer, actor).await,
            MatchDecision::Reject => self.resolve_and_reoffer(offer, MatchStatus::Rejected).await,
        }
    }

    /// Expires a pending match past its deadline.
    ///
    /// Idempotent: expiring an already-resolved (or unknown) match is a
    /// no-op, so duplicate timer firings are harmless.
    pub async fn expire(
        &self,
        match_id: MatchId,
    ) -> Result<(Option<Match>, Vec<DomainEvent>), EngineError> {
        let Some(offer) = self.store.match_by_id(match_id).await? else {
            return Ok((None, Vec::new()));
        };
        if offer.status != MatchStatus::Pending {
            return Ok((None, Vec::new()));
        }

        let (updated, events) = self.resolve_and_reoffer(offer, MatchStatus::Expired).await?;
        Ok((Some(updated), events))
    }

    /// Completes an accepted match: frees the volunteer, bumps their help
    /// count, and advances the request to completed.
    pub async fn complete(
        &self,
        match_id: MatchId,
        actor: UserId,
    ) -> Result<(Match, Vec<DomainEvent>), EngineError> {
        let offer = self
            .store
            .match_by_id(match_id)
            .await?
            .ok_or_else(|| EngineError::not_found("match", match_id))?;
        if offer.status != MatchStatus::Accepted {
            return Err(EngineError::InvalidState(format!(
                "match {match_id} is {}, not accepted",
                offer.status.as_str()
            )));
        }
        let request = self
            .store
            .request(offer.request_id)
            .await?
            .ok_or_else(|| EngineError::not_found("request", offer.request_id))?;
        if request.status != RequestStatus::InProgress {
            return Err(EngineError::InvalidState(format!(
                "request {} is {}, work must be in progress before completion",
                request.id, request.status
            )));
        }

        let now = self.clock.now();
        let updated = self
            .store
            .update_match_status(match_id, MatchStatus::Accepted, MatchStatus::Completed, now)
            .await?
            .ok_or_else(|| {
                EngineError::Conflict(format!("match {match_id} changed state concurrently"))
            })?;

        self.free_volunteer(&updated).await?;
        self.store
            .record_completed_help(updated.volunteer_id, now)
            .await?;
        self.lifecycle
            .transition(&request, RequestStatus::Completed, actor, None)
            .await?;

        let volunteer_user = self.volunteer_user(&updated).await?;
        let events = vec![DomainEvent::RequestCompleted {
            request_id: request.id,
            request_title: request.title.clone(),
            requester: request.requester_id,
            volunteer_user: Some(volunteer_user),
        }];
        Ok((updated, events))
    }

    /// Rejects the active match of a request being cancelled and frees the
    /// volunteer if they had accepted. Returns the volunteer's user id for
    /// the cancellation fan-out.
    pub async fn release_active_match(
        &self,
        request: &HelpRequest,
    ) -> Result<Option<UserId>, EngineError> {
        let Some(active) = self.store.active_match_for_request(request.id).await? else {
            return Ok(None);
        };
        let was_accepted = active.status == MatchStatus::Accepted;
        let now = self.clock.now();
        let updated = self
            .store
            .update_match_status(active.id, active.status, MatchStatus::Rejected, now)
            .await?
            .ok_or_else(|| {
                EngineError::Conflict(format!("match {} changed state concurrently", active.id))
            })?;
        if was_accepted {
            self.free_volunteer(&updated).await?;
        }
        info!(
            request_id = %request.id,
            match_id = %updated.id,
            "Active match released by request cancellation"
        );
        Ok(Some(self.volunteer_user(&updated).await?))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn accept(
        &self,
        offer: Match,
        actor: UserId,
    ) -> Result<(Match, Vec<DomainEvent>), EngineError> {
        let now = self.clock.now();
        let updated = self
            .store
            .update_match_status(offer.id, MatchStatus::Pending, MatchStatus::Accepted, now)
            .await?
            .ok_or_else(|| {
                EngineError::InvalidState(format!("match {} is no longer pending", offer.id))
            })?;

        if self
            .store
            .update_volunteer_status(
                updated.volunteer_id,
                VolunteerStatus::Available,
                VolunteerStatus::Busy,
                now,
            )
            .await?
            .is_none()
        {
            // They accepted regardless; a manual availability toggle between
            // offer and accept must not lose the match.
            warn!(
                volunteer_id = %updated.volunteer_id,
                "Volunteer was not in 'available' when accepting; leaving their status as-is"
            );
        }

        let request = self
            .store
            .request(updated.request_id)
            .await?
            .ok_or_else(|| EngineError::not_found("request", updated.request_id))?;
        self.lifecycle
            .transition(&request, RequestStatus::Matched, actor, None)
            .await?;

        info!(
            match_id = %updated.id,
            request_id = %request.id,
            "Match accepted"
        );
        let events = vec![DomainEvent::MatchAccepted {
            request_id: request.id,
            request_title: request.title.clone(),
            requester: request.requester_id,
        }];
        Ok((updated, events))
    }

    /// Shared tail of reject and expire: resolve the match, then offer the
    /// request to the next candidate (or report it unmatched).
    async fn resolve_and_reoffer(
        &self,
        offer: Match,
        terminal: MatchStatus,
    ) -> Result<(Match, Vec<DomainEvent>), EngineError> {
        debug_assert!(matches!(
            terminal,
            MatchStatus::Rejected | MatchStatus::Expired
        ));
        let now = self.clock.now();
        let updated = self
            .store
            .update_match_status(offer.id, MatchStatus::Pending, terminal, now)
            .await?
            .ok_or_else(|| {
                EngineError::InvalidState(format!("match {} is no longer pending", offer.id))
            })?;

        info!(
            match_id = %updated.id,
            request_id = %updated.request_id,
            terminal = terminal.as_str(),
            "Match resolved without acceptance"
        );

        let request = self
            .store
            .request(updated.request_id)
            .await?
            .ok_or_else(|| EngineError::not_found("request", updated.request_id))?;

        let mut events = vec![DomainEvent::MatchRejected {
            request_id: request.id,
            request_title: request.title.clone(),
            requester: request.requester_id,
            timed_out: terminal == MatchStatus::Expired,
        }];

        // Re-match immediately; the request stayed open the whole time.
        if request.status == RequestStatus::Open {
            let (_, offer_events) = self.offer(&request).await?;
            events.extend(offer_events);
        }

        Ok((updated, events))
    }

    fn build_offer(&self, request: &HelpRequest, candidate: &ScoredCandidate) -> Match {
        let now = self.clock.now();
        let deadline = self.config.deadlines.for_urgency(request.urgency);
        Match {
            id: MatchId::new(),
            request_id: request.id,
            volunteer_id: candidate.volunteer_id,
            score: candidate.score,
            distance_km: candidate.distance_km,
            status: MatchStatus::Pending,
            deadline_at: now + deadline,
            accepted_at: None,
            completed_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn free_volunteer(&self, offer: &Match) -> Result<(), EngineError> {
        let now = self.clock.now();
        if self
            .store
            .update_volunteer_status(
                offer.volunteer_id,
                VolunteerStatus::Busy,
                VolunteerStatus::Available,
                now,
            )
            .await?
            .is_none()
        {
            warn!(
                volunteer_id = %offer.volunteer_id,
                "Volunteer was not 'busy' when being freed; leaving their status as-is"
            );
        }
        Ok(())
    }

    async fn volunteer_user(&self, offer: &Match) -> Result<UserId, EngineError> {
        let volunteer = self
            .store
            .volunteer(offer.volunteer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("volunteer", offer.volunteer_id))?;
        Ok(volunteer.user_id)
    }
}
