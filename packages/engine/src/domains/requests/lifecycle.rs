//! Request lifecycle controller.
//!
//! Sole writer of `HelpRequest.status`. Every transition is applied as a
//! conditional write on the expected prior status and produces exactly one
//! status-log row. Callers (the engine facade) serialize transitions for a
//! given request behind its per-request lock.

use std::sync::Arc;

use tracing::info;

use crate::common::{Clock, UserId};
use crate::domains::requests::models::{HelpRequest, RequestStatus, StatusLog};
use crate::error::EngineError;
use crate::store::{NewStatusLog, Store};

/// Whether `old -> new` is a legal request transition.
///
/// `open -> matched -> in_progress -> completed`, with `cancelled` reachable
/// from any non-terminal state.
pub fn is_valid_transition(old: RequestStatus, new: RequestStatus) -> bool {
    use RequestStatus::*;
    match (old, new) {
        (Open, Matched) => true,
        (Matched, InProgress) => true,
        (InProgress, Completed) => true,
        (Open | Matched | InProgress, Cancelled) => true,
        // A rejected or expired offer leaves the request open; that is not a
        // status change, so it never appears here.
        _ => false,
    }
}

pub struct LifecycleController {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl LifecycleController {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Writes the creation entry (`None -> open`) for a freshly inserted
    /// request.
    pub async fn record_created(&self, request: &HelpRequest) -> Result<StatusLog, EngineError> {
        let entry = self
            .store
            .append_status_log(NewStatusLog {
                request_id: request.id,
                old_status: None,
                new_status: RequestStatus::Open,
                changed_by: request.requester_id,
                notes: None,
                created_at: self.clock.now(),
            })
            .await?;
        Ok(entry)
    }

    /// Advances a request to `new_status`, appending the audit row.
    ///
    /// Fails with `InvalidState` on an illegal transition and with `Conflict`
    /// if the status changed underneath us (the conditional write did not
    /// match).
    pub async fn transition(
        &self,
        request: &HelpRequest,
        new_status: RequestStatus,
        actor: UserId,
        notes: Option<String>,
    ) -> Result<HelpRequest, EngineError> {
        let old_status = request.status;
        if !is_valid_transition(old_status, new_status) {
            return Err(EngineError::InvalidState(format!(
                "request {} cannot move from {} to {}",
                request.id, old_status, new_status
            )));
        }

        let now = self.clock.now();
        let updated = self
            .store
            .update_request_status(request.id, old_status, new_status, now)
            .await?
            .ok_or_else(|| {
                EngineError::Conflict(format!(
                    "request {} was no longer in status {}",
                    request.id, old_status
                ))
            })?;

        self.store
            .append_status_log(NewStatusLog {
                request_id: request.id,
                old_status: Some(old_status),
                new_status,
                changed_by: actor,
                notes,
                created_at: now,
            })
            .await?;

        info!(
            request_id = %request.id,
            old_status = %old_status,
            new_status = %new_status,
            actor = %actor,
            "Request status advanced"
        );
        Ok(updated)
    }
}
