//! Persistence gateway.
//!
//! The engine talks to durable storage through the `Store` trait. The
//! invariant-critical writes are conditional: a match insert only succeeds
//! when no active match exists for the request, and status updates only
//! apply when the row is still in the expected prior state. Those
//! conditional forms are the durable backstop behind the engine's
//! per-request locks.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::{MatchId, NotificationId, RequestId, UserId, VolunteerId};
use crate::domains::matching::models::{Match, MatchStatus};
use crate::domains::notifications::models::Notification;
use crate::domains::requests::models::{
    HelpRequest, RequestFilter, RequestStatus, StatusLog,
};
use crate::domains::volunteers::models::{VolunteerProfile, VolunteerStatus};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Input for one audit-trail row; the store assigns the id and the
/// per-request sequence number.
#[derive(Debug, Clone)]
pub struct NewStatusLog {
    pub request_id: RequestId,
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    pub changed_by: UserId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Help requests
    // ------------------------------------------------------------------

    async fn insert_request(&self, request: &HelpRequest) -> Result<()>;

    async fn request(&self, id: RequestId) -> Result<Option<HelpRequest>>;

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<HelpRequest>>;

    /// Conditional status write: applies only while the row is still in
    /// `expected`. Returns the updated row, or `None` on a mismatch.
    async fn update_request_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<HelpRequest>>;

    // ------------------------------------------------------------------
    // Volunteer profiles
    // ------------------------------------------------------------------

    async fn insert_volunteer(&self, volunteer: &VolunteerProfile) -> Result<()>;

    async fn volunteer(&self, id: VolunteerId) -> Result<Option<VolunteerProfile>>;

    async fn volunteer_by_user(&self, user_id: UserId) -> Result<Option<VolunteerProfile>>;

    async fn available_volunteers(&self) -> Result<Vec<VolunteerProfile>>;

    /// Conditional availability write (arbiter transitions); `None` when the
    /// volunteer was not in `expected`.
    async fn update_volunteer_status(
        &self,
        id: VolunteerId,
        expected: VolunteerStatus,
        new: VolunteerStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<VolunteerProfile>>;

    /// Unconditional availability write (volunteer-initiated toggles).
    async fn set_volunteer_status(
        &self,
        id: VolunteerId,
        new: VolunteerStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<VolunteerProfile>>;

    /// Increments the volunteer's cumulative help count.
    async fn record_completed_help(&self, id: VolunteerId, now: DateTime<Utc>) -> Result<()>;

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    /// Inserts a match only if the request has no active (pending/accepted)
    /// match. Returns `false` without writing when one exists.
    async fn insert_match_if_no_active(&self, offer: &Match) -> Result<bool>;

    async fn match_by_id(&self, id: MatchId) -> Result<Option<Match>>;

    /// Conditional match transition. Stamps `accepted_at`/`completed_at`
    /// when moving to those states. `None` on a state mismatch.
    async fn update_match_status(
        &self,
        id: MatchId,
        expected: MatchStatus,
        new: MatchStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>>;

    async fn active_match_for_request(&self, id: RequestId) -> Result<Option<Match>>;

    /// All matches for a request, oldest first.
    async fn matches_for_request(&self, id: RequestId) -> Result<Vec<Match>>;

    /// Whether the volunteer holds a pending or accepted match anywhere.
    async fn volunteer_has_active_match(&self, id: VolunteerId) -> Result<bool>;

    /// Volunteers whose offer for this request was rejected or expired at or
    /// after `since` (the cooldown set).
    async fn declined_volunteers(
        &self,
        request_id: RequestId,
        since: DateTime<Utc>,
    ) -> Result<Vec<VolunteerId>>;

    /// Pending matches whose response deadline has passed.
    async fn due_pending_matches(&self, now: DateTime<Utc>) -> Result<Vec<Match>>;

    // ------------------------------------------------------------------
    // Status log
    // ------------------------------------------------------------------

    /// Appends one immutable audit row, assigning the next per-request
    /// sequence number.
    async fn append_status_log(&self, entry: NewStatusLog) -> Result<StatusLog>;

    /// Audit trail for a request, oldest first.
    async fn status_history(&self, id: RequestId) -> Result<Vec<StatusLog>>;

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<()>;

    async fn notification(&self, id: NotificationId) -> Result<Option<Notification>>;

    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<Notification>>;

    async fn mark_notification_read(&self, id: NotificationId) -> Result<Option<Notification>>;
}
