//! Postgres store.
//!
//! Runtime `query_as` SQL against the schema in the server package's
//! migrations. The at-most-one-active-match invariant is backed twice: the
//! guarded `INSERT ... WHERE NOT EXISTS` here and a partial unique index on
//! `matches (request_id) WHERE status IN ('pending', 'accepted')`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::{MatchId, NotificationId, RequestId, UserId, VolunteerId};
use crate::domains::matching::models::{Match, MatchStatus};
use crate::domains::notifications::models::Notification;
use crate::domains::requests::models::{
    Coordinates, HelpRequest, RequestFilter, RequestStatus, StatusLog,
};
use crate::domains::volunteers::models::{VolunteerProfile, VolunteerStatus};
use crate::store::{NewStatusLog, Store};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ----------------------------------------------------------------------
// Row types: statuses and enums live as TEXT in the schema and are parsed
// back into the closed domain types on read.
// ----------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    requester_id: Uuid,
    help_type: String,
    urgency: String,
    title: String,
    description: Option<String>,
    latitude: f64,
    longitude: f64,
    address: Option<String>,
    required_skills: Vec<String>,
    status: String,
    required_by: Option<DateTime<Utc>>,
    people_affected: i32,
    is_sos: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for HelpRequest {
    type Error = anyhow::Error;

    fn try_from(row: RequestRow) -> Result<Self> {
        Ok(HelpRequest {
            id: RequestId::from_uuid(row.id),
            requester_id: UserId::from_uuid(row.requester_id),
            help_type: row.help_type.parse().map_err(|e: String| anyhow!(e))?,
            urgency: row.urgency.parse().map_err(|e: String| anyhow!(e))?,
            title: row.title,
            description: row.description,
            location: Coordinates::new(row.latitude, row.longitude),
            address: row.address,
            required_skills: row.required_skills,
            status: row.status.parse().map_err(|e: String| anyhow!(e))?,
            required_by: row.required_by,
            people_affected: row.people_affected,
            is_sos: row.is_sos,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VolunteerRow {
    id: Uuid,
    user_id: Uuid,
    skills: Vec<String>,
    max_distance_km: f64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status: String,
    total_helps: i32,
    rating: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VolunteerRow> for VolunteerProfile {
    type Error = anyhow::Error;

    fn try_from(row: VolunteerRow) -> Result<Self> {
        let location = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };
        Ok(VolunteerProfile {
            id: VolunteerId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            skills: row.skills,
            max_distance_km: row.max_distance_km,
            location,
            status: row.status.parse().map_err(|e: String| anyhow!(e))?,
            total_helps: row.total_helps,
            rating: row.rating,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MatchRow {
    id: Uuid,
    request_id: Uuid,
    volunteer_id: Uuid,
    score: f64,
    distance_km: f64,
    status: String,
    deadline_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MatchRow> for Match {
    type Error = anyhow::Error;

    fn try_from(row: MatchRow) -> Result<Self> {
        Ok(Match {
            id: MatchId::from_uuid(row.id),
            request_id: RequestId::from_uuid(row.request_id),
            volunteer_id: VolunteerId::from_uuid(row.volunteer_id),
            score: row.score,
            distance_km: row.distance_km,
            status: row.status.parse().map_err(|e: String| anyhow!(e))?,
            deadline_at: row.deadline_at,
            accepted_at: row.accepted_at,
            completed_at: row.completed_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatusLogRow {
    id: Uuid,
    request_id: Uuid,
    seq: i64,
    old_status: Option<String>,
    new_status: String,
    changed_by: Uuid,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StatusLogRow> for StatusLog {
    type Error = anyhow::Error;

    fn try_from(row: StatusLogRow) -> Result<Self> {
        let old_status = row
            .old_status
            .map(|s| s.parse().map_err(|e: String| anyhow!(e)))
            .transpose()?;
        Ok(StatusLog {
            id: crate::common::StatusLogId::from_uuid(row.id),
            request_id: RequestId::from_uuid(row.request_id),
            seq: row.seq,
            old_status,
            new_status: row.new_status.parse().map_err(|e: String| anyhow!(e))?,
            changed_by: UserId::from_uuid(row.changed_by),
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    kind: String,
    is_read: bool,
    link: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: NotificationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            title: row.title,
            message: row.message,
            kind: row.kind.parse().map_err(|e: String| anyhow!(e))?,
            is_read: row.is_read,
            link: row.link,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_request(&self, request: &HelpRequest) -> Result<()> {
        sqlx::query(
            "INSERT INTO help_requests (
                id, requester_id, help_type, urgency, title, description,
                latitude, longitude, address, required_skills, status,
                required_by, people_affected, is_sos, created_at, updated_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(request.id.into_uuid())
        .bind(request.requester_id.into_uuid())
        .bind(request.help_type.as_str())
        .bind(request.urgency.as_str())
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.location.latitude)
        .bind(request.location.longitude)
        .bind(&request.address)
        .bind(&request.required_skills)
        .bind(request.status.as_str())
        .bind(request.required_by)
        .bind(request.people_affected)
        .bind(request.is_sos)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn request(&self, id: RequestId) -> Result<Option<HelpRequest>> {
        sqlx::query_as::<_, RequestRow>("SELECT * FROM help_requests WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<HelpRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT * FROM help_requests
             WHERE ($1::uuid IS NULL OR requester_id = $1)
               AND ($2::text IS NULL OR status = $2)
               AND ($3::text IS NULL OR help_type = $3)
               AND ($4::text IS NULL OR urgency = $4)
               AND (NOT $5 OR is_sos)
             ORDER BY created_at DESC, id",
        )
        .bind(filter.requester_id.map(|id| id.into_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.help_type.map(|t| t.as_str()))
        .bind(filter.urgency.map(|u| u.as_str()))
        .bind(filter.sos_only)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_request_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<HelpRequest>> {
        sqlx::query_as::<_, RequestRow>(
            "UPDATE help_requests
             SET status = $3, updated_at = $4
             WHERE id = $1 AND status = $2
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn insert_volunteer(&self, volunteer: &VolunteerProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO volunteer_profiles (
                id, user_id, skills, max_distance_km, latitude, longitude,
                status, total_helps, rating, created_at, updated_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(volunteer.id.into_uuid())
        .bind(volunteer.user_id.into_uuid())
        .bind(&volunteer.skills)
        .bind(volunteer.max_distance_km)
        .bind(volunteer.location.map(|l| l.latitude))
        .bind(volunteer.location.map(|l| l.longitude))
        .bind(volunteer.status.as_str())
        .bind(volunteer.total_helps)
        .bind(volunteer.rating)
        .bind(volunteer.created_at)
        .bind(volunteer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn volunteer(&self, id: VolunteerId) -> Result<Option<VolunteerProfile>> {
        sqlx::query_as::<_, VolunteerRow>("SELECT * FROM volunteer_profiles WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn volunteer_by_user(&self, user_id: UserId) -> Result<Option<VolunteerProfile>> {
        sqlx::query_as::<_, VolunteerRow>("SELECT * FROM volunteer_profiles WHERE user_id = $1")
            .bind(user_id.into_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn available_volunteers(&self) -> Result<Vec<VolunteerProfile>> {
        let rows = sqlx::query_as::<_, VolunteerRow>(
            "SELECT * FROM volunteer_profiles WHERE status = 'available' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_volunteer_status(
        &self,
        id: VolunteerId,
        expected: VolunteerStatus,
        new: VolunteerStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<VolunteerProfile>> {
        sqlx::query_as::<_, VolunteerRow>(
            "UPDATE volunteer_profiles
             SET status = $3, updated_at = $4
             WHERE id = $1 AND status = $2
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn set_volunteer_status(
        &self,
        id: VolunteerId,
        new: VolunteerStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<VolunteerProfile>> {
        sqlx::query_as::<_, VolunteerRow>(
            "UPDATE volunteer_profiles
             SET status = $2, updated_at = $3
             WHERE id = $1
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(new.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn record_completed_help(&self, id: VolunteerId, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE volunteer_profiles
             SET total_helps = total_helps + 1, updated_at = $2
             WHERE id = $1",
        )
        .bind(id.into_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_match_if_no_active(&self, offer: &Match) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO matches (
                id, request_id, volunteer_id, score, distance_km, status,
                deadline_at, accepted_at, completed_at, notes, created_at, updated_at
             )
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
             WHERE NOT EXISTS (
                SELECT 1 FROM matches
                WHERE request_id = $2 AND status IN ('pending', 'accepted')
             )",
        )
        .bind(offer.id.into_uuid())
        .bind(offer.request_id.into_uuid())
        .bind(offer.volunteer_id.into_uuid())
        .bind(offer.score)
        .bind(offer.distance_km)
        .bind(offer.status.as_str())
        .bind(offer.deadline_at)
        .bind(offer.accepted_at)
        .bind(offer.completed_at)
        .bind(&offer.notes)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn match_by_id(&self, id: MatchId) -> Result<Option<Match>> {
        sqlx::query_as::<_, MatchRow>("SELECT * FROM matches WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn update_match_status(
        &self,
        id: MatchId,
        expected: MatchStatus,
        new: MatchStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>> {
        sqlx::query_as::<_, MatchRow>(
            "UPDATE matches
             SET status = $3,
                 updated_at = $4,
                 accepted_at = CASE WHEN $3 = 'accepted' THEN $4 ELSE accepted_at END,
                 completed_at = CASE WHEN $3 = 'completed' THEN $4 ELSE completed_at END
             WHERE id = $1 AND status = $2
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn active_match_for_request(&self, id: RequestId) -> Result<Option<Match>> {
        sqlx::query_as::<_, MatchRow>(
            "SELECT * FROM matches
             WHERE request_id = $1 AND status IN ('pending', 'accepted')",
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn matches_for_request(&self, id: RequestId) -> Result<Vec<Match>> {
        let rows = sqlx::query_as::<_, MatchRow>(
            "SELECT * FROM matches WHERE request_id = $1 ORDER BY created_at, id",
        )
        .bind(id.into_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn volunteer_has_active_match(&self, id: VolunteerId) -> Result<bool> {
        let exists: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM matches
             WHERE volunteer_id = $1 AND status IN ('pending', 'accepted')
             LIMIT 1",
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(exists.is_some())
    }

    async fn declined_volunteers(
        &self,
        request_id: RequestId,
        since: DateTime<Utc>,
    ) -> Result<Vec<VolunteerId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT volunteer_id FROM matches
             WHERE request_id = $1
               AND status IN ('rejected', 'expired')
               AND updated_at >= $2",
        )
        .bind(request_id.into_uuid())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(VolunteerId::from_uuid).collect())
    }

    async fn due_pending_matches(&self, now: DateTime<Utc>) -> Result<Vec<Match>> {
        let rows = sqlx::query_as::<_, MatchRow>(
            "SELECT * FROM matches
             WHERE status = 'pending' AND deadline_at <= $1
             ORDER BY deadline_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn append_status_log(&self, entry: NewStatusLog) -> Result<StatusLog> {
        // Callers serialize per request, so the MAX(seq) read is race-free;
        // the unique (request_id, seq) index is the backstop.
        let row = sqlx::query_as::<_, StatusLogRow>(
            "INSERT INTO status_logs (
                id, request_id, seq, old_status, new_status, changed_by, notes, created_at
             )
             VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM status_logs WHERE request_id = $2),
                $3, $4, $5, $6, $7
             )
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(entry.request_id.into_uuid())
        .bind(entry.old_status.map(|s| s.as_str()))
        .bind(entry.new_status.as_str())
        .bind(entry.changed_by.into_uuid())
        .bind(&entry.notes)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn status_history(&self, id: RequestId) -> Result<Vec<StatusLog>> {
        let rows = sqlx::query_as::<_, StatusLogRow>(
            "SELECT * FROM status_logs WHERE request_id = $1 ORDER BY seq",
        )
        .bind(id.into_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<()> {
        // Small fan-out (requester + volunteer); row-at-a-time is fine.
        for n in notifications {
            sqlx::query(
                "INSERT INTO notifications (
                    id, user_id, title, message, kind, is_read, link, created_at
                 )
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(n.id.into_uuid())
            .bind(n.user_id.into_uuid())
            .bind(&n.title)
            .bind(&n.message)
            .bind(n.kind.as_str())
            .bind(n.is_read)
            .bind(&n.link)
            .bind(n.created_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(user_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<Option<Notification>> {
        sqlx::query_as::<_, NotificationRow>(
            "UPDATE notifications SET is_read = true WHERE id = $1 RETURNING *",
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }
}
