//! Eligibility filter.
//!
//! Narrows the volunteer pool for a request to admissible candidates and
//! returns them in a deterministic rank order: score descending, then
//! distance ascending, then volunteer id. Reproducible ordering is what the
//! arbiter's sequential offer cycle relies on.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::MatchConfig;
use crate::domains::matching::models::ScoredCandidate;
use crate::domains::matching::scoring::score_candidate;
use crate::domains::requests::models::HelpRequest;
use crate::error::EngineError;
use crate::store::Store;

/// Ranked, admissible candidates for a request.
///
/// A volunteer qualifies when they are available, have a usable location
/// within radius (SOS widens it), and hold no active match anywhere. A
/// volunteer who declined or timed out on this request within the cooldown
/// window is skipped, unless the request is SOS or skipping them would leave
/// nobody at all.
pub async fn eligible_candidates(
    store: &dyn Store,
    request: &HelpRequest,
    config: &MatchConfig,
    now: DateTime<Utc>,
) -> Result<Vec<ScoredCandidate>, EngineError> {
    let pool = store.available_volunteers().await?;

    let cooled_down = if request.is_sos {
        Vec::new()
    } else {
        let since = now - config.rejection_cooldown;
        store.declined_volunteers(request.id, since).await?
    };

    let mut candidates = Vec::new();
    let mut skipped_for_cooldown = Vec::new();

    for volunteer in &pool {
        let Some(scored) = score_candidate(request, volunteer, config) else {
            continue;
        };
        // One outstanding offer per volunteer, across all requests.
        if store.volunteer_has_active_match(volunteer.id).await? {
            continue;
        }
        if cooled_down.contains(&volunteer.id) {
            skipped_for_cooldown.push(scored);
            continue;
        }
        candidates.push(scored);
    }

    // Cooldown is a preference, not a hard rule: with nobody else left, a
    // recent decliner is better than no offer at all.
    if candidates.is_empty() && !skipped_for_cooldown.is_empty() {
        debug!(
            request_id = %request.id,
            count = skipped_for_cooldown.len(),
            "No fresh candidates; falling back to cooled-down volunteers"
        );
        candidates = skipped_for_cooldown;
    }

    rank(&mut candidates);
    Ok(candidates)
}

/// Sorts candidates into the deterministic offer order.
pub fn rank(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(Ordering::Equal),
            )
            .then(a.volunteer_id.cmp(&b.volunteer_id))
    });
}
