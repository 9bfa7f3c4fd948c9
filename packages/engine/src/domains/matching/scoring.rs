//! Geospatial scorer.
//!
//! Pure functions only: distance via the haversine formula and a composite
//! match score from the weights in `MatchConfig`. Safe to call concurrently
//! and repeatedly.

use crate::config::MatchConfig;
use crate::domains::matching::models::ScoredCandidate;
use crate::domains::requests::models::{Coordinates, HelpRequest};
use crate::domains::volunteers::models::VolunteerProfile;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometers, rounded to
/// 0.01 km.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let distance = 2.0 * EARTH_RADIUS_KM * h.sqrt().asin();

    (distance * 100.0).round() / 100.0
}

/// Fraction of the request's required skills the volunteer covers.
///
/// Blank tags are ignored; a request with no usable tags scores 0 overlap
/// (validation upstream rejects such requests anyway).
pub fn skill_overlap(request: &HelpRequest, volunteer: &VolunteerProfile) -> f64 {
    let required: Vec<&str> = request
        .required_skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if required.is_empty() {
        return 0.0;
    }
    let matched = required
        .iter()
        .filter(|skill| volunteer.has_skill(skill))
        .count();
    matched as f64 / required.len() as f64
}

/// Scores one volunteer against one request.
///
/// Returns `None` (ineligible) when either side lacks valid coordinates or
/// the distance exceeds the volunteer's service radius (widened by the SOS
/// multiplier for SOS requests).
pub fn score_candidate(
    request: &HelpRequest,
    volunteer: &VolunteerProfile,
    config: &MatchConfig,
) -> Option<ScoredCandidate> {
    if !request.location.is_valid() {
        return None;
    }
    let location = volunteer.location.filter(|l| l.is_valid())?;

    let distance_km = haversine_km(request.location, location);
    let radius = if request.is_sos {
        volunteer.max_distance_km * config.sos_radius_multiplier
    } else {
        volunteer.max_distance_km
    };
    if distance_km > radius {
        return None;
    }

    let w = &config.weights;
    let proximity = 1.0 / (1.0 + distance_km);
    let overlap = skill_overlap(request, volunteer);
    let urgency_boost = request.urgency.factor() * overlap;
    let rating = (volunteer.rating / 5.0).clamp(0.0, 1.0);

    let score = w.distance * proximity
        + w.skills * overlap
        + w.urgency * urgency_boost
        + w.rating * rating;

    Some(ScoredCandidate {
        volunteer_id: volunteer.id,
        score,
        distance_km,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RequestId, UserId, VolunteerId};
    use crate::domains::requests::models::{HelpType, RequestStatus, Urgency};
    use crate::domains::volunteers::models::VolunteerStatus;
    use chrono::Utc;

    fn request_at(lat: f64, lng: f64) -> HelpRequest {
        HelpRequest {
            id: RequestId::new(),
            requester_id: UserId::new(),
            help_type: HelpType::Rescue,
            urgency: Urgency::Critical,
            title: "test".into(),
            description: None,
            location: Coordinates::new(lat, lng),
            address: None,
            required_skills: vec!["rescue".into()],
            status: RequestStatus::Open,
            required_by: None,
            people_affected: 1,
            is_sos: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn volunteer_at(lat: f64, lng: f64, skills: &[&str]) -> VolunteerProfile {
        VolunteerProfile {
            id: VolunteerId::new(),
            user_id: UserId::new(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            max_distance_km: 10.0,
            location: Some(Coordinates::new(lat, lng)),
            status: VolunteerStatus::Available,
            total_helps: 0,
            rating: 4.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = Coordinates::new(12.97, 77.59);
        let b = Coordinates::new(13.08, 80.27);
        assert_eq!(haversine_km(a, b), haversine_km(b, a));
    }

    #[test]
    fn haversine_zero_for_same_point() {
        let a = Coordinates::new(44.98, -93.27);
        assert_eq!(haversine_km(a, a), 0.0);
    }

    #[test]
    fn haversine_known_distance() {
        // Bangalore to Chennai is roughly 290 km as the crow flies.
        let blr = Coordinates::new(12.9716, 77.5946);
        let maa = Coordinates::new(13.0827, 80.2707);
        let d = haversine_km(blr, maa);
        assert!((280.0..300.0).contains(&d), "got {d}");
    }

    #[test]
    fn score_is_monotonic_in_distance() {
        let request = request_at(12.97, 77.59);
        // Same skills and rating, increasing offsets to the north.
        let mut last = f64::MAX;
        for offset in [0.001, 0.01, 0.02, 0.05] {
            let v = volunteer_at(12.97 + offset, 77.59, &["rescue"]);
            let scored = score_candidate(&request, &v, &MatchConfig::default()).unwrap();
            assert!(
                scored.score <= last,
                "score increased with distance: {} > {last}",
                scored.score
            );
            last = scored.score;
        }
    }

    #[test]
    fn beyond_radius_is_ineligible() {
        let request = request_at(12.97, 77.59);
        // ~1 degree of latitude is ~111 km, far past the 10 km radius.
        let v = volunteer_at(13.97, 77.59, &["rescue"]);
        assert!(score_candidate(&request, &v, &MatchConfig::default()).is_none());
    }

    #[test]
    fn sos_widens_the_radius() {
        let mut request = request_at(12.97, 77.59);
        // ~13.3 km away: outside a 10 km radius, inside 10 * 1.5.
        let v = volunteer_at(12.97 + 0.12, 77.59, &["rescue"]);
        let config = MatchConfig::default();
        assert!(score_candidate(&request, &v, &config).is_none());
        request.is_sos = true;
        assert!(score_candidate(&request, &v, &config).is_some());
    }

    #[test]
    fn missing_volunteer_location_is_ineligible() {
        let request = request_at(12.97, 77.59);
        let mut v = volunteer_at(12.97, 77.59, &["rescue"]);
        v.location = None;
        assert!(score_candidate(&request, &v, &MatchConfig::default()).is_none());
    }

    #[test]
    fn zero_request_coordinates_make_everyone_ineligible() {
        let request = request_at(0.0, 0.0);
        let v = volunteer_at(0.01, 0.01, &["rescue"]);
        assert!(score_candidate(&request, &v, &MatchConfig::default()).is_none());
    }

    #[test]
    fn skill_overlap_is_fractional() {
        let mut request = request_at(12.97, 77.59);
        request.required_skills = vec!["rescue".into(), "first aid".into()];
        let v = volunteer_at(12.97, 77.59, &["rescue"]);
        assert_eq!(skill_overlap(&request, &v), 0.5);
    }

    #[test]
    fn skilled_far_volunteer_beats_unskilled_near_one() {
        // One volunteer at 1.2 km with the skill, one at 0.5 km without it.
        // Under the default weights skill must dominate.
        let request = request_at(12.97, 77.59);
        let v1 = volunteer_at(12.97 + 0.0108, 77.59, &["rescue"]); // ~1.2 km
        let v2 = volunteer_at(12.97 + 0.0045, 77.59, &[]); // ~0.5 km
        let config = MatchConfig::default();
        let s1 = score_candidate(&request, &v1, &config).unwrap();
        let s2 = score_candidate(&request, &v2, &config).unwrap();
        assert!(s1.score > s2.score);
    }
}
