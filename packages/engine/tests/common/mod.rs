// Common test fixtures: an engine on the in-memory store with a manual
// clock, plus builders for the Bangalore-area scenario data used across the
// suites.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use engine_core::domains::requests::models::{HelpType, NewHelpRequest, Urgency};
use engine_core::domains::volunteers::models::{NewVolunteerProfile, VolunteerProfile};
use engine_core::store::MemoryStore;
use engine_core::{Engine, ManualClock, MatchConfig, UserId};

pub const BASE_LAT: f64 = 12.97;
pub const BASE_LNG: f64 = 77.59;

pub struct TestEngine {
    pub engine: Arc<Engine>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
}

pub fn test_engine() -> TestEngine {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    ));
    let engine = Arc::new(Engine::new(
        store.clone(),
        clock.clone(),
        MatchConfig::default(),
    ));
    TestEngine {
        engine,
        clock,
        store,
    }
}

/// A critical rescue request at the base coordinates.
pub fn rescue_request(requester: UserId) -> NewHelpRequest {
    NewHelpRequest {
        requester_id: requester,
        help_type: HelpType::Rescue,
        urgency: Urgency::Critical,
        title: "Family trapped by flood water".into(),
        description: None,
        latitude: BASE_LAT,
        longitude: BASE_LNG,
        address: Some("Shivajinagar".into()),
        required_skills: vec!["rescue".into()],
        required_by: None,
        people_affected: 4,
        is_sos: false,
    }
}

/// Registers an available volunteer offset north of the base point.
/// 0.009 degrees of latitude is roughly 1 km.
pub async fn register_volunteer_at(
    engine: &Engine,
    lat_offset: f64,
    skills: &[&str],
) -> VolunteerProfile {
    engine
        .register_volunteer(NewVolunteerProfile {
            user_id: UserId::new(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            max_distance_km: 10.0,
            latitude: Some(BASE_LAT + lat_offset),
            longitude: Some(BASE_LNG),
        })
        .await
        .expect("volunteer registration failed")
}
