// Matching: geospatial scoring, eligibility filtering, offer arbitration.

pub mod arbiter;
pub mod eligibility;
pub mod models;
pub mod scoring;

pub use arbiter::MatchArbiter;
pub use models::{Match, MatchDecision, MatchStatus, ScoredCandidate};
