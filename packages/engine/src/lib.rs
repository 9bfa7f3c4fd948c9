// Sahaya Relief Network - Matching & Request-Lifecycle Engine
//
// This crate is the core of the platform: given a help request it selects and
// ranks eligible volunteers, creates and arbitrates match offers, and drives
// the request through its status lifecycle with an append-only audit trail.
//
// Registration forms, dashboards and delivery transports are external
// collaborators that call into `Engine` and render its results.

pub mod common;
pub mod config;
pub mod domains;
pub mod engine;
pub mod error;
pub mod store;

pub use common::{Clock, ManualClock, SystemClock};
pub use common::{MatchId, NotificationId, RequestId, UserId, VolunteerId};
pub use config::{MatchConfig, MatchWeights, ResponseDeadlines};
pub use engine::Engine;
pub use error::EngineError;
