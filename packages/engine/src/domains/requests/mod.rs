// Help requests: models, status state machine, audit trail.

pub mod lifecycle;
pub mod models;

pub use lifecycle::LifecycleController;
pub use models::{
    Coordinates, HelpRequest, HelpType, NewHelpRequest, RequestFilter, RequestStatus, StatusLog,
    Urgency,
};
