// Shared infrastructure: typed IDs and the clock collaborator.

pub mod clock;
pub mod entity_ids;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity_ids::{MatchId, NotificationId, RequestId, StatusLogId, UserId, VolunteerId};
pub use id::Id;
