//! Typed ID aliases for the engine's domain entities.

pub use super::id::Id;

/// Marker type for platform users (requesters, volunteers, admins).
///
/// The engine only ever sees opaque actor ids; identity and auth live in an
/// external collaborator.
pub struct User;

/// Marker type for help requests.
pub struct HelpRequest;

/// Marker type for volunteer profiles.
pub struct VolunteerProfile;

/// Marker type for match offers.
pub struct Match;

/// Marker type for status-log entries.
pub struct StatusLog;

/// Marker type for notifications.
pub struct Notification;

/// Typed ID for platform users.
pub type UserId = Id<User>;

/// Typed ID for help requests.
pub type RequestId = Id<HelpRequest>;

/// Typed ID for volunteer profiles.
pub type VolunteerId = Id<VolunteerProfile>;

/// Typed ID for match offers.
pub type MatchId = Id<Match>;

/// Typed ID for status-log entries.
pub type StatusLogId = Id<StatusLog>;

/// Typed ID for notifications.
pub type NotificationId = Id<Notification>;
