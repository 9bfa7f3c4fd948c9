// Volunteer profiles.

pub mod models;

pub use models::{NewVolunteerProfile, VolunteerProfile, VolunteerStatus};
