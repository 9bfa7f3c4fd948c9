// Notifications: domain events and their fan-out to notification records.

pub mod emitter;
pub mod models;

pub use emitter::{notifications_for, DomainEvent};
pub use models::{Notification, NotificationKind};
