// Domain modules, one per aggregate.

pub mod matching;
pub mod notifications;
pub mod requests;
pub mod volunteers;
