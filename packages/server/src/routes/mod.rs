// HTTP routes

pub mod health;
pub mod matches;
pub mod notifications;
pub mod requests;
pub mod volunteers;

pub use health::*;
pub use matches::*;
pub use notifications::*;
pub use requests::*;
pub use volunteers::*;
