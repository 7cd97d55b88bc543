pub mod auth;
pub mod rate_limit;

pub use rate_limit::{SlidingWindow, ThrottleLayer};
