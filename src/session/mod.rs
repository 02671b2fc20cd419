pub mod store;
pub mod throttle;

pub use store::{Admission, Session, SessionStore, DEFAULT_SESSION_ID};
pub use throttle::RateLimiter;
