pub mod retry;
pub mod throttle;

pub use retry::{Backoff, RetryConfig};
pub use throttle::{DEFAULT_THROTTLE_WINDOW, ErrorThrottle};
