use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_secs(10);

/// Lets one error log through per window and counts the ones it swallowed.
#[derive(Debug)]
pub struct ErrorThrottle {
    window: Duration,
    last_emitted: Option<Instant>,
    suppressed: u64,
}

impl Default for ErrorThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_WINDOW)
    }
}

impl ErrorThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emitted: None,
            suppressed: 0,
        }
    }

    /// Returns the number of errors suppressed since the last emitted one when
    /// this error should be logged, `None` when it should be swallowed.
    pub fn check(&mut self) -> Option<u64> {
        let now = Instant::now();
        match self.last_emitted {
            Some(last) if now.duration_since(last) < self.window => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last_emitted = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}
