use std::time::Duration;

/// Doubling delay between retry attempts, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    attempts: u64,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        // A zero delay would turn the retry loop into a spin
        let next = initial.max(Duration::from_millis(1));
        Self {
            next,
            max: max.max(next),
            attempts: 0,
        }
    }

    /// Records a failed attempt and returns how long to wait before the next one.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts += 1;
        let delay = self.next.min(self.max);
        self.next = self.next.saturating_mul(2).min(self.max);
        delay
    }

    pub const fn attempts(&self) -> u64 {
        self.attempts
    }
}
