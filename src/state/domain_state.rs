use std::time::{Duration, Instant};

/// Token-bucket state for one domain
///
/// The clock is always passed in by the caller, so the bucket itself never
/// reads the time and can be stepped deterministically in tests.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Tokens currently available; meaningless until the first refill
    tokens: f64,

    /// Instant of the last refill, `None` while the bucket is untouched (full)
    last_refill: Option<Instant>,

    /// Refill rate in requests per second
    rate: f64,

    /// Number of requests admitted for this domain
    pub request_count: u32,
}

impl DomainState {
    /// Creates a full bucket refilling at `rate` requests per second
    pub fn new(rate: f64) -> Self {
        Self {
            tokens: 0.0,
            last_refill: None,
            rate,
            request_count: 0,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Changes the refill rate, keeping the tokens already earned
    pub fn set_rate(&mut self, rate: f64, now: Instant, capacity: u32) {
        self.refill(now, capacity);
        self.rate = rate;
    }

    fn refill(&mut self, now: Instant, capacity: u32) {
        let capacity = f64::from(capacity.max(1));
        match self.last_refill {
            None => self.tokens = capacity,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last).as_secs_f64();
                self.tokens = (self.tokens + elapsed * self.rate).min(capacity);
            }
        }
        self.last_refill = Some(now);
    }

    /// Takes one token if available
    ///
    /// # Arguments
    ///
    /// * `now` - The current time instant
    /// * `capacity` - Maximum tokens the bucket holds (burst size)
    ///
    /// # Returns
    ///
    /// * `Ok(())` - A token was taken and the request may proceed
    /// * `Err(wait)` - No token; one will be available after `wait`
    pub fn try_acquire(&mut self, now: Instant, capacity: u32) -> Result<(), Duration> {
        self.refill(now, capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            self.request_count += 1;
            return Ok(());
        }

        let missing = 1.0 - self.tokens;
        let wait = if self.rate > 0.0 {
            Duration::try_from_secs_f64(missing / self.rate).unwrap_or(Duration::MAX)
        } else {
            Duration::MAX
        };
        Err(wait)
    }

    /// Time until the next token, or `None` if one is available now
    pub fn time_until_next_request(&self, now: Instant, capacity: u32) -> Option<Duration> {
        let mut probe = self.clone();
        probe.try_acquire(now, capacity).err()
    }
}
