use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window limiter for login submissions, keyed by client address.
#[derive(Debug)]
pub struct LoginThrottle {
    max_attempts: usize,
    window: Duration,
    attempts: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts: max_attempts as usize,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::from_secs(60))
    }

    /// Records an attempt by `key`; false once the limit for the window is hit.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut attempts = self.attempts.lock();
        // keep the map from growing without bound
        attempts.retain(|_, q| q.back().is_some_and(|t| now.duration_since(*t) < self.window));

        let queue = attempts.entry(key.to_owned()).or_default();
        while queue
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            queue.pop_front();
        }
        if queue.len() >= self.max_attempts {
            return false;
        }
        queue.push_back(now);
        true
    }
}
