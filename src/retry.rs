use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff between conflicting writes.
///
/// `steps` bounds the number of retries. Each delay is the previous one multiplied by
/// `factor`, limited to `cap_ms`, plus up to `jitter` times itself at random.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Backoff {
    pub steps: u32,
    pub duration_ms: u64,
    pub factor: f64,
    pub jitter: f64,
    pub cap_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            steps: 5,
            duration_ms: 10,
            factor: 2.0,
            jitter: 0.1,
            cap_ms: 1000,
        }
    }
}

impl Backoff {
    pub fn delays(&self) -> Delays {
        Delays {
            remaining: self.steps,
            next_ms: self.duration_ms.min(self.cap_ms) as f64,
            backoff: self.clone(),
        }
    }
}

pub struct Delays {
    backoff: Backoff,
    remaining: u32,
    next_ms: f64,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let base = self.next_ms;
        self.next_ms = (base * self.backoff.factor).min(self.backoff.cap_ms as f64);

        let jitter = if self.backoff.jitter > 0.0 {
            base * self.backoff.jitter * rand::random::<f64>()
        } else {
            0.0
        };
        Some(Duration::from_nanos(((base + jitter).max(0.0) * 1e6).round() as u64))
    }
}
