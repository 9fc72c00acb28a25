use parley_shared::TokenCount;
use std::time::{Duration, Instant};

/// Usage band of the token bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Normal,
    Warning,
    Critical,
}

/// Token count against the model's context window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenMeter {
    count: Option<u64>,
    limit: Option<u64>,
}

impl TokenMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a server reading. Partial readings leave the meter untouched.
    pub fn update(&mut self, reading: &TokenCount) -> bool {
        match (reading.count, reading.limit) {
            (Some(count), Some(limit)) => {
                self.count = Some(count);
                self.limit = Some(limit);
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.count = None;
        self.limit = None;
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Usage in percent, clamped to `0..=100`.
    pub fn percent(&self) -> Option<f64> {
        let (count, limit) = (self.count?, self.limit?);
        Some(usage_percent(count, limit))
    }

    pub fn level(&self) -> Level {
        self.percent().map(level_for).unwrap_or(Level::Normal)
    }

    pub fn label(&self) -> String {
        match (self.count, self.limit) {
            (Some(count), Some(limit)) => format!("{count} / {limit} tokens"),
            _ => "- / - tokens".to_string(),
        }
    }
}

pub fn usage_percent(count: u64, limit: u64) -> f64 {
    if limit == 0 {
        return if count > 0 { 100.0 } else { 0.0 };
    }
    (count as f64 / limit as f64 * 100.0).clamp(0.0, 100.0)
}

pub fn level_for(percent: f64) -> Level {
    if percent > 90.0 {
        Level::Critical
    } else if percent > 70.0 {
        Level::Warning
    } else {
        Level::Normal
    }
}

/// Delays a token count until typing pauses.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// True once per quiet period, when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
