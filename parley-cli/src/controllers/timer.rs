use std::time::{Duration, Instant};

/// Wall-clock stopwatch for a single response.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    started: Option<Instant>,
    stopped: Option<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from zero, discarding any previous reading.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.stopped = None;
    }

    /// Freeze the reading. Returns the elapsed time, if the timer was running.
    pub fn stop(&mut self) -> Option<Duration> {
        let elapsed = self.started.map(|start| start.elapsed())?;
        self.started = None;
        self.stopped = Some(elapsed);
        Some(elapsed)
    }

    pub fn reset(&mut self) {
        self.started = None;
        self.stopped = None;
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match (self.started, self.stopped) {
            (Some(start), _) => start.elapsed(),
            (None, Some(stopped)) => stopped,
            (None, None) => Duration::ZERO,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn display(&self) -> String {
        format_secs(self.elapsed_secs())
    }
}

/// Seconds with one decimal, e.g. `1.2s`.
pub fn format_secs(secs: f64) -> String {
    format!("{secs:.1}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_timer_reads_zero() {
        let timer = Timer::new();
        assert_eq!(timer.display(), "0.0s");
        assert!(!timer.is_running());
    }

    #[test]
    fn stop_freezes_reading() {
        let mut timer = Timer::new();
        assert!(timer.stop().is_none());
        timer.start();
        assert!(timer.is_running());
        let frozen = timer.stop().unwrap();
        assert_eq!(timer.elapsed(), frozen);
        timer.reset();
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[test]
    fn formats_one_decimal() {
        assert_eq!(format_secs(1.24), "1.2s");
        assert_eq!(format_secs(12.0), "12.0s");
    }
}
