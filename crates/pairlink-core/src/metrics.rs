//! Per-exchange phase timings.
//!
//! Created per attempt, fed a timestamp at the end of each phase, logged once
//! as a single line and dropped. Each phase measures the time since the
//! previous mark, so phases add up to the exchange's wall time.
//!
//! Like the session machine, methods take `now` instead of reading a clock.

use std::{
    fmt::Write,
    time::{Duration, Instant},
};

/// Measured protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Public key out, wrapped key back
    Handshake,
    /// Resume challenge round trip
    Resume,
    /// Reading the request (server) or response (client)
    Read,
    /// Handler invocation
    Handle,
    /// Writing the request (client) or response (server)
    Write,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::Resume => "resume",
            Self::Read => "read",
            Self::Handle => "handle",
            Self::Write => "write",
        }
    }
}

/// Timing accumulator for one exchange.
#[derive(Debug, Clone)]
pub struct Metrics {
    topic: String,
    addr: String,
    mark: Instant,
    phases: Vec<(Phase, Duration)>,
}

impl Metrics {
    /// Start timing an exchange with `addr`.
    pub fn new(addr: impl Into<String>, now: Instant) -> Self {
        Self { topic: String::new(), addr: addr.into(), mark: now, phases: Vec::new() }
    }

    /// Topic for the log line.
    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    /// Topic recorded so far.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Close `phase` at `now` and restart the clock.
    pub fn fix(&mut self, phase: Phase, now: Instant) {
        let elapsed = now.saturating_duration_since(self.mark);
        self.phases.push((phase, elapsed));
        self.mark = now;
    }

    /// Duration recorded for `phase`, if it ran.
    pub fn duration(&self, phase: Phase) -> Option<Duration> {
        self.phases.iter().find(|(p, _)| *p == phase).map(|(_, d)| *d)
    }

    /// Sum of all recorded phases.
    pub fn total(&self) -> Duration {
        self.phases.iter().map(|(_, d)| *d).sum()
    }

    /// `"<topic>: addr (<addr>), <phase> (<d>), ..., total (<d>)"`
    pub fn line(&self) -> String {
        let mut line = format!("{}: addr ({})", self.topic, self.addr);
        for (phase, duration) in &self.phases {
            let _ = write!(line, ", {} ({})", phase.label(), format_duration(*duration));
        }

        let total = self.total();
        if !total.is_zero() {
            let _ = write!(line, ", total ({})", format_duration(total));
        }
        line
    }
}

/// Render with the largest unit that keeps the value under a thousand.
pub fn format_duration(duration: Duration) -> String {
    let ns = duration.as_nanos();
    if ns < 1_000 {
        return format!("{ns} ns");
    }

    let us = duration.as_micros();
    if us < 1_000 {
        return format!("{us} µs");
    }

    let ms = duration.as_millis();
    if ms < 1_000 {
        return format!("{ms} ms");
    }

    format!("{:.2} s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_measure_since_previous_mark() {
        let t0 = Instant::now();
        let mut metrics = Metrics::new("127.0.0.1:8080", t0);

        metrics.fix(Phase::Handshake, t0 + Duration::from_millis(3));
        metrics.fix(Phase::Write, t0 + Duration::from_millis(4));
        metrics.fix(Phase::Read, t0 + Duration::from_millis(10));

        assert_eq!(metrics.duration(Phase::Handshake), Some(Duration::from_millis(3)));
        assert_eq!(metrics.duration(Phase::Write), Some(Duration::from_millis(1)));
        assert_eq!(metrics.duration(Phase::Read), Some(Duration::from_millis(6)));
        assert_eq!(metrics.duration(Phase::Resume), None);
        assert_eq!(metrics.total(), Duration::from_millis(10));
    }

    #[test]
    fn line_lists_recorded_phases_in_order() {
        let t0 = Instant::now();
        let mut metrics = Metrics::new("10.0.0.1:80", t0);
        metrics.set_topic("echo");
        metrics.fix(Phase::Read, t0 + Duration::from_micros(20));
        metrics.fix(Phase::Handle, t0 + Duration::from_micros(25));
        metrics.fix(Phase::Write, t0 + Duration::from_millis(2));

        assert_eq!(
            metrics.line(),
            "echo: addr (10.0.0.1:80), read (20 µs), handle (5 µs), write (1 ms), total (2 ms)"
        );
    }

    #[test]
    fn empty_metrics_omit_total() {
        let metrics = Metrics::new("a", Instant::now());
        assert_eq!(metrics.line(), ": addr (a)");
    }

    #[test]
    fn duration_units() {
        assert_eq!(format_duration(Duration::from_nanos(999)), "999 ns");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "1 µs");
        assert_eq!(format_duration(Duration::from_micros(1_500)), "1 ms");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.50 s");
    }
}
