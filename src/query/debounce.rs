use std::time::{Duration, Instant};

/// Trailing-edge debouncer with an injected clock.
///
/// Every `push` replaces the pending value and restarts the delay; the value is
/// released by `poll` once no push has happened for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// How long an event loop may sleep before the pending value is due.
    /// `None` when nothing is pending; zero when it is already due.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        let (_, pushed_at) = self.pending.as_ref()?;
        Some((*pushed_at + self.delay).saturating_duration_since(now))
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.time_until_due(now) {
            Some(left) if left.is_zero() => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    /// Releases the pending value immediately, e.g. on Enter or shutdown.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }
}
