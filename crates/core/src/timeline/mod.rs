use std::cell::Cell;
use std::time::{Duration, Instant};

/// Source of monotonic time for the tick scheduler.
pub trait Clock {
    /// Time elapsed since an arbitrary but fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Used for deterministic playback.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Minimum time between two ticks at the given FPS limit.
pub fn tick_period(fps_limit: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps_limit.max(1)))
}

/// Gates animation ticks by the FPS limit.
///
/// Only unpaused time counts towards the next tick, and time beyond one
/// period is discarded instead of being replayed as a burst of ticks.
#[derive(Debug, Default, Clone)]
pub struct TickScheduler {
    last_seen: Option<Duration>,
    accumulated: Duration,
    last_tick_at: Option<Duration>,
    measured_fps: f32,
    ticks: u64,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes the clock and returns `true` when a tick should fire.
    pub fn poll(&mut self, now: Duration, fps_limit: u32, paused: bool) -> bool {
        let delta = self
            .last_seen
            .map(|last| now.saturating_sub(last))
            .unwrap_or_default();
        self.last_seen = Some(now);

        if paused {
            // Resuming continues from the same point in the period.
            self.last_tick_at = None;
            return false;
        }

        self.accumulated += delta;
        let first_tick = self.ticks == 0 && self.accumulated.is_zero();
        if !first_tick && self.accumulated < tick_period(fps_limit) {
            return false;
        }

        self.accumulated = Duration::ZERO;
        self.record_tick(now);
        true
    }

    /// Time left before [`poll`](Self::poll) would fire, given no pause.
    pub fn time_until_next(&self, fps_limit: u32) -> Duration {
        tick_period(fps_limit).saturating_sub(self.accumulated)
    }

    /// Forgets partial progress towards the next tick.
    pub fn reset(&mut self) {
        *self = Self {
            ticks: self.ticks,
            ..Self::default()
        };
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Tick rate measured over the last two ticks.
    pub fn measured_fps(&self) -> f32 {
        self.measured_fps
    }

    fn record_tick(&mut self, now: Duration) {
        if let Some(previous) = self.last_tick_at {
            let elapsed = now.saturating_sub(previous).as_secs_f32();
            if elapsed > 0.0 {
                self.measured_fps = 1.0 / elapsed;
            }
        }
        self.last_tick_at = Some(now);
        self.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(100);

    #[test]
    fn fires_immediately_then_once_per_period() {
        let mut scheduler = TickScheduler::new();
        assert!(scheduler.poll(Duration::ZERO, 10, false));
        assert!(!scheduler.poll(Duration::from_millis(50), 10, false));
        assert!(scheduler.poll(FRAME, 10, false));
        assert_eq!(scheduler.ticks(), 2);
    }

    #[test]
    fn missed_time_is_not_replayed() {
        let mut scheduler = TickScheduler::new();
        scheduler.poll(Duration::ZERO, 10, false);

        assert!(scheduler.poll(Duration::from_secs(5), 10, false));
        assert!(!scheduler.poll(Duration::from_millis(5_001), 10, false));
        assert_eq!(scheduler.ticks(), 2);
    }

    #[test]
    fn paused_time_is_not_accumulated() {
        let mut scheduler = TickScheduler::new();
        scheduler.poll(Duration::ZERO, 10, false);
        assert!(!scheduler.poll(Duration::from_millis(60), 10, false));

        assert!(!scheduler.poll(Duration::from_millis(70), 10, true));
        assert!(!scheduler.poll(Duration::from_secs(30), 10, true));

        // 60ms were banked before the pause; 40 more complete the period.
        assert!(!scheduler.poll(Duration::from_millis(30_020), 10, false));
        assert!(scheduler.poll(Duration::from_millis(30_040), 10, false));
    }

    #[test]
    fn reports_time_until_next_tick() {
        let mut scheduler = TickScheduler::new();
        scheduler.poll(Duration::ZERO, 10, false);
        scheduler.poll(Duration::from_millis(40), 10, false);
        assert_eq!(scheduler.time_until_next(10), Duration::from_millis(60));
    }

    #[test]
    fn measures_tick_rate() {
        let mut scheduler = TickScheduler::new();
        let clock = ManualClock::new();
        for _ in 0..4 {
            scheduler.poll(clock.now(), 20, false);
            clock.advance(Duration::from_millis(50));
        }
        assert!((scheduler.measured_fps() - 20.0).abs() < 0.01);
    }
}
