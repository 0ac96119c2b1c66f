use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Owns the recurring autosave timer. The timer exists iff autosave is
/// enabled, so `enabled` is derived from the handle rather than stored.
///
/// Every start bumps the generation. Ticks carry the generation of the timer
/// that fired them, so a tick queued by a cancelled timer can be told apart.
#[derive(Debug)]
pub struct AutosaveScheduler {
    period: Duration,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl AutosaveScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            generation: 0,
            timer: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.timer.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True if `generation` belongs to the running timer.
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_enabled() && generation == self.generation
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts the timer. `on_tick` runs once per period with the timer's
    /// generation; returning false stops the timer task (the receiving side
    /// is gone).
    pub fn enable<F>(&mut self, on_tick: F)
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        self.disable();
        self.generation += 1;
        self.timer = Some(spawn_timer(self.period, self.generation, on_tick));
        log::info!("Autosave enabled (every {}s)", self.period.as_secs());
    }

    pub fn disable(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            log::info!("Autosave timer cancelled");
        }
    }

    /// Applies a new period. A running timer is restarted with it.
    pub fn set_period<F>(&mut self, period: Duration, on_tick: F)
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        if period == self.period {
            return;
        }
        self.period = period;
        if self.is_enabled() {
            self.enable(on_tick);
        }
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        self.disable();
    }
}

fn spawn_timer<F>(period: Duration, generation: u64, mut on_tick: F) -> JoinHandle<()>
where
    F: FnMut(u64) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !on_tick(generation) {
                break;
            }
        }
    })
}
