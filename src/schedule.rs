// src/schedule.rs
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Fixed-period ticker that can be armed and disarmed. A disarmed ticker's
/// `tick` never resolves, so it can sit in a `select!` unconditionally.
///
/// Built on `tokio::time`, so a paused test clock drives it deterministically.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Arm (or re-arm); the first tick lands one full period from now.
    pub fn start(&mut self) {
        let mut iv = time::interval_at(Instant::now() + self.period, self.period);
        iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(iv);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(iv) => iv.tick().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let start = Instant::now();
        let mut t = Ticker::new(Duration::from_millis(500));
        t.start();
        let at = t.tick().await;
        assert_eq!(at - start, Duration::from_millis(500));
        let at = t.tick().await;
        assert_eq!(at - start, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_ticker_never_fires() {
        let mut t = Ticker::new(Duration::from_millis(10));
        t.start();
        t.stop();
        let fired = time::timeout(Duration::from_secs(5), t.tick()).await;
        assert!(fired.is_err());
    }
}
