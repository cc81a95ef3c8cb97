//! ALFA Slideshow - Timer Coordinator
//!
//! Owns the periodic auto-advance timer and the one-shot auto-lock timer.
//! Both are polled from the session task, so a fire can never race a
//! teardown: once released, `next` never yields again.
//!
//! Auto-lock is deliberately not re-armed by user interaction and is not tied
//! to app backgrounding. Locking the device backgrounds the app, so a
//! lifecycle-driven lock would re-trigger itself.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};

use crate::settings::SessionConfig;

/// Which timer fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerFire {
    AdvanceTick,
    AutoLockElapsed,
}

/// Session timers
#[derive(Default)]
pub struct TimerCoordinator {
    /// Periodic auto-advance
    advance: Option<Interval>,
    /// One-shot auto-lock
    auto_lock: Option<Pin<Box<Sleep>>>,
    /// Set once on teardown
    released: bool,
}

impl TimerCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timers enabled in `config`. Must run inside a tokio runtime.
    pub fn arm(&mut self, config: &SessionConfig) {
        if self.released {
            return;
        }

        if config.auto_advance_enabled {
            self.arm_advance(config.advance_interval.duration());
        }

        if config.auto_lock_enabled {
            self.arm_auto_lock(config.auto_lock_delay.duration());
        }
    }

    /// (Re)start auto-advance; the first tick comes one period from now
    pub fn arm_advance(&mut self, period: Duration) {
        if self.released {
            return;
        }

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.advance = Some(ticker);
    }

    /// Start the one-shot auto-lock countdown
    pub fn arm_auto_lock(&mut self, delay: Duration) {
        if self.released {
            return;
        }
        self.auto_lock = Some(Box::pin(sleep(delay)));
    }

    /// Stop auto-advance; true if it was running
    pub fn cancel_advance(&mut self) -> bool {
        self.advance.take().is_some()
    }

    /// Stop auto-lock; true if it was pending
    pub fn cancel_auto_lock(&mut self) -> bool {
        self.auto_lock.take().is_some()
    }

    pub fn is_advancing(&self) -> bool {
        self.advance.is_some()
    }

    pub fn is_auto_lock_pending(&self) -> bool {
        self.auto_lock.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Cancel both timers for good. Returns false if already released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }

        self.cancel_advance();
        self.cancel_auto_lock();
        self.released = true;
        true
    }

    /// Wait for the next fire; pends forever when nothing is armed
    pub async fn next(&mut self) -> TimerFire {
        if self.released {
            return pending().await;
        }

        let fire = tokio::select! {
            _ = tick(&mut self.advance) => TimerFire::AdvanceTick,
            _ = elapse(&mut self.auto_lock) => TimerFire::AutoLockElapsed,
        };

        if fire == TimerFire::AutoLockElapsed {
            self.auto_lock = None;
        }

        fire
    }
}

async fn tick(advance: &mut Option<Interval>) {
    match advance {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}

async fn elapse(auto_lock: &mut Option<Pin<Box<Sleep>>>) {
    match auto_lock {
        Some(delay) => delay.as_mut().await,
        None => pending::<()>().await,
    }
}
