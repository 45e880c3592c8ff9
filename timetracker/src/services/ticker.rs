//! Periodic refresh of derived timer values
//!
//! Runs a background task that asks the engine to recompute elapsed and
//! remaining time once per period.

use crate::services::timer::TimerEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct Ticker;

impl Ticker {
    /// Start ticking `engine` every `period`; abort the handle to stop
    pub fn spawn(engine: Arc<TimerEngine>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Starting ticker ({:?})", period);

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                engine.tick();
            }
        })
    }
}
