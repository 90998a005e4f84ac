//! Reactor-driven delay for the loop executors.
//!
//! Backs [`DelayPort`] with an `async-io-mini` timer, so a sleeping loop
//! yields its executor instead of spinning the core.

use core::time::Duration;

use async_io_mini::Timer;

use crate::app::ports::DelayPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct ReactorDelay;

impl ReactorDelay {
    pub fn new() -> Self {
        Self
    }
}

impl DelayPort for ReactorDelay {
    async fn sleep(&mut self, duration: Duration) {
        Timer::after(duration).await;
    }
}
