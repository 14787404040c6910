//! Tokio clock
//!
//! Uses `tokio::time` for both reading and sleeping. Works with tokio's
//! paused test clock.

use async_trait::async_trait;

use crate::error::Result;
use crate::timing::clock::{Clock, Instant};

/// Clock backed by the tokio timer driver
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) -> Result<()> {
        tokio::time::sleep_until(deadline).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}
