use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{DelayRange, ThrottleConfig};

/// Pacing policy applied between successive external calls
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Sleeps for a uniformly random delay within a bounded range
#[derive(Debug, Clone)]
pub struct JitterThrottle {
    range: DelayRange,
}

impl JitterThrottle {
    pub fn new(range: DelayRange) -> Self {
        Self { range }
    }

    /// Draw the next delay. Degenerate or inverted ranges collapse to `min_ms`.
    pub fn next_delay(&self) -> Duration {
        let DelayRange { min_ms, max_ms } = self.range;
        if max_ms <= min_ms {
            return Duration::from_millis(min_ms);
        }
        let millis = rand::thread_rng().gen_range(min_ms..=max_ms);
        Duration::from_millis(millis)
    }
}

#[async_trait]
impl Throttle for JitterThrottle {
    async fn pause(&self) {
        let delay = self.next_delay();
        debug!("Throttling for {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

/// No delay at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThrottle;

#[async_trait]
impl Throttle for NoThrottle {
    async fn pause(&self) {}
}

/// Counts pauses without sleeping
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CountingThrottle {
    pauses: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl CountingThrottle {
    pub(crate) fn pauses(&self) -> usize {
        self.pauses.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl Throttle for CountingThrottle {
    async fn pause(&self) {
        self.pauses.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

/// One throttle per kind of external call
#[derive(Clone)]
pub struct Throttles {
    pub listing: Arc<dyn Throttle>,
    pub detail: Arc<dyn Throttle>,
    pub subtitle: Arc<dyn Throttle>,
}

impl Throttles {
    pub fn from_config(config: &ThrottleConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            listing: Arc::new(JitterThrottle::new(config.listing_delay)),
            detail: Arc::new(JitterThrottle::new(config.detail_delay)),
            subtitle: Arc::new(JitterThrottle::new(config.subtitle_delay)),
        }
    }

    pub fn disabled() -> Self {
        Self::uniform(Arc::new(NoThrottle))
    }

    pub fn uniform(throttle: Arc<dyn Throttle>) -> Self {
        Self {
            listing: Arc::clone(&throttle),
            detail: Arc::clone(&throttle),
            subtitle: throttle,
        }
    }
}
