//! Rate budget observation
//!
//! The remaining request quota of the hosting API is read before every
//! resolution and published to a gauge holding the last observed value.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::version::error::ResolveError;
use crate::version::registry::Registry;

/// Name under which the remaining-quota gauge is exported
pub const RATE_LIMIT_REMAINING_GAUGE: &str = "remote_versions_github_rate_limit_remaining";

/// A metric holding the last value written to it
pub trait Gauge: Send + Sync {
    fn name(&self) -> &str;

    fn set(&self, value: f64);

    fn get(&self) -> f64;
}

/// Lock-free in-process gauge
#[derive(Debug)]
pub struct AtomicGauge {
    name: &'static str,
    bits: AtomicU64,
}

impl AtomicGauge {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            bits: AtomicU64::new(0),
        }
    }

    /// Gauge for the remaining GitHub core rate limit
    pub const fn rate_limit_remaining() -> Self {
        Self::new(RATE_LIMIT_REMAINING_GAUGE)
    }
}

impl Gauge for AtomicGauge {
    fn name(&self) -> &str {
        self.name
    }

    fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Reads the remaining quota and records it on a gauge
pub struct RateBudgetMonitor {
    registry: Arc<dyn Registry>,
    gauge: Arc<dyn Gauge>,
}

impl RateBudgetMonitor {
    pub fn new(registry: Arc<dyn Registry>, gauge: Arc<dyn Gauge>) -> Self {
        Self { registry, gauge }
    }

    pub fn gauge(&self) -> &Arc<dyn Gauge> {
        &self.gauge
    }

    /// Query the remaining quota, publish it, and return it
    pub async fn check(&self) -> Result<u64, ResolveError> {
        let limit = self
            .registry
            .rate_limit()
            .await
            .map_err(ResolveError::BudgetCheck)?;

        debug!(
            remaining = limit.remaining,
            limit = limit.limit,
            reset = %limit.reset,
            "rate limit"
        );
        self.gauge.set(limit.remaining as f64);

        Ok(limit.remaining)
    }
}
