//! Per-provider failure tracking
//!
//! Counts consecutive failures per provider. A success clears the count.
//! Once the count reaches the configured threshold the provider is disabled
//! and the engine stops scheduling it until it is reset.

use dashmap::DashMap;
use mill_action_api::ProviderId;
use tracing::{info, warn};

/// Health of a single provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// No outstanding failures
    Healthy,
    /// Failed recently but still scheduled
    Degraded { consecutive_failures: u32 },
    /// Suppressed from future requests
    Disabled,
}

impl HealthStatus {
    pub fn is_disabled(&self) -> bool {
        matches!(self, HealthStatus::Disabled)
    }
}

/// Consecutive-failure tracker shared across requests
#[derive(Debug)]
pub struct ProviderHealth {
    /// Failures before a provider is disabled; `0` never disables
    threshold: u32,
    failures: DashMap<ProviderId, u32>,
}

impl ProviderHealth {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            failures: DashMap::new(),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn record_success(&self, provider: &ProviderId) {
        if let Some((_, previous)) = self.failures.remove(provider) {
            info!(
                provider = %provider,
                previous_failures = previous,
                "Provider recovered"
            );
        }
    }

    /// Record a failure and return the provider's new status
    pub fn record_failure(&self, provider: &ProviderId) -> HealthStatus {
        let count = {
            let mut entry = self.failures.entry(provider.clone()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };

        let status = self.classify(count);
        if status.is_disabled() && count == self.threshold {
            warn!(
                provider = %provider,
                consecutive_failures = count,
                "Provider disabled after repeated failures"
            );
        }
        status
    }

    pub fn status(&self, provider: &ProviderId) -> HealthStatus {
        let count = self.failures.get(provider).map(|entry| *entry).unwrap_or(0);
        self.classify(count)
    }

    pub fn is_disabled(&self, provider: &ProviderId) -> bool {
        self.status(provider).is_disabled()
    }

    /// Clear recorded failures, re-enabling a disabled provider
    pub fn reset(&self, provider: &ProviderId) {
        if self.failures.remove(provider).is_some() {
            info!(provider = %provider, "Provider health reset");
        }
    }

    fn classify(&self, count: u32) -> HealthStatus {
        match count {
            0 => HealthStatus::Healthy,
            n if self.threshold > 0 && n >= self.threshold => HealthStatus::Disabled,
            n => HealthStatus::Degraded {
                consecutive_failures: n,
            },
        }
    }
}
