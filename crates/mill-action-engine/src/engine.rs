//! Concurrent provider execution
//!
//! Every scheduled provider gets its own task on a `JoinSet` (fan-out). A
//! single loop collects finished tasks and watches the request's
//! cancellation token (fan-in). Completion order is irrelevant: results are
//! put back into provider order by the aggregator before returning.

use crate::aggregator::aggregate;
use crate::capability_cache::CapabilityCache;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::health::ProviderHealth;
use crate::instrumentation::observe;
use crate::isolation::{invoke_isolated, InvocationOutcome};
use mill_action_api::{
    ActionProvider, CodeAction, ProviderCapabilities, ProviderId, RequestContext, ResultItem,
    TextSpan,
};
use mill_action_config::logging::provider_span;
use mill_action_config::EngineConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, Instrument};

/// A reported action together with its provider's capabilities
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedAction {
    item: ResultItem,
    capabilities: Arc<ProviderCapabilities>,
}

impl CollectedAction {
    pub fn new(item: ResultItem, capabilities: Arc<ProviderCapabilities>) -> Self {
        Self { item, capabilities }
    }

    pub fn provider(&self) -> &ProviderId {
        &self.item.provider
    }

    pub fn action(&self) -> &CodeAction {
        &self.item.action
    }

    pub fn region(&self) -> TextSpan {
        self.item.region
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    pub fn item(&self) -> &ResultItem {
        &self.item
    }

    pub fn into_item(self) -> ResultItem {
        self.item
    }
}

/// Runs providers concurrently behind the isolation boundary
pub struct ExecutionEngine {
    timeout: Duration,
    instrumentation_budget: Duration,
    health: Arc<ProviderHealth>,
    capabilities: Arc<CapabilityCache>,
}

impl ExecutionEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            timeout: config.provider_timeout(),
            instrumentation_budget: config.instrumentation_budget(),
            health: Arc::new(ProviderHealth::new(config.failure_threshold)),
            capabilities: Arc::new(CapabilityCache::default()),
        }
    }

    /// Share a capability cache with other engines
    pub fn with_capability_cache(mut self, cache: Arc<CapabilityCache>) -> Self {
        self.capabilities = cache;
        self
    }

    pub fn health(&self) -> &Arc<ProviderHealth> {
        &self.health
    }

    pub fn capabilities(&self) -> &Arc<CapabilityCache> {
        &self.capabilities
    }

    pub fn provider_timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn instrumentation_budget(&self) -> Duration {
        self.instrumentation_budget
    }

    /// Run `providers` for `context` and return their actions in provider
    /// order.
    ///
    /// Providers not matching the request's priority filter, and providers
    /// disabled by repeated failures, are not run. Provider failures yield no
    /// results for that provider; only request cancellation fails the call.
    pub async fn run_all(
        &self,
        context: &RequestContext,
        providers: &[Arc<dyn ActionProvider>],
    ) -> OrchestratorResult<Vec<CollectedAction>> {
        let started = Instant::now();
        let scheduled = self.schedule(context, providers);

        if context.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let shared = Arc::new(context.clone());
        let mut units = JoinSet::new();
        for (index, provider) in scheduled.iter().enumerate() {
            let span = provider_span(provider.descriptor().name());
            units.spawn(
                run_unit(
                    index,
                    Arc::clone(provider),
                    Arc::clone(&shared),
                    self.timeout,
                    self.instrumentation_budget,
                )
                .instrument(span),
            );
        }

        let cancellation = context.cancellation().clone();
        // Tagged with the scheduled index; names are not unique across sources.
        let mut buffer: Vec<(usize, CollectedAction)> = Vec::new();

        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    units.abort_all();
                    debug!(
                        discarded = buffer.len(),
                        "Request cancelled, aborting outstanding providers"
                    );
                    return Err(OrchestratorError::Cancelled);
                }
                joined = units.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((index, outcome)) => {
                            self.settle(index, &scheduled[index], outcome, &mut buffer);
                        }
                        Err(e) => {
                            error!(error = %e, "Provider task ended abnormally");
                        }
                    }
                }
            }
        }

        if context.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let results = aggregate(buffer);
        debug!(
            providers = scheduled.len(),
            actions = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Providers finished"
        );
        Ok(results)
    }

    /// Apply the priority filter and drop disabled providers
    fn schedule(
        &self,
        context: &RequestContext,
        providers: &[Arc<dyn ActionProvider>],
    ) -> Vec<Arc<dyn ActionProvider>> {
        let filter = context.priority();
        providers
            .iter()
            .filter(|provider| {
                let descriptor = provider.descriptor();
                if !descriptor.matches_priority(filter) {
                    return false;
                }
                if self.health.is_disabled(descriptor.id()) {
                    debug!(provider = %descriptor.name(), "Skipping disabled provider");
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Fold one finished unit into health tracking and the result buffer
    fn settle(
        &self,
        index: usize,
        provider: &Arc<dyn ActionProvider>,
        outcome: InvocationOutcome,
        buffer: &mut Vec<(usize, CollectedAction)>,
    ) {
        let id = provider.descriptor().id();
        match outcome {
            InvocationOutcome::Completed(items) => {
                self.health.record_success(id);
                if items.is_empty() {
                    return;
                }
                let capabilities = self.capabilities.capability_of(&**provider);
                buffer.extend(
                    items
                        .into_iter()
                        .map(|item| (index, CollectedAction::new(item, Arc::clone(&capabilities)))),
                );
            }
            outcome if outcome.is_failure() => {
                self.health.record_failure(id);
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("timeout", &self.timeout)
            .field("instrumentation_budget", &self.instrumentation_budget)
            .field("failure_threshold", &self.health.threshold())
            .finish()
    }
}

/// One unit of work: a single isolated provider invocation
async fn run_unit(
    index: usize,
    provider: Arc<dyn ActionProvider>,
    context: Arc<RequestContext>,
    timeout: Duration,
    budget: Duration,
) -> (usize, InvocationOutcome) {
    let id = provider.descriptor().id().clone();
    let sink = context.instrumentation().cloned();

    if let Some(sink) = &sink {
        observe(budget, "provider_started", || sink.provider_started(&id));
    }

    let started = Instant::now();
    let outcome = invoke_isolated(provider, context, timeout).await;
    let elapsed = started.elapsed();

    if let Some(sink) = &sink {
        let reported = outcome.as_provider_outcome();
        observe(budget, "provider_finished", || {
            sink.provider_finished(&id, reported, elapsed)
        });
    }

    (index, outcome)
}
