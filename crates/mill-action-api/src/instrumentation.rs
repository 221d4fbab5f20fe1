//! Side-channel instrumentation hooks
//!
//! A sink is purely observational. The engine calls it around the whole
//! request and around each provider invocation; it must return quickly and
//! can never change which actions are returned or in what order.

use crate::context::DocumentTarget;
use crate::descriptor::ProviderId;
use std::time::Duration;

/// How a single provider invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// Finished and reported `actions` actions
    Completed { actions: usize },
    /// Returned an error, panicked or produced malformed output
    Failed,
    /// Ran past the soft timeout
    TimedOut,
    /// Stopped because the request was cancelled
    Cancelled,
}

impl ProviderOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ProviderOutcome::Failed | ProviderOutcome::TimedOut)
    }
}

/// Observer for request and provider lifecycles. Every hook defaults to a
/// no-op.
pub trait InstrumentationSink: Send + Sync {
    fn request_started(&self, _document: &DocumentTarget) {}

    fn request_finished(&self, _document: &DocumentTarget, _actions: usize, _elapsed: Duration) {}

    fn provider_started(&self, _provider: &ProviderId) {}

    fn provider_finished(
        &self,
        _provider: &ProviderId,
        _outcome: ProviderOutcome,
        _elapsed: Duration,
    ) {
    }
}
