//! Report callback handed to providers
//!
//! An `ActionSink` belongs to exactly one provider invocation. It tags every
//! reported action with the provider's identity and appends it under a lock,
//! so providers may clone it into spawned tasks or threads and report from
//! there. Once the engine finishes the invocation the sink is sealed and late
//! reports are dropped.

use crate::context::TextSpan;
use crate::descriptor::ProviderId;
use crate::CodeAction;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// An action tagged with the provider that reported it
#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem {
    /// Provider that reported the action
    pub provider: ProviderId,
    /// The reported action
    pub action: CodeAction,
    /// Region of the document the action applies to
    pub region: TextSpan,
}

#[derive(Default)]
struct SinkState {
    items: Vec<ResultItem>,
    sealed: bool,
}

/// Thread-safe report callback for a single provider invocation
#[derive(Clone)]
pub struct ActionSink {
    provider: ProviderId,
    state: Arc<Mutex<SinkState>>,
}

impl ActionSink {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(SinkState::default())),
        }
    }

    /// Provider this sink tags actions with
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// Report an action applying to `region`.
    ///
    /// Safe to call concurrently from any thread. Returns `false` when the
    /// invocation already ended and the action was dropped.
    pub fn report(&self, action: CodeAction, region: TextSpan) -> bool {
        let mut state = self.state.lock();
        if state.sealed {
            debug!(
                provider = %self.provider,
                title = %action.title,
                "Dropping action reported after invocation ended"
            );
            return false;
        }
        state.items.push(ResultItem {
            provider: self.provider.clone(),
            action,
            region,
        });
        true
    }

    /// Number of actions reported so far
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sealed(&self) -> bool {
        self.state.lock().sealed
    }

    /// Seal the sink and take everything reported, in report order.
    ///
    /// Called by the engine when the invocation ends; later reports are
    /// rejected.
    pub fn finish(&self) -> Vec<ResultItem> {
        let mut state = self.state.lock();
        state.sealed = true;
        std::mem::take(&mut state.items)
    }
}

impl std::fmt::Debug for ActionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSink")
            .field("provider", &self.provider)
            .field("reported", &self.len())
            .finish()
    }
}
