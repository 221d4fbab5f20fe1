//! Core Provider API for Code Actions
//!
//! This crate defines the foundational traits and types for implementing
//! code action providers in the TypeMill system. A provider inspects a
//! document location and reports zero or more `CodeAction`s; the orchestration
//! engine (`mill-action-engine`) decides which providers apply, runs them
//! concurrently and merges what they report.
//!
//! # Architecture
//!
//! Each provider is a self-contained unit with its own:
//! - Descriptor (identity, languages, extensions, ordering hints, priority)
//! - Action computation logic
//! - Optional capability declarations (bulk apply support)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Module Declarations
// ============================================================================

pub mod capabilities;
pub mod context;
pub mod descriptor;
pub mod instrumentation;
pub mod registration;
pub mod sink;

// Re-exports
pub use capabilities::{BulkApplyScope, BulkApplySupport, ProviderCapabilities};
pub use context::{
    ActionOptions, ActionPriority, DocumentTarget, ExecutionMode, RequestContext, TextSpan,
};
pub use descriptor::{ProviderDescriptor, ProviderId};
pub use instrumentation::{InstrumentationSink, ProviderOutcome};
pub use registration::{iter_registrations, ProviderRegistration};
pub use sink::{ActionSink, ResultItem};

// Re-export for the registration macro and for callers building contexts.
pub use inventory;
pub use tokio_util::sync::CancellationToken;

// ============================================================================
// Error Types
// ============================================================================

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors a provider can report back to the engine
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Provider logic failed
    #[error("Provider failed: {message}")]
    Failed { message: String },

    /// Provider produced output the engine cannot accept
    #[error("Invalid provider output: {message}")]
    InvalidOutput { message: String },

    /// Internal provider error
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// The provider observed cancellation and stopped early
    #[error("Operation cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Create a failure error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Create an invalid output error
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error signals cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ============================================================================
// Core Data Types
// ============================================================================

/// An action offered to the user for a document location.
///
/// The engine never interprets `kind` or `data`; they are carried through to
/// whoever applies the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAction {
    /// Title shown to the user
    pub title: String,

    /// Optional action kind (e.g. "quickfix", "refactor.extract")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Provider-specific payload used when the action is applied
    #[serde(default)]
    pub data: Value,
}

impl CodeAction {
    /// Create an action with just a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: None,
            data: Value::Null,
        }
    }

    /// Set the action kind
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Attach provider-specific data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Check that the action is well formed
    pub fn validate(&self) -> ProviderResult<()> {
        if self.title.trim().is_empty() {
            return Err(ProviderError::invalid_output("action title cannot be empty"));
        }
        if matches!(&self.kind, Some(kind) if kind.trim().is_empty()) {
            return Err(ProviderError::invalid_output(format!(
                "action '{}' has an empty kind",
                self.title
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Core Provider Trait
// ============================================================================

/// Core code action provider trait
///
/// Providers are invoked at most once per request and may run concurrently
/// with unrelated providers. Results are reported through the `ActionSink`,
/// which may be cloned into spawned work.
#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// Get the static provider descriptor
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Compute actions for the given request, reporting each through `sink`.
    ///
    /// Returning an error discards everything reported during this call.
    async fn compute_actions(
        &self,
        context: &RequestContext,
        sink: &ActionSink,
    ) -> ProviderResult<()>;

    /// Bulk apply support declared by this provider, if any
    fn bulk_apply_support(&self) -> Option<BulkApplySupport> {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
