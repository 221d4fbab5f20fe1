//! Code action orchestration engine
//!
//! Given a request context, the engine discovers which registered providers
//! apply, runs them concurrently behind an isolation boundary and returns
//! their actions in provider order.
//!
//! Data flow: [`ProviderRegistry`] → [`applicability`] → [`ExecutionEngine`]
//! (fan-out to providers, fan-in of results) → [`CapabilityCache`] →
//! [`aggregator`] → caller. [`ActionOrchestrator`] wires the pieces together.

pub mod aggregator;
pub mod applicability;
pub mod capability_cache;
pub mod engine;
pub mod error;
pub mod health;
mod instrumentation;
mod isolation;
pub mod manager;
pub mod ordering;
pub mod registry;

pub use applicability::{NoProjectProviders, ProjectProviderSource, ProjectProviders};
pub use capability_cache::{BulkApplyAnalyzer, CapabilityAnalyzer, CapabilityCache};
pub use engine::{CollectedAction, ExecutionEngine};
pub use error::{OrchestratorError, OrchestratorResult};
pub use health::{HealthStatus, ProviderHealth};
pub use manager::ActionOrchestrator;
pub use registry::{LanguageGroup, ProviderRegistry};

pub use mill_action_api as api;
