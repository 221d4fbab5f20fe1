//! Orchestrator façade
//!
//! Owns the registry, the project provider source and the execution engine,
//! and answers code action requests end to end.

use crate::applicability::{applicable_providers, NoProjectProviders, ProjectProviderSource};
use crate::capability_cache::{CapabilityAnalyzer, CapabilityCache};
use crate::engine::{CollectedAction, ExecutionEngine};
use crate::error::OrchestratorResult;
use crate::health::HealthStatus;
use crate::instrumentation::observe;
use crate::registry::ProviderRegistry;
use mill_action_api::{ActionProvider, ProviderCapabilities, ProviderId, RequestContext};
use mill_action_config::logging::{self, request_span};
use mill_action_config::{ActionsConfig, EngineConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// Entry point for code action requests
pub struct ActionOrchestrator {
    /// Globally registered providers
    registry: Arc<ProviderRegistry>,
    /// Project-scoped providers
    project: Arc<dyn ProjectProviderSource>,
    /// Execution engine, including health tracking and capability cache
    engine: ExecutionEngine,
}

impl ActionOrchestrator {
    /// Create an orchestrator with no project-scoped providers
    pub fn new(registry: ProviderRegistry, config: &EngineConfig) -> Self {
        info!(
            providers = registry.len(),
            provider_timeout_ms = config.provider_timeout_ms,
            failure_threshold = config.failure_threshold,
            "Creating action orchestrator"
        );
        Self {
            registry: Arc::new(registry),
            project: Arc::new(NoProjectProviders),
            engine: ExecutionEngine::new(config),
        }
    }

    /// Create an orchestrator configured from `mill-actions.toml` and
    /// `MILL_ACTIONS__*` environment variables.
    ///
    /// Also installs the configured tracing subscriber unless the host
    /// already installed one.
    pub fn from_environment(registry: ProviderRegistry) -> OrchestratorResult<Self> {
        let config = ActionsConfig::load()?;
        logging::initialize(&config.logging);
        Ok(Self::new(registry, &config.engine))
    }

    /// Use `source` for project-scoped providers
    pub fn with_project_providers(mut self, source: Arc<dyn ProjectProviderSource>) -> Self {
        self.project = source;
        self
    }

    /// Replace the capability analysis, starting from an empty cache
    pub fn with_capability_analyzer(mut self, analyzer: Arc<dyn CapabilityAnalyzer>) -> Self {
        self.engine = self
            .engine
            .with_capability_cache(Arc::new(CapabilityCache::new(analyzer)));
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Providers that apply to `context`, in execution order
    pub fn applicable(&self, context: &RequestContext) -> Vec<Arc<dyn ActionProvider>> {
        applicable_providers(&self.registry, self.project.as_ref(), context)
    }

    /// Run an explicit provider list for `context`
    pub async fn run_all(
        &self,
        context: &RequestContext,
        providers: &[Arc<dyn ActionProvider>],
    ) -> OrchestratorResult<Vec<CollectedAction>> {
        self.engine.run_all(context, providers).await
    }

    /// Compute every applicable action for `context`.
    pub async fn get_actions(
        &self,
        context: &RequestContext,
    ) -> OrchestratorResult<Vec<CollectedAction>> {
        let document = context.document();
        let span = request_span(
            &document.path.display().to_string(),
            context.language(),
            &context.mode().to_string(),
        );

        async {
            let budget = self.engine.instrumentation_budget();
            if let Some(sink) = context.instrumentation() {
                observe(budget, "request_started", || sink.request_started(document));
            }

            let started = Instant::now();
            let providers = self.applicable(context);
            let result = self.engine.run_all(context, &providers).await;
            let elapsed = started.elapsed();

            let actions = result.as_ref().map(Vec::len).unwrap_or(0);
            if let Some(sink) = context.instrumentation() {
                observe(budget, "request_finished", || {
                    sink.request_finished(document, actions, elapsed)
                });
            }

            match &result {
                Ok(actions) => debug!(
                    providers = providers.len(),
                    actions = actions.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Code action request completed"
                ),
                Err(e) => debug!(error = %e, "Code action request aborted"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Capabilities of `provider`, computed once and cached
    pub fn capability_of(&self, provider: &dyn ActionProvider) -> Arc<ProviderCapabilities> {
        self.engine.capabilities().capability_of(provider)
    }

    pub fn provider_health(&self, provider: &ProviderId) -> HealthStatus {
        self.engine.health().status(provider)
    }

    /// Re-enable a provider disabled by repeated failures
    pub fn reset_provider_health(&self, provider: &ProviderId) {
        self.engine.health().reset(provider)
    }
}

impl std::fmt::Debug for ActionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionOrchestrator")
            .field("registry", &self.registry)
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mill_action_api::{
        ActionSink, BulkApplyScope, BulkApplySupport, CodeAction, DocumentTarget,
        ProviderDescriptor, ProviderResult, TextSpan,
    };
    use pretty_assertions::assert_eq;

    struct EchoProvider {
        descriptor: ProviderDescriptor,
    }

    #[async_trait]
    impl ActionProvider for EchoProvider {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn compute_actions(
            &self,
            context: &RequestContext,
            sink: &ActionSink,
        ) -> ProviderResult<()> {
            sink.report(
                CodeAction::new(format!("{} action", self.descriptor.name())),
                context.document().span,
            );
            Ok(())
        }
    }

    struct EverythingBulk;

    impl CapabilityAnalyzer for EverythingBulk {
        fn analyze(&self, _provider: &dyn ActionProvider) -> ProviderResult<ProviderCapabilities> {
            Ok(ProviderCapabilities::none()
                .with_bulk_apply(BulkApplySupport::new([BulkApplyScope::Workspace])))
        }
    }

    fn echo(descriptor: ProviderDescriptor) -> Arc<dyn ActionProvider> {
        Arc::new(EchoProvider { descriptor })
    }

    fn context() -> RequestContext {
        RequestContext::new(DocumentTarget::new("src/lib.rs", "rust", TextSpan::new(3, 9)))
    }

    #[tokio::test]
    async fn test_get_actions_end_to_end() {
        let registry = ProviderRegistry::new(vec![
            echo(ProviderDescriptor::new("second").language("rust").after("first")),
            echo(ProviderDescriptor::new("first").language("rust")),
            echo(ProviderDescriptor::new("python").language("python")),
        ]);
        let orchestrator = ActionOrchestrator::new(registry, &EngineConfig::default());

        let results = orchestrator.get_actions(&context()).await.unwrap();
        let titles: Vec<_> = results.iter().map(|c| c.action().title.as_str()).collect();
        assert_eq!(titles, vec!["first action", "second action"]);
        assert!(results.iter().all(|c| c.region() == TextSpan::new(3, 9)));
    }

    #[tokio::test]
    async fn test_custom_capability_analyzer() {
        let registry = ProviderRegistry::new(vec![echo(
            ProviderDescriptor::new("only").language("rust"),
        )]);
        let orchestrator = ActionOrchestrator::new(registry, &EngineConfig::default())
            .with_capability_analyzer(Arc::new(EverythingBulk));

        let results = orchestrator.get_actions(&context()).await.unwrap();
        assert!(results[0].capabilities().supports_bulk_apply());

        let provider = orchestrator.registry().get("only").unwrap();
        assert!(orchestrator.capability_of(&*provider).supports_bulk_apply());
    }

    #[tokio::test]
    async fn test_from_environment_uses_loaded_config() {
        let registry = ProviderRegistry::new(vec![echo(
            ProviderDescriptor::new("only").language("rust"),
        )]);
        let orchestrator = ActionOrchestrator::from_environment(registry).unwrap();

        assert!(tracing::dispatcher::has_been_set());
        assert_eq!(
            orchestrator.engine().provider_timeout(),
            EngineConfig::default().provider_timeout()
        );
        let results = orchestrator.get_actions(&context()).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_health_accessors() {
        let orchestrator =
            ActionOrchestrator::new(ProviderRegistry::default(), &EngineConfig::default());
        let id = ProviderId::new("unknown");
        assert_eq!(orchestrator.provider_health(&id), HealthStatus::Healthy);
        orchestrator.reset_provider_health(&id);
        assert!(orchestrator.get_actions(&context()).await.unwrap().is_empty());
    }
}
