use async_trait::async_trait;
use mill_action_api::{
    mill_action_provider, ActionProvider, ActionSink, CodeAction, DocumentTarget,
    ProviderDescriptor, ProviderResult, RequestContext, TextSpan,
};
use mill_action_config::EngineConfig;
use mill_action_engine::{ActionOrchestrator, ProviderRegistry};
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct StaticProvider {
    descriptor: ProviderDescriptor,
}

#[async_trait]
impl ActionProvider for StaticProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn compute_actions(
        &self,
        context: &RequestContext,
        sink: &ActionSink,
    ) -> ProviderResult<()> {
        sink.report(
            CodeAction::new(format!("{} fix", self.descriptor.name())).with_kind("quickfix"),
            context.document().span,
        );
        Ok(())
    }
}

fn organize_imports() -> Arc<dyn ActionProvider> {
    Arc::new(StaticProvider {
        descriptor: ProviderDescriptor::new("organize-imports").language("typescript"),
    })
}

fn add_missing_import() -> Arc<dyn ActionProvider> {
    Arc::new(StaticProvider {
        descriptor: ProviderDescriptor::new("add-missing-import")
            .language("typescript")
            .before("organize-imports"),
    })
}

fn mislabelled() -> Arc<dyn ActionProvider> {
    Arc::new(StaticProvider {
        descriptor: ProviderDescriptor::new("actual-name").language("typescript"),
    })
}

mill_action_provider! {
    name: "organize-imports",
    factory: organize_imports,
}

mill_action_provider! {
    name: "add-missing-import",
    factory: add_missing_import,
}

mill_action_provider! {
    name: "registered-name",
    factory: mislabelled,
}

#[test]
fn test_inventory_registry_is_sorted_by_name() {
    let registry = ProviderRegistry::from_inventory();
    assert_eq!(
        registry.provider_names(),
        vec!["add-missing-import", "organize-imports"]
    );
}

#[tokio::test]
async fn test_inventory_providers_answer_requests() {
    let orchestrator =
        ActionOrchestrator::new(ProviderRegistry::from_inventory(), &EngineConfig::default());
    let context = RequestContext::new(DocumentTarget::new(
        "src/index.ts",
        "typescript",
        TextSpan::new(0, 12),
    ));

    let results = orchestrator.get_actions(&context).await.unwrap();
    let titles: Vec<&str> = results.iter().map(|c| c.action().title.as_str()).collect();
    assert_eq!(titles, vec!["add-missing-import fix", "organize-imports fix"]);
    assert!(results
        .iter()
        .all(|c| c.action().kind.as_deref() == Some("quickfix")));
}
