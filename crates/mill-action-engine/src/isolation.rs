//! Isolation boundary around a single provider invocation
//!
//! Errors, panics, timeouts and malformed output all end up as an
//! [`InvocationOutcome`] instead of escaping into the batch. Only request
//! cancellation stops the invocation early without counting as a failure.

use futures::FutureExt;
use mill_action_api::{
    ActionProvider, ActionSink, ProviderError, ProviderOutcome, RequestContext, ResultItem,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// How one isolated invocation ended
#[derive(Debug)]
pub(crate) enum InvocationOutcome {
    /// Finished; every reported action passed validation
    Completed(Vec<ResultItem>),
    /// Returned an error, panicked or reported a malformed action
    Failed(String),
    /// Still running when the soft timeout elapsed
    TimedOut,
    /// Stopped because the request was cancelled
    Cancelled,
    /// Provider gave up on its own with `ProviderError::Cancelled`
    Withdrawn,
}

impl InvocationOutcome {
    /// Outcome as reported to instrumentation sinks
    pub(crate) fn as_provider_outcome(&self) -> ProviderOutcome {
        match self {
            InvocationOutcome::Completed(items) => ProviderOutcome::Completed {
                actions: items.len(),
            },
            InvocationOutcome::Failed(_) => ProviderOutcome::Failed,
            InvocationOutcome::TimedOut => ProviderOutcome::TimedOut,
            InvocationOutcome::Cancelled | InvocationOutcome::Withdrawn => {
                ProviderOutcome::Cancelled
            }
        }
    }

    /// Whether this outcome counts against the provider's health
    pub(crate) fn is_failure(&self) -> bool {
        matches!(
            self,
            InvocationOutcome::Failed(_) | InvocationOutcome::TimedOut
        )
    }
}

/// Invoke `provider` for `context` behind the isolation boundary.
///
/// Anything the provider reported is discarded unless the invocation
/// completes cleanly.
pub(crate) async fn invoke_isolated(
    provider: Arc<dyn ActionProvider>,
    context: Arc<RequestContext>,
    timeout: Duration,
) -> InvocationOutcome {
    let id = provider.descriptor().id().clone();

    if context.is_cancelled() {
        debug!(provider = %id, "Request cancelled before provider started");
        return InvocationOutcome::Cancelled;
    }

    let sink = ActionSink::new(id.clone());
    let call = AssertUnwindSafe(provider.compute_actions(&context, &sink)).catch_unwind();

    let result = tokio::select! {
        biased;
        _ = context.cancellation().cancelled() => None,
        result = tokio::time::timeout(timeout, call) => Some(result),
    };

    // Seal before inspecting so stragglers from spawned threads are dropped.
    let reported = sink.finish();

    let Some(result) = result else {
        debug!(
            provider = %id,
            discarded = reported.len(),
            "Provider stopped by request cancellation"
        );
        return InvocationOutcome::Cancelled;
    };

    match result {
        Err(_) => {
            warn!(
                provider = %id,
                timeout_ms = timeout.as_millis() as u64,
                discarded = reported.len(),
                "Provider timed out"
            );
            InvocationOutcome::TimedOut
        }
        Ok(Err(payload)) => {
            let message = panic_message(payload.as_ref());
            error!(
                provider = %id,
                panic = %message,
                discarded = reported.len(),
                "Provider panicked"
            );
            InvocationOutcome::Failed(format!("panic: {}", message))
        }
        Ok(Ok(Err(ProviderError::Cancelled))) => {
            if context.is_cancelled() {
                InvocationOutcome::Cancelled
            } else {
                debug!(provider = %id, "Provider withdrew without results");
                InvocationOutcome::Withdrawn
            }
        }
        Ok(Ok(Err(e))) => {
            warn!(
                provider = %id,
                error = %e,
                discarded = reported.len(),
                "Provider failed"
            );
            InvocationOutcome::Failed(e.to_string())
        }
        Ok(Ok(Ok(()))) => validate(&id, reported),
    }
}

fn validate(id: &mill_action_api::ProviderId, reported: Vec<ResultItem>) -> InvocationOutcome {
    for item in &reported {
        if let Err(e) = item.action.validate() {
            warn!(
                provider = %id,
                error = %e,
                discarded = reported.len(),
                "Provider reported a malformed action"
            );
            return InvocationOutcome::Failed(e.to_string());
        }
    }
    InvocationOutcome::Completed(reported)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mill_action_api::{
        CancellationToken, CodeAction, DocumentTarget, ProviderDescriptor, ProviderResult,
        TextSpan,
    };

    enum Behavior {
        Report(Vec<&'static str>),
        Error,
        Panic,
        Hang,
        Withdraw,
        ReportThenFail,
    }

    struct ScriptedProvider {
        descriptor: ProviderDescriptor,
        behavior: Behavior,
    }

    #[async_trait]
    impl ActionProvider for ScriptedProvider {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn compute_actions(
            &self,
            _context: &RequestContext,
            sink: &ActionSink,
        ) -> ProviderResult<()> {
            match &self.behavior {
                Behavior::Report(titles) => {
                    for title in titles {
                        sink.report(CodeAction::new(*title), TextSpan::new(0, 1));
                    }
                    Ok(())
                }
                Behavior::Error => Err(ProviderError::failed("no analysis available")),
                Behavior::Panic => panic!("provider bug"),
                Behavior::Hang => {
                    futures::future::pending::<()>().await;
                    Ok(())
                }
                Behavior::Withdraw => Err(ProviderError::Cancelled),
                Behavior::ReportThenFail => {
                    sink.report(CodeAction::new("partial"), TextSpan::default());
                    Err(ProviderError::internal("gave up halfway"))
                }
            }
        }
    }

    fn provider(behavior: Behavior) -> Arc<dyn ActionProvider> {
        Arc::new(ScriptedProvider {
            descriptor: ProviderDescriptor::new("scripted").language("rust"),
            behavior,
        })
    }

    fn context() -> Arc<RequestContext> {
        Arc::new(RequestContext::new(DocumentTarget::new(
            "lib.rs",
            "rust",
            TextSpan::new(0, 1),
        )))
    }

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_completed_keeps_report_order() {
        let outcome = invoke_isolated(provider(Behavior::Report(vec!["a", "b"])), context(), TIMEOUT).await;
        match outcome {
            InvocationOutcome::Completed(items) => {
                let titles: Vec<_> = items.iter().map(|i| i.action.title.as_str()).collect();
                assert_eq!(titles, vec!["a", "b"]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_is_contained() {
        let outcome = invoke_isolated(provider(Behavior::Error), context(), TIMEOUT).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_failure_discards_partial_reports() {
        let outcome = invoke_isolated(provider(Behavior::ReportThenFail), context(), TIMEOUT).await;
        assert!(matches!(outcome, InvocationOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let outcome = invoke_isolated(provider(Behavior::Panic), context(), TIMEOUT).await;
        match outcome {
            InvocationOutcome::Failed(message) => assert!(message.contains("provider bug")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hang_times_out() {
        let outcome =
            invoke_isolated(provider(Behavior::Hang), context(), Duration::from_millis(20)).await;
        assert!(matches!(outcome, InvocationOutcome::TimedOut));
        assert_eq!(outcome.as_provider_outcome(), ProviderOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_malformed_action_is_a_failure() {
        let outcome = invoke_isolated(provider(Behavior::Report(vec!["ok", ""])), context(), TIMEOUT).await;
        assert!(matches!(outcome, InvocationOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_withdrawal_is_not_a_failure() {
        let outcome = invoke_isolated(provider(Behavior::Withdraw), context(), TIMEOUT).await;
        assert!(matches!(outcome, InvocationOutcome::Withdrawn));
        assert!(!outcome.is_failure());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = Arc::new(
            RequestContext::new(DocumentTarget::new("lib.rs", "rust", TextSpan::default()))
                .with_cancellation(token),
        );
        let outcome = invoke_isolated(provider(Behavior::Report(vec!["a"])), ctx, TIMEOUT).await;
        assert!(matches!(outcome, InvocationOutcome::Cancelled));
        assert!(!outcome.is_failure());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_hanging_provider() {
        let token = CancellationToken::new();
        let ctx = Arc::new(
            RequestContext::new(DocumentTarget::new("lib.rs", "rust", TextSpan::default()))
                .with_cancellation(token.clone()),
        );
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let outcome =
            invoke_isolated(provider(Behavior::Hang), ctx, Duration::from_secs(5)).await;
        trigger.await.unwrap();
        assert!(matches!(outcome, InvocationOutcome::Cancelled));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }
}
