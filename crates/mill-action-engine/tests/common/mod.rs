#![allow(dead_code)]

use async_trait::async_trait;
use mill_action_api::{
    ActionProvider, ActionSink, CodeAction, DocumentTarget, InstrumentationSink,
    ProviderDescriptor, ProviderError, ProviderId, ProviderOutcome, ProviderResult,
    RequestContext, TextSpan,
};
use mill_action_engine::CollectedAction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    Error,
    Panic,
    Hang,
    Malformed,
}

/// Configurable provider for end-to-end scenarios
pub struct TestProvider {
    descriptor: ProviderDescriptor,
    delay: Duration,
    titles: Vec<String>,
    failure: Failure,
    from_thread: bool,
    calls: AtomicUsize,
}

impl TestProvider {
    pub fn new(descriptor: ProviderDescriptor) -> Self {
        Self {
            descriptor,
            delay: Duration::ZERO,
            titles: Vec::new(),
            failure: Failure::None,
            from_thread: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn reports<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.titles = titles.into_iter().map(Into::into).collect();
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = failure;
        self
    }

    /// Report from a spawned OS thread instead of the calling task
    pub fn from_thread(mut self) -> Self {
        self.from_thread = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ActionProvider for TestProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn compute_actions(
        &self,
        context: &RequestContext,
        sink: &ActionSink,
    ) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.failure {
            Failure::Error => return Err(ProviderError::failed("scripted failure")),
            Failure::Panic => panic!("scripted panic in {}", self.descriptor.name()),
            Failure::Hang => {
                futures::future::pending::<()>().await;
            }
            Failure::Malformed => {
                sink.report(CodeAction::new(""), context.document().span);
                return Ok(());
            }
            Failure::None => {}
        }

        let span = context.document().span;
        if self.from_thread {
            let titles = self.titles.clone();
            let sink = sink.clone();
            let handle = std::thread::spawn(move || {
                for title in titles {
                    sink.report(CodeAction::new(title), span);
                }
            });
            handle
                .join()
                .map_err(|_| ProviderError::internal("reporting thread panicked"))?;
        } else {
            for title in &self.titles {
                sink.report(CodeAction::new(title.clone()), span);
            }
        }
        Ok(())
    }
}

/// Instrumentation sink that records events and can be made slow
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<String>>,
    pub delay: Duration,
}

impl RecordingSink {
    pub fn slow(delay: Duration) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            delay,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn record(&self, event: String) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.events.lock().push(event);
    }
}

impl InstrumentationSink for RecordingSink {
    fn request_started(&self, document: &DocumentTarget) {
        self.record(format!("request_started:{}", document.path.display()));
    }

    fn request_finished(&self, _document: &DocumentTarget, actions: usize, _elapsed: Duration) {
        self.record(format!("request_finished:{}", actions));
    }

    fn provider_started(&self, provider: &ProviderId) {
        self.record(format!("provider_started:{}", provider));
    }

    fn provider_finished(&self, provider: &ProviderId, outcome: ProviderOutcome, _elapsed: Duration) {
        let outcome = match outcome {
            ProviderOutcome::Completed { actions } => format!("completed({})", actions),
            ProviderOutcome::Failed => "failed".to_string(),
            ProviderOutcome::TimedOut => "timed_out".to_string(),
            ProviderOutcome::Cancelled => "cancelled".to_string(),
        };
        self.record(format!("provider_finished:{}:{}", provider, outcome));
    }
}

pub fn rust_document() -> DocumentTarget {
    DocumentTarget::new("src/lib.rs", "rust", TextSpan::new(10, 20))
}

pub fn titles(results: &[CollectedAction]) -> Vec<String> {
    results.iter().map(|c| c.action().title.clone()).collect()
}

pub fn providers(list: &[&Arc<TestProvider>]) -> Vec<Arc<dyn ActionProvider>> {
    list.iter()
        .map(|provider| Arc::clone(*provider) as Arc<dyn ActionProvider>)
        .collect()
}
