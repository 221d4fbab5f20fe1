//! Request context handed to every provider invocation

use crate::instrumentation::InstrumentationSink;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Byte range inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` lies entirely inside this span
    pub const fn contains(&self, other: &TextSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Priority class a provider can declare and a request can filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    Lowest,
    Low,
    Normal,
    High,
}

impl ActionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPriority::Lowest => "lowest",
            ActionPriority::Low => "low",
            ActionPriority::Normal => "normal",
            ActionPriority::High => "high",
        }
    }
}

impl fmt::Display for ActionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the current request is being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Regular editor or tool request
    #[default]
    Standard,
    /// Restricted interactive session; project-scoped providers never run
    Interactive,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Standard => f.write_str("standard"),
            ExecutionMode::Interactive => f.write_str("interactive"),
        }
    }
}

/// The document location a request targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTarget {
    /// Path of the document
    pub path: PathBuf,
    /// Language tag (e.g. "rust", "typescript")
    pub language: String,
    /// Optional document kind (e.g. "source", "script", "generated")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Identifier of the hosting project, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Span the request is about
    pub span: TextSpan,
}

impl DocumentTarget {
    pub fn new(path: impl Into<PathBuf>, language: impl Into<String>, span: TextSpan) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            kind: None,
            project: None,
            span,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn in_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// File extension without the leading dot
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Free-form options bundle forwarded to providers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionOptions {
    values: Map<String, Value>,
}

impl ActionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Typed lookup; `None` when the key is missing or has the wrong shape
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Map<String, Value>> for ActionOptions {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// Everything a provider gets to see about one request.
///
/// Immutable for the lifetime of the request. Cloning is cheap: the
/// cancellation token and instrumentation sink are shared.
#[derive(Clone)]
pub struct RequestContext {
    document: DocumentTarget,
    priority: Option<ActionPriority>,
    options: ActionOptions,
    mode: ExecutionMode,
    cancellation: CancellationToken,
    instrumentation: Option<Arc<dyn InstrumentationSink>>,
}

impl RequestContext {
    pub fn new(document: DocumentTarget) -> Self {
        Self {
            document,
            priority: None,
            options: ActionOptions::default(),
            mode: ExecutionMode::Standard,
            cancellation: CancellationToken::new(),
            instrumentation: None,
        }
    }

    /// Only run providers declaring this priority
    pub fn with_priority(mut self, priority: ActionPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_instrumentation(mut self, sink: Arc<dyn InstrumentationSink>) -> Self {
        self.instrumentation = Some(sink);
        self
    }

    pub fn document(&self) -> &DocumentTarget {
        &self.document
    }

    pub fn language(&self) -> &str {
        &self.document.language
    }

    pub fn priority(&self) -> Option<ActionPriority> {
        self.priority
    }

    pub fn options(&self) -> &ActionOptions {
        &self.options
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_interactive(&self) -> bool {
        self.mode == ExecutionMode::Interactive
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn instrumentation(&self) -> Option<&Arc<dyn InstrumentationSink>> {
        self.instrumentation.as_ref()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("document", &self.document)
            .field("priority", &self.priority)
            .field("options", &self.options)
            .field("mode", &self.mode)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("instrumented", &self.instrumentation.is_some())
            .finish()
    }
}
