//! Provider descriptors
//!
//! A descriptor is the only thing the engine inspects about a provider: its
//! identity, where it applies, how it orders against its siblings and which
//! priority class it belongs to.

use crate::context::{ActionPriority, DocumentTarget};
use std::fmt;
use std::sync::Arc;

/// Provider identity, cheap to clone and hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(Arc<str>);

impl ProviderId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ProviderId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Static description of a provider
///
/// Built once with the builder methods and never mutated afterwards.
///
/// # Example
///
/// ```
/// use mill_action_api::{ActionPriority, ProviderDescriptor};
///
/// let descriptor = ProviderDescriptor::new("add-missing-import")
///     .language("rust")
///     .extension("rs")
///     .after("remove-unused-import")
///     .priority(ActionPriority::High);
///
/// assert!(descriptor.handles_language("rust"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    id: ProviderId,
    languages: Vec<String>,
    extensions: Vec<String>,
    document_kinds: Vec<String>,
    after: Vec<ProviderId>,
    before: Vec<ProviderId>,
    priority: Option<ActionPriority>,
}

impl ProviderDescriptor {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            id: ProviderId::new(name),
            languages: Vec::new(),
            extensions: Vec::new(),
            document_kinds: Vec::new(),
            after: Vec::new(),
            before: Vec::new(),
            priority: None,
        }
    }

    /// Declare a language this provider contributes to
    pub fn language(mut self, language: impl Into<String>) -> Self {
        push_unique(&mut self.languages, language.into());
        self
    }

    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for language in languages {
            push_unique(&mut self.languages, language.into());
        }
        self
    }

    /// Restrict the provider to documents with this extension.
    ///
    /// Stored lowercase without the leading dot.
    pub fn extension(mut self, extension: impl AsRef<str>) -> Self {
        push_unique(&mut self.extensions, normalize_extension(extension.as_ref()));
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for extension in extensions {
            push_unique(&mut self.extensions, normalize_extension(extension.as_ref()));
        }
        self
    }

    /// Restrict the provider to documents of this kind
    pub fn document_kind(mut self, kind: impl Into<String>) -> Self {
        push_unique(&mut self.document_kinds, kind.into());
        self
    }

    /// Run after the named provider
    pub fn after(mut self, name: impl AsRef<str>) -> Self {
        let id = ProviderId::new(name);
        if !self.after.contains(&id) {
            self.after.push(id);
        }
        self
    }

    /// Run before the named provider
    pub fn before(mut self, name: impl AsRef<str>) -> Self {
        let id = ProviderId::new(name);
        if !self.before.contains(&id) {
            self.before.push(id);
        }
        self
    }

    pub fn priority(mut self, priority: ActionPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn id(&self) -> &ProviderId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    pub fn declared_languages(&self) -> &[String] {
        &self.languages
    }

    pub fn declared_extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn declared_document_kinds(&self) -> &[String] {
        &self.document_kinds
    }

    pub fn runs_after(&self) -> &[ProviderId] {
        &self.after
    }

    pub fn runs_before(&self) -> &[ProviderId] {
        &self.before
    }

    pub fn declared_priority(&self) -> Option<ActionPriority> {
        self.priority
    }

    pub fn handles_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }

    pub fn handles_extension(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        self.extensions.iter().any(|e| *e == extension)
    }

    /// Whether the declared extension and document-kind constraints accept
    /// `document`. Empty constraints accept everything.
    pub fn matches_document(&self, document: &DocumentTarget) -> bool {
        let extension_ok = self.extensions.is_empty()
            || document
                .extension()
                .is_some_and(|extension| self.handles_extension(extension));

        let kind_ok = self.document_kinds.is_empty()
            || document
                .kind
                .as_deref()
                .is_some_and(|kind| self.document_kinds.iter().any(|k| k == kind));

        extension_ok && kind_ok
    }

    /// Whether this provider runs under the given priority filter
    pub fn matches_priority(&self, filter: Option<ActionPriority>) -> bool {
        match filter {
            None => true,
            Some(requested) => self.priority == Some(requested),
        }
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TextSpan;

    fn doc(path: &str) -> DocumentTarget {
        DocumentTarget::new(path, "rust", TextSpan::default())
    }

    #[test]
    fn test_unconstrained_descriptor_matches_everything() {
        let descriptor = ProviderDescriptor::new("any").language("rust");
        assert!(descriptor.matches_document(&doc("src/lib.rs")));
        assert!(descriptor.matches_document(&doc("Makefile")));
        assert!(descriptor.matches_document(&doc("build.rs").with_kind("script")));
    }

    #[test]
    fn test_extension_constraint() {
        let descriptor = ProviderDescriptor::new("rs-only").extension(".RS");
        assert_eq!(descriptor.declared_extensions(), ["rs"]);
        assert!(descriptor.matches_document(&doc("src/lib.rs")));
        assert!(descriptor.matches_document(&doc("src/LIB.Rs")));
        assert!(!descriptor.matches_document(&doc("src/lib.ts")));
        assert!(!descriptor.matches_document(&doc("Makefile")));
    }

    #[test]
    fn test_document_kind_constraint() {
        let descriptor = ProviderDescriptor::new("scripts").document_kind("script");
        assert!(descriptor.matches_document(&doc("build.rs").with_kind("script")));
        assert!(!descriptor.matches_document(&doc("build.rs").with_kind("source")));
        assert!(!descriptor.matches_document(&doc("build.rs")));
    }

    #[test]
    fn test_both_constraints_must_hold() {
        let descriptor = ProviderDescriptor::new("both")
            .extension("rs")
            .document_kind("generated");
        assert!(descriptor.matches_document(&doc("out.rs").with_kind("generated")));
        assert!(!descriptor.matches_document(&doc("out.ts").with_kind("generated")));
        assert!(!descriptor.matches_document(&doc("out.rs").with_kind("source")));
    }

    #[test]
    fn test_priority_filter() {
        let high = ProviderDescriptor::new("high").priority(ActionPriority::High);
        let none = ProviderDescriptor::new("none");
        assert!(high.matches_priority(None));
        assert!(high.matches_priority(Some(ActionPriority::High)));
        assert!(!high.matches_priority(Some(ActionPriority::Low)));
        assert!(none.matches_priority(None));
        assert!(!none.matches_priority(Some(ActionPriority::Normal)));
    }

    #[test]
    fn test_builder_deduplicates() {
        let descriptor = ProviderDescriptor::new("dup")
            .languages(["rust", "rust", "toml"])
            .after("a")
            .after("a")
            .before("b");
        assert_eq!(descriptor.declared_languages(), ["rust", "toml"]);
        assert_eq!(descriptor.runs_after(), [ProviderId::new("a")]);
        assert_eq!(descriptor.runs_before(), [ProviderId::new("b")]);
    }
}
