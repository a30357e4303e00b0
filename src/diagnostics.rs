//! Positioned diagnostics produced by the feature pass.
//!
//! Diagnostics are collected, never thrown. A member that fails extraction is
//! reported and dropped; its siblings are still processed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::syntax::span::{LineIndex, Span};

/// Default domain for diagnostic identifiers.
pub const DEFAULT_DOMAIN: &str = "flex.macros.feature";

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
            Severity::Note => f.write_str("note"),
        }
    }
}

/// Everything the pass can complain about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// The feature or presentation attribute is attached to something other
    /// than a struct.
    NotAStruct,
    /// A binding pattern is not a simple name.
    NotAnIdentifier,
    /// A binding has no explicit type.
    TypeAnnotationMissing,
    /// A fetched property is not an array.
    UnsupportedType,
    /// The fetched attribute is attached to something other than a property.
    NotAProperty,
    /// `@Presentation` without a feature type argument.
    FeatureArgumentMissing,
    /// An action takes a variadic parameter, which Swift cannot forward.
    VariadicParameter,
}

impl DiagnosticKind {
    /// Stable key used in the message identifier.
    pub fn key(self) -> &'static str {
        match self {
            DiagnosticKind::NotAStruct => "notAStruct",
            DiagnosticKind::NotAnIdentifier => "notAnIdentifier",
            DiagnosticKind::TypeAnnotationMissing => "typeAnnotationMissing",
            DiagnosticKind::UnsupportedType => "unsupportedType",
            DiagnosticKind::NotAProperty => "notAProperty",
            DiagnosticKind::FeatureArgumentMissing => "featureArgumentMissing",
            DiagnosticKind::VariadicParameter => "variadicParameter",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            DiagnosticKind::NotAStruct => "The attribute can only be applied to a struct",
            DiagnosticKind::NotAnIdentifier => "Identifier expected",
            DiagnosticKind::TypeAnnotationMissing => "Type annotation missing",
            DiagnosticKind::UnsupportedType => {
                "Type not supported. Currently only arrays of PersistentModel are supported"
            }
            DiagnosticKind::NotAProperty => "The attribute can only be applied to a property",
            DiagnosticKind::FeatureArgumentMissing => {
                "The attribute requires the feature type as its generic argument"
            }
            DiagnosticKind::VariadicParameter => {
                "Actions with variadic parameters cannot be forwarded"
            }
        }
    }

    /// All current kinds are errors.
    pub fn severity(self) -> Severity {
        Severity::Error
    }
}

/// `domain.key`, e.g. `flex.macros.feature.typeAnnotationMissing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId {
    pub domain: String,
    pub key: String,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.key)
    }
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A single reported problem, attached to the offending source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub id: MessageId,
    pub message: String,
    pub severity: Severity,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span, domain: &str) -> Self {
        Self {
            kind,
            id: MessageId {
                domain: domain.to_string(),
                key: kind.key().to_string(),
            },
            message: kind.message().to_string(),
            severity: kind.severity(),
            span,
        }
    }

    /// Compiler-style rendering:
    ///
    /// ```text
    /// Counter.swift:4:17: error: Type annotation missing [flex.macros.feature.typeAnnotationMissing]
    ///     @Outlet var count = 0
    ///                 ^
    /// ```
    pub fn render(&self, source: &str, path: &str) -> String {
        let lines = LineIndex::new(source);
        let position = lines.position(self.span.start);
        let line = lines.line_text(position.line);
        let marker_width = Span::new(self.span.start, self.span.end.min(source.len()))
            .text(source)
            .lines()
            .next()
            .map(|first| first.chars().count())
            .unwrap_or(0)
            .max(1);
        let caret = format!(
            "{}^{}",
            " ".repeat(position.column - 1),
            "~".repeat(marker_width - 1)
        );
        format!(
            "{path}:{position}: {}: {} [{}]\n{line}\n{caret}",
            self.severity, self.message, self.id
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.severity, self.message, self.id)
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Accumulates diagnostics for one expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    domain: String,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            items: Vec::new(),
        }
    }

    pub fn report(&mut self, span: Span, kind: DiagnosticKind) {
        tracing::debug!(key = kind.key(), start = span.start, "diagnostic reported");
        self.items.push(Diagnostic::new(kind, span, &self.domain));
    }

    /// Append diagnostics from another entry point, skipping ones already
    /// present (same identifier and span).
    pub fn merge(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in other {
            let duplicate = self
                .items
                .iter()
                .any(|d| d.id == diagnostic.id && d.span == diagnostic.span);
            if !duplicate {
                self.items.push(diagnostic);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics in source order; reports at the same position keep their
    /// reporting order.
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.items.sort_by_key(|d| (d.span.start, d.span.end));
        self.items
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_id_format() {
        let d = Diagnostic::new(DiagnosticKind::TypeAnnotationMissing, Span::new(0, 1), DEFAULT_DOMAIN);
        assert_eq!(d.id.to_string(), "flex.macros.feature.typeAnnotationMissing");
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "Type annotation missing");
    }

    #[test]
    fn test_all_kinds_are_errors() {
        for kind in [
            DiagnosticKind::NotAStruct,
            DiagnosticKind::NotAnIdentifier,
            DiagnosticKind::TypeAnnotationMissing,
            DiagnosticKind::UnsupportedType,
            DiagnosticKind::NotAProperty,
            DiagnosticKind::FeatureArgumentMissing,
            DiagnosticKind::VariadicParameter,
        ] {
            assert_eq!(kind.severity(), Severity::Error, "{kind:?}");
        }
    }

    #[test]
    fn test_merge_skips_duplicates() {
        let mut a = Diagnostics::new(DEFAULT_DOMAIN);
        a.report(Span::new(4, 9), DiagnosticKind::TypeAnnotationMissing);

        let mut b = Diagnostics::new(DEFAULT_DOMAIN);
        b.report(Span::new(4, 9), DiagnosticKind::TypeAnnotationMissing);
        b.report(Span::new(1, 2), DiagnosticKind::NotAnIdentifier);

        a.merge(b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_sorted_by_position() {
        let mut d = Diagnostics::new(DEFAULT_DOMAIN);
        d.report(Span::new(20, 25), DiagnosticKind::NotAnIdentifier);
        d.report(Span::new(3, 5), DiagnosticKind::TypeAnnotationMissing);
        let sorted = d.into_sorted();
        assert_eq!(sorted[0].span.start, 3);
        assert_eq!(sorted[1].span.start, 20);
    }

    #[test]
    fn test_render() {
        let source = "struct S {\n    @Outlet var count = 0\n}";
        let start = source.find("count").unwrap();
        let d = Diagnostic::new(
            DiagnosticKind::TypeAnnotationMissing,
            Span::new(start, start + 5),
            DEFAULT_DOMAIN,
        );
        assert_eq!(
            d.render(source, "S.swift"),
            "S.swift:2:17: error: Type annotation missing [flex.macros.feature.typeAnnotationMissing]\n    @Outlet var count = 0\n                ^~~~~"
        );
    }

    #[test]
    fn test_custom_domain() {
        let mut d = Diagnostics::new("acme.codegen");
        d.report(Span::default(), DiagnosticKind::NotAStruct);
        let items = d.into_vec();
        assert_eq!(items[0].id.to_string(), "acme.codegen.notAStruct");
    }

    #[test]
    fn test_serializes_kind_as_key() {
        let json = serde_json::to_string(&DiagnosticKind::NotAProperty).unwrap();
        assert_eq!(json, "\"notAProperty\"");
    }
}
