//! Whole-file expansion.
//!
//! Parses a source file, expands every attached macro and splices the
//! results back into the original text. Text outside the edits is copied
//! byte for byte, so comments and formatting survive.
//!
//! Edits, per expanded declaration:
//!
//! - expanded macro attributes and member markers are removed (the whole
//!   line when the attribute stands alone on it);
//! - accessor blocks replace everything after a property's type annotation;
//! - members are inserted before the closing brace of the struct;
//! - peers and extensions follow the declaration, member peers follow their
//!   member.

use tracing::{debug, trace, warn};

use crate::config::ExpansionConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::expand::{expand_role, MacroRegistry, MacroRole, SynthesizedDecl};
use crate::syntax::ir::{Attribute, Decl, StructDecl};
use crate::syntax::parser::{parse_source, ParseError};
use crate::syntax::span::Span;
use crate::synth::writer::indent_lines;

const INDENT: &str = "    ";

/// Expanded source text and everything reported while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSource {
    pub text: String,
    /// Sorted by source position, duplicates removed.
    pub diagnostics: Vec<Diagnostic>,
}

impl ExpandedSource {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// All diagnostics rendered compiler-style against the original source.
    pub fn render_diagnostics(&self, original: &str, path: &str) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.render(original, path))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Expand every macro in `source`.
///
/// Only syntax errors fail; problems with the annotated code itself come
/// back as diagnostics next to whatever could still be generated.
pub fn expand_source(source: &str, config: &ExpansionConfig) -> Result<ExpandedSource, ParseError> {
    let file = parse_source(source)?;
    let registry = MacroRegistry::from_config(config);

    let mut expander = SourceExpander {
        source,
        config,
        registry: &registry,
        edits: Vec::new(),
        diagnostics: Diagnostics::new(config.diagnostic_domain.as_str()),
        scope: Vec::new(),
        file_level_end: 0,
    };

    for decl in &file.decls {
        expander.file_level_end = decl.span().end;
        expander.expand_decl(decl, "");
    }

    let edit_count = expander.edits.len();
    let SourceExpander {
        edits, diagnostics, ..
    } = expander;
    let text = apply_edits(source, edits);

    debug!(edits = edit_count, diagnostics = diagnostics.len(), "expanded source");

    Ok(ExpandedSource {
        text,
        diagnostics: diagnostics.into_sorted(),
    })
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Replace `span` with `text`. Zero-width spans are insertions.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    span: Span,
    text: String,
}

/// Apply non-overlapping edits. Insertions at the same offset keep the order
/// they were recorded in.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| e.span.start);

    let mut out = String::with_capacity(source.len() * 2);
    let mut cursor = 0;
    for edit in edits {
        if edit.span.start < cursor {
            warn!(
                start = edit.span.start,
                end = edit.span.end,
                "dropping overlapping edit"
            );
            continue;
        }
        trace!(start = edit.span.start, end = edit.span.end, "applying edit");
        out.push_str(Span::new(cursor, edit.span.start).text(source));
        out.push_str(&edit.text);
        cursor = cursor.max(edit.span.end);
    }
    out.push_str(Span::new(cursor, source.len()).text(source));
    out
}

struct SourceExpander<'a> {
    source: &'a str,
    config: &'a ExpansionConfig,
    registry: &'a MacroRegistry,
    edits: Vec<Edit>,
    diagnostics: Diagnostics,
    /// Names of the types enclosing the declaration being expanded.
    scope: Vec<String>,
    /// End of the file-level declaration being expanded.
    file_level_end: usize,
}

impl SourceExpander<'_> {
    fn expand_decl(&mut self, decl: &Decl, indent: &str) {
        let expanded = self.run_roles(decl);

        // Accessors of a struct's own expansion rewrite its members.
        let mut accessor_indent = indent.to_string();
        match decl {
            Decl::Struct(s) => {
                let member_indent = self.member_indent(&s.members, indent);
                self.scope.push(s.name.text.clone());
                for member in &s.members {
                    self.expand_member(member, &member_indent);
                }
                self.scope.pop();
                let members: Vec<&SynthesizedDecl> = expanded
                    .iter()
                    .filter(|d| d.role == MacroRole::Member)
                    .collect();
                self.insert_members(s, &members, &member_indent);
                accessor_indent = member_indent;
            }
            Decl::Nominal(n) => {
                let member_indent = self.member_indent(&n.members, indent);
                self.scope.push(n.name.text.clone());
                for member in &n.members {
                    self.expand_member(member, &member_indent);
                }
                self.scope.pop();
            }
            Decl::Variable(_) | Decl::Function(_) | Decl::Other(_) => {}
        }

        self.strip_attributes(decl.attributes(), false);
        self.apply_accessors(&expanded, &accessor_indent);
        self.insert_after(decl, &expanded, indent);
    }

    /// Members get their own macros (`@Fetched`); markers are stripped.
    /// Nested types expand like top-level ones.
    fn expand_member(&mut self, member: &Decl, indent: &str) {
        if matches!(member, Decl::Struct(_) | Decl::Nominal(_)) {
            self.expand_decl(member, indent);
            return;
        }
        let expanded = self.run_roles(member);
        self.strip_attributes(member.attributes(), true);
        self.apply_accessors(&expanded, indent);
        self.insert_after(member, &expanded, indent);
    }

    fn run_roles(&mut self, decl: &Decl) -> Vec<SynthesizedDecl> {
        let mut decls = Vec::new();
        for role in MacroRole::ORDER {
            let expansion = expand_role(self.registry, decl, role, self.config);
            decls.extend(expansion.decls);
            self.diagnostics.merge(expansion.diagnostics);
        }
        decls
    }

    fn edit(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(Edit {
            span,
            text: text.into(),
        });
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Remove expanded macro attributes, plus member markers when `member`.
    fn strip_attributes(&mut self, attributes: &[Attribute], member: bool) {
        let config = self.config;
        let markers = config.markers.member_markers();
        for attribute in attributes {
            let is_macro = self.registry.contains(&attribute.name);
            let is_marker = member && markers.contains(&attribute.name.as_str());
            if is_macro || is_marker {
                let span = self.removal_span(attribute.span);
                self.edit(span, "");
            }
        }
    }

    /// The attribute with its trailing spaces, or its whole line if nothing
    /// else is on it.
    fn removal_span(&self, span: Span) -> Span {
        let bytes = self.source.as_bytes();

        let mut line_start = span.start;
        while line_start > 0 && matches!(bytes[line_start - 1], b' ' | b'\t') {
            line_start -= 1;
        }
        let alone_before = line_start == 0 || bytes[line_start - 1] == b'\n';

        let mut end = span.end;
        while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
            end += 1;
        }
        let at_line_end = end >= bytes.len() || matches!(bytes[end], b'\n' | b'\r');

        match (alone_before, at_line_end) {
            (true, true) => {
                let mut line_end = end;
                if bytes.get(line_end) == Some(&b'\r') {
                    line_end += 1;
                }
                if bytes.get(line_end) == Some(&b'\n') {
                    line_end += 1;
                }
                Span::new(line_start, line_end)
            }
            // `@MainActor @Feature\n`: drop the space before instead.
            (false, true) => Span::new(self.trim_back(span.start), end),
            _ => Span::new(span.start, end),
        }
    }

    fn trim_back(&self, mut offset: usize) -> usize {
        let bytes = self.source.as_bytes();
        while offset > 0 && matches!(bytes[offset - 1], b' ' | b'\t') {
            offset -= 1;
        }
        offset
    }

    // -----------------------------------------------------------------------
    // Accessors, members, peers, extensions
    // -----------------------------------------------------------------------

    fn apply_accessors(&mut self, expanded: &[SynthesizedDecl], indent: &str) {
        for accessor in expanded.iter().filter(|d| d.role == MacroRole::Accessor) {
            let Some(anchor) = accessor.anchor else {
                continue;
            };
            let block = indent_lines(&accessor.source, indent);
            self.edit(anchor, format!(" {}", block.trim_start()));
        }
    }

    fn insert_members(&mut self, s: &StructDecl, members: &[&SynthesizedDecl], indent: &str) {
        if members.is_empty() {
            return;
        }

        let close = s.body.end.saturating_sub(1);
        let insert_at = self.trim_back_whitespace(close);
        let body_is_empty = insert_at <= s.body.start + 1;

        let mut text = String::new();
        let mut previous: Option<&str> = None;
        for member in members {
            let separator = match previous {
                None if body_is_empty => "\n",
                Some(prev) if same_group(prev, &member.source) => "\n",
                _ => "\n\n",
            };
            text.push_str(separator);
            text.push_str(&indent_lines(&member.source, indent));
            previous = Some(&member.source);
        }

        // `struct S { }`: the closing brace moves to its own line.
        let gap = Span::new(insert_at, close);
        if gap.text(self.source).contains('\n') {
            self.edit(Span::new(insert_at, insert_at), text);
        } else {
            text.push('\n');
            text.push_str(&self.line_indent(s.body.start));
            self.edit(gap, text);
        }
    }

    /// Peers and extensions without an anchor follow the declaration; member
    /// peers follow their member. Extensions of a nested type go to file
    /// level, after the outermost enclosing declaration, with a qualified
    /// type name.
    fn insert_after(&mut self, decl: &Decl, expanded: &[SynthesizedDecl], indent: &str) {
        let placed = expanded.iter().filter(|d| {
            matches!(d.role, MacroRole::Peer | MacroRole::Extension)
        });
        for generated in placed {
            if generated.role == MacroRole::Extension && !self.scope.is_empty() {
                let at = self.file_level_end;
                let text = format!("\n\n{}", self.qualify_extension(&generated.source));
                self.edit(Span::new(at, at), text);
                continue;
            }
            let at = generated.anchor.map_or(decl.span().end, |a| a.end);
            let text = format!("\n\n{}", indent_lines(&generated.source, indent));
            self.edit(Span::new(at, at), text);
        }
    }

    /// `extension Inner: P {}` inside `enum Outer` becomes
    /// `extension Outer.Inner: P {}`.
    fn qualify_extension(&self, source: &str) -> String {
        match source.strip_prefix("extension ") {
            Some(rest) => format!("extension {}.{rest}", self.scope.join(".")),
            None => source.to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Layout helpers
    // -----------------------------------------------------------------------

    fn trim_back_whitespace(&self, mut offset: usize) -> usize {
        let bytes = self.source.as_bytes();
        while offset > 0 && bytes[offset - 1].is_ascii_whitespace() {
            offset -= 1;
        }
        offset
    }

    /// Leading whitespace of the line containing `offset`.
    fn line_indent(&self, offset: usize) -> String {
        let line_start = self.source[..offset.min(self.source.len())]
            .rfind('\n')
            .map_or(0, |i| i + 1);
        self.source[line_start..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }

    /// Indentation of a body's members: that of the first member, or one
    /// level deeper than the enclosing declaration.
    fn member_indent(&self, members: &[Decl], indent: &str) -> String {
        match members.first() {
            Some(first) => self.line_indent(first.span().start),
            None => format!("{indent}{INDENT}"),
        }
    }
}

/// Consecutive one-line declarations with the same leading keyword stay
/// together, e.g. a run of typealiases.
fn same_group(previous: &str, next: &str) -> bool {
    let single_line = |s: &str| !s.contains('\n');
    let keyword = |s: &str| s.split_whitespace().next().map(str::to_string);
    single_line(previous) && single_line(next) && keyword(previous) == keyword(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use pretty_assertions::assert_eq;

    fn expand(source: &str) -> ExpandedSource {
        expand_source(source, &ExpansionConfig::default()).unwrap()
    }

    // ── Edits ────────────────────────────────────────────────────────

    #[test]
    fn test_apply_edits_in_order() {
        let edits = vec![
            Edit { span: Span::new(5, 5), text: "!".into() },
            Edit { span: Span::new(0, 1), text: "J".into() },
            Edit { span: Span::new(5, 5), text: "?".into() },
        ];
        assert_eq!(apply_edits("hello", edits), "Jello!?");
    }

    #[test]
    fn test_overlapping_edit_is_dropped() {
        let edits = vec![
            Edit { span: Span::new(0, 4), text: "X".into() },
            Edit { span: Span::new(2, 3), text: "Y".into() },
        ];
        assert_eq!(apply_edits("abcdef", edits), "Xef");
    }

    #[test]
    fn test_untouched_source_is_identical() {
        let source = "import SwiftUI\n\n// nothing to expand\nstruct S {\n    var x = 1\n}\n";
        let result = expand(source);
        assert_eq!(result.text, source);
        assert!(result.diagnostics.is_empty());
    }

    // ── Attributes ───────────────────────────────────────────────────

    #[test]
    fn test_attribute_on_own_line_removes_line() {
        let result = expand("@Feature\nstruct S {\n}\n");
        assert!(result.text.starts_with("struct S {\n"));
    }

    #[test]
    fn test_attribute_after_other_attribute() {
        let result = expand("@MainActor @Feature\nstruct S {\n}\n");
        assert!(result.text.starts_with("@MainActor\nstruct S {\n"));
    }

    #[test]
    fn test_inline_marker_removed() {
        let result = expand("@Feature\nstruct S {\n    @Outlet let x: Int = 1\n}\n");
        assert!(result.text.contains("\n    let x: Int = 1\n"));
        assert!(!result.text.contains("@Outlet"));
    }

    #[test]
    fn test_markers_outside_features_are_stripped() {
        let result = expand("struct S {\n    @Action\n    func f() {}\n}\n");
        assert_eq!(result.text, "struct S {\n    func f() {}\n}\n");
    }

    // ── Fetched ──────────────────────────────────────────────────────

    #[test]
    fn test_fetched_property() {
        let source = "struct SomeFeature {\n    @Fetched var objects: [TestModel]\n}";
        insta::assert_snapshot!(expand(source).text, @r###"
        struct SomeFeature {
            var objects: [TestModel] {
                get {
                    objectsFetcher.results
                }
            }

            private let objectsFetcher: Fetcher<TestModel> = .init()
        }
        "###);
    }

    // ── Presentation ─────────────────────────────────────────────────

    #[test]
    fn test_presentation_view() {
        let source = "@Presentation<CounterFeature>\nstruct CounterView: View {\n    var body: some View {\n        Text(\"\\(_feature.outlets.count)\")\n    }\n}";
        insta::assert_snapshot!(expand(source).text, @r###"
        struct CounterView: View {
            var body: some View {
                Text("\(_feature.outlets.count)")
            }

            @Environment(CounterFeature.Box.self) public var _feature
        }

        extension CounterView: Flex.Presentation {}
        "###);
    }

    // ── Layout ───────────────────────────────────────────────────────

    #[test]
    fn test_members_into_empty_one_line_body() {
        let result = expand("@Feature\nstruct S { }");
        assert!(result.text.starts_with("struct S {\n    typealias Box = SBox\n}"));
    }

    #[test]
    fn test_storage_accessors_use_member_indent() {
        let result = expand("@Feature\nstruct S {\n    @Outlet var x: Int = 0\n}\n");
        assert!(result.text.contains(
            "\n    var x: Int {\n        get {\n            _xStorage\n        }\n        nonmutating set {\n            _xStorage = newValue\n        }\n    }\n"
        ));
    }

    #[test]
    fn test_feature_nested_in_enum() {
        let source = "enum Namespace {\n    @Feature\n    struct Inner {\n        @Outlet var x: Int = 0\n    }\n}\n";
        let result = expand(source);
        assert!(result.diagnostics.is_empty());
        assert!(!result.text.contains("@Feature"));
        assert!(!result.text.contains("@Outlet"));
        assert!(result.text.contains("\n        typealias Box = InnerBox\n"));
        assert!(result.text.contains("\n        var x: Int {\n            get {\n                _xStorage\n"));
        assert!(result.text.contains("\n    @MainActor @Observable public class InnerOutlets {\n"));
        assert!(result.text.contains("\n}\n\nextension Namespace.Inner: Flex.Feature {}"));
        assert!(!result.text.contains("extension Inner"));
    }

    #[test]
    fn test_diagnostics_are_sorted_and_unique() {
        let source = "@Feature\nstruct S {\n    @Outlet var b = 1\n    @Outlet var (x, y): (Int, Int) = (0, 0)\n    @Outlet var a = 0\n}";
        let result = expand(source);
        let kinds: Vec<_> = result.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::TypeAnnotationMissing,
                DiagnosticKind::NotAnIdentifier,
                DiagnosticKind::TypeAnnotationMissing,
            ]
        );
    }

    #[test]
    fn test_parse_error_is_returned() {
        let result = expand_source("struct S {", &ExpansionConfig::default());
        assert!(matches!(result, Err(ParseError::UnexpectedEof(_))));
    }
}
