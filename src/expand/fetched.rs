//! `@Fetched`: a property backed by a persistent-store fetcher.
//!
//! `@Fetched var things: [Thing]` becomes a getter reading
//! `thingsFetcher.results`, with a private `Fetcher<Thing>` peer next to it.

use crate::diagnostics::DiagnosticKind;
use crate::expand::{accessor_anchor, AttachedMacro, ExpansionContext, MacroRole, SynthesizedDecl};
use crate::synth::writer::CodeWriter;
use crate::syntax::ir::{bare_name, Attribute, Decl, PatternBinding};

pub struct FetchedMacro;

impl AttachedMacro for FetchedMacro {
    fn roles(&self) -> &'static [MacroRole] {
        &[MacroRole::Peer, MacroRole::Accessor]
    }

    fn expand(
        &self,
        role: MacroRole,
        _attribute: &Attribute,
        decl: &Decl,
        ctx: &mut ExpansionContext<'_>,
    ) -> Vec<SynthesizedDecl> {
        let Decl::Variable(variable) = decl else {
            ctx.report(decl.span(), DiagnosticKind::NotAProperty);
            return Vec::new();
        };
        let Some(binding) = variable.bindings.first() else {
            ctx.report(variable.span, DiagnosticKind::NotAnIdentifier);
            return Vec::new();
        };
        let Some(name) = binding.pattern.as_identifier().map(|i| i.text.clone()) else {
            ctx.report(binding.pattern.span(), DiagnosticKind::NotAnIdentifier);
            return Vec::new();
        };
        let Some(element) = array_element(binding) else {
            ctx.report(variable.span, DiagnosticKind::UnsupportedType);
            return Vec::new();
        };

        let fetcher = format!("{}Fetcher", bare_name(&name));
        match role {
            MacroRole::Peer => vec![SynthesizedDecl::new(
                MacroRole::Peer,
                format!("private let {fetcher}: Fetcher<{element}> = .init()"),
            )
            .named(fetcher)
            .anchored(variable.span)],
            MacroRole::Accessor => {
                let Some(anchor) = accessor_anchor(binding) else {
                    return Vec::new();
                };
                let mut w = CodeWriter::new();
                w.open("");
                w.open("get");
                w.line(format!("{fetcher}.results"));
                w.close();
                w.close();
                vec![SynthesizedDecl::new(MacroRole::Accessor, w.finish())
                    .named(name)
                    .anchored(anchor)]
            }
            MacroRole::Member | MacroRole::Extension => Vec::new(),
        }
    }
}

/// Element type of an `[Element]` annotation. Dictionaries and anything
/// else are unsupported.
fn array_element(binding: &PatternBinding) -> Option<String> {
    let ty = binding.type_annotation.as_ref()?.ty.trim();
    let inner = ty.strip_prefix('[')?.strip_suffix(']')?.trim();

    let mut depth = 0i32;
    for ch in inner.chars() {
        match ch {
            '[' | '(' | '<' => depth += 1,
            ']' | ')' | '>' => depth -= 1,
            ':' if depth == 0 => return None,
            _ => {}
        }
        if depth < 0 {
            // `[A] ... [B]`: the outer brackets do not pair up.
            return None;
        }
    }
    (!inner.is_empty()).then(|| inner.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpansionConfig;
    use crate::expand::{expand_all, Expansion};
    use crate::syntax::parser::parse_source;
    use pretty_assertions::assert_eq;

    fn expand_member(body: &str) -> Expansion {
        let source = format!("struct SomeFeature {{\n{body}\n}}");
        let file = parse_source(&source).unwrap();
        let member = file.decls[0].as_struct().unwrap().members[0].clone();
        expand_all(&member, &ExpansionConfig::default())
    }

    #[test]
    fn test_array_property() {
        let expansion = expand_member("    @Fetched var objects: [TestModel]");
        assert!(expansion.diagnostics.is_empty());
        let peer = expansion.of_role(MacroRole::Peer).next().unwrap();
        assert_eq!(peer.source, "private let objectsFetcher: Fetcher<TestModel> = .init()");
        let accessor = expansion.of_role(MacroRole::Accessor).next().unwrap();
        assert_eq!(
            accessor.source,
            "{\n    get {\n        objectsFetcher.results\n    }\n}"
        );
    }

    #[test]
    fn test_non_array_is_unsupported() {
        let expansion = expand_member("    @Fetched var objects: Set<TestModel>");
        assert!(expansion.decls.is_empty());
        assert_eq!(expansion.diagnostics.len(), 1);
        assert_eq!(expansion.diagnostics[0].kind, DiagnosticKind::UnsupportedType);
    }

    #[test]
    fn test_missing_type_is_unsupported() {
        let expansion = expand_member("    @Fetched var objects = []");
        assert_eq!(expansion.diagnostics[0].kind, DiagnosticKind::UnsupportedType);
    }

    #[test]
    fn test_dictionary_is_unsupported() {
        let expansion = expand_member("    @Fetched var objects: [String: TestModel]");
        assert_eq!(expansion.diagnostics[0].kind, DiagnosticKind::UnsupportedType);
    }

    #[test]
    fn test_function_is_not_a_property() {
        let expansion = expand_member("    @Fetched func load() {}");
        assert_eq!(expansion.diagnostics.len(), 1);
        assert_eq!(expansion.diagnostics[0].kind, DiagnosticKind::NotAProperty);
        assert_eq!(
            expansion.diagnostics[0].message,
            "The attribute can only be applied to a property"
        );
    }

    #[test]
    fn test_array_element_helper() {
        let element = |ty: &str| {
            let source = format!("struct S {{\n    var x: {ty}\n}}");
            let file = parse_source(&source).unwrap();
            let s = file.decls[0].as_struct().unwrap();
            let element = array_element(&s.variable_decls().next().unwrap().bindings[0]);
            element
        };
        assert_eq!(element("[Item]").as_deref(), Some("Item"));
        assert_eq!(element("[Box<Item>]").as_deref(), Some("Box<Item>"));
        assert_eq!(element("[Item]?"), None);
        assert_eq!(element("[[String: Int]]").as_deref(), Some("[String: Int]"));
    }
}
