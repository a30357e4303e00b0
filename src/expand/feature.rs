//! `@Feature`: the main macro.

use crate::analysis::classify;
use crate::diagnostics::DiagnosticKind;
use crate::expand::{accessor_anchor, AttachedMacro, ExpansionContext, MacroRole, SynthesizedDecl};
use crate::synth::{feature_extensions, feature_members, storage_accessors, synthesize};
use crate::syntax::ir::{Attribute, Decl};

/// Expands a feature struct into its proxies, box, storage and conformances.
pub struct FeatureMacro;

impl AttachedMacro for FeatureMacro {
    fn roles(&self) -> &'static [MacroRole] {
        &MacroRole::ORDER
    }

    fn expand(
        &self,
        role: MacroRole,
        _attribute: &Attribute,
        decl: &Decl,
        ctx: &mut ExpansionContext<'_>,
    ) -> Vec<SynthesizedDecl> {
        let Decl::Struct(feature) = decl else {
            ctx.report(decl.span(), DiagnosticKind::NotAStruct);
            return Vec::new();
        };

        let config = ctx.config;
        let (classification, diagnostics) = classify(feature, config);
        ctx.absorb(diagnostics);

        match role {
            MacroRole::Member => feature_members(&classification, config)
                .into_iter()
                .map(|source| SynthesizedDecl::new(MacroRole::Member, source))
                .collect(),
            MacroRole::Peer => synthesize(&classification, config)
                .into_iter()
                .map(|ty| SynthesizedDecl::new(MacroRole::Peer, ty.source).named(ty.name))
                .collect(),
            MacroRole::Extension => feature_extensions(&classification, config)
                .into_iter()
                .map(|source| SynthesizedDecl::new(MacroRole::Extension, source))
                .collect(),
            MacroRole::Accessor => classification
                .generated_storage()
                .into_iter()
                .filter_map(|property| {
                    let anchor = accessor_anchor(&property.binding)?;
                    Some(
                        SynthesizedDecl::new(MacroRole::Accessor, storage_accessors(property, config))
                            .named(property.name.as_str())
                            .anchored(anchor),
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpansionConfig;
    use crate::expand::expand_declaration;
    use crate::syntax::parser::parse_source;
    use pretty_assertions::assert_eq;

    fn expand(source: &str, role: MacroRole) -> crate::expand::Expansion {
        let decl = parse_source(source).unwrap().decls.remove(0);
        expand_declaration(&decl, role, &ExpansionConfig::default())
    }

    #[test]
    fn test_not_a_struct() {
        let expansion = expand("@Feature\nclass C {\n}", MacroRole::Peer);
        assert!(expansion.decls.is_empty());
        assert_eq!(expansion.diagnostics.len(), 1);
        assert_eq!(expansion.diagnostics[0].kind, DiagnosticKind::NotAStruct);
        assert_eq!(
            expansion.diagnostics[0].message,
            "The attribute can only be applied to a struct"
        );
    }

    #[test]
    fn test_member_role() {
        let expansion = expand(
            "@Feature\nstruct S {\n    @Outlet var x: Int = 1\n}",
            MacroRole::Member,
        );
        let sources: Vec<_> = expansion.decls.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "typealias Box = SBox",
                "typealias Outlets = SOutlets",
                "@State private var _xStorage: Int = 1",
                "var $x: Binding<Int> {\n    $_xStorage\n}",
            ]
        );
    }

    #[test]
    fn test_accessor_role_targets_state_outlets() {
        let source = "@Feature\nstruct S {\n    @Outlet var x: Int = 1\n    @Outlet var y: Int { 2 }\n}";
        let expansion = expand(source, MacroRole::Accessor);
        assert_eq!(expansion.decls.len(), 1);
        let accessor = &expansion.decls[0];
        assert_eq!(accessor.name.as_deref(), Some("x"));
        assert_eq!(accessor.anchor.map(|a| a.text(source)), Some(" = 1"));
    }

    #[test]
    fn test_extension_role() {
        let expansion = expand("@Feature\nstruct S {\n}", MacroRole::Extension);
        assert_eq!(expansion.decls.len(), 2);
        assert_eq!(expansion.decls[0].source, "extension S: Flex.Feature {}");
    }
}
