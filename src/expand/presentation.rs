//! `@Presentation<Feature>`: a view that reads its feature's box from the
//! environment.

use crate::diagnostics::DiagnosticKind;
use crate::expand::{AttachedMacro, ExpansionContext, MacroRole, SynthesizedDecl};
use crate::synth::ProxyKind;
use crate::syntax::ir::{Attribute, Decl};

pub struct PresentationMacro;

impl AttachedMacro for PresentationMacro {
    fn roles(&self) -> &'static [MacroRole] {
        &[MacroRole::Member, MacroRole::Extension]
    }

    fn expand(
        &self,
        role: MacroRole,
        attribute: &Attribute,
        decl: &Decl,
        ctx: &mut ExpansionContext<'_>,
    ) -> Vec<SynthesizedDecl> {
        let Decl::Struct(view) = decl else {
            ctx.report(decl.span(), DiagnosticKind::NotAStruct);
            return Vec::new();
        };

        match role {
            MacroRole::Member => {
                let Some(feature) = attribute.generic_arguments.first() else {
                    ctx.report(attribute.span, DiagnosticKind::FeatureArgumentMissing);
                    return Vec::new();
                };
                vec![SynthesizedDecl::new(
                    MacroRole::Member,
                    format!(
                        "@Environment({feature}.{}.self) public var _feature",
                        ProxyKind::Box.suffix()
                    ),
                )
                .named("_feature")]
            }
            MacroRole::Extension => vec![SynthesizedDecl::new(
                MacroRole::Extension,
                format!(
                    "extension {}: {} {{}}",
                    view.name.text,
                    ctx.config.runtime_type("Presentation")
                ),
            )],
            MacroRole::Peer | MacroRole::Accessor => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpansionConfig;
    use crate::expand::expand_all;
    use crate::syntax::parser::parse_source;
    use pretty_assertions::assert_eq;

    fn expand(source: &str) -> crate::expand::Expansion {
        let decl = parse_source(source).unwrap().decls.remove(0);
        expand_all(&decl, &ExpansionConfig::default())
    }

    #[test]
    fn test_presentation_expansion() {
        let expansion = expand("@Presentation<CounterFeature>\nstruct CounterView: View {\n}");
        assert!(expansion.diagnostics.is_empty());
        let sources: Vec<_> = expansion.decls.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "@Environment(CounterFeature.Box.self) public var _feature",
                "extension CounterView: Flex.Presentation {}",
            ]
        );
    }

    #[test]
    fn test_missing_feature_argument() {
        let expansion = expand("@Presentation\nstruct CounterView: View {\n}");
        assert_eq!(expansion.diagnostics.len(), 1);
        assert_eq!(
            expansion.diagnostics[0].kind,
            DiagnosticKind::FeatureArgumentMissing
        );
        // The conformance does not depend on the argument.
        assert_eq!(expansion.decls.len(), 1);
    }

    #[test]
    fn test_presentation_on_enum() {
        let expansion = expand("@Presentation<F>\nenum E { case a }");
        assert!(expansion.decls.is_empty());
        assert_eq!(expansion.diagnostics[0].kind, DiagnosticKind::NotAStruct);
    }
}
