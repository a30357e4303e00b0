//! Pass driver: attached macros, their roles, and per-declaration expansion.
//!
//! Each role is an independent entry point. Nothing is shared between calls:
//! every invocation re-classifies its declaration, so the roles can run in
//! any order, or alone, and still agree.

pub mod feature;
pub mod fetched;
pub mod presentation;
pub mod source;

use serde::Serialize;
use tracing::debug;

use crate::config::ExpansionConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::syntax::ir::{Attribute, Decl, PatternBinding};
use crate::syntax::span::Span;

pub use feature::FeatureMacro;
pub use fetched::FetchedMacro;
pub use presentation::PresentationMacro;
pub use source::{expand_source, ExpandedSource};

// ---------------------------------------------------------------------------
// Roles and output
// ---------------------------------------------------------------------------

/// What an expansion contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroRole {
    /// New members inside the annotated type.
    Member,
    /// New declarations next to the annotated one.
    Peer,
    /// Extensions of the annotated type.
    Extension,
    /// Accessors replacing a property's storage.
    Accessor,
}

impl MacroRole {
    /// The order the driver runs roles in when expanding everything.
    pub const ORDER: [MacroRole; 4] = [
        MacroRole::Member,
        MacroRole::Peer,
        MacroRole::Extension,
        MacroRole::Accessor,
    ];
}

/// One generated declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedDecl {
    pub role: MacroRole,
    /// Name of the generated type, or the property an accessor belongs to.
    pub name: Option<String>,
    /// Source text, unindented.
    pub source: String,
    /// Accessors: the range the accessor block replaces, from the end of the
    /// type annotation to the end of the binding. Peers of a member: the
    /// member they follow. `None` for declarations placed relative to the
    /// annotated declaration itself.
    pub anchor: Option<Span>,
}

impl SynthesizedDecl {
    pub fn new(role: MacroRole, source: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            source: source.into(),
            anchor: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn anchored(mut self, anchor: Span) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

/// Range an accessor block replaces for `binding`: everything after the
/// type annotation (initializer, observers, existing accessors).
pub fn accessor_anchor(binding: &PatternBinding) -> Option<Span> {
    let annotation = binding.type_annotation.as_ref()?;
    Some(Span::new(annotation.span.end, binding.span.end))
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

/// Per-invocation state handed to a macro.
pub struct ExpansionContext<'a> {
    pub config: &'a ExpansionConfig,
    diagnostics: Diagnostics,
}

impl<'a> ExpansionContext<'a> {
    pub fn new(config: &'a ExpansionConfig) -> Self {
        Self {
            config,
            diagnostics: Diagnostics::new(config.diagnostic_domain.as_str()),
        }
    }

    pub fn report(&mut self, span: Span, kind: DiagnosticKind) {
        self.diagnostics.report(span, kind);
    }

    /// Take over diagnostics collected elsewhere, e.g. by the classifier.
    pub fn absorb(&mut self, diagnostics: Diagnostics) {
        self.diagnostics.merge(diagnostics);
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

/// A macro attached to a declaration through an attribute.
pub trait AttachedMacro {
    /// Roles this macro contributes to.
    fn roles(&self) -> &'static [MacroRole];

    /// Expand one role. Problems are reported on `ctx`; the returned
    /// declarations are whatever could still be generated.
    fn expand(
        &self,
        role: MacroRole,
        attribute: &Attribute,
        decl: &Decl,
        ctx: &mut ExpansionContext<'_>,
    ) -> Vec<SynthesizedDecl>;
}

/// Attribute name to macro.
pub struct MacroRegistry {
    macros: Vec<(String, Box<dyn AttachedMacro>)>,
}

impl MacroRegistry {
    pub fn empty() -> Self {
        Self { macros: Vec::new() }
    }

    /// The feature, presentation and fetched macros under their configured
    /// names.
    pub fn from_config(config: &ExpansionConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(config.markers.feature.as_str(), FeatureMacro);
        registry.register(config.markers.presentation.as_str(), PresentationMacro);
        registry.register(config.markers.fetched.as_str(), FetchedMacro);
        registry
    }

    /// Register a macro. A later registration under the same name wins.
    pub fn register(&mut self, name: impl Into<String>, attached: impl AttachedMacro + 'static) {
        let name = name.into();
        self.macros.retain(|(existing, _)| *existing != name);
        self.macros.push((name, Box::new(attached)));
    }

    pub fn get(&self, name: &str) -> Option<&dyn AttachedMacro> {
        self.macros
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, attached)| attached.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Result of running one or more roles on a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Expansion {
    pub decls: Vec<SynthesizedDecl>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Expansion {
    pub fn of_role(&self, role: MacroRole) -> impl Iterator<Item = &SynthesizedDecl> {
        self.decls.iter().filter(move |d| d.role == role)
    }
}

/// Run one role of every macro attached to `decl`, in isolation.
pub fn expand_declaration(decl: &Decl, role: MacroRole, config: &ExpansionConfig) -> Expansion {
    let registry = MacroRegistry::from_config(config);
    expand_role(&registry, decl, role, config)
}

/// Run every role in [`MacroRole::ORDER`]. Diagnostics raised by more than
/// one role are reported once.
pub fn expand_all(decl: &Decl, config: &ExpansionConfig) -> Expansion {
    let registry = MacroRegistry::from_config(config);
    let mut decls = Vec::new();
    let mut diagnostics = Diagnostics::new(config.diagnostic_domain.as_str());
    for role in MacroRole::ORDER {
        let expansion = expand_role(&registry, decl, role, config);
        decls.extend(expansion.decls);
        diagnostics.merge(expansion.diagnostics);
    }
    Expansion {
        decls,
        diagnostics: diagnostics.into_sorted(),
    }
}

fn expand_role(
    registry: &MacroRegistry,
    decl: &Decl,
    role: MacroRole,
    config: &ExpansionConfig,
) -> Expansion {
    let mut ctx = ExpansionContext::new(config);
    let mut decls = Vec::new();

    for attribute in decl.attributes() {
        let Some(attached) = registry.get(&attribute.name) else {
            continue;
        };
        if attached.roles().contains(&role) {
            decls.extend(attached.expand(role, attribute, decl, &mut ctx));
        }
    }

    let diagnostics = ctx.into_diagnostics();
    if !decls.is_empty() || !diagnostics.is_empty() {
        debug!(
            ?role,
            decls = decls.len(),
            diagnostics = diagnostics.len(),
            "expanded declaration"
        );
    }

    Expansion {
        decls,
        diagnostics: diagnostics.into_sorted(),
    }
}
