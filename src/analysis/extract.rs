//! Signature extraction: names and types from property bindings, forwarding
//! signatures from action methods.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::syntax::ir::{FunctionDecl, Modifier, Parameter, PatternBinding, VariableDecl};
use crate::syntax::span::Span;

/// A property binding with a simple name and an explicit type.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub ty: String,
    pub binding: PatternBinding,
    /// Span of the whole variable declaration the binding belongs to.
    pub decl_span: Span,
}

impl Property {
    /// Initializer expression exactly as written.
    pub fn initializer(&self) -> Option<&str> {
        self.binding.initializer.as_ref().map(|i| i.value.as_str())
    }
}

/// Extract `(name, type)` pairs from every binding of `decl`.
///
/// A binding whose pattern is not a simple name reports `notAnIdentifier`;
/// one without a type annotation reports `typeAnnotationMissing`. Both are
/// left out of the result. Types are never inferred from initializers.
pub fn extract_identifiers_and_types(
    decl: &VariableDecl,
    diagnostics: &mut Diagnostics,
) -> Vec<Property> {
    if decl.bindings.is_empty() {
        diagnostics.report(decl.span, DiagnosticKind::NotAnIdentifier);
        return Vec::new();
    }

    let mut properties = Vec::new();
    for binding in &decl.bindings {
        let Some(identifier) = binding.pattern.as_identifier() else {
            diagnostics.report(binding.pattern.span(), DiagnosticKind::NotAnIdentifier);
            continue;
        };
        let Some(annotation) = &binding.type_annotation else {
            diagnostics.report(identifier.span, DiagnosticKind::TypeAnnotationMissing);
            continue;
        };
        properties.push(Property {
            name: identifier.text.clone(),
            ty: annotation.ty.clone(),
            binding: binding.clone(),
            decl_span: decl.span,
        });
    }
    properties
}

/// What the actions proxy needs to re-declare and forward an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSignature {
    pub name: String,
    /// Copied modifiers, minus the ones that make no sense on a class method.
    pub modifiers: Vec<Modifier>,
    pub generic_parameters: Option<String>,
    /// Copied verbatim, defaults included.
    pub parameters: Vec<Parameter>,
    pub effects: Vec<String>,
    pub return_type: Option<String>,
    pub where_clause: Option<String>,
    pub is_static: bool,
    pub span: Span,
}

impl ActionSignature {
    pub fn is_async(&self) -> bool {
        self.effects.iter().any(|e| e == "async")
    }

    pub fn is_throwing(&self) -> bool {
        self.effects
            .iter()
            .any(|e| e.starts_with("throws") || e == "rethrows")
    }
}

/// `mutating` has no meaning on a class, `override` has nothing to override.
const DROPPED_ACTION_MODIFIERS: &[&str] = &["mutating", "nonmutating", "override"];

pub fn extract_action(func: &FunctionDecl) -> ActionSignature {
    let is_static = func
        .modifiers
        .iter()
        .any(|m| m.name == "static" || m.name == "class");

    ActionSignature {
        name: func.name.text.clone(),
        modifiers: func
            .modifiers
            .iter()
            .filter(|m| !DROPPED_ACTION_MODIFIERS.contains(&m.name.as_str()))
            .cloned()
            .collect(),
        generic_parameters: func.generic_parameters.clone(),
        parameters: func.parameters.clone(),
        effects: func.effects.clone(),
        return_type: func.return_type.clone(),
        where_clause: func.where_clause.clone(),
        is_static,
        span: func.span,
    }
}
