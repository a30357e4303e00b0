//! The `<Feature>Actions` proxy.

use crate::analysis::{ActionSignature, Classification};
use crate::config::ExpansionConfig;
use crate::synth::writer::CodeWriter;
use crate::synth::{open_proxy, ProxyKind, SynthesizedType};

/// Generate the actions proxy, or `None` if the feature has no actions.
pub fn actions_type(classification: &Classification, config: &ExpansionConfig) -> Option<SynthesizedType> {
    if !classification.has_actions() {
        return None;
    }

    let name = ProxyKind::Actions.type_name(&classification.feature);
    let mut w = CodeWriter::new();
    open_proxy(&mut w, &name, classification, config);

    let feature = classification.feature_type();
    for action in &classification.actions {
        w.blank();
        w.open(signature(action));
        w.line(forwarding_call(action, &feature));
        w.close();
    }

    w.close();

    Some(SynthesizedType {
        kind: ProxyKind::Actions,
        name,
        source: w.finish(),
    })
}

/// Re-declared signature: same modifiers, generics, parameters (defaults
/// included), effects, return type and constraints.
pub fn signature(action: &ActionSignature) -> String {
    let mut out = String::new();
    for modifier in &action.modifiers {
        out.push_str(&modifier.to_source());
        out.push(' ');
    }
    out.push_str("func ");
    out.push_str(&action.name);
    if let Some(generics) = &action.generic_parameters {
        out.push_str(generics);
    }
    let parameters: Vec<String> = action.parameters.iter().map(|p| p.to_source()).collect();
    out.push('(');
    out.push_str(&parameters.join(", "));
    out.push(')');
    for effect in &action.effects {
        out.push(' ');
        out.push_str(effect);
    }
    if let Some(return_type) = &action.return_type {
        out.push_str(" -> ");
        out.push_str(return_type);
    }
    if let Some(where_clause) = &action.where_clause {
        out.push_str(" where ");
        out.push_str(where_clause);
    }
    out
}

/// `try await feature.name(label: value, other)`.
///
/// Every parameter is passed explicitly, defaulted ones included, so the
/// proxy's own defaults are what the caller sees. Labels are kept where the
/// parameter has one; `inout` parameters are passed with `&`.
pub fn forwarding_call(action: &ActionSignature, feature: &str) -> String {
    let arguments: Vec<String> = action
        .parameters
        .iter()
        .map(|p| {
            let value = if p.is_inout() {
                format!("&{}", p.bound_name())
            } else {
                p.bound_name().to_string()
            };
            match p.label() {
                Some(label) => format!("{label}: {value}"),
                None => value,
            }
        })
        .collect();

    let mut call = String::new();
    if action.is_throwing() {
        call.push_str("try ");
    }
    if action.is_async() {
        call.push_str("await ");
    }
    call.push_str(if action.is_static { feature } else { "feature" });
    call.push('.');
    call.push_str(&action.name);
    call.push('(');
    call.push_str(&arguments.join(", "));
    call.push(')');
    call
}
