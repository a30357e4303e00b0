//! Synthesis engine: generated Swift declarations for a classified feature.
//!
//! Every generator is a pure function of the [`Classification`] and the
//! [`ExpansionConfig`]; the same input always produces the same text.

pub mod accessors;
pub mod actions;
pub mod destinations;
pub mod extensions;
pub mod feature_box;
pub mod members;
pub mod outlets;
pub mod writer;

use serde::Serialize;

use crate::analysis::Classification;
use crate::config::ExpansionConfig;
use crate::syntax::ir::bare_name;
use writer::CodeWriter;

pub use accessors::storage_accessors;
pub use extensions::feature_extensions;
pub use members::feature_members;

/// The generated companion types of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProxyKind {
    Outlets,
    Actions,
    Destinations,
    Box,
}

impl ProxyKind {
    /// Proxy kinds in the order they are emitted and stored in the box.
    pub const PROXIES: [ProxyKind; 3] = [ProxyKind::Outlets, ProxyKind::Actions, ProxyKind::Destinations];

    /// `Outlets` in `CounterFeatureOutlets`.
    pub fn suffix(self) -> &'static str {
        match self {
            ProxyKind::Outlets => "Outlets",
            ProxyKind::Actions => "Actions",
            ProxyKind::Destinations => "Destinations",
            ProxyKind::Box => "Box",
        }
    }

    pub fn type_name(self, feature: &str) -> String {
        format!("{feature}{}", self.suffix())
    }

    /// Stored property name on the box.
    pub fn field_name(self) -> &'static str {
        match self {
            ProxyKind::Outlets => "outlets",
            ProxyKind::Actions => "actions",
            ProxyKind::Destinations => "destinations",
            ProxyKind::Box => "box",
        }
    }

    /// Whether the classification produces this kind at all.
    pub fn is_present(self, classification: &Classification) -> bool {
        match self {
            ProxyKind::Outlets => classification.has_outlets(),
            ProxyKind::Actions => classification.has_actions(),
            ProxyKind::Destinations => classification.has_destinations(),
            ProxyKind::Box => true,
        }
    }
}

/// A generated top-level type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedType {
    pub kind: ProxyKind,
    pub name: String,
    pub source: String,
}

/// Proxy kinds present for `classification`, in emission order.
pub fn present_proxies(classification: &Classification) -> Vec<ProxyKind> {
    ProxyKind::PROXIES
        .into_iter()
        .filter(|kind| kind.is_present(classification))
        .collect()
}

/// All generated types: each present proxy, then the box.
///
/// Absent buckets produce no type at all; the box is always generated.
pub fn synthesize(classification: &Classification, config: &ExpansionConfig) -> Vec<SynthesizedType> {
    let mut types = Vec::new();
    types.extend(outlets::outlets_type(classification, config));
    types.extend(actions::actions_type(classification, config));
    types.extend(destinations::destinations_type(classification, config));
    types.push(feature_box::box_type(classification, config));
    types
}

// ---------------------------------------------------------------------------
// Shared proxy helpers
// ---------------------------------------------------------------------------

/// Class header, the stored feature and the initializer.
fn open_proxy(w: &mut CodeWriter, name: &str, classification: &Classification, config: &ExpansionConfig) {
    w.open(format!(
        "@{} @Observable public class {}{}",
        config.global_actor,
        classification.generic_declaration(name),
        classification.where_suffix()
    ));
    let feature = classification.feature_type();
    w.line(format!("private let feature: {feature}"));
    w.blank();
    w.open(format!("init(_ feature: {feature})"));
    w.line("self.feature = feature");
    w.close();
}

/// `var name: T { feature.name }`
fn getter_forward(w: &mut CodeWriter, name: &str, ty: &str) {
    w.open(format!("var {name}: {ty}"));
    w.line(format!("feature.{name}"));
    w.close();
}

/// `var name: T { get { feature.name } set { feature.name = newValue } }`
fn settable_forward(w: &mut CodeWriter, name: &str, ty: &str) {
    w.open(format!("var {name}: {ty}"));
    w.open("get");
    w.line(format!("feature.{name}"));
    w.close();
    w.open("set");
    w.line(format!("feature.{name} = newValue"));
    w.close();
    w.close();
}

/// `var $name: Binding<T> { feature.$name }`
fn projected_binding_forward(w: &mut CodeWriter, name: &str, ty: &str) {
    let name = bare_name(name);
    w.open(format!("var ${name}: Binding<{ty}>"));
    w.line(format!("feature.${name}"));
    w.close();
}
