//! The `<Feature>Box` aggregate.
//!
//! One box is built per feature value and injected into the environment. It
//! holds one instance of each present proxy and conforms to the matching
//! `With*` runtime protocols, so presentation code can require "has outlets"
//! generically.

use crate::analysis::Classification;
use crate::config::ExpansionConfig;
use crate::synth::writer::CodeWriter;
use crate::synth::{present_proxies, ProxyKind, SynthesizedType};

pub fn box_type(classification: &Classification, config: &ExpansionConfig) -> SynthesizedType {
    let feature = classification.feature_type();
    let name = ProxyKind::Box.type_name(&classification.feature);
    let proxies = present_proxies(classification);

    let conformances: Vec<String> = proxies
        .iter()
        .map(|kind| config.runtime_type(&format!("With{}", kind.suffix())))
        .collect();

    let mut header = format!(
        "@{} @Observable public class {}",
        config.global_actor,
        classification.generic_declaration(&name)
    );
    if !conformances.is_empty() {
        header.push_str(": ");
        header.push_str(&conformances.join(", "));
    }
    header.push_str(&classification.where_suffix());

    let mut w = CodeWriter::new();
    w.open(header);
    w.line(format!("private let _feature: {feature}"));
    let proxy_types: Vec<String> = proxies
        .iter()
        .map(|kind| classification.specialize(&kind.type_name(&classification.feature)))
        .collect();
    for (kind, ty) in proxies.iter().zip(&proxy_types) {
        w.line(format!("public let {}: {ty}", kind.field_name()));
    }
    w.blank();
    w.open(format!("public init(_ feature: {feature})"));
    w.line("self._feature = feature");
    for (kind, ty) in proxies.iter().zip(&proxy_types) {
        w.line(format!("self.{} = {ty}(feature)", kind.field_name()));
    }
    w.close();
    w.close();

    SynthesizedType {
        kind: ProxyKind::Box,
        name,
        source: w.finish(),
    }
}
