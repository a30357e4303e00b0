//! The `<Feature>Destinations` proxy.
//!
//! Destinations are always exposed as a read-only value plus a binding,
//! whatever the mutability of the underlying property. The binding comes
//! from the feature's projected `$name`, never from writing through the
//! proxy.

use crate::analysis::Classification;
use crate::config::ExpansionConfig;
use crate::synth::writer::CodeWriter;
use crate::synth::{getter_forward, open_proxy, projected_binding_forward, ProxyKind, SynthesizedType};

pub fn destinations_type(
    classification: &Classification,
    config: &ExpansionConfig,
) -> Option<SynthesizedType> {
    if !classification.has_destinations() {
        return None;
    }

    let name = ProxyKind::Destinations.type_name(&classification.feature);
    let mut w = CodeWriter::new();
    open_proxy(&mut w, &name, classification, config);

    for destination in &classification.destinations {
        let property = &destination.property;
        w.blank();
        getter_forward(&mut w, &property.name, &property.ty);
        w.blank();
        projected_binding_forward(&mut w, &property.name, &property.ty);
    }

    w.close();

    Some(SynthesizedType {
        kind: ProxyKind::Destinations,
        name,
        source: w.finish(),
    })
}
