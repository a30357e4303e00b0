//! Accessor rewrite for properties moved to generated storage.
//!
//! The feature's own property keeps its name and type but becomes a pure
//! forward to `_<name>Storage`. Observers survive the move: their bodies run
//! inside the generated setter around the storage write.

use crate::analysis::Property;
use crate::config::ExpansionConfig;
use crate::syntax::ir::AccessorKind;
use crate::synth::writer::CodeWriter;

/// The accessor block that replaces the property's initializer and
/// observers, braces included.
pub fn storage_accessors(property: &Property, config: &ExpansionConfig) -> String {
    let storage = config.storage_name(&property.name);
    let observers = property.binding.observers();
    let will_set = observers.iter().find(|a| a.kind == AccessorKind::WillSet);
    let did_set = observers.iter().find(|a| a.kind == AccessorKind::DidSet);

    let mut w = CodeWriter::new();
    w.open("");

    w.open("get");
    w.line(&storage);
    w.close();

    w.open("nonmutating set");
    if let Some(did_set) = did_set {
        let old = did_set.parameter.as_deref().unwrap_or("oldValue");
        w.line(format!("let {old} = {storage}"));
    }
    if let Some(will_set) = will_set {
        w.open("do");
        if let Some(new) = &will_set.parameter {
            w.line(format!("let {new} = newValue"));
        }
        w.block(will_set.body.as_deref().unwrap_or_default());
        w.close();
    }
    w.line(format!("{storage} = newValue"));
    if let Some(did_set) = did_set {
        w.open("do");
        w.block(did_set.body.as_deref().unwrap_or_default());
        w.close();
    }
    w.close();

    w.close();
    w.finish()
}
