//! Conformance extensions attached to the feature.

use crate::analysis::Classification;
use crate::config::ExpansionConfig;
use crate::synth::present_proxies;
use crate::synth::writer::CodeWriter;

/// `Feature` conformance, one `Has*` conformance per present proxy, and the
/// `View` conformance whose body renders `presentation` with the box in the
/// environment.
pub fn feature_extensions(classification: &Classification, config: &ExpansionConfig) -> Vec<String> {
    let feature = &classification.feature;

    let mut extensions = vec![conformance(feature, &config.runtime_type("Feature"))];
    for kind in present_proxies(classification) {
        let protocol = config.runtime_type(&format!("Has{}", kind.suffix()));
        extensions.push(conformance(feature, &protocol));
    }

    let mut w = CodeWriter::new();
    w.open(format!("extension {feature}: {}", config.ui_type("View")));
    w.open("public var body: some View");
    w.line("presentation");
    w.indent();
    w.line(".environment(Box(self))");
    w.dedent();
    w.close();
    w.close();
    extensions.push(w.finish());

    extensions
}

fn conformance(ty: &str, protocol: &str) -> String {
    format!("extension {ty}: {protocol} {{}}")
}
