//! The `<Feature>Outlets` proxy.

use crate::analysis::{Classification, Property};
use crate::config::ExpansionConfig;
use crate::synth::writer::CodeWriter;
use crate::syntax::ir::bare_name;
use crate::synth::{
    getter_forward, open_proxy, projected_binding_forward, settable_forward, ProxyKind,
    SynthesizedType,
};

/// Generate the outlets proxy, or `None` if the feature has no outlets.
///
/// Members are emitted bucket by bucket: state outlets, writable outlets,
/// read-only outlets.
pub fn outlets_type(classification: &Classification, config: &ExpansionConfig) -> Option<SynthesizedType> {
    if !classification.has_outlets() {
        return None;
    }

    let name = ProxyKind::Outlets.type_name(&classification.feature);
    let mut w = CodeWriter::new();
    open_proxy(&mut w, &name, classification, config);

    for property in &classification.state_outlets {
        w.blank();
        settable_forward(&mut w, &property.name, &property.ty);
        w.blank();
        projected_binding_forward(&mut w, &property.name, &property.ty);
    }

    for property in &classification.writable_outlets {
        w.blank();
        settable_forward(&mut w, &property.name, &property.ty);
        w.blank();
        lazy_binding(&mut w, property);
    }

    for property in &classification.readonly_outlets {
        w.blank();
        getter_forward(&mut w, &property.name, &property.ty);
    }

    w.close();

    Some(SynthesizedType {
        kind: ProxyKind::Outlets,
        name,
        source: w.finish(),
    })
}

/// A binding built once per proxy. The closures capture the proxy
/// `unowned` so the proxy does not retain itself.
fn lazy_binding(w: &mut CodeWriter, property: &Property) {
    let name = &property.name;
    w.line("@ObservationIgnored");
    w.line(format!(
        "lazy var ${}: Binding<{}> = Binding(",
        bare_name(name),
        property.ty
    ));
    w.indent();
    w.line(format!("mainActorGet: {{ [unowned self] in self.feature.{name} }},"));
    w.line(format!(
        "mainActorSet: {{ [unowned self] newValue in self.feature.{name} = newValue }}"
    ));
    w.dedent();
    w.line(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify;
    use crate::syntax::parser::parse_source;

    fn outlets(source: &str) -> Option<String> {
        let file = parse_source(source).unwrap();
        let config = ExpansionConfig::default();
        let (c, _) = classify(file.decls[0].as_struct().unwrap(), &config);
        outlets_type(&c, &config).map(|t| t.source)
    }

    #[test]
    fn test_no_outlets_no_type() {
        assert_eq!(outlets("struct S {\n    @Action func f() {}\n}"), None);
    }

    #[test]
    fn test_writable_outlet_gets_lazy_binding() {
        let source = "struct S {\n    @Outlet var x: Int { get { a } set { a = newValue } }\n}";
        insta::assert_snapshot!(outlets(source).unwrap(), @r###"
        @MainActor @Observable public class SOutlets {
            private let feature: S

            init(_ feature: S) {
                self.feature = feature
            }

            var x: Int {
                get {
                    feature.x
                }
                set {
                    feature.x = newValue
                }
            }

            @ObservationIgnored
            lazy var $x: Binding<Int> = Binding(
                mainActorGet: { [unowned self] in self.feature.x },
                mainActorSet: { [unowned self] newValue in self.feature.x = newValue }
            )
        }
        "###);
    }

    #[test]
    fn test_state_outlet_forwards_projected_binding() {
        let source = "struct S {\n    @Outlet var greeting: String = \"Hello\"\n}";
        insta::assert_snapshot!(outlets(source).unwrap(), @r###"
        @MainActor @Observable public class SOutlets {
            private let feature: S

            init(_ feature: S) {
                self.feature = feature
            }

            var greeting: String {
                get {
                    feature.greeting
                }
                set {
                    feature.greeting = newValue
                }
            }

            var $greeting: Binding<String> {
                feature.$greeting
            }
        }
        "###);
    }

    #[test]
    fn test_private_setter_has_no_setter_and_no_binding() {
        let source = "struct S {\n    @Outlet private(set) var x: Int = 0\n}";
        let text = outlets(source).unwrap();
        assert!(text.contains("var x: Int {\n        feature.x\n    }"));
        assert!(!text.contains("set {"));
        assert!(!text.contains("$x"));
    }

    #[test]
    fn test_bucket_order() {
        let source = "struct S {\n    @Outlet let r: Int = 0\n    @Outlet var w: Int { get { 0 } set {} }\n    @Outlet var s: Int = 0\n}";
        let text = outlets(source).unwrap();
        let s = text.find("var s:").unwrap();
        let w = text.find("var w:").unwrap();
        let r = text.find("var r:").unwrap();
        assert!(s < w && w < r);
    }
}
