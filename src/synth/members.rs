//! Members added to the feature struct itself.

use crate::analysis::{Classification, Property};
use crate::config::ExpansionConfig;
use crate::synth::writer::CodeWriter;
use crate::syntax::ir::bare_name;
use crate::synth::{present_proxies, ProxyKind};

/// Generated members, one declaration per entry, in emission order:
/// the `Box` typealias, a typealias per present proxy, then storage and a
/// projected binding for every property moved to generated storage.
pub fn feature_members(classification: &Classification, config: &ExpansionConfig) -> Vec<String> {
    let mut members = vec![typealias(ProxyKind::Box, classification)];
    members.extend(
        present_proxies(classification)
            .into_iter()
            .map(|kind| typealias(kind, classification)),
    );

    for property in classification.generated_storage() {
        members.push(storage_field(property, config));
        members.push(storage_binding(property, config));
    }

    members
}

/// `typealias Outlets = SOutlets<T>`
fn typealias(kind: ProxyKind, classification: &Classification) -> String {
    let target = classification.specialize(&kind.type_name(&classification.feature));
    format!("typealias {} = {target}", kind.suffix())
}

/// `@State private var _xStorage: T = <initializer as written>`
fn storage_field(property: &Property, config: &ExpansionConfig) -> String {
    let mut field = format!(
        "@State private var {}: {}",
        config.storage_name(&property.name),
        property.ty
    );
    if let Some(initializer) = property.initializer() {
        field.push_str(" = ");
        field.push_str(initializer);
    }
    field
}

/// `var $x: Binding<T> { $_xStorage }`
fn storage_binding(property: &Property, config: &ExpansionConfig) -> String {
    let mut w = CodeWriter::new();
    w.open(format!("var ${}: Binding<{}>", bare_name(&property.name), property.ty));
    w.line(format!("${}", config.storage_name(&property.name)));
    w.close();
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify;
    use crate::syntax::parser::parse_source;
    use pretty_assertions::assert_eq;

    fn members(source: &str) -> Vec<String> {
        let file = parse_source(source).unwrap();
        let config = ExpansionConfig::default();
        let (c, _) = classify(file.decls[0].as_struct().unwrap(), &config);
        feature_members(&c, &config)
    }

    #[test]
    fn test_box_typealias_always_present() {
        assert_eq!(members("struct S {\n}"), vec!["typealias Box = SBox".to_string()]);
    }

    #[test]
    fn test_storage_keeps_initializer_verbatim() {
        let result = members("struct S {\n    @Outlet var items: [Int] = [1, 2,   3]\n}");
        assert_eq!(
            result,
            vec![
                "typealias Box = SBox".to_string(),
                "typealias Outlets = SOutlets".to_string(),
                "@State private var _itemsStorage: [Int] = [1, 2,   3]".to_string(),
                "var $items: Binding<[Int]> {\n    $_itemsStorage\n}".to_string(),
            ]
        );
    }

    #[test]
    fn test_storage_without_initializer() {
        let result = members("struct S {\n    @Destination var sheet: Sheet?\n}");
        assert_eq!(result[2], "@State private var _sheetStorage: Sheet?");
    }

    #[test]
    fn test_escaped_name_derives_bare_names() {
        let result = members("struct S {\n    @Outlet var `default`: Int = 0\n}");
        assert_eq!(result[2], "@State private var _defaultStorage: Int = 0");
        assert_eq!(result[3], "var $default: Binding<Int> {\n    $_defaultStorage\n}");
    }

    #[test]
    fn test_generic_feature_typealiases() {
        let result = members("struct S<T: Equatable> {\n    @Action func go() {}\n}");
        assert_eq!(
            result,
            vec![
                "typealias Box = SBox<T>".to_string(),
                "typealias Actions = SActions<T>".to_string(),
            ]
        );
    }

    #[test]
    fn test_shared_storage_emitted_once() {
        let result = members("struct S {\n    @Outlet @Destination var d: Text? = nil\n}");
        let storage = result.iter().filter(|m| m.starts_with("@State")).count();
        assert_eq!(storage, 1);
    }
}
