//! Member classification for feature structs.
//!
//! Outlets are split into three disjoint buckets, checked in order:
//!
//! 1. **state**: a stored `var` without `private(set)` and without the
//!    fetched marker. Gets generated backing storage and a projected binding.
//! 2. **writable**: a `var` that is stored or has a `set` accessor, again
//!    without `private(set)`.
//! 3. **read-only**: everything else.
//!
//! Destinations and actions are collected independently of outlets.

use tracing::debug;

use crate::analysis::extract::{
    extract_action, extract_identifiers_and_types, ActionSignature, Property,
};
use crate::config::ExpansionConfig;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::syntax::ir::{BindingSpecifier, Decl, StructDecl, VariableDecl};

/// How a destination's `$binding` is provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationStorage {
    /// Plain stored `var`: the pass generates `@State` storage for it.
    Generated,
    /// Anything else: the feature is expected to project `$name` itself,
    /// e.g. through its own `@State` or `@Binding` wrapper.
    Projected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub property: Property,
    pub storage: DestinationStorage,
}

/// Classified members of one feature, in declaration order within each
/// bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub feature: String,
    /// The feature's generic parameter clause as written, e.g. `<T: Equatable>`.
    pub generic_parameters: Option<String>,
    pub where_clause: Option<String>,
    pub state_outlets: Vec<Property>,
    pub writable_outlets: Vec<Property>,
    pub readonly_outlets: Vec<Property>,
    pub actions: Vec<ActionSignature>,
    pub destinations: Vec<Destination>,
}

impl Classification {
    pub fn has_outlets(&self) -> bool {
        !(self.state_outlets.is_empty()
            && self.writable_outlets.is_empty()
            && self.readonly_outlets.is_empty())
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn has_destinations(&self) -> bool {
        !self.destinations.is_empty()
    }

    /// The feature type as generated code refers to it, e.g. `S<T>`.
    pub fn feature_type(&self) -> String {
        self.specialize(&self.feature)
    }

    /// `name` applied to the feature's generic arguments: `SOutlets<T>`.
    pub fn specialize(&self, name: &str) -> String {
        match self.generic_parameters.as_deref() {
            Some(clause) => format!("{name}<{}>", generic_arguments(clause).join(", ")),
            None => name.to_string(),
        }
    }

    /// Header of a generated type that carries the feature's generics:
    /// `SOutlets<T: Equatable>`.
    pub fn generic_declaration(&self, name: &str) -> String {
        format!("{name}{}", self.generic_parameters.as_deref().unwrap_or_default())
    }

    /// ` where ...` to close a generated type header, or empty.
    pub fn where_suffix(&self) -> String {
        self.where_clause
            .as_deref()
            .map(|clause| format!(" where {clause}"))
            .unwrap_or_default()
    }

    pub fn outlet_count(&self) -> usize {
        self.state_outlets.len() + self.writable_outlets.len() + self.readonly_outlets.len()
    }

    /// Properties that get generated `@State` backing storage: state outlets
    /// first, then generated-storage destinations not already covered.
    pub fn generated_storage(&self) -> Vec<&Property> {
        let mut storage: Vec<&Property> = self.state_outlets.iter().collect();
        for destination in &self.destinations {
            if destination.storage == DestinationStorage::Generated
                && !storage.iter().any(|p| p.name == destination.property.name)
            {
                storage.push(&destination.property);
            }
        }
        storage
    }
}

/// Classify the members of a feature struct.
///
/// Never fails: members that cannot be extracted are reported and left out,
/// every other member is still classified.
pub fn classify(decl: &StructDecl, config: &ExpansionConfig) -> (Classification, Diagnostics) {
    let markers = &config.markers;
    let mut diagnostics = Diagnostics::new(config.diagnostic_domain.as_str());
    let mut classification = Classification {
        feature: decl.name.text.clone(),
        generic_parameters: decl.generic_parameters.clone(),
        where_clause: decl.where_clause.clone(),
        ..Classification::default()
    };

    for member in &decl.members {
        match member {
            Decl::Variable(variable) => {
                let is_outlet = variable.has_attribute(&markers.outlet);
                let is_destination = variable.has_attribute(&markers.destination);
                if !is_outlet && !is_destination {
                    continue;
                }

                // Extracted once even when both markers are present.
                let properties = extract_identifiers_and_types(variable, &mut diagnostics);

                if is_outlet {
                    let bucket = match outlet_kind(variable, config) {
                        OutletKind::State => &mut classification.state_outlets,
                        OutletKind::Writable => &mut classification.writable_outlets,
                        OutletKind::ReadOnly => &mut classification.readonly_outlets,
                    };
                    bucket.extend(properties.iter().cloned());
                }

                if is_destination {
                    let storage = destination_storage(variable, config);
                    classification
                        .destinations
                        .extend(properties.into_iter().map(|property| Destination {
                            property,
                            storage,
                        }));
                }
            }
            Decl::Function(function) if function.has_attribute(&markers.action) => {
                // A variadic argument cannot be passed on to another call.
                if let Some(variadic) = function.parameters.iter().find(|p| p.is_variadic()) {
                    diagnostics.report(variadic.span, DiagnosticKind::VariadicParameter);
                    continue;
                }
                classification.actions.push(extract_action(function));
            }
            _ => {}
        }
    }

    debug!(
        feature = %classification.feature,
        state = classification.state_outlets.len(),
        writable = classification.writable_outlets.len(),
        readonly = classification.readonly_outlets.len(),
        actions = classification.actions.len(),
        destinations = classification.destinations.len(),
        diagnostics = diagnostics.len(),
        "classified feature"
    );

    (classification, diagnostics)
}

/// Argument names of a generic parameter clause: `<T: P, each U>` gives
/// `T` and `repeat each U`.
fn generic_arguments(clause: &str) -> Vec<String> {
    let inner = clause.trim().trim_start_matches('<').trim_end_matches('>');
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                arguments.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    arguments.push(&inner[start..]);

    arguments
        .into_iter()
        .filter_map(|parameter| {
            let name = parameter.split(':').next().unwrap_or_default().trim();
            if name.is_empty() {
                None
            } else if name.starts_with("each ") {
                Some(format!("repeat {name}"))
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutletKind {
    State,
    Writable,
    ReadOnly,
}

fn outlet_kind(variable: &VariableDecl, config: &ExpansionConfig) -> OutletKind {
    let fetched = variable.has_attribute(&config.markers.fetched);
    let private_set = variable.is_setter_private();

    if fetched {
        // The fetched accessor replaces the storage with a getter.
        OutletKind::ReadOnly
    } else if variable.specifier == BindingSpecifier::Var
        && variable.is_stored_property()
        && !private_set
    {
        OutletKind::State
    } else if variable.is_writable() && !private_set {
        OutletKind::Writable
    } else {
        OutletKind::ReadOnly
    }
}

fn destination_storage(variable: &VariableDecl, config: &ExpansionConfig) -> DestinationStorage {
    let markers = config.markers.member_markers();
    let only_markers = variable
        .attributes
        .iter()
        .all(|a| markers.contains(&a.name.as_str()));

    if variable.specifier == BindingSpecifier::Var
        && variable.is_stored_property()
        && only_markers
    {
        DestinationStorage::Generated
    } else {
        DestinationStorage::Projected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_source;
    use pretty_assertions::assert_eq;

    fn classify_source(source: &str) -> (Classification, Diagnostics) {
        let file = parse_source(source).unwrap();
        let decl = file.decls[0].as_struct().unwrap();
        classify(decl, &ExpansionConfig::default())
    }

    fn names(props: &[Property]) -> Vec<&str> {
        props.iter().map(|p| p.name.as_str()).collect()
    }

    const COUNTER: &str = r#"struct CounterFeature {
    @State private var counter = 0

    @Outlet private(set) var count: Int {
        get { counter }
        set { counter = newValue }
    }
    @Outlet var isResettable: Bool { counter != 0 }
    @Outlet var greeting: String = "Hello"
    @Outlet var name: String {
        get { _name }
        nonmutating set { _name = newValue }
    }

    @Destination var destinationView: Text? = Text("Destination")

    @Action func increment() {
        counter += 1
    }

    @Action func set(_ value: Int) {
        counter = value
    }

    func helper() {}
}"#;

    #[test]
    fn test_counter_buckets() {
        let (c, diagnostics) = classify_source(COUNTER);
        assert!(diagnostics.is_empty());
        assert_eq!(c.feature, "CounterFeature");
        assert_eq!(names(&c.state_outlets), vec!["greeting"]);
        assert_eq!(names(&c.writable_outlets), vec!["name"]);
        assert_eq!(names(&c.readonly_outlets), vec!["count", "isResettable"]);
        let actions: Vec<_> = c.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(actions, vec!["increment", "set"]);
        assert_eq!(c.destinations.len(), 1);
        assert_eq!(c.destinations[0].storage, DestinationStorage::Generated);
    }

    #[test]
    fn test_private_setter_on_stored_var_is_read_only() {
        let (c, _) = classify_source("struct S {\n    @Outlet private(set) var x: Int = 0\n}");
        assert!(c.state_outlets.is_empty());
        assert!(c.writable_outlets.is_empty());
        assert_eq!(names(&c.readonly_outlets), vec!["x"]);
    }

    #[test]
    fn test_private_var_without_set_detail_is_still_state() {
        let (c, _) = classify_source("struct S {\n    @Outlet private var x: Int = 0\n}");
        assert_eq!(names(&c.state_outlets), vec!["x"]);
    }

    #[test]
    fn test_observers_keep_state_eligibility() {
        let source = "struct S {\n    @Outlet var x: Int = 0 {\n        didSet { print(x) }\n    }\n}";
        let (c, _) = classify_source(source);
        assert_eq!(names(&c.state_outlets), vec!["x"]);
    }

    #[test]
    fn test_let_is_read_only() {
        let (c, _) = classify_source("struct S {\n    @Outlet let x: Int = 0\n}");
        assert_eq!(names(&c.readonly_outlets), vec!["x"]);
    }

    #[test]
    fn test_missing_type_drops_outlet() {
        let (c, diagnostics) = classify_source("struct S {\n    @Outlet var x = 0\n}");
        assert!(!c.has_outlets());
        let items = diagnostics.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, DiagnosticKind::TypeAnnotationMissing);
    }

    #[test]
    fn test_failure_does_not_block_siblings() {
        let source = "struct S {\n    @Outlet var a = 0\n    @Outlet var b: Int = 1\n}";
        let (c, diagnostics) = classify_source(source);
        assert_eq!(names(&c.state_outlets), vec!["b"]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_outlet_and_destination_reports_once() {
        let (c, diagnostics) = classify_source("struct S {\n    @Outlet @Destination var d = 0\n}");
        assert!(!c.has_outlets());
        assert!(!c.has_destinations());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_outlet_and_destination_share_storage() {
        let source = "struct S {\n    @Outlet @Destination var d: Text? = nil\n}";
        let (c, _) = classify_source(source);
        assert_eq!(names(&c.state_outlets), vec!["d"]);
        assert_eq!(c.destinations.len(), 1);
        assert_eq!(c.generated_storage().len(), 1);
    }

    #[test]
    fn test_wrapped_destination_is_projected() {
        let source = "struct S {\n    @Destination @State var sheet: Sheet? = nil\n    @Destination var computed: Sheet? { nil }\n}";
        let (c, _) = classify_source(source);
        assert_eq!(c.destinations[0].storage, DestinationStorage::Projected);
        assert_eq!(c.destinations[1].storage, DestinationStorage::Projected);
        assert!(c.generated_storage().is_empty());
    }

    #[test]
    fn test_fetched_outlet_is_read_only() {
        let (c, _) = classify_source("struct S {\n    @Outlet @Fetched var items: [Item]\n}");
        assert_eq!(names(&c.readonly_outlets), vec!["items"]);
    }

    #[test]
    fn test_unmarked_members_are_ignored() {
        let (c, diagnostics) = classify_source("struct S {\n    var a = 0\n    func f() {}\n}");
        assert_eq!(c, Classification { feature: "S".into(), ..Classification::default() });
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unicode_outlet_names() {
        let source = "struct S {\n    @Outlet var größe: Int = 0\n    @Outlet var ok: Int = 1\n}";
        let (c, diagnostics) = classify_source(source);
        assert!(diagnostics.is_empty());
        assert_eq!(names(&c.state_outlets), vec!["größe", "ok"]);
    }

    #[test]
    fn test_unicode_action_parameter() {
        let (c, diagnostics) = classify_source("struct S {\n    @Action func go(ü: String) {}\n}");
        assert!(diagnostics.is_empty());
        assert_eq!(c.actions[0].parameters[0].first_name, "ü");
    }

    #[test]
    fn test_variadic_action_is_reported() {
        let source = "struct S {\n    @Action func add(_ values: Int...) {}\n    @Action func go() {}\n}";
        let (c, diagnostics) = classify_source(source);
        let actions: Vec<_> = c.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(actions, vec!["go"]);
        let items = diagnostics.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, DiagnosticKind::VariadicParameter);
        assert_eq!(items[0].span.text(source), "_ values: Int...");
    }

    #[test]
    fn test_generic_feature_type() {
        let source = "struct S<T: Equatable, U> where U: Sendable {\n    @Outlet var x: T\n}";
        let (c, _) = classify_source(source);
        assert_eq!(c.feature_type(), "S<T, U>");
        assert_eq!(c.specialize("SOutlets"), "SOutlets<T, U>");
        assert_eq!(c.generic_declaration("SOutlets"), "SOutlets<T: Equatable, U>");
        assert_eq!(c.where_suffix(), " where U: Sendable");
    }

    #[test]
    fn test_plain_feature_type() {
        let (c, _) = classify_source("struct S {\n}");
        assert_eq!(c.feature_type(), "S");
        assert_eq!(c.generic_declaration("SBox"), "SBox");
        assert_eq!(c.where_suffix(), "");
    }

    #[test]
    fn test_generic_arguments_skip_nested_commas() {
        assert_eq!(
            generic_arguments("<K: Hashable, V: Collection<Dictionary<K, Int>>, each E>"),
            vec!["K", "V", "repeat each E"]
        );
    }

    #[test]
    fn test_classification_is_repeatable() {
        let first = classify_source(COUNTER);
        let second = classify_source(COUNTER);
        assert_eq!(first.0, second.0);
    }
}
