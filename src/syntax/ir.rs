//! Declaration IR: the tagged-union tree the feature pass operates on.
//!
//! The IR is deliberately shallow. Declarations, bindings, accessors and
//! parameters are structured; types, initializer expressions and bodies are
//! carried as raw source text. Every node records its byte [`Span`] so
//! diagnostics and source edits can point back at the original text.
//!
//! The tree is `serde`-serialisable and versioned by [`IR_VERSION`], so a host
//! that already has a syntax tree can hand the pass an IR document instead of
//! source text.

use serde::{Deserialize, Serialize};

use crate::syntax::span::Span;

/// Version of the IR document format.
pub const IR_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// File and declarations
// ---------------------------------------------------------------------------

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub version: u32,
    pub decls: Vec<Decl>,
}

impl SourceFile {
    pub fn new(decls: Vec<Decl>) -> Self {
        Self {
            version: IR_VERSION,
            decls,
        }
    }

    /// Find a top-level struct by name.
    pub fn struct_named(&self, name: &str) -> Option<&StructDecl> {
        self.decls.iter().find_map(|decl| match decl {
            Decl::Struct(s) if s.name.text == name => Some(s),
            _ => None,
        })
    }
}

/// Any declaration, at file level or inside a struct body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum Decl {
    Struct(StructDecl),
    Nominal(NominalDecl),
    Variable(VariableDecl),
    Function(FunctionDecl),
    Other(OtherDecl),
}

impl Decl {
    pub fn attributes(&self) -> &[Attribute] {
        match self {
            Decl::Struct(d) => &d.attributes,
            Decl::Nominal(d) => &d.attributes,
            Decl::Variable(d) => &d.attributes,
            Decl::Function(d) => &d.attributes,
            Decl::Other(d) => &d.attributes,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Struct(d) => d.span,
            Decl::Nominal(d) => d.span,
            Decl::Variable(d) => d.span,
            Decl::Function(d) => d.span,
            Decl::Other(d) => d.span,
        }
    }

    /// Returns `true` if an attribute with exactly this name is attached.
    pub fn has_attribute(&self, name: &str) -> bool {
        has_attribute(self.attributes(), name)
    }

    pub fn as_struct(&self) -> Option<&StructDecl> {
        match self {
            Decl::Struct(s) => Some(s),
            _ => None,
        }
    }
}

/// Attribute matching is purely by name; no semantic resolution.
pub fn has_attribute(attributes: &[Attribute], name: &str) -> bool {
    attributes.iter().any(|a| a.name == name)
}

/// A name token with its span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub text: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

/// `name` without the backticks of an escaped identifier. Names derived from
/// it (`$name`, `_nameStorage`) must not carry them.
pub fn bare_name(name: &str) -> &str {
    name.strip_prefix('`')
        .and_then(|n| n.strip_suffix('`'))
        .unwrap_or(name)
}

/// An attribute such as `@Outlet`, `@Presentation<Feature>` or
/// `@available(iOS 17, *)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Name without the leading `@`.
    pub name: String,
    /// Generic arguments as written, e.g. `["CounterFeature"]`.
    pub generic_arguments: Vec<String>,
    /// Raw text between the argument parentheses, if any.
    pub arguments: Option<String>,
    pub span: Span,
}

impl Attribute {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_arguments: Vec::new(),
            arguments: None,
            span: Span::default(),
        }
    }
}

/// A declaration modifier such as `public`, `static` or `private(set)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    /// Parenthesised detail: `set` in `private(set)`.
    pub detail: Option<String>,
    pub span: Span,
}

impl Modifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: None,
            span: Span::default(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// `private(set)`: the setter is not reachable from sibling declarations.
    pub fn is_private_set(&self) -> bool {
        self.name == "private" && self.detail.as_deref() == Some("set")
    }

    /// Source spelling, e.g. `private(set)`.
    pub fn to_source(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}({})", self.name, detail),
            None => self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Type declarations
// ---------------------------------------------------------------------------

/// A `struct` declaration with its parsed members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<Modifier>,
    pub name: Identifier,
    pub generic_parameters: Option<String>,
    pub inherited: Vec<String>,
    /// Requirements after `where`, without the keyword.
    #[serde(default)]
    pub where_clause: Option<String>,
    pub members: Vec<Decl>,
    /// From the first attribute to the closing brace.
    pub span: Span,
    /// From the opening to the closing brace, inclusive.
    pub body: Span,
}

impl StructDecl {
    pub fn variable_decls(&self) -> impl Iterator<Item = &VariableDecl> {
        self.members.iter().filter_map(|m| match m {
            Decl::Variable(v) => Some(v),
            _ => None,
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        has_attribute(&self.attributes, name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Kind of a non-struct type-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NominalKind {
    Class,
    Enum,
    Actor,
    Protocol,
    Extension,
}

impl NominalKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "class" => Some(NominalKind::Class),
            "enum" => Some(NominalKind::Enum),
            "actor" => Some(NominalKind::Actor),
            "protocol" => Some(NominalKind::Protocol),
            "extension" => Some(NominalKind::Extension),
            _ => None,
        }
    }
}

/// A class, enum, actor, protocol or extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NominalDecl {
    pub kind: NominalKind,
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<Modifier>,
    pub name: Identifier,
    /// Body declarations. Empty when the body could not be parsed and was
    /// kept as raw text.
    #[serde(default)]
    pub members: Vec<Decl>,
    pub span: Span,
}

/// Anything else: imports, initializers, typealiases, `#Preview` blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherDecl {
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<Modifier>,
    pub text: String,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// `let` or `var`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSpecifier {
    Let,
    Var,
}

/// A property declaration: `@Outlet private(set) var count: Int { ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<Modifier>,
    pub specifier: BindingSpecifier,
    pub bindings: Vec<PatternBinding>,
    pub span: Span,
}

impl VariableDecl {
    pub fn has_attribute(&self, name: &str) -> bool {
        has_attribute(&self.attributes, name)
    }

    /// A stored property has exactly one binding and at most property
    /// observers (`willSet`/`didSet`), never `get`/`set` or an implicit getter.
    pub fn is_stored_property(&self) -> bool {
        let [binding] = self.bindings.as_slice() else {
            return false;
        };
        match &binding.accessor_block {
            None => true,
            Some(AccessorBlock::Getter { .. }) => false,
            Some(AccessorBlock::Accessors { accessors, .. }) => {
                accessors.iter().all(|a| a.kind.is_observer())
            }
        }
    }

    /// `var` that is either stored or has a `set` accessor.
    pub fn is_writable(&self) -> bool {
        if self.specifier != BindingSpecifier::Var {
            return false;
        }
        self.is_stored_property() || self.bindings.iter().any(PatternBinding::has_setter)
    }

    pub fn is_setter_private(&self) -> bool {
        self.modifiers.iter().any(Modifier::is_private_set)
    }
}

/// One `pattern: Type = value { accessors }` entry of a variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternBinding {
    pub pattern: Pattern,
    pub type_annotation: Option<TypeAnnotation>,
    pub initializer: Option<Initializer>,
    pub accessor_block: Option<AccessorBlock>,
    pub span: Span,
}

impl PatternBinding {
    pub fn has_setter(&self) -> bool {
        match &self.accessor_block {
            Some(AccessorBlock::Accessors { accessors, .. }) => {
                accessors.iter().any(|a| a.kind == AccessorKind::Set)
            }
            _ => false,
        }
    }

    /// Property observers, in source order.
    pub fn observers(&self) -> Vec<&Accessor> {
        match &self.accessor_block {
            Some(AccessorBlock::Accessors { accessors, .. }) => {
                accessors.iter().filter(|a| a.kind.is_observer()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// The left-hand side of a binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    Identifier(Identifier),
    Wildcard { span: Span },
    /// Tuple or other complex pattern, kept as text.
    Complex { text: String, span: Span },
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(ident) => ident.span,
            Pattern::Wildcard { span } | Pattern::Complex { span, .. } => *span,
        }
    }

    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Pattern::Identifier(ident) => Some(ident),
            _ => None,
        }
    }
}

/// `: Type`, with the type kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub ty: String,
    /// Span of the type itself (after the colon).
    pub span: Span,
}

/// `= expression`, with the expression kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initializer {
    pub value: String,
    /// Span of the expression (after the equals sign).
    pub span: Span,
}

/// The braces after a binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessorBlock {
    /// `{ get { ... } set { ... } }` or `{ didSet { ... } }`.
    Accessors { accessors: Vec<Accessor>, span: Span },
    /// `{ counter != 0 }`: an implicit getter body.
    Getter { body: String, span: Span },
}

impl AccessorBlock {
    pub fn span(&self) -> Span {
        match self {
            AccessorBlock::Accessors { span, .. } | AccessorBlock::Getter { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessorKind {
    Get,
    Set,
    WillSet,
    DidSet,
    Read,
    Modify,
    Init,
}

impl AccessorKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "get" => Some(AccessorKind::Get),
            "set" => Some(AccessorKind::Set),
            "willSet" => Some(AccessorKind::WillSet),
            "didSet" => Some(AccessorKind::DidSet),
            "_read" => Some(AccessorKind::Read),
            "_modify" => Some(AccessorKind::Modify),
            "init" => Some(AccessorKind::Init),
            _ => None,
        }
    }

    pub fn is_observer(self) -> bool {
        matches!(self, AccessorKind::WillSet | AccessorKind::DidSet)
    }
}

/// A single accessor: `nonmutating set(value) { ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessor {
    pub kind: AccessorKind,
    /// `mutating` / `nonmutating`.
    pub modifiers: Vec<String>,
    /// Explicit parameter name, e.g. `value` in `set(value)`.
    pub parameter: Option<String>,
    /// `async`, `throws` on getters.
    pub effects: Vec<String>,
    /// Raw text between the braces; `None` for protocol-style requirements.
    pub body: Option<String>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<Modifier>,
    pub name: Identifier,
    /// Raw generic parameter clause including angle brackets.
    pub generic_parameters: Option<String>,
    pub parameters: Vec<Parameter>,
    /// Effect specifiers in order: `async`, `throws`, `throws(E)`, `rethrows`.
    pub effects: Vec<String>,
    pub return_type: Option<String>,
    /// Raw `where` clause without the keyword.
    pub where_clause: Option<String>,
    /// Raw text between the body braces.
    pub body: Option<String>,
    pub span: Span,
}

impl FunctionDecl {
    pub fn has_attribute(&self, name: &str) -> bool {
        has_attribute(&self.attributes, name)
    }

    pub fn is_async(&self) -> bool {
        self.effects.iter().any(|e| e == "async")
    }

    pub fn is_throwing(&self) -> bool {
        self.effects
            .iter()
            .any(|e| e.starts_with("throws") || e == "rethrows")
    }
}

/// A function parameter: `with number: Int = 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Argument label, or `_`.
    pub first_name: String,
    /// Bound name when it differs from the label.
    pub second_name: Option<String>,
    pub ty: String,
    pub default_value: Option<String>,
    pub span: Span,
}

impl Parameter {
    pub fn new(first_name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            second_name: None,
            ty: ty.into(),
            default_value: None,
            span: Span::default(),
        }
    }

    pub fn with_second_name(mut self, name: impl Into<String>) -> Self {
        self.second_name = Some(name.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Name the parameter is bound to inside the function body.
    pub fn bound_name(&self) -> &str {
        self.second_name.as_deref().unwrap_or(&self.first_name)
    }

    /// Label used at the call site, `None` for `_`.
    pub fn label(&self) -> Option<&str> {
        (self.first_name != "_").then_some(self.first_name.as_str())
    }

    pub fn is_inout(&self) -> bool {
        self.ty.split_whitespace().next() == Some("inout")
    }

    /// `_ values: Int...`
    pub fn is_variadic(&self) -> bool {
        self.ty.trim_end().ends_with("...")
    }

    /// Source spelling: `with number: Int = 0`.
    pub fn to_source(&self) -> String {
        let mut out = self.first_name.clone();
        if let Some(second) = &self.second_name {
            out.push(' ');
            out.push_str(second);
        }
        out.push_str(": ");
        out.push_str(&self.ty);
        if let Some(default) = &self.default_value {
            out.push_str(" = ");
            out.push_str(default);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str, accessor_block: Option<AccessorBlock>) -> PatternBinding {
        PatternBinding {
            pattern: Pattern::Identifier(Identifier::new(name, Span::default())),
            type_annotation: Some(TypeAnnotation {
                ty: "Int".into(),
                span: Span::default(),
            }),
            initializer: None,
            accessor_block,
            span: Span::default(),
        }
    }

    fn accessor(kind: AccessorKind) -> Accessor {
        Accessor {
            kind,
            modifiers: Vec::new(),
            parameter: None,
            effects: Vec::new(),
            body: Some(String::new()),
            span: Span::default(),
        }
    }

    fn variable(specifier: BindingSpecifier, bindings: Vec<PatternBinding>) -> VariableDecl {
        VariableDecl {
            attributes: Vec::new(),
            modifiers: Vec::new(),
            specifier,
            bindings,
            span: Span::default(),
        }
    }

    fn accessors(kinds: &[AccessorKind]) -> Option<AccessorBlock> {
        Some(AccessorBlock::Accessors {
            accessors: kinds.iter().copied().map(accessor).collect(),
            span: Span::default(),
        })
    }

    #[test]
    fn test_plain_var_is_stored_and_writable() {
        let v = variable(BindingSpecifier::Var, vec![binding("x", None)]);
        assert!(v.is_stored_property());
        assert!(v.is_writable());
    }

    #[test]
    fn test_observers_keep_property_stored() {
        let block = accessors(&[AccessorKind::WillSet, AccessorKind::DidSet]);
        let v = variable(BindingSpecifier::Var, vec![binding("x", block)]);
        assert!(v.is_stored_property());
    }

    #[test]
    fn test_get_set_is_computed_but_writable() {
        let block = accessors(&[AccessorKind::Get, AccessorKind::Set]);
        let v = variable(BindingSpecifier::Var, vec![binding("x", block)]);
        assert!(!v.is_stored_property());
        assert!(v.is_writable());
    }

    #[test]
    fn test_implicit_getter_is_read_only() {
        let block = Some(AccessorBlock::Getter {
            body: "42".into(),
            span: Span::default(),
        });
        let v = variable(BindingSpecifier::Var, vec![binding("x", block)]);
        assert!(!v.is_stored_property());
        assert!(!v.is_writable());
    }

    #[test]
    fn test_let_is_never_writable() {
        let v = variable(BindingSpecifier::Let, vec![binding("x", None)]);
        assert!(v.is_stored_property());
        assert!(!v.is_writable());
    }

    #[test]
    fn test_multiple_bindings_are_not_stored() {
        let v = variable(
            BindingSpecifier::Var,
            vec![binding("a", None), binding("b", None)],
        );
        assert!(!v.is_stored_property());
        assert!(!v.is_writable());
    }

    #[test]
    fn test_private_set_detection() {
        let mut v = variable(BindingSpecifier::Var, vec![binding("x", None)]);
        v.modifiers.push(Modifier::new("private"));
        assert!(!v.is_setter_private());
        v.modifiers.push(Modifier::new("private").with_detail("set"));
        assert!(v.is_setter_private());
        assert_eq!(v.modifiers[1].to_source(), "private(set)");
    }

    #[test]
    fn test_fileprivate_set_is_not_private_set() {
        let m = Modifier::new("fileprivate").with_detail("set");
        assert!(!m.is_private_set());
    }

    #[test]
    fn test_parameter_names() {
        let p = Parameter::new("with", "Int")
            .with_second_name("number")
            .with_default("0");
        assert_eq!(p.label(), Some("with"));
        assert_eq!(p.bound_name(), "number");
        assert_eq!(p.to_source(), "with number: Int = 0");

        let q = Parameter::new("_", "Int").with_second_name("value");
        assert_eq!(q.label(), None);
        assert_eq!(q.bound_name(), "value");
    }

    #[test]
    fn test_inout_parameter() {
        assert!(Parameter::new("value", "inout Int").is_inout());
        assert!(!Parameter::new("inoutValue", "Int").is_inout());
    }

    #[test]
    fn test_ir_round_trips_through_json() {
        let file = SourceFile::new(vec![Decl::Variable(variable(
            BindingSpecifier::Var,
            vec![binding("x", None)],
        ))]);
        let json = serde_json::to_string(&file).unwrap();
        let back: SourceFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, file);
        assert_eq!(back.version, IR_VERSION);
    }
}
