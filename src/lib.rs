//! # flex-codegen
//!
//! Source-to-source expansion for the Flex feature macros.
//!
//! A feature is a Swift struct whose members are marked `@Outlet`, `@Action`
//! or `@Destination`. `@Feature` classifies those members and synthesizes
//! the proxy types a view talks to (`Outlets`, `Actions`, `Destinations`),
//! the `Box` that owns them, state storage, and the runtime conformances.
//! `@Presentation<Feature>` wires a view to that box and `@Fetched` backs a
//! property with a persistent-store fetcher.
//!
//! ## Core Systems
//!
//! - **[`syntax`]**: tokenizer, declaration parser and the syntax tree
//! - **[`analysis`]**: signature extraction and member classification
//! - **[`synth`]**: generated proxies, box, members, accessors, extensions
//! - **[`expand`]**: attached macros, roles, and whole-file expansion
//! - **[`diagnostics`]**: diagnostic kinds, collection and rendering
//! - **[`config`]**: marker names, runtime module and naming options
//!
//! ```
//! use flex_codegen::{expand_source, ExpansionConfig};
//!
//! let source = "@Feature\nstruct F {\n    @Outlet var count: Int = 0\n}\n";
//! let expanded = expand_source(source, &ExpansionConfig::default()).unwrap();
//! assert!(expanded.text.contains("public class FOutlets"));
//! ```

// Foundation
pub mod config;
pub mod diagnostics;
pub mod syntax;

// Analysis and generation
pub mod analysis;
pub mod synth;

// Driver
pub mod expand;

pub use analysis::{classify, Classification};
pub use config::{ConfigError, ExpansionConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use expand::{
    expand_all, expand_declaration, expand_source, ExpandedSource, Expansion, MacroRole,
    SynthesizedDecl,
};
pub use syntax::{parse_source, ParseError};
