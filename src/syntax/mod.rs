//! Swift declaration syntax: tokenizer, parser and the declaration IR.

pub mod ir;
pub mod parser;
pub mod span;
pub mod tokenizer;

pub use ir::*;
pub use parser::{parse_source, ParseError};
pub use span::{LineIndex, Position, Span};
