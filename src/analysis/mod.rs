//! Declaration analysis: signature extraction and member classification.

pub mod classify;
pub mod extract;

pub use classify::{classify, Classification, Destination, DestinationStorage};
pub use extract::{extract_action, extract_identifiers_and_types, ActionSignature, Property};
