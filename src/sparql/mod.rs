//! The SPARQL side of the translation: pattern primitives, the mutable
//! query model populated by the generator, and the generator itself.

pub mod generator;
pub mod model;
pub mod pattern;

pub use generator::SparqlGenerator;
pub use model::{RenderMode, SelectVariable, SparqlModel, SparqlVariableOrdering};
pub use pattern::{GraphPattern, PatternItem, TriplePattern};

/// The `rdf:type` predicate binding instances to their class
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
