//! Mapping between the entity-relationship metadata model and RDF identifiers.

pub mod name_mapping;
pub mod sparql_map;

pub use name_mapping::NameMapping;
pub use sparql_map::{PropertyInfo, SparqlMap};
