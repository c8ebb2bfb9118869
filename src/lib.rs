//! # OData SPARQL
//!
//! An OData query endpoint for SPARQL graph stores. Incoming OData resource
//! paths and query options are parsed into a typed query tree, translated
//! into SPARQL against a configurable metadata-to-RDF mapping, executed
//! against a remote graph store, and the graph-shaped results are reshaped
//! back into entity and feed payloads.
//!
//! ## Pipeline
//!
//! 1. [`parsing::ODataParser`] turns a request URI into a [`odata::ast::QueryNode`] tree
//! 2. [`sparql::SparqlGenerator`] binds the tree to a [`sparql::SparqlModel`]
//! 3. The model renders SPARQL text and executes it via [`execution::SparqlEndpoint`]
//! 4. [`execution::ODataFeedGenerator`] materializes typed entries from the result graph
//!
//! ## Example
//!
//! ```ignore
//! use odata_sparql::mapping::{NameMapping, SparqlMap};
//! use odata_sparql::metadata::EdmModel;
//! use odata_sparql::parsing::ODataParser;
//! use odata_sparql::sparql::SparqlGenerator;
//! use std::sync::Arc;
//!
//! let model = Arc::new(EdmModel::from_file("dbpedia.metadata.json")?);
//! let map = SparqlMap::new(
//!     Arc::clone(&model),
//!     "http://dbpedia.org/ontology/",
//!     NameMapping::Unchanged,
//!     Some("http://dbpedia.org/ontology/"),
//!     Some(NameMapping::LowerCamelCase),
//! );
//!
//! let parser = ODataParser::new(&model)?;
//! let query = parser.parse_path_and_query("Films?$top=10")?;
//! let generator = SparqlGenerator::new(&map, "en");
//! let sparql = generator.process_query(&query)?.sparql_representation();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

/// Service settings and the per-endpoint registry
pub mod config;

/// Error types and result alias
pub mod error;

/// Query execution and result materialization
pub mod execution;

/// HTTP surface of the OData service
pub mod http;

/// Metadata-to-RDF identifier mapping
pub mod mapping;

/// Entity-relationship metadata model
pub mod metadata;

/// Query tree and payload data structures
pub mod odata;

/// OData URI and expression parsing
pub mod parsing;

/// SPARQL pattern primitives, query model and generator
pub mod sparql;

pub use error::{Error, Result};
