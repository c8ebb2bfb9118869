//! Query Execution Module
//!
//! This module executes translated queries and reshapes their results.
//!
//! # Components
//!
//! - **SparqlEndpoint** - Remote SPARQL protocol client with a fixed timeout
//! - **ResultGraph** - In-memory graph holding a CONSTRUCT/DESCRIBE result
//! - **ODataFeedGenerator** - Materializes typed entries and feeds from graphs
//!
//! # Architecture
//!
//! The execution layer sits between the query model and the wire writer. It
//! orchestrates:
//!
//! 1. One query round trip to the configured endpoint
//! 2. Loading the returned graph into an embedded store
//! 3. Ordering reconciliation via a re-executed tuple query
//! 4. Typed property coercion into entry/feed payloads

pub mod feed_generator;
pub mod result_graph;
pub mod sparql_endpoint;

// Re-export main types for convenience
pub use feed_generator::ODataFeedGenerator;
pub use result_graph::ResultGraph;
pub use sparql_endpoint::{SparqlEndpoint, SparqlResultSet};
