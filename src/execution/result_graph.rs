//! In-memory RDF graph holding the result of a CONSTRUCT/DESCRIBE query.
//!
//! The returned triples are loaded into an embedded store so the
//! materializer can both look up individual property values and re-run a
//! tuple query over the result when the original ordering has to be
//! re-established.

use std::collections::HashMap;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{Quad, Term};
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;

use crate::error::{Error, Result};
use crate::sparql::RDF_TYPE;

/// An executed graph result, queryable locally.
pub struct ResultGraph {
    store: Store,
}

impl ResultGraph {
    /// Creates an empty graph.
    pub fn new() -> Result<Self> {
        Ok(ResultGraph {
            store: Store::new()?,
        })
    }

    /// Loads a graph from N-Triples bytes as returned by the endpoint.
    pub fn from_ntriples(data: &[u8]) -> Result<Self> {
        let graph = Self::new()?;
        let parser = RdfParser::from_format(RdfFormat::NTriples);
        for quad in parser.for_slice(data) {
            let quad =
                quad.map_err(|e| Error::Transport(format!("cannot parse endpoint response: {}", e)))?;
            graph.store.insert(&quad)?;
        }
        Ok(graph)
    }

    /// Inserts a single quad; used when assembling graphs programmatically.
    pub fn insert(&self, quad: &Quad) -> Result<()> {
        self.store.insert(quad)?;
        Ok(())
    }

    /// Number of triples in the graph.
    pub fn len(&self) -> Result<usize> {
        Ok(self.store.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.is_empty()?)
    }

    /// All subjects carrying an `rdf:type` triple with the given class.
    pub fn subjects_of_type(&self, type_uri: &str) -> Result<Vec<String>> {
        let query = format!("SELECT ?s WHERE {{ ?s <{}> <{}> }}", RDF_TYPE, type_uri);
        let rows = self.evaluate_select(&query)?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| match row.remove("s") {
                Some(Term::NamedNode(node)) => Some(node.into_string()),
                _ => None,
            })
            .collect())
    }

    /// First object of a subject/predicate pair, if any.
    pub fn first_object(&self, subject_uri: &str, predicate_uri: &str) -> Result<Option<Term>> {
        let query = format!(
            "SELECT ?o WHERE {{ <{}> <{}> ?o }} LIMIT 1",
            subject_uri, predicate_uri
        );
        let rows = self.evaluate_select(&query)?;
        Ok(rows.into_iter().next().and_then(|mut row| row.remove("o")))
    }

    /// Evaluates a SPARQL SELECT query over this graph and returns the
    /// solutions in evaluation order.
    pub fn evaluate_select(&self, query: &str) -> Result<Vec<HashMap<String, Term>>> {
        let evaluator = SparqlEvaluator::new();
        let prepared = evaluator
            .parse_query(query)
            .map_err(|e| Error::Store(e.to_string()))?;
        let results = prepared.on_store(&self.store).execute()?;
        let mut rows = Vec::new();
        if let QueryResults::Solutions(solutions) = results {
            for solution in solutions {
                let solution = solution?;
                let mut row = HashMap::new();
                for (variable, term) in solution.iter() {
                    row.insert(variable.as_str().to_string(), term.clone());
                }
                rows.push(row);
            }
        }
        Ok(rows)
    }
}
