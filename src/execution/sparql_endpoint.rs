//! Remote SPARQL protocol client.
//!
//! Issues exactly one query execution per call against a configured
//! endpoint, with a fixed timeout and no retries. CONSTRUCT/DESCRIBE
//! results are negotiated as N-Triples and loaded into a [`ResultGraph`];
//! SELECT results are negotiated as the SPARQL JSON results format.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::execution::result_graph::ResultGraph;

/// Tabular result of a SELECT query
#[derive(Debug, Clone)]
pub struct SparqlResultSet {
    pub variables: Vec<String>,
    /// One map of variable name to bound value per solution
    pub rows: Vec<HashMap<String, String>>,
}

/// A remote SPARQL query endpoint
pub struct SparqlEndpoint {
    url: String,
    default_graph_uri: Option<String>,
    client: reqwest::Client,
}

impl SparqlEndpoint {
    /// Creates a client for one endpoint URL.
    ///
    /// The timeout covers the whole round trip; an expired timeout surfaces
    /// as a transport error.
    pub fn new(
        url: impl Into<String>,
        default_graph_uri: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(SparqlEndpoint {
            url: url.into(),
            default_graph_uri,
            client,
        })
    }

    /// The endpoint URL this client talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Executes a CONSTRUCT or DESCRIBE query and returns the result graph.
    pub async fn execute_construct(&self, query: &str) -> Result<ResultGraph> {
        let body = self.send(query, "application/n-triples").await?;
        ResultGraph::from_ntriples(&body)
    }

    /// Executes a SELECT query and returns its solutions.
    pub async fn execute_select(&self, query: &str) -> Result<SparqlResultSet> {
        let body = self.send(query, "application/sparql-results+json").await?;
        let document: ResultsDocument = serde_json::from_slice(&body)
            .map_err(|e| Error::Transport(format!("cannot parse SPARQL results document: {}", e)))?;
        Ok(document.into_result_set())
    }

    async fn send(&self, query: &str, accept: &str) -> Result<Vec<u8>> {
        debug!("sending query to {}: {}", self.url, query);
        let mut form: Vec<(&str, &str)> = vec![("query", query)];
        if let Some(graph) = &self.default_graph_uri {
            form.push(("default-graph-uri", graph));
        }
        let response = self
            .client
            .post(&self.url)
            .header("Accept", accept)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::Transport(format!(
                "query failed with status {}: {}",
                status, body
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// The SPARQL 1.1 JSON results document
#[derive(Debug, Deserialize)]
struct ResultsDocument {
    #[serde(default)]
    head: ResultsHead,
    #[serde(default)]
    results: ResultsBody,
}

#[derive(Debug, Default, Deserialize)]
struct ResultsHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultsBody {
    #[serde(default)]
    bindings: Vec<HashMap<String, ResultsBinding>>,
}

#[derive(Debug, Deserialize)]
struct ResultsBinding {
    value: String,
}

impl ResultsDocument {
    fn into_result_set(self) -> SparqlResultSet {
        SparqlResultSet {
            variables: self.head.vars,
            rows: self
                .results
                .bindings
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(name, binding)| (name, binding.value))
                        .collect()
                })
                .collect(),
        }
    }
}
