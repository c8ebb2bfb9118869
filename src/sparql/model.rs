//! The mutable translation target populated by the generator.
//!
//! A [`SparqlModel`] collects the graph pattern, selected variables,
//! ordering and pagination of one translated query, renders the final
//! SPARQL text, and dispatches execution results to the feed generator.
//! One instance serves exactly one translation and is then discarded.

use log::debug;

use crate::error::{Error, Result};
use crate::execution::feed_generator::ODataFeedGenerator;
use crate::execution::sparql_endpoint::SparqlEndpoint;
use crate::odata::feed::ODataPayload;
use crate::sparql::pattern::GraphPattern;

/// A selected output variable with its result shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectVariable {
    pub name: String,
    /// Qualified entity type the variable's bindings belong to
    pub entity_type: String,
    /// True when the variable stands for a collection of instances
    pub is_collection: bool,
}

/// One `ORDER BY` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlVariableOrdering {
    pub variable: String,
    pub descending: bool,
}

impl SparqlVariableOrdering {
    pub fn sparql_representation(&self) -> String {
        if self.descending {
            format!("DESC(?{})", self.variable)
        } else {
            format!("?{}", self.variable)
        }
    }
}

/// How the accumulated query renders and executes
#[derive(Debug, Clone, PartialEq)]
pub enum RenderMode {
    /// Plain tuple `SELECT` over the accumulated pattern
    Select,
    /// Graph-shaped query describing every selected variable's instances
    DescribeGraph,
    /// Graph-shaped query describing one already-identified resource
    DescribeResource {
        resource: String,
        /// Qualified entity type of the resource
        entity_type: String,
    },
}

/// The intermediate SPARQL query model.
pub struct SparqlModel {
    pub root_graph_pattern: GraphPattern,
    pub select_variables: Vec<SelectVariable>,
    pub mode: RenderMode,
    pub ordering: Vec<SparqlVariableOrdering>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    variable_counter: u64,
}

impl Default for SparqlModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SparqlModel {
    pub fn new() -> Self {
        SparqlModel {
            root_graph_pattern: GraphPattern::new(),
            select_variables: Vec::new(),
            mode: RenderMode::Select,
            ordering: Vec::new(),
            limit: None,
            offset: None,
            variable_counter: 0,
        }
    }

    /// Mints a fresh variable name. Names are never reused within one model.
    pub fn next_variable(&mut self) -> String {
        self.variable_counter += 1;
        format!("v{}", self.variable_counter)
    }

    /// The graph pattern currently being extended.
    ///
    /// Nested scopes are not generated yet, so this is always the root.
    pub fn current_graph_pattern(&self) -> &GraphPattern {
        &self.root_graph_pattern
    }

    /// Mutable access to the pattern currently being extended.
    pub fn current_graph_pattern_mut(&mut self) -> &mut GraphPattern {
        &mut self.root_graph_pattern
    }

    /// Records an output variable; repeated additions of the same name are
    /// ignored.
    pub fn add_select_variable(&mut self, name: &str, entity_type: &str, is_collection: bool) {
        if self.select_variables.iter().any(|v| v.name == name) {
            return;
        }
        self.select_variables.push(SelectVariable {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            is_collection,
        });
    }

    /// Switches to graph-shaped rendering of the selected variables.
    ///
    /// A single-resource target, once set, takes precedence and is kept.
    pub fn set_describe(&mut self) {
        if let RenderMode::Select = self.mode {
            self.mode = RenderMode::DescribeGraph;
        }
    }

    /// Targets the query at one fully-identified resource.
    pub fn select_entity(&mut self, resource: impl Into<String>, entity_type: impl Into<String>) {
        self.mode = RenderMode::DescribeResource {
            resource: resource.into(),
            entity_type: entity_type.into(),
        };
    }

    /// True when the model renders a graph-shaped query.
    pub fn is_describe(&self) -> bool {
        !matches!(self.mode, RenderMode::Select)
    }

    /// Entity type recorded for a selected variable or the describe target.
    pub fn entity_type_of(&self, variable_or_resource: &str) -> Option<&str> {
        if let RenderMode::DescribeResource {
            resource,
            entity_type,
        } = &self.mode
        {
            if resource == variable_or_resource {
                return Some(entity_type);
            }
        }
        self.select_variables
            .iter()
            .find(|v| v.name == variable_or_resource)
            .map(|v| v.entity_type.as_str())
    }

    /// Appends an `ORDER BY` key; keys chain in the order they are added.
    pub fn add_ordering(&mut self, variable: impl Into<String>, descending: bool) {
        self.ordering.push(SparqlVariableOrdering {
            variable: variable.into(),
            descending,
        });
    }

    /// Renders the SPARQL text for this model's render mode.
    ///
    /// Rendering is deterministic: the same model state always produces
    /// byte-identical text.
    pub fn sparql_representation(&self) -> String {
        match &self.mode {
            RenderMode::DescribeResource { resource, .. } => format!(
                "CONSTRUCT {{ <{0}> ?p ?o }} WHERE {{ <{0}> ?p ?o }}",
                resource
            ),
            RenderMode::DescribeGraph => {
                let described: Vec<String> = self
                    .select_variables
                    .iter()
                    .map(|v| format!("?{0} ?{0}_p ?{0}_o .", v.name))
                    .collect();
                let mut where_parts = described.clone();
                let pattern = self.root_graph_pattern.sparql_representation();
                if !pattern.is_empty() {
                    where_parts.push(pattern);
                }
                format!(
                    "CONSTRUCT {{ {} }} WHERE {{ {} }}{}",
                    described.join(" "),
                    where_parts.join(" "),
                    self.solution_modifiers()
                )
            }
            RenderMode::Select => self.select_representation(),
        }
    }

    /// Renders a plain tuple `SELECT` over the accumulated pattern,
    /// regardless of the render mode.
    pub fn select_representation(&self) -> String {
        format!(
            "SELECT {} WHERE {{ {} }}{}",
            self.projection(),
            self.root_graph_pattern.sparql_representation(),
            self.solution_modifiers()
        )
    }

    /// Renders the tuple query used to re-establish ordering over an
    /// already-returned result graph.
    ///
    /// Ordering and limit are reapplied; the offset is not, because the
    /// remote query has already skipped those solutions and the returned
    /// graph only contains the requested page.
    pub fn reconciliation_representation(&self) -> String {
        let mut text = format!(
            "SELECT {} WHERE {{ {} }}",
            self.projection(),
            self.root_graph_pattern.sparql_representation()
        );
        if !self.ordering.is_empty() {
            text.push_str(" ORDER BY ");
            text.push_str(&self.ordering_keys());
        }
        if let Some(limit) = self.limit {
            text.push_str(&format!(" LIMIT {}", limit));
        }
        text
    }

    /// Derives the count query used for pagination accounting.
    ///
    /// Only single-variable queries can be counted; anything else is an
    /// unsupported construct.
    pub fn count_representation(&self) -> Result<String> {
        if self.select_variables.len() != 1 {
            return Err(Error::UnsupportedConstruct(
                "count is only available for single-variable queries".to_string(),
            ));
        }
        Ok(format!(
            "SELECT (COUNT(?{}) AS ?count) WHERE {{ {} }}",
            self.select_variables[0].name,
            self.root_graph_pattern.sparql_representation()
        ))
    }

    fn projection(&self) -> String {
        if self.select_variables.is_empty() {
            "*".to_string()
        } else {
            self.select_variables
                .iter()
                .map(|v| format!("?{}", v.name))
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    fn ordering_keys(&self) -> String {
        self.ordering
            .iter()
            .map(|o| o.sparql_representation())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn solution_modifiers(&self) -> String {
        let mut text = String::new();
        if !self.ordering.is_empty() {
            text.push_str(" ORDER BY ");
            text.push_str(&self.ordering_keys());
        }
        if let Some(limit) = self.limit {
            text.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            text.push_str(&format!(" OFFSET {}", offset));
        }
        text
    }

    /// Executes this model against a remote endpoint and materializes the
    /// response.
    ///
    /// Exactly one query execution is issued per request (plus the count
    /// query when pagination was requested); transport failures are
    /// surfaced, never retried.
    pub async fn execute(
        &self,
        endpoint: &SparqlEndpoint,
        handler: &ODataFeedGenerator<'_>,
    ) -> Result<ODataPayload> {
        let query = self.sparql_representation();
        debug!("executing translated query: {}", query);
        match &self.mode {
            RenderMode::DescribeResource {
                resource,
                entity_type,
            } => {
                let graph = endpoint.execute_construct(&query).await?;
                let entry = handler.create_entry_from_graph(&graph, resource, entity_type)?;
                Ok(ODataPayload::Entry(entry))
            }
            RenderMode::DescribeGraph => {
                let graph = endpoint.execute_construct(&query).await?;
                let total = if self.limit.is_some() || self.offset.is_some() {
                    Some(self.execute_count(endpoint).await?)
                } else {
                    None
                };
                let feed = handler.create_feed_from_graph(&graph, self, total)?;
                Ok(ODataPayload::Feed(feed))
            }
            RenderMode::Select => {
                let result_set = endpoint.execute_select(&query).await?;
                let feed = handler.create_feed_from_result_set(&result_set)?;
                Ok(ODataPayload::Feed(feed))
            }
        }
    }

    async fn execute_count(&self, endpoint: &SparqlEndpoint) -> Result<u64> {
        let query = self.count_representation()?;
        debug!("executing count query: {}", query);
        let result_set = endpoint.execute_select(&query).await?;
        result_set
            .rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| {
                Error::Transport("count query returned no numeric binding".to_string())
            })
    }
}
