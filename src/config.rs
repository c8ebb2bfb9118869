//! Service settings and the per-endpoint context registry.
//!
//! A settings document names one or more SPARQL endpoints, each with its
//! metadata document and RDF naming conventions. The registry constructs the
//! expensive per-endpoint pieces (metadata model, mapping, HTTP client)
//! exactly once per endpoint name behind a lock and hands out shared handles
//! afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::execution::sparql_endpoint::SparqlEndpoint;
use crate::mapping::name_mapping::NameMapping;
use crate::mapping::sparql_map::SparqlMap;
use crate::metadata::EdmModel;

fn default_timeout_secs() -> u64 {
    60
}

/// Configuration of one named SPARQL endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSettings {
    /// Name the endpoint is addressed by in request paths
    pub name: String,
    /// URL of the remote SPARQL query endpoint
    pub sparql_endpoint: String,
    #[serde(default)]
    pub default_graph_uri: Option<String>,
    /// Path to the metadata document describing the entity model
    pub metadata: String,
    /// Default namespace prefix for entity type identifiers
    pub type_namespace: String,
    /// Default namespace prefix for property identifiers; falls back to the
    /// type namespace
    #[serde(default)]
    pub property_namespace: Option<String>,
    #[serde(default)]
    pub type_name_mapping: NameMapping,
    #[serde(default)]
    pub property_name_mapping: Option<NameMapping>,
    /// Language tag applied to string constants in generated filters
    #[serde(default)]
    pub default_language_code: Option<String>,
    /// Round-trip timeout for outbound endpoint calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// The loaded service settings document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSettings {
    /// Base URI the OData service is published under (with trailing slash)
    pub odata_base: String,
    pub endpoints: Vec<EndpointSettings>,
}

impl ServiceSettings {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::Configuration(format!("cannot parse service settings: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Configuration(format!(
                "cannot read service settings {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    pub fn endpoint(&self, name: &str) -> Option<&EndpointSettings> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

/// The fully constructed runtime pieces of one endpoint
pub struct EndpointContext {
    pub settings: EndpointSettings,
    pub model: Arc<EdmModel>,
    pub map: Arc<SparqlMap>,
    pub endpoint: SparqlEndpoint,
}

impl EndpointContext {
    fn initialize(settings: &EndpointSettings) -> Result<Self> {
        let model = Arc::new(EdmModel::from_file(&settings.metadata)?);
        let map = Arc::new(SparqlMap::new(
            Arc::clone(&model),
            &settings.type_namespace,
            settings.type_name_mapping,
            settings.property_namespace.as_deref(),
            settings.property_name_mapping,
        ));
        let endpoint = SparqlEndpoint::new(
            settings.sparql_endpoint.clone(),
            settings.default_graph_uri.clone(),
            Duration::from_secs(settings.timeout_secs),
        )?;
        info!(
            "initialized endpoint {} against {}",
            settings.name, settings.sparql_endpoint
        );
        Ok(EndpointContext {
            settings: settings.clone(),
            model,
            map,
            endpoint,
        })
    }

    /// Language tag for generated string constants, empty when unset.
    pub fn default_language_code(&self) -> &str {
        self.settings.default_language_code.as_deref().unwrap_or("")
    }
}

/// Lock-guarded, once-per-name construction of endpoint contexts.
pub struct EndpointRegistry {
    settings: ServiceSettings,
    contexts: RwLock<HashMap<String, Arc<EndpointContext>>>,
}

impl EndpointRegistry {
    pub fn new(settings: ServiceSettings) -> Self {
        EndpointRegistry {
            settings,
            contexts: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Returns the context for a named endpoint, constructing it on first
    /// use. Construction happens-before any read because both go through
    /// the same lock.
    pub fn context(&self, name: &str) -> Result<Arc<EndpointContext>> {
        {
            let contexts = self
                .contexts
                .read()
                .map_err(|_| Error::Configuration("endpoint registry lock poisoned".to_string()))?;
            if let Some(context) = contexts.get(name) {
                return Ok(Arc::clone(context));
            }
        }
        let settings = self
            .settings
            .endpoint(name)
            .ok_or_else(|| Error::Configuration(format!("no endpoint named {}", name)))?
            .clone();
        let mut contexts = self
            .contexts
            .write()
            .map_err(|_| Error::Configuration("endpoint registry lock poisoned".to_string()))?;
        if let Some(context) = contexts.get(name) {
            return Ok(Arc::clone(context));
        }
        let context = Arc::new(EndpointContext::initialize(&settings)?);
        contexts.insert(name.to_string(), Arc::clone(&context));
        Ok(context)
    }
}
