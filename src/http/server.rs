//! HTTP server for the OData query surface.
//!
//! Routes `GET /{endpoint}/{resource-path}` through the full pipeline:
//! parse the OData URI, translate it to SPARQL, execute against the
//! endpoint's graph store, materialize the result, and write the payload as
//! JSON. The endpoint root serves a service document listing entity sets.

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{info, warn};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::EndpointRegistry;
use crate::error::{Error, Result};
use crate::execution::feed_generator::ODataFeedGenerator;
use crate::odata::feed::ODataPayload;
use crate::parsing::odata_parser::ODataParser;
use crate::sparql::generator::SparqlGenerator;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One entity set advertised by the service document
#[derive(Debug, Serialize)]
pub struct ServiceDocumentEntry {
    pub name: String,
    pub url: String,
}

/// Service document listing an endpoint's entity sets
#[derive(Debug, Serialize)]
pub struct ServiceDocumentResponse {
    pub value: Vec<ServiceDocumentEntry>,
}

/// API errors mapped onto HTTP status codes
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    NotImplemented(String),
    BadGateway(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::Parse(_) => ApiError::BadRequest(err.to_string()),
            Error::UnsupportedConstruct(_) => ApiError::NotImplemented(err.to_string()),
            Error::Transport(_) => ApiError::BadGateway(err.to_string()),
            Error::Mapping(_) | Error::Configuration(_) | Error::Store(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

/// Create the HTTP server with all routes
pub fn create_server(registry: Arc<EndpointRegistry>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/:endpoint", get(service_document))
        .route("/:endpoint/", get(service_document))
        .route("/:endpoint/*resource", get(execute_query))
        .layer(cors)
        .with_state(registry)
}

/// GET /:endpoint - Service document listing the endpoint's entity sets
async fn service_document(
    State(registry): State<Arc<EndpointRegistry>>,
    Path(endpoint): Path<String>,
) -> std::result::Result<Json<ServiceDocumentResponse>, ApiError> {
    let context = resolve_endpoint(&registry, &endpoint)?;
    let base = service_base(&registry, &endpoint);
    let value = context
        .model
        .entity_sets
        .iter()
        .map(|set| ServiceDocumentEntry {
            name: set.name.clone(),
            url: format!("{}{}", base, set.name),
        })
        .collect();
    Ok(Json(ServiceDocumentResponse { value }))
}

/// GET /:endpoint/*resource - Translate and execute one OData query
async fn execute_query(
    State(registry): State<Arc<EndpointRegistry>>,
    Path((endpoint, resource)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> std::result::Result<Json<ODataPayload>, ApiError> {
    let context = resolve_endpoint(&registry, &endpoint)?;

    let relative = match &query {
        Some(options) => format!("{}?{}", resource, options),
        None => resource,
    };
    let parser = ODataParser::new(&context.model)?;
    let root = parser.parse_path_and_query(&relative)?;

    let generator = SparqlGenerator::new(&context.map, context.default_language_code());
    let model = generator.process_query(&root)?;

    let base = service_base(&registry, &endpoint);
    let feed_generator = ODataFeedGenerator::new(&context.map, &base);
    let payload = model.execute(&context.endpoint, &feed_generator).await?;
    Ok(Json(payload))
}

fn resolve_endpoint(
    registry: &EndpointRegistry,
    name: &str,
) -> std::result::Result<Arc<crate::config::EndpointContext>, ApiError> {
    if registry.settings().endpoint(name).is_none() {
        return Err(ApiError::NotFound(format!("no endpoint named {}", name)));
    }
    registry.context(name).map_err(|err| {
        warn!("endpoint {} failed to initialize: {}", name, err);
        ApiError::from(err)
    })
}

fn service_base(registry: &EndpointRegistry, endpoint: &str) -> String {
    format!(
        "{}/{}/",
        registry.settings().odata_base.trim_end_matches('/'),
        endpoint
    )
}

/// Start the HTTP server on the specified address
pub async fn start_server(addr: &str, registry: Arc<EndpointRegistry>) -> Result<()> {
    let app = create_server(registry);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Configuration(format!("cannot bind {}: {}", addr, e)))?;
    info!("OData SPARQL service listening on http://{}", addr);
    info!("  GET /:endpoint            - service document");
    info!("  GET /:endpoint/:resource  - entity queries with $filter/$top/$skip/$orderby");

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Configuration(format!("server error: {}", e)))?;

    Ok(())
}
