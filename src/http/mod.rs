//! HTTP API module for the OData service
//!
//! Provides the inbound OData surface:
//! - Per-endpoint service documents
//! - Entity set, key lookup and navigation queries with query options

pub mod server;

pub use server::{
    create_server, start_server, ApiError, ErrorResponse, ServiceDocumentEntry,
    ServiceDocumentResponse,
};
