//! Entry and feed payloads produced by the result materializer.
//!
//! These are the structured values handed to the wire writer. The HTTP
//! adapter serializes them as JSON; other serializations can be layered on
//! without touching the materializer.

use serde::Serialize;

/// A typed property value carried by an entry.
///
/// `Decimal` and `DateTime` keep their lexical form so values round-trip
/// without precision loss.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal(String),
    DateTime(String),
    String(String),
}

/// One named property of an entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ODataProperty {
    pub name: String,
    pub value: PropertyValue,
}

/// A link from an entry to a related collection or entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ODataAssociationLink {
    pub name: String,
    pub url: String,
}

/// A single materialized entity
#[derive(Debug, Clone, Serialize)]
pub struct ODataEntry {
    pub type_name: String,
    pub id: String,
    pub read_link: String,
    pub properties: Vec<ODataProperty>,
    pub association_links: Vec<ODataAssociationLink>,
}

/// A materialized collection of entries
#[derive(Debug, Clone, Serialize)]
pub struct ODataFeed {
    pub id: String,
    /// Total number of matching entities before `$top`/`$skip` truncation
    pub count: u64,
    pub entries: Vec<ODataEntry>,
}

/// The payload of one completed request
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ODataPayload {
    Entry(ODataEntry),
    Feed(ODataFeed),
}
