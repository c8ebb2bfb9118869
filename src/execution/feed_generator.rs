//! Materialization of graph results into entry and feed payloads.
//!
//! Given a returned result graph and the metadata map, the feed generator
//! reconstructs typed entries: one per described resource, or one per
//! instance of the collection's class. Literal values are coerced to their
//! declared primitive type with a string-based second attempt, falling back
//! to null (nullable properties) or the type default (non-nullable ones);
//! coercion failures never abort a request. Association links are built
//! purely from identifier-prefix arithmetic, without further round trips.

use oxigraph::model::{Literal, Term};

use crate::error::{Error, Result};
use crate::execution::result_graph::ResultGraph;
use crate::execution::sparql_endpoint::SparqlResultSet;
use crate::mapping::sparql_map::SparqlMap;
use crate::metadata::PrimitiveType;
use crate::odata::feed::{
    ODataAssociationLink, ODataEntry, ODataFeed, ODataProperty, PropertyValue,
};
use crate::sparql::model::SparqlModel;

const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";
const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// Builds OData entry and feed payloads from executed query results.
pub struct ODataFeedGenerator<'a> {
    map: &'a SparqlMap,
    base_uri: &'a str,
}

impl<'a> ODataFeedGenerator<'a> {
    /// Creates a generator writing links under the given OData service base
    /// URI (with trailing slash).
    pub fn new(map: &'a SparqlMap, base_uri: &'a str) -> Self {
        ODataFeedGenerator { map, base_uri }
    }

    /// Builds the single entry for a described resource.
    pub fn create_entry_from_graph(
        &self,
        graph: &ResultGraph,
        resource: &str,
        entity_type: &str,
    ) -> Result<ODataEntry> {
        let id_prefix = self.map.resource_uri_prefix(entity_type)?;
        let resource_id = resource.strip_prefix(id_prefix).ok_or_else(|| {
            Error::Mapping(format!(
                "cannot create entry for resource {}: URI does not start with the expected prefix {}",
                resource, id_prefix
            ))
        })?;
        let entity_set = self.map.entity_set_name(entity_type)?;
        let odata_link = format!("{}{}('{}')", self.base_uri, entity_set, resource_id);

        let mut properties = Vec::new();
        for mapping in self.map.structural_property_mappings(entity_type)? {
            let Some(term) = graph.first_object(resource, &mapping.uri)? else {
                continue;
            };
            let Term::Literal(literal) = term else {
                continue;
            };
            let target = mapping.property_type.unwrap_or(PrimitiveType::String);
            properties.push(ODataProperty {
                name: mapping.name,
                value: literal_value(&literal, target, mapping.nullable),
            });
        }

        let association_links = self
            .map
            .association_property_mappings(entity_type)?
            .into_iter()
            .map(|mapping| ODataAssociationLink {
                url: format!("{}/{}", odata_link, mapping.name),
                name: mapping.name,
            })
            .collect();

        Ok(ODataEntry {
            type_name: entity_type.to_string(),
            id: odata_link.clone(),
            read_link: odata_link,
            properties,
            association_links,
        })
    }

    /// Builds a feed for a collection query result.
    ///
    /// When the original query carried an ordering, the ordering and limit
    /// are re-established by running the model's reconstituted tuple query
    /// over the returned graph, because the remote CONSTRUCT strategy does
    /// not guarantee result order. Without an ordering, every subject typed
    /// with the collection's class becomes an entry.
    pub fn create_feed_from_graph(
        &self,
        graph: &ResultGraph,
        model: &SparqlModel,
        total_count: Option<u64>,
    ) -> Result<ODataFeed> {
        let primary = model.select_variables.first().ok_or_else(|| {
            Error::Mapping("query model has no selected variable to materialize".to_string())
        })?;
        let entity_type = primary.entity_type.as_str();
        let type_uri = self
            .map
            .uri_for_type(entity_type)
            .ok_or_else(|| {
                Error::Mapping(format!("no RDF class mapping for entity type {}", entity_type))
            })?
            .to_string();

        let subjects: Vec<String> = if model.ordering.is_empty() {
            graph.subjects_of_type(&type_uri)?
        } else {
            let query = model.reconciliation_representation();
            graph
                .evaluate_select(&query)?
                .into_iter()
                .filter_map(|mut row| match row.remove(primary.name.as_str()) {
                    Some(Term::NamedNode(node)) => Some(node.into_string()),
                    _ => None,
                })
                .collect()
        };

        let entries = subjects
            .iter()
            .map(|subject| self.create_entry_from_graph(graph, subject, entity_type))
            .collect::<Result<Vec<_>>>()?;

        Ok(ODataFeed {
            id: format!("{}{}", self.base_uri, self.map.entity_set_name(entity_type)?),
            count: total_count.unwrap_or(entries.len() as u64),
            entries,
        })
    }

    /// Materialization of plain SELECT result sets is not implemented; every
    /// reachable query shape renders in a describe mode.
    pub fn create_feed_from_result_set(&self, _result_set: &SparqlResultSet) -> Result<ODataFeed> {
        Err(Error::UnsupportedConstruct(
            "materializing plain SELECT result sets is not implemented".to_string(),
        ))
    }
}

/// Coerces a literal to the declared primitive type.
///
/// First attempt honors the literal's datatype; on mismatch the raw lexical
/// form is parsed instead; if both fail the value falls back to null or the
/// type default depending on nullability.
fn literal_value(literal: &Literal, target: PrimitiveType, nullable: bool) -> PropertyValue {
    typed_value(literal, target)
        .or_else(|| lexical_value(literal.value(), target))
        .unwrap_or_else(|| fallback_value(target, nullable))
}

fn typed_value(literal: &Literal, target: PrimitiveType) -> Option<PropertyValue> {
    let datatype = literal.datatype();
    if !datatype_fits(datatype.as_str(), target) {
        return None;
    }
    lexical_value(literal.value(), target)
}

fn datatype_fits(datatype: &str, target: PrimitiveType) -> bool {
    match target {
        PrimitiveType::Boolean => datatype == xsd("boolean"),
        PrimitiveType::DateTime => datatype == xsd("dateTime") || datatype == xsd("date"),
        PrimitiveType::String => datatype == xsd("string") || datatype == RDF_LANG_STRING,
        PrimitiveType::Byte
        | PrimitiveType::Int16
        | PrimitiveType::Int32
        | PrimitiveType::Int64
        | PrimitiveType::Decimal
        | PrimitiveType::Double => is_numeric_datatype(datatype),
    }
}

fn is_numeric_datatype(datatype: &str) -> bool {
    let Some(local) = datatype.strip_prefix(XSD_NAMESPACE) else {
        return false;
    };
    matches!(
        local,
        "byte"
            | "short"
            | "int"
            | "integer"
            | "long"
            | "decimal"
            | "double"
            | "float"
            | "negativeInteger"
            | "nonNegativeInteger"
            | "nonPositiveInteger"
            | "positiveInteger"
            | "unsignedByte"
            | "unsignedShort"
            | "unsignedInt"
            | "unsignedLong"
    )
}

fn xsd(local: &str) -> String {
    format!("{}{}", XSD_NAMESPACE, local)
}

fn lexical_value(value: &str, target: PrimitiveType) -> Option<PropertyValue> {
    match target {
        PrimitiveType::Boolean => match value {
            "true" | "1" => Some(PropertyValue::Boolean(true)),
            "false" | "0" => Some(PropertyValue::Boolean(false)),
            _ => None,
        },
        PrimitiveType::Byte => value.parse().ok().map(PropertyValue::Byte),
        PrimitiveType::Int16 => value.parse().ok().map(PropertyValue::Int16),
        PrimitiveType::Int32 => value.parse().ok().map(PropertyValue::Int32),
        PrimitiveType::Int64 => value.parse().ok().map(PropertyValue::Int64),
        PrimitiveType::Double => value.parse().ok().map(PropertyValue::Double),
        PrimitiveType::Decimal => value
            .parse::<f64>()
            .ok()
            .map(|_| PropertyValue::Decimal(value.to_string())),
        PrimitiveType::DateTime => {
            if value.is_empty() {
                None
            } else {
                Some(PropertyValue::DateTime(value.to_string()))
            }
        }
        PrimitiveType::String => Some(PropertyValue::String(value.to_string())),
    }
}

fn fallback_value(target: PrimitiveType, nullable: bool) -> PropertyValue {
    if nullable {
        return PropertyValue::Null;
    }
    match target {
        PrimitiveType::Boolean => PropertyValue::Boolean(false),
        PrimitiveType::Byte => PropertyValue::Byte(0),
        PrimitiveType::Int16 => PropertyValue::Int16(0),
        PrimitiveType::Int32 => PropertyValue::Int32(0),
        PrimitiveType::Int64 => PropertyValue::Int64(0),
        PrimitiveType::Double => PropertyValue::Double(0.0),
        PrimitiveType::Decimal => PropertyValue::Decimal("0".to_string()),
        PrimitiveType::DateTime => PropertyValue::DateTime("0001-01-01T00:00:00".to_string()),
        PrimitiveType::String => PropertyValue::String(String::new()),
    }
}
