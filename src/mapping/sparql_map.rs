//! Resolution of entity types and properties to RDF identifiers.
//!
//! A [`SparqlMap`] is built once from a loaded metadata model and is
//! read-only afterwards: it can be shared across concurrent requests. For
//! every entity type and property it resolves an RDF identifier either from
//! an explicit `Uri` annotation or by applying a configured naming
//! convention over a namespace prefix, and records the identifier prefixes
//! used to convert between opaque instance URIs and OData entity keys.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::error::{Error, Result};
use crate::mapping::name_mapping::NameMapping;
use crate::metadata::{
    boolean_annotation, string_annotation, EdmModel, PrimitiveType,
};

/// Mapping details for one structural or navigation property
#[derive(Debug, Clone)]
pub struct PropertyInfo {
    pub name: String,
    pub uri: String,
    /// Primitive type for structural properties, `None` for navigations
    pub property_type: Option<PrimitiveType>,
    pub nullable: bool,
    /// True when the RDF predicate points from target to source
    pub is_inverse: bool,
}

#[derive(Debug, Clone)]
struct TypeMapping {
    uri: String,
    identifier_prefix: Option<String>,
}

#[derive(Debug, Clone)]
struct PropertyMapping {
    uri: String,
    is_inverse: bool,
    identifier_prefix: Option<String>,
}

/// Resolves metadata names to RDF identifiers and back.
pub struct SparqlMap {
    model: Arc<EdmModel>,
    type_uri_map: HashMap<String, TypeMapping>,
    property_uri_map: HashMap<String, PropertyMapping>,
}

impl SparqlMap {
    /// Builds a map over a loaded metadata model.
    ///
    /// `type_namespace`/`type_name_mapping` provide the default RDF
    /// identifier derivation for entity types; properties fall back to the
    /// type settings when no distinct namespace or convention is given.
    /// Explicit `Uri` annotations always win over the derived defaults.
    ///
    /// Entity types annotated with `Ignore` are skipped, as are types
    /// without exactly one declared key property in their base chain.
    pub fn new(
        model: Arc<EdmModel>,
        type_namespace: &str,
        type_name_mapping: NameMapping,
        property_namespace: Option<&str>,
        property_name_mapping: Option<NameMapping>,
    ) -> Self {
        let property_namespace = property_namespace.unwrap_or(type_namespace);
        let property_name_mapping = property_name_mapping.unwrap_or(type_name_mapping);

        let mut type_uri_map = HashMap::new();
        let mut property_uri_map = HashMap::new();

        for entity_type in &model.entity_types {
            let qualified_name = model.qualified_name(entity_type);
            if boolean_annotation(&entity_type.annotations, "Ignore").unwrap_or(false) {
                continue;
            }
            let Some((_, key_property)) = model.single_key_property(&qualified_name) else {
                warn!(
                    "skipping entity type {}: a single declared key property is required",
                    qualified_name
                );
                continue;
            };
            let type_uri = string_annotation(&entity_type.annotations, "Uri")
                .map(str::to_string)
                .unwrap_or_else(|| type_name_mapping.apply(type_namespace, &entity_type.name));
            let identifier_prefix =
                string_annotation(&key_property.annotations, "IdentifierPrefix")
                    .map(str::to_string);
            type_uri_map.insert(
                qualified_name.clone(),
                TypeMapping {
                    uri: type_uri,
                    identifier_prefix,
                },
            );

            for (declaring, property) in model.structural_properties(&qualified_name) {
                let declared_key = format!("{}.{}", model.qualified_name(declaring), property.name);
                let entity_key = format!("{}.{}", qualified_name, property.name);
                if let Some(existing) = property_uri_map.get(&declared_key).cloned() {
                    // Inherited property: share the mapping of its declaring type
                    property_uri_map.insert(entity_key, existing);
                    continue;
                }
                let mapping = PropertyMapping {
                    uri: string_annotation(&property.annotations, "Uri")
                        .map(str::to_string)
                        .unwrap_or_else(|| {
                            property_name_mapping.apply(property_namespace, &property.name)
                        }),
                    is_inverse: false,
                    identifier_prefix: string_annotation(&property.annotations, "IdentifierPrefix")
                        .map(str::to_string),
                };
                property_uri_map.insert(entity_key.clone(), mapping.clone());
                if declared_key != entity_key {
                    property_uri_map.insert(declared_key, mapping);
                }
            }

            for (declaring, navigation) in model.navigation_properties(&qualified_name) {
                let declared_key =
                    format!("{}.{}", model.qualified_name(declaring), navigation.name);
                let entity_key = format!("{}.{}", qualified_name, navigation.name);
                if let Some(existing) = property_uri_map.get(&declared_key).cloned() {
                    property_uri_map.insert(entity_key, existing);
                    continue;
                }
                let mapping = PropertyMapping {
                    uri: string_annotation(&navigation.annotations, "Uri")
                        .map(str::to_string)
                        .unwrap_or_else(|| {
                            property_name_mapping.apply(property_namespace, &navigation.name)
                        }),
                    is_inverse: boolean_annotation(&navigation.annotations, "IsInverse")
                        .unwrap_or(false),
                    identifier_prefix: None,
                };
                property_uri_map.insert(entity_key.clone(), mapping.clone());
                if declared_key != entity_key {
                    property_uri_map.insert(declared_key, mapping);
                }
            }
        }

        SparqlMap {
            model,
            type_uri_map,
            property_uri_map,
        }
    }

    /// The metadata model this map was built from.
    pub fn model(&self) -> &EdmModel {
        &self.model
    }

    /// RDF class identifier for an entity type.
    pub fn uri_for_type(&self, qualified_name: &str) -> Option<&str> {
        self.type_uri_map
            .get(qualified_name)
            .map(|m| m.uri.as_str())
    }

    /// RDF predicate identifier for a structural or navigation property.
    pub fn uri_for_property(&self, qualified_name: &str, property_name: &str) -> Option<&str> {
        self.property_uri_map
            .get(&property_key(qualified_name, property_name))
            .map(|m| m.uri.as_str())
    }

    /// RDF predicate and direction for a navigation property.
    pub fn navigation_property_uri(
        &self,
        qualified_name: &str,
        property_name: &str,
    ) -> Option<(&str, bool)> {
        self.property_uri_map
            .get(&property_key(qualified_name, property_name))
            .map(|m| (m.uri.as_str(), m.is_inverse))
    }

    /// Identifier prefix declared on a property, if any.
    pub fn identifier_prefix_for_property(
        &self,
        qualified_name: &str,
        property_name: &str,
    ) -> Option<&str> {
        self.property_uri_map
            .get(&property_key(qualified_name, property_name))
            .and_then(|m| m.identifier_prefix.as_deref())
    }

    /// The URI prefix instances of an entity type are minted under.
    ///
    /// Fails when the type is unmapped or its key property carries no
    /// `IdentifierPrefix` annotation.
    pub fn resource_uri_prefix(&self, qualified_name: &str) -> Result<&str> {
        self.type_uri_map
            .get(qualified_name)
            .ok_or_else(|| Error::Mapping(format!("no mapping for entity type {}", qualified_name)))?
            .identifier_prefix
            .as_deref()
            .ok_or_else(|| {
                Error::Mapping(format!(
                    "entity type {} declares no identifier prefix",
                    qualified_name
                ))
            })
    }

    /// Name of the entity set containing instances of an entity type.
    pub fn entity_set_name(&self, qualified_name: &str) -> Result<&str> {
        self.model
            .entity_set_for_type(qualified_name)
            .map(|s| s.name.as_str())
            .ok_or_else(|| {
                Error::Mapping(format!("no entity set declared for type {}", qualified_name))
            })
    }

    /// Mappings for all structural properties of a type, inherited included.
    pub fn structural_property_mappings(&self, qualified_name: &str) -> Result<Vec<PropertyInfo>> {
        if self.model.entity_type(qualified_name).is_none() {
            return Err(Error::Mapping(format!(
                "no metadata for entity type {}",
                qualified_name
            )));
        }
        Ok(self
            .model
            .structural_properties(qualified_name)
            .into_iter()
            .filter_map(|(_, property)| {
                self.property_uri_map
                    .get(&property_key(qualified_name, &property.name))
                    .map(|mapping| PropertyInfo {
                        name: property.name.clone(),
                        uri: mapping.uri.clone(),
                        property_type: Some(property.property_type),
                        nullable: property.nullable,
                        is_inverse: false,
                    })
            })
            .collect())
    }

    /// Mappings for all navigation properties of a type, inherited included.
    pub fn association_property_mappings(&self, qualified_name: &str) -> Result<Vec<PropertyInfo>> {
        if self.model.entity_type(qualified_name).is_none() {
            return Err(Error::Mapping(format!(
                "no metadata for entity type {}",
                qualified_name
            )));
        }
        Ok(self
            .model
            .navigation_properties(qualified_name)
            .into_iter()
            .filter_map(|(_, navigation)| {
                self.property_uri_map
                    .get(&property_key(qualified_name, &navigation.name))
                    .map(|mapping| PropertyInfo {
                        name: navigation.name.clone(),
                        uri: mapping.uri.clone(),
                        property_type: None,
                        nullable: false,
                        is_inverse: mapping.is_inverse,
                    })
            })
            .collect())
    }
}

fn property_key(qualified_name: &str, property_name: &str) -> String {
    format!("{}.{}", qualified_name, property_name)
}
