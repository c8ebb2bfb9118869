//! Entity-relationship metadata model.
//!
//! This module holds the schema the OData surface is defined against: entity
//! types with structural and navigation properties, single-inheritance base
//! type chains, declared keys, entity sets, and string/boolean annotations.
//! Models are loaded once from a JSON schema document and are read-only
//! afterwards, so a loaded [`EdmModel`] can be shared freely across requests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Namespace under which the RDF mapping annotations are defined.
///
/// Recognized terms: `Uri`, `IdentifierPrefix`, `IsInverse` and `Ignore`.
pub const ANNOTATIONS_NAMESPACE: &str = "odata-sparql.annotations";

/// Primitive property types supported by the OData surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    DateTime,
    Decimal,
    Double,
    Int16,
    Int32,
    Int64,
    String,
}

/// Value of a metadata annotation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    Boolean(bool),
    Text(String),
}

/// A structural (scalar valued) property of an entity type
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PrimitiveType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub annotations: HashMap<String, AnnotationValue>,
}

/// A navigation (relationship valued) property of an entity type
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPropertyDef {
    pub name: String,
    /// Qualified name of the entity type on the far end
    pub target_type: String,
    /// True when the navigation targets many entities
    #[serde(default)]
    pub collection: bool,
    #[serde(default)]
    pub annotations: HashMap<String, AnnotationValue>,
}

/// An entity type declaration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeDef {
    pub name: String,
    /// Qualified name of the base entity type, if any
    #[serde(default)]
    pub base_type: Option<String>,
    /// Names of the properties declared as the entity key
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub navigation_properties: Vec<NavigationPropertyDef>,
    #[serde(default)]
    pub annotations: HashMap<String, AnnotationValue>,
}

/// A named collection of entities of one element type
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySetDef {
    pub name: String,
    /// Qualified name of the set's element type
    pub element_type: String,
}

/// A loaded metadata document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdmModel {
    /// Namespace qualifying all entity type names in this document
    pub namespace: String,
    #[serde(default)]
    pub entity_types: Vec<EntityTypeDef>,
    #[serde(default)]
    pub entity_sets: Vec<EntitySetDef>,
}

impl EdmModel {
    /// Parses a metadata document from its JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::Configuration(format!("cannot parse metadata document: {}", e)))
    }

    /// Loads a metadata document from a file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Configuration(format!(
                "cannot read metadata document {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Returns the qualified name of an entity type declared in this model.
    pub fn qualified_name(&self, entity_type: &EntityTypeDef) -> String {
        format!("{}.{}", self.namespace, entity_type.name)
    }

    /// Looks up an entity type by its qualified name.
    pub fn entity_type(&self, qualified_name: &str) -> Option<&EntityTypeDef> {
        self.entity_types
            .iter()
            .find(|t| self.qualified_name(t) == qualified_name)
    }

    /// Looks up an entity set by name.
    pub fn entity_set(&self, name: &str) -> Option<&EntitySetDef> {
        self.entity_sets.iter().find(|s| s.name == name)
    }

    /// Finds the entity set whose element type is the given qualified name.
    pub fn entity_set_for_type(&self, qualified_name: &str) -> Option<&EntitySetDef> {
        self.entity_sets
            .iter()
            .find(|s| s.element_type == qualified_name)
    }

    /// Walks the base type chain starting at the given type, most derived first.
    ///
    /// The chain stops at the first unknown base type name.
    pub fn type_chain(&self, qualified_name: &str) -> Vec<&EntityTypeDef> {
        let mut chain = Vec::new();
        let mut current = self.entity_type(qualified_name);
        while let Some(entity_type) = current {
            chain.push(entity_type);
            current = entity_type
                .base_type
                .as_deref()
                .and_then(|base| self.entity_type(base));
        }
        chain
    }

    /// All structural properties of a type, inherited ones included, paired
    /// with the entity type that declares each. Base type properties come
    /// first so derived types append rather than shadow.
    pub fn structural_properties(
        &self,
        qualified_name: &str,
    ) -> Vec<(&EntityTypeDef, &PropertyDef)> {
        let mut chain = self.type_chain(qualified_name);
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|t| t.properties.iter().map(move |p| (t, p)))
            .collect()
    }

    /// All navigation properties of a type, inherited ones included, paired
    /// with the declaring entity type.
    pub fn navigation_properties(
        &self,
        qualified_name: &str,
    ) -> Vec<(&EntityTypeDef, &NavigationPropertyDef)> {
        let mut chain = self.type_chain(qualified_name);
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|t| t.navigation_properties.iter().map(move |p| (t, p)))
            .collect()
    }

    /// Finds a structural property by name, searching the base type chain.
    ///
    /// Returns the declaring type together with the property definition.
    pub fn find_structural_property(
        &self,
        qualified_name: &str,
        property_name: &str,
    ) -> Option<(&EntityTypeDef, &PropertyDef)> {
        self.type_chain(qualified_name).into_iter().find_map(|t| {
            t.properties
                .iter()
                .find(|p| p.name == property_name)
                .map(|p| (t, p))
        })
    }

    /// Finds a navigation property by name, searching the base type chain.
    pub fn find_navigation_property(
        &self,
        qualified_name: &str,
        property_name: &str,
    ) -> Option<(&EntityTypeDef, &NavigationPropertyDef)> {
        self.type_chain(qualified_name).into_iter().find_map(|t| {
            t.navigation_properties
                .iter()
                .find(|p| p.name == property_name)
                .map(|p| (t, p))
        })
    }

    /// Resolves the single declared key property of a type.
    ///
    /// Walks up the base type chain to the nearest type declaring a key and
    /// returns it together with its declaring type. Returns `None` when no
    /// key is declared anywhere in the chain, or when the declaring type
    /// lists more than one key property (composite keys are unsupported).
    pub fn single_key_property(
        &self,
        qualified_name: &str,
    ) -> Option<(&EntityTypeDef, &PropertyDef)> {
        for entity_type in self.type_chain(qualified_name) {
            if entity_type.keys.is_empty() {
                continue;
            }
            if entity_type.keys.len() > 1 {
                return None;
            }
            let key_name = &entity_type.keys[0];
            return entity_type
                .properties
                .iter()
                .find(|p| &p.name == key_name)
                .map(|p| (entity_type, p));
        }
        None
    }
}

/// Reads a string valued annotation, accepting both the namespace qualified
/// term (`odata-sparql.annotations.Uri`) and the bare term name (`Uri`).
pub fn string_annotation<'a>(
    annotations: &'a HashMap<String, AnnotationValue>,
    term: &str,
) -> Option<&'a str> {
    let qualified = format!("{}.{}", ANNOTATIONS_NAMESPACE, term);
    match annotations.get(&qualified).or_else(|| annotations.get(term)) {
        Some(AnnotationValue::Text(value)) => Some(value.as_str()),
        _ => None,
    }
}

/// Reads a boolean valued annotation, with the same key resolution as
/// [`string_annotation`].
pub fn boolean_annotation(
    annotations: &HashMap<String, AnnotationValue>,
    term: &str,
) -> Option<bool> {
    let qualified = format!("{}.{}", ANNOTATIONS_NAMESPACE, term);
    match annotations.get(&qualified).or_else(|| annotations.get(term)) {
        Some(AnnotationValue::Boolean(value)) => Some(*value),
        _ => None,
    }
}
