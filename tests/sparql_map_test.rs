//! SPARQL Map Integration Tests
//!
//! Verifies resolution of entity types and properties to RDF identifiers:
//! naming conventions, annotation overrides, identifier prefixes, navigation
//! direction, inheritance aliasing and the composite key restriction.

use std::sync::Arc;

use odata_sparql::error::Error;
use odata_sparql::mapping::{NameMapping, SparqlMap};
use odata_sparql::metadata::EdmModel;

const METADATA: &str = r#"{
    "namespace": "DBPedia",
    "entityTypes": [
        {
            "name": "Film",
            "keys": ["Id"],
            "properties": [
                {"name": "Id", "type": "String", "annotations": {"IdentifierPrefix": "http://dbpedia.org/resource/"}},
                {"name": "Name", "type": "String", "annotations": {"Uri": "http://xmlns.com/foaf/0.1/name"}},
                {"name": "Runtime", "type": "Double", "nullable": true}
            ],
            "navigationProperties": [
                {"name": "Director", "targetType": "DBPedia.Person", "collection": false}
            ]
        },
        {
            "name": "Person",
            "keys": ["Id"],
            "properties": [
                {"name": "Id", "type": "String", "annotations": {"IdentifierPrefix": "http://dbpedia.org/resource/"}}
            ],
            "navigationProperties": [
                {"name": "DirectedFilms", "targetType": "DBPedia.Film", "collection": true,
                 "annotations": {"Uri": "http://dbpedia.org/ontology/director", "IsInverse": true}}
            ]
        },
        {
            "name": "Award",
            "keys": ["Id"],
            "properties": [
                {"name": "Id", "type": "String"}
            ]
        },
        {
            "name": "Coordinates",
            "keys": ["Latitude", "Longitude"],
            "properties": [
                {"name": "Latitude", "type": "Double"},
                {"name": "Longitude", "type": "Double"}
            ]
        },
        {
            "name": "Internal",
            "keys": ["Id"],
            "properties": [
                {"name": "Id", "type": "String"}
            ],
            "annotations": {"Ignore": true}
        }
    ],
    "entitySets": [
        {"name": "Films", "elementType": "DBPedia.Film"},
        {"name": "Persons", "elementType": "DBPedia.Person"}
    ]
}"#;

fn dbpedia_map() -> SparqlMap {
    let model = Arc::new(EdmModel::from_json_str(METADATA).expect("fixture metadata should parse"));
    SparqlMap::new(
        model,
        "http://dbpedia.org/ontology/",
        NameMapping::Unchanged,
        Some("http://dbpedia.org/ontology/"),
        Some(NameMapping::LowerCamelCase),
    )
}

#[test]
fn test_type_uri_uses_the_type_convention() {
    let map = dbpedia_map();
    assert_eq!(
        map.uri_for_type("DBPedia.Film"),
        Some("http://dbpedia.org/ontology/Film")
    );
    assert_eq!(map.uri_for_type("DBPedia.NoSuchType"), None);
}

#[test]
fn test_property_uri_uses_the_property_convention() {
    let map = dbpedia_map();
    assert_eq!(
        map.uri_for_property("DBPedia.Film", "Runtime"),
        Some("http://dbpedia.org/ontology/runtime")
    );
}

#[test]
fn test_explicit_uri_annotation_wins_over_the_convention() {
    let map = dbpedia_map();
    assert_eq!(
        map.uri_for_property("DBPedia.Film", "Name"),
        Some("http://xmlns.com/foaf/0.1/name")
    );
}

#[test]
fn test_identifier_prefix_resolution() {
    let map = dbpedia_map();
    assert_eq!(
        map.identifier_prefix_for_property("DBPedia.Film", "Id"),
        Some("http://dbpedia.org/resource/")
    );
    assert_eq!(
        map.resource_uri_prefix("DBPedia.Film")
            .expect("Film declares an identifier prefix"),
        "http://dbpedia.org/resource/"
    );
    assert!(
        matches!(map.resource_uri_prefix("DBPedia.Award"), Err(Error::Mapping(_))),
        "a type without an IdentifierPrefix annotation cannot mint resource URIs"
    );
}

#[test]
fn test_navigation_direction() {
    let map = dbpedia_map();
    assert_eq!(
        map.navigation_property_uri("DBPedia.Film", "Director"),
        Some(("http://dbpedia.org/ontology/director", false))
    );
    assert_eq!(
        map.navigation_property_uri("DBPedia.Person", "DirectedFilms"),
        Some(("http://dbpedia.org/ontology/director", true))
    );
}

#[test]
fn test_entity_set_resolution() {
    let map = dbpedia_map();
    assert_eq!(
        map.entity_set_name("DBPedia.Film")
            .expect("Films targets DBPedia.Film"),
        "Films"
    );
    assert!(
        matches!(map.entity_set_name("DBPedia.Award"), Err(Error::Mapping(_))),
        "no container entity set targets DBPedia.Award"
    );
}

#[test]
fn test_composite_keys_are_rejected() {
    let map = dbpedia_map();
    assert_eq!(
        map.uri_for_type("DBPedia.Coordinates"),
        None,
        "entity types with more than one declared key property are skipped"
    );
}

#[test]
fn test_ignored_types_are_not_mapped() {
    let map = dbpedia_map();
    assert_eq!(map.uri_for_type("DBPedia.Internal"), None);
}

#[test]
fn test_structural_property_mappings() {
    let map = dbpedia_map();
    let mappings = map
        .structural_property_mappings("DBPedia.Film")
        .expect("Film should have structural mappings");
    let names: Vec<&str> = mappings.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Id", "Name", "Runtime"]);
    let runtime = &mappings[2];
    assert_eq!(runtime.uri, "http://dbpedia.org/ontology/runtime");
    assert!(runtime.nullable);
}

#[test]
fn test_association_property_mappings() {
    let map = dbpedia_map();
    let mappings = map
        .association_property_mappings("DBPedia.Person")
        .expect("Person should have association mappings");
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].name, "DirectedFilms");
    assert!(mappings[0].is_inverse);
}

#[test]
fn test_inherited_properties_share_the_base_mapping() {
    let document = r#"{
        "namespace": "Library",
        "entityTypes": [
            {
                "name": "Work",
                "keys": ["Id"],
                "properties": [
                    {"name": "Id", "type": "String", "annotations": {"IdentifierPrefix": "http://example.org/work/"}},
                    {"name": "Title", "type": "String", "annotations": {"Uri": "http://purl.org/dc/terms/title"}}
                ]
            },
            {
                "name": "Book",
                "baseType": "Library.Work",
                "properties": [
                    {"name": "PageCount", "type": "Int32"}
                ]
            }
        ],
        "entitySets": [
            {"name": "Books", "elementType": "Library.Book"},
            {"name": "Works", "elementType": "Library.Work"}
        ]
    }"#;
    let model = Arc::new(EdmModel::from_json_str(document).expect("document should parse"));
    let map = SparqlMap::new(
        model,
        "http://example.org/ontology/",
        NameMapping::Unchanged,
        None,
        None,
    );
    assert_eq!(
        map.uri_for_property("Library.Book", "Title"),
        map.uri_for_property("Library.Work", "Title"),
        "a property inherited from a base type shares its base mapping"
    );
    assert_eq!(
        map.uri_for_property("Library.Book", "Title"),
        Some("http://purl.org/dc/terms/title")
    );
}
