//! OData Parser Integration Tests
//!
//! Verifies parsing of resource paths, key lookups, navigation segments and
//! the `$filter`/`$orderby`/`$top`/`$skip` query options into query trees.

use std::sync::Arc;

use odata_sparql::error::Error;
use odata_sparql::metadata::EdmModel;
use odata_sparql::odata::ast::{
    BinaryOperatorKind, ConstantValue, OrderByDirection, QueryNode,
};
use odata_sparql::parsing::ODataParser;

const METADATA: &str = r#"{
    "namespace": "DBPedia",
    "entityTypes": [
        {
            "name": "Film",
            "keys": ["Id"],
            "properties": [
                {"name": "Id", "type": "String", "annotations": {"IdentifierPrefix": "http://dbpedia.org/resource/"}},
                {"name": "Name", "type": "String"},
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
                {"name": "Id", "type": "String", "annotations": {"IdentifierPrefix": "http://dbpedia.org/resource/"}},
                {"name": "Name", "type": "String"}
            ]
        }
    ],
    "entitySets": [
        {"name": "Films", "elementType": "DBPedia.Film"},
        {"name": "Persons", "elementType": "DBPedia.Person"}
    ]
}"#;

fn model() -> Arc<EdmModel> {
    Arc::new(EdmModel::from_json_str(METADATA).expect("fixture metadata should parse"))
}

fn parse(path: &str) -> QueryNode {
    let model = model();
    let parser = ODataParser::new(&model).expect("parser should build");
    parser
        .parse_path_and_query(path)
        .expect("path should parse")
}

fn parse_error(path: &str) -> Error {
    let model = model();
    let parser = ODataParser::new(&model).expect("parser should build");
    parser
        .parse_path_and_query(path)
        .expect_err("path should not parse")
}

#[test]
fn test_entity_set_path() {
    assert_eq!(
        parse("Films"),
        QueryNode::EntitySet {
            set_name: "Films".to_string(),
            element_type: "DBPedia.Film".to_string(),
        }
    );
}

#[test]
fn test_key_lookup_path() {
    let node = parse("Films('Un_Chien_Andalou')");
    let QueryNode::KeyLookup {
        declaring_type,
        key_property,
        key_value,
        ..
    } = node
    else {
        panic!("expected a key lookup node");
    };
    assert_eq!(declaring_type, "DBPedia.Film");
    assert_eq!(key_property, "Id");
    assert_eq!(
        *key_value,
        QueryNode::Constant(ConstantValue::String("Un_Chien_Andalou".to_string()))
    );
}

#[test]
fn test_key_literal_quote_escaping() {
    let node = parse("Persons('O''Brien')");
    let QueryNode::KeyLookup { key_value, .. } = node else {
        panic!("expected a key lookup node");
    };
    assert_eq!(
        *key_value,
        QueryNode::Constant(ConstantValue::String("O'Brien".to_string()))
    );
}

#[test]
fn test_navigation_segment() {
    let node = parse("Films('Un_Chien_Andalou')/Director");
    let QueryNode::Navigation {
        source,
        declaring_type,
        property_name,
        target_type,
        is_collection,
    } = node
    else {
        panic!("expected a navigation node");
    };
    assert_eq!(declaring_type, "DBPedia.Film");
    assert_eq!(property_name, "Director");
    assert_eq!(target_type, "DBPedia.Person");
    assert!(!is_collection);
    assert!(matches!(*source, QueryNode::KeyLookup { .. }));
}

#[test]
fn test_filter_precedence() {
    let node = parse("Films?$filter=Runtime gt 100 and Runtime lt 200");
    let QueryNode::Filter {
        item_type,
        expression,
        ..
    } = node
    else {
        panic!("expected a filter node");
    };
    assert_eq!(item_type, "DBPedia.Film");
    let QueryNode::BinaryOperator { kind, left, right } = *expression else {
        panic!("expected a binary operator");
    };
    assert_eq!(kind, BinaryOperatorKind::And);
    assert!(matches!(
        *left,
        QueryNode::BinaryOperator {
            kind: BinaryOperatorKind::GreaterThan,
            ..
        }
    ));
    assert!(matches!(
        *right,
        QueryNode::BinaryOperator {
            kind: BinaryOperatorKind::LessThan,
            ..
        }
    ));
}

#[test]
fn test_function_call_arguments() {
    let node = parse("Films?$filter=startswith(Name, 'Un')");
    let QueryNode::Filter { expression, .. } = node else {
        panic!("expected a filter node");
    };
    let QueryNode::FunctionCall { name, arguments } = *expression else {
        panic!("expected a function call");
    };
    assert_eq!(name, "startswith");
    assert_eq!(arguments.len(), 2);
    assert_eq!(
        arguments[0],
        QueryNode::PropertyAccess {
            source_type: "DBPedia.Film".to_string(),
            property_name: "Name".to_string(),
        }
    );
    assert_eq!(
        arguments[1],
        QueryNode::Constant(ConstantValue::String("Un".to_string()))
    );
}

#[test]
fn test_percent_encoded_options() {
    let node = parse("Films?$filter=Runtime%20gt%20100");
    assert!(matches!(node, QueryNode::Filter { .. }));
}

#[test]
fn test_top_and_skip_options() {
    let node = parse("Films?$skip=50&$top=10");
    let QueryNode::Top { collection, amount } = node else {
        panic!("expected $top to wrap the tree");
    };
    assert_eq!(*amount, QueryNode::Constant(ConstantValue::Int32(10)));
    let QueryNode::Skip { amount, .. } = *collection else {
        panic!("expected $skip inside $top");
    };
    assert_eq!(*amount, QueryNode::Constant(ConstantValue::Int32(50)));
}

#[test]
fn test_orderby_chain() {
    let node = parse("Films?$orderby=Name desc,Runtime");
    // The last key ends up outermost; the generator restores key order by
    // descending into the collection first
    let QueryNode::OrderBy {
        collection,
        direction,
        ..
    } = node
    else {
        panic!("expected an orderby node");
    };
    assert_eq!(direction, OrderByDirection::Ascending);
    let QueryNode::OrderBy { direction, .. } = *collection else {
        panic!("expected the first key nested inside");
    };
    assert_eq!(direction, OrderByDirection::Descending);
}

#[test]
fn test_unknown_entity_set_fails() {
    assert!(matches!(parse_error("Movies"), Error::Parse(_)));
}

#[test]
fn test_unknown_property_fails() {
    assert!(matches!(
        parse_error("Films?$filter=Rating gt 5"),
        Error::Parse(_)
    ));
}

#[test]
fn test_unknown_navigation_fails() {
    assert!(matches!(
        parse_error("Films('x')/Producer"),
        Error::Parse(_)
    ));
}

#[test]
fn test_unsupported_query_option_fails() {
    assert!(matches!(
        parse_error("Films?$expand=Director"),
        Error::Parse(_)
    ));
}

#[test]
fn test_invalid_top_fails() {
    assert!(matches!(parse_error("Films?$top=ten"), Error::Parse(_)));
}

#[test]
fn test_filter_on_single_entity_fails() {
    assert!(matches!(
        parse_error("Films('x')?$filter=Runtime gt 100"),
        Error::Parse(_)
    ));
}

#[test]
fn test_unterminated_string_fails() {
    assert!(matches!(
        parse_error("Films?$filter=Name eq 'Un"),
        Error::Parse(_)
    ));
}
