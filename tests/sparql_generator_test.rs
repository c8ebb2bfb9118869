//! SPARQL Generator Integration Tests
//!
//! Verifies the translation of parsed OData query trees into SPARQL query
//! models: pattern construction, variable reuse, operator and function
//! mapping, pagination, ordering and rendering.

use std::sync::Arc;

use odata_sparql::error::Error;
use odata_sparql::mapping::{NameMapping, SparqlMap};
use odata_sparql::metadata::{EdmModel, PrimitiveType};
use odata_sparql::odata::ast::{ConstantValue, QueryNode};
use odata_sparql::parsing::ODataParser;
use odata_sparql::sparql::{RenderMode, SparqlGenerator, SparqlModel, RDF_TYPE};

const DBPEDIA_METADATA: &str = r#"{
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
                {"name": "Director", "targetType": "DBPedia.Person", "collection": false},
                {"name": "Starring", "targetType": "DBPedia.Person", "collection": true}
            ]
        },
        {
            "name": "Person",
            "keys": ["Id"],
            "properties": [
                {"name": "Id", "type": "String", "annotations": {"IdentifierPrefix": "http://dbpedia.org/resource/"}},
                {"name": "Name", "type": "String", "annotations": {"Uri": "http://xmlns.com/foaf/0.1/name"}},
                {"name": "BirthDate", "type": "DateTime", "nullable": true}
            ],
            "navigationProperties": [
                {"name": "DirectedFilms", "targetType": "DBPedia.Film", "collection": true,
                 "annotations": {"Uri": "http://dbpedia.org/ontology/director", "IsInverse": true}}
            ]
        },
        {
            "name": "Place",
            "keys": ["Id"],
            "properties": [
                {"name": "Id", "type": "String", "annotations": {"IdentifierPrefix": "http://dbpedia.org/resource/"}},
                {"name": "PopulationTotal", "type": "Int64", "nullable": true}
            ]
        }
    ],
    "entitySets": [
        {"name": "Films", "elementType": "DBPedia.Film"},
        {"name": "Persons", "elementType": "DBPedia.Person"},
        {"name": "Places", "elementType": "DBPedia.Place"}
    ]
}"#;

fn dbpedia_model() -> Arc<EdmModel> {
    Arc::new(EdmModel::from_json_str(DBPEDIA_METADATA).expect("fixture metadata should parse"))
}

fn dbpedia_map(model: &Arc<EdmModel>) -> SparqlMap {
    SparqlMap::new(
        Arc::clone(model),
        "http://dbpedia.org/ontology/",
        NameMapping::Unchanged,
        Some("http://dbpedia.org/ontology/"),
        Some(NameMapping::LowerCamelCase),
    )
}

fn translate_with_language(path: &str, language: &str) -> Result<SparqlModel, Error> {
    let model = dbpedia_model();
    let map = dbpedia_map(&model);
    let parser = ODataParser::new(&model)?;
    let query = parser.parse_path_and_query(path)?;
    SparqlGenerator::new(&map, language).process_query(&query)
}

fn translate(path: &str) -> SparqlModel {
    translate_with_language(path, "").expect("translation should succeed")
}

#[test]
fn test_entity_set_access() {
    let model = translate("Films");
    assert_eq!(model.root_graph_pattern.triple_patterns.len(), 1);
    let triple = &model.root_graph_pattern.triple_patterns[0];
    assert_eq!(
        triple.sparql_representation(),
        format!("?v1 <{}> <http://dbpedia.org/ontology/Film>", RDF_TYPE)
    );
    assert_eq!(model.select_variables.len(), 1);
    assert_eq!(model.select_variables[0].name, "v1");
    assert!(model.select_variables[0].is_collection);
    assert!(model.is_describe(), "entity set queries render graph-shaped");
    assert_eq!(model.entity_type_of("v1"), Some("DBPedia.Film"));
}

#[test]
fn test_single_key_lookup() {
    let model = translate("Films('Un_Chien_Andalou')");
    assert_eq!(
        model.mode,
        RenderMode::DescribeResource {
            resource: "http://dbpedia.org/resource/Un_Chien_Andalou".to_string(),
            entity_type: "DBPedia.Film".to_string(),
        }
    );
    assert_eq!(
        model.sparql_representation(),
        "CONSTRUCT { <http://dbpedia.org/resource/Un_Chien_Andalou> ?p ?o } \
         WHERE { <http://dbpedia.org/resource/Un_Chien_Andalou> ?p ?o }"
    );
}

#[test]
fn test_key_literal_is_concatenated_without_re_encoding() {
    let model = translate("Films('Un_Chien_Andalou')");
    let RenderMode::DescribeResource { resource, .. } = &model.mode else {
        panic!("key lookup should target a single resource");
    };
    assert_eq!(
        resource,
        &format!("{}{}", "http://dbpedia.org/resource/", "Un_Chien_Andalou")
    );
}

#[test]
fn test_filter_comparison() {
    let model = translate("Places?$filter=PopulationTotal gt 1000000");
    assert_eq!(model.root_graph_pattern.triple_patterns.len(), 2);
    assert_eq!(
        model.root_graph_pattern.filter_expressions,
        vec!["?v2 > 1000000".to_string()]
    );
    assert_eq!(model.select_variables[0].name, "v1");
    assert!(model.is_describe());
}

#[test]
fn test_comparison_operators_map_one_to_one() {
    for (odata, sparql) in [
        ("gt", ">"),
        ("lt", "<"),
        ("eq", "="),
        ("ne", "!="),
        ("ge", ">="),
        ("le", "<="),
    ] {
        let model = translate(&format!("Places?$filter=PopulationTotal {} 5", odata));
        assert_eq!(
            model.root_graph_pattern.filter_expressions,
            vec![format!("?v2 {} 5", sparql)],
            "operator {} should map to {}",
            odata,
            sparql
        );
    }
}

#[test]
fn test_logical_operators_parenthesize_operands() {
    let model = translate("Places?$filter=PopulationTotal gt 5 and PopulationTotal lt 10");
    assert_eq!(
        model.root_graph_pattern.filter_expressions,
        vec!["(?v2 > 5) && (?v2 < 10)".to_string()]
    );

    let model = translate("Places?$filter=PopulationTotal lt 5 or PopulationTotal gt 10");
    assert_eq!(
        model.root_graph_pattern.filter_expressions,
        vec!["(?v2 < 5) || (?v2 > 10)".to_string()]
    );
}

#[test]
fn test_not_renders_with_parentheses() {
    let model = translate("Places?$filter=not (PopulationTotal gt 5)");
    assert_eq!(
        model.root_graph_pattern.filter_expressions,
        vec!["!(?v2 > 5)".to_string()]
    );
}

#[test]
fn test_arithmetic_operators_are_parenthesized() {
    let model = translate("Places?$filter=PopulationTotal add 1 gt 10");
    assert_eq!(
        model.root_graph_pattern.filter_expressions,
        vec!["(?v2 + 1) > 10".to_string()]
    );
}

#[test]
fn test_mod_is_unsupported() {
    let result = translate_with_language("Places?$filter=PopulationTotal mod 2 eq 0", "");
    assert!(
        matches!(result, Err(Error::UnsupportedConstruct(_))),
        "mod has no SPARQL equivalent and must fail the translation"
    );
}

#[test]
fn test_indexof_is_unsupported() {
    let result = translate_with_language("Films?$filter=indexof(Name, 'a') eq 1", "");
    assert!(
        matches!(result, Err(Error::UnsupportedConstruct(_))),
        "indexof has no SPARQL equivalent and must fail the translation"
    );
}

#[test]
fn test_property_access_is_deduplicated() {
    let model = translate("Places?$filter=PopulationTotal gt 5 and PopulationTotal lt 10");
    // One type triple plus one property triple: the second access reuses the
    // existing binding
    assert_eq!(model.root_graph_pattern.triple_patterns.len(), 2);
}

#[test]
fn test_top_and_skip_compose() {
    let model = translate("Films?$skip=50&$top=10");
    assert_eq!(model.limit, Some(10));
    assert_eq!(model.offset, Some(50));
    assert_eq!(
        model.root_graph_pattern.triple_patterns.len(),
        1,
        "pagination must not duplicate the base pattern"
    );
    assert!(model
        .sparql_representation()
        .ends_with(" LIMIT 10 OFFSET 50"));
}

#[test]
fn test_orderby_direct_property() {
    let model = translate("Places?$orderby=PopulationTotal desc");
    assert_eq!(model.ordering.len(), 1);
    assert_eq!(model.ordering[0].variable, "v2");
    assert!(model.ordering[0].descending);
    assert!(model.sparql_representation().contains(" ORDER BY DESC(?v2)"));
}

#[test]
fn test_orderby_expression_is_unsupported() {
    let result = translate_with_language("Places?$orderby=PopulationTotal add 1", "");
    assert!(
        matches!(result, Err(Error::UnsupportedConstruct(_))),
        "only direct property access is supported in $orderby"
    );
}

#[test]
fn test_forward_navigation() {
    let model = translate("Films('Un_Chien_Andalou')/Director");
    assert_eq!(model.root_graph_pattern.triple_patterns.len(), 1);
    assert_eq!(
        model.root_graph_pattern.triple_patterns[0].sparql_representation(),
        "<http://dbpedia.org/resource/Un_Chien_Andalou> \
         <http://dbpedia.org/ontology/director> ?v1"
    );
    assert_eq!(model.select_variables[0].name, "v1");
    assert_eq!(model.select_variables[0].entity_type, "DBPedia.Person");
    assert!(!model.select_variables[0].is_collection);
    assert!(model.is_describe());
}

#[test]
fn test_inverse_navigation_reverses_the_triple() {
    let model = translate("Persons('Luis_Bunuel')/DirectedFilms");
    assert_eq!(
        model.root_graph_pattern.triple_patterns[0].sparql_representation(),
        "?v1 <http://dbpedia.org/ontology/director> \
         <http://dbpedia.org/resource/Luis_Bunuel>"
    );
    assert_eq!(model.select_variables[0].entity_type, "DBPedia.Film");
    assert!(model.select_variables[0].is_collection);
}

#[test]
fn test_describe_rendering_covers_selected_variables() {
    let model = translate("Films");
    assert_eq!(
        model.sparql_representation(),
        format!(
            "CONSTRUCT {{ ?v1 ?v1_p ?v1_o . }} WHERE {{ ?v1 ?v1_p ?v1_o . \
             ?v1 <{}> <http://dbpedia.org/ontology/Film> . }}",
            RDF_TYPE
        )
    );
}

#[test]
fn test_rendering_is_deterministic() {
    let first = translate("Places?$filter=PopulationTotal gt 1000000&$orderby=PopulationTotal&$top=5");
    let second = translate("Places?$filter=PopulationTotal gt 1000000&$orderby=PopulationTotal&$top=5");
    assert_eq!(
        first.sparql_representation(),
        second.sparql_representation(),
        "translating the same query twice must yield byte-identical SPARQL"
    );
}

#[test]
fn test_string_functions_map_to_sparql_builtins() {
    let cases = [
        ("startswith(Name, 'Un')", "strstarts(?v2, 'Un')"),
        ("endswith(Name, 'lou')", "strends(?v2, 'lou')"),
        ("substringof('Chien', Name)", "contains(?v2, 'Chien')"),
        ("length(Name) gt 3", "strlen(?v2) > 3"),
        ("tolower(Name) eq 'x'", "lcase(?v2) = 'x'"),
        ("toupper(Name) eq 'X'", "ucase(?v2) = 'X'"),
        ("substring(Name, 1, 2) eq 'n'", "substr(?v2, 1, 2) = 'n'"),
        ("concat(Name, 's') eq 'xs'", "concat(?v2, 's') = 'xs'"),
        (
            "trim(Name) eq 'X'",
            r"replace(?v2, '^\\s+|\\s+$', '') = 'X'",
        ),
    ];
    for (odata, sparql) in cases {
        let model = translate(&format!("Films?$filter={}", odata));
        assert_eq!(
            model.root_graph_pattern.filter_expressions,
            vec![sparql.to_string()],
            "translating {}",
            odata
        );
    }
}

#[test]
fn test_date_functions_map_to_sparql_builtins() {
    let cases = [
        ("day(BirthDate) eq 1", "day(?v2) = 1"),
        ("month(BirthDate) eq 2", "month(?v2) = 2"),
        ("year(BirthDate) eq 1900", "year(?v2) = 1900"),
        ("hour(BirthDate) eq 3", "hours(?v2) = 3"),
        ("minute(BirthDate) eq 4", "minutes(?v2) = 4"),
        ("second(BirthDate) eq 5", "seconds(?v2) = 5"),
    ];
    for (odata, sparql) in cases {
        let model = translate(&format!("Persons?$filter={}", odata));
        assert_eq!(
            model.root_graph_pattern.filter_expressions,
            vec![sparql.to_string()],
            "translating {}",
            odata
        );
    }
}

#[test]
fn test_math_functions_map_to_sparql_builtins() {
    let cases = [
        ("round(Runtime) eq 960", "round(?v2) = 960"),
        ("ceiling(Runtime) eq 960", "ceil(?v2) = 960"),
        ("floor(Runtime) eq 960", "floor(?v2) = 960"),
    ];
    for (odata, sparql) in cases {
        let model = translate(&format!("Films?$filter={}", odata));
        assert_eq!(
            model.root_graph_pattern.filter_expressions,
            vec![sparql.to_string()],
            "translating {}",
            odata
        );
    }
}

#[test]
fn test_string_constants_carry_the_default_language_code() {
    let model = translate_with_language("Films?$filter=Name eq 'Un Chien Andalou'", "en")
        .expect("translation should succeed");
    assert_eq!(
        model.root_graph_pattern.filter_expressions,
        vec!["?v2 = 'Un Chien Andalou'@en".to_string()]
    );
}

#[test]
fn test_count_query_derivation() {
    let model = translate("Films");
    assert_eq!(
        model.count_representation().expect("count should derive"),
        format!(
            "SELECT (COUNT(?v1) AS ?count) WHERE {{ ?v1 <{}> <http://dbpedia.org/ontology/Film> . }}",
            RDF_TYPE
        )
    );
}

#[test]
fn test_count_query_rejects_multiple_variables() {
    let mut model = SparqlModel::new();
    model.add_select_variable("v1", "DBPedia.Film", true);
    model.add_select_variable("v2", "DBPedia.Person", true);
    assert!(matches!(
        model.count_representation(),
        Err(Error::UnsupportedConstruct(_))
    ));
}

#[test]
fn test_convert_coerces_constant_operands() {
    let model = dbpedia_model();
    let map = dbpedia_map(&model);
    let query = QueryNode::Top {
        collection: Box::new(QueryNode::EntitySet {
            set_name: "Films".to_string(),
            element_type: "DBPedia.Film".to_string(),
        }),
        amount: Box::new(QueryNode::Convert {
            source: Box::new(QueryNode::Constant(ConstantValue::String("10".to_string()))),
            target_type: PrimitiveType::Int32,
        }),
    };
    let translated = SparqlGenerator::new(&map, "")
        .process_query(&query)
        .expect("translation should succeed");
    assert_eq!(translated.limit, Some(10));
}

#[test]
fn test_reconciliation_query_reapplies_ordering_and_limit_but_not_offset() {
    let model = translate("Films?$orderby=Name&$skip=20&$top=2");
    let query = model.reconciliation_representation();
    assert!(query.starts_with("SELECT ?v1 WHERE {"));
    assert!(query.contains(" ORDER BY ?v2"));
    assert!(query.ends_with(" LIMIT 2"));
    assert!(
        !query.contains("OFFSET"),
        "the returned graph already starts at the requested page"
    );
}
