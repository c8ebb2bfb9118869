//! The AST walker binding OData query nodes to SPARQL model mutations.
//!
//! One [`SparqlGenerator`] translates one parsed query tree into a fully
//! populated [`SparqlModel`]. The generator itself is stateless: the model
//! under construction is threaded through every binder call, so a generator
//! can be reused across translations against the same map.

use crate::error::{Error, Result};
use crate::mapping::sparql_map::SparqlMap;
use crate::metadata::PrimitiveType;
use crate::odata::ast::{
    BinaryOperatorKind, ConstantValue, OrderByDirection, QueryNode, UnaryOperatorKind,
};
use crate::sparql::model::SparqlModel;
use crate::sparql::pattern::{PatternItem, TriplePattern};
use crate::sparql::RDF_TYPE;

/// The value a bound query node contributes to its parent
#[derive(Debug, Clone, PartialEq)]
enum BoundValue {
    /// A raw constant, not yet rendered as SPARQL
    Constant(ConstantValue),
    /// An absolute resource identifier
    Resource(String),
    /// A variable name, without the leading `?`
    Variable(String),
    /// An already-rendered SPARQL expression fragment
    Expression(String),
}

/// Translates parsed OData query trees into SPARQL query models.
pub struct SparqlGenerator<'a> {
    map: &'a SparqlMap,
    default_language_code: String,
}

impl<'a> SparqlGenerator<'a> {
    /// Creates a generator over a metadata map.
    ///
    /// `default_language_code` tags string constants in generated filters;
    /// pass an empty string to emit plain literals.
    pub fn new(map: &'a SparqlMap, default_language_code: impl Into<String>) -> Self {
        SparqlGenerator {
            map,
            default_language_code: default_language_code.into(),
        }
    }

    /// Translates a whole query tree into a new model.
    ///
    /// Any unsupported node kind, operator or function fails the whole
    /// translation; there are no partial results.
    pub fn process_query(&self, query: &QueryNode) -> Result<SparqlModel> {
        let mut model = SparqlModel::new();
        match query {
            QueryNode::KeyLookup {
                collection,
                declaring_type,
                key_property,
                key_value,
            } => {
                let resource =
                    self.resolve_key_resource(declaring_type, key_property, key_value, &mut model)?;
                let entity_type = collection.item_type().ok_or_else(|| {
                    Error::UnsupportedConstruct(
                        "key lookup over a collection with no element type".to_string(),
                    )
                })?;
                model.select_entity(resource, entity_type);
            }
            QueryNode::EntitySet { .. }
            | QueryNode::Filter { .. }
            | QueryNode::Top { .. }
            | QueryNode::Skip { .. }
            | QueryNode::OrderBy { .. }
            | QueryNode::Navigation { .. } => {
                let bound = self.bind_node(query, &mut model)?;
                // The entity set binder selects its own variable; shaping
                // roots (top, skip, orderby over a navigation) may leave the
                // final variable unselected.
                if model.select_variables.is_empty() {
                    let variable = match bound {
                        BoundValue::Variable(v) => v,
                        _ => {
                            return Err(Error::UnsupportedConstruct(
                                "query root does not produce a selectable collection".to_string(),
                            ))
                        }
                    };
                    let item_type = query.item_type().ok_or_else(|| {
                        Error::UnsupportedConstruct(
                            "query root has no element type".to_string(),
                        )
                    })?;
                    let is_collection = match query {
                        QueryNode::Navigation { is_collection, .. } => *is_collection,
                        _ => true,
                    };
                    model.add_select_variable(&variable, item_type, is_collection);
                }
                model.set_describe();
            }
            other => {
                return Err(Error::UnsupportedConstruct(format!(
                    "no processing implemented for query root {}",
                    node_kind(other)
                )))
            }
        }
        Ok(model)
    }

    /// Binds a collection-valued or single-entity node.
    fn bind_node(&self, node: &QueryNode, model: &mut SparqlModel) -> Result<BoundValue> {
        match node {
            QueryNode::Constant(value) => Ok(BoundValue::Constant(value.clone())),
            QueryNode::EntitySet { element_type, .. } => self
                .bind_entity_set(element_type, model)
                .map(BoundValue::Variable),
            QueryNode::KeyLookup {
                declaring_type,
                key_property,
                key_value,
                ..
            } => self
                .resolve_key_resource(declaring_type, key_property, key_value, model)
                .map(BoundValue::Resource),
            QueryNode::Filter {
                collection,
                expression,
                ..
            } => self.bind_filter(collection, expression, model),
            QueryNode::Top { collection, amount } => {
                let limit = self.bind_amount(amount, "$top", model)?;
                model.limit = Some(limit);
                self.bind_node(collection, model)
            }
            QueryNode::Skip { collection, amount } => {
                let offset = self.bind_amount(amount, "$skip", model)?;
                model.offset = Some(offset);
                self.bind_node(collection, model)
            }
            QueryNode::OrderBy {
                collection,
                expression,
                direction,
            } => {
                let bound = self.bind_node(collection, model)?;
                match self.bind_expression(expression, model)? {
                    BoundValue::Variable(variable) => {
                        model.add_ordering(variable, *direction == OrderByDirection::Descending);
                    }
                    _ => {
                        return Err(Error::UnsupportedConstruct(
                            "only direct property access is supported in $orderby".to_string(),
                        ))
                    }
                }
                Ok(bound)
            }
            QueryNode::Navigation {
                source,
                declaring_type,
                property_name,
                ..
            } => self
                .bind_navigation(source, declaring_type, property_name, model)
                .map(BoundValue::Variable),
            QueryNode::PropertyAccess {
                source_type,
                property_name,
            } => self.bind_property_access(source_type, property_name, model),
            other => Err(Error::UnsupportedConstruct(format!(
                "no processing implemented for {}",
                node_kind(other)
            ))),
        }
    }

    /// Binds a scalar or boolean expression node.
    fn bind_expression(&self, node: &QueryNode, model: &mut SparqlModel) -> Result<BoundValue> {
        match node {
            QueryNode::Constant(value) => Ok(BoundValue::Constant(value.clone())),
            QueryNode::Convert {
                source,
                target_type,
            } => {
                let bound = self.bind_expression(source, model)?;
                match bound {
                    BoundValue::Constant(value) => {
                        convert_constant(value, *target_type).map(BoundValue::Constant)
                    }
                    other => Ok(other),
                }
            }
            QueryNode::BinaryOperator { kind, left, right } => self
                .bind_binary_operator(*kind, left, right, model)
                .map(BoundValue::Expression),
            QueryNode::UnaryOperator { kind, operand } => self
                .bind_unary_operator(*kind, operand, model)
                .map(BoundValue::Expression),
            QueryNode::PropertyAccess {
                source_type,
                property_name,
            } => self.bind_property_access(source_type, property_name, model),
            QueryNode::FunctionCall { name, arguments } => self
                .bind_function_call(name, arguments, model)
                .map(BoundValue::Expression),
            other => Err(Error::UnsupportedConstruct(format!(
                "no support for {} in expressions",
                node_kind(other)
            ))),
        }
    }

    /// Emits the type triple binding a fresh instances variable for an
    /// entity set, and selects that variable.
    fn bind_entity_set(&self, element_type: &str, model: &mut SparqlModel) -> Result<String> {
        let type_uri = self
            .map
            .uri_for_type(element_type)
            .ok_or_else(|| {
                Error::Mapping(format!("no RDF class mapping for entity type {}", element_type))
            })?
            .to_string();
        let instances = model.next_variable();
        model.current_graph_pattern_mut().add(TriplePattern::new(
            PatternItem::Variable(instances.clone()),
            PatternItem::Resource(RDF_TYPE.to_string()),
            PatternItem::Resource(type_uri),
        ));
        model.add_select_variable(&instances, element_type, true);
        model.set_describe();
        Ok(instances)
    }

    /// Resolves a key lookup to an absolute resource identifier by
    /// concatenating the key property's identifier prefix with the key
    /// literal's lexical form.
    fn resolve_key_resource(
        &self,
        declaring_type: &str,
        key_property: &str,
        key_value: &QueryNode,
        model: &mut SparqlModel,
    ) -> Result<String> {
        let prefix = self
            .map
            .identifier_prefix_for_property(declaring_type, key_property)
            .ok_or_else(|| {
                Error::Mapping(format!(
                    "key property {}.{} declares no identifier prefix",
                    declaring_type, key_property
                ))
            })?
            .to_string();
        match self.bind_expression(key_value, model)? {
            BoundValue::Constant(value) => Ok(format!("{}{}", prefix, value.lexical_form())),
            _ => Err(Error::UnsupportedConstruct(
                "key lookup requires a constant key value".to_string(),
            )),
        }
    }

    /// Binds the filtered collection, then appends the translated boolean
    /// expression as one filter on the current pattern.
    fn bind_filter(
        &self,
        collection: &QueryNode,
        expression: &QueryNode,
        model: &mut SparqlModel,
    ) -> Result<BoundValue> {
        let source = self.bind_node(collection, model)?;
        let instances = match source {
            BoundValue::Variable(variable) => variable,
            _ => {
                return Err(Error::UnsupportedConstruct(
                    "$filter requires a collection source".to_string(),
                ))
            }
        };
        let bound = self.bind_expression(expression, model)?;
        let filter_text = self.render(&bound)?;
        model
            .current_graph_pattern_mut()
            .add_filter_expression(filter_text);
        Ok(BoundValue::Variable(instances))
    }

    /// Links the navigation source to a fresh target variable through the
    /// navigation's RDF predicate, honoring its declared direction.
    fn bind_navigation(
        &self,
        source: &QueryNode,
        declaring_type: &str,
        property_name: &str,
        model: &mut SparqlModel,
    ) -> Result<String> {
        let source_item = match self.bind_node(source, model)? {
            BoundValue::Resource(uri) => PatternItem::Resource(uri),
            BoundValue::Variable(variable) => PatternItem::Variable(variable),
            _ => {
                return Err(Error::UnsupportedConstruct(
                    "navigation source could not be bound".to_string(),
                ))
            }
        };
        let (property_uri, is_inverse) = self
            .map
            .navigation_property_uri(declaring_type, property_name)
            .map(|(uri, inverse)| (uri.to_string(), inverse))
            .ok_or_else(|| {
                Error::Mapping(format!(
                    "no RDF predicate mapping for navigation {}.{}",
                    declaring_type, property_name
                ))
            })?;
        let target = model.next_variable();
        let pattern = model.current_graph_pattern_mut();
        if is_inverse {
            // Target is the subject of the triple
            pattern.add(TriplePattern::new(
                PatternItem::Variable(target.clone()),
                PatternItem::Resource(property_uri),
                source_item,
            ));
        } else {
            pattern.add(TriplePattern::new(
                source_item,
                PatternItem::Resource(property_uri),
                PatternItem::Variable(target.clone()),
            ));
        }
        Ok(target)
    }

    /// Resolves a property access to its predicate-bound variable, creating
    /// the instances variable and the access triple only when no equivalent
    /// binding exists yet.
    fn bind_property_access(
        &self,
        source_type: &str,
        property_name: &str,
        model: &mut SparqlModel,
    ) -> Result<BoundValue> {
        let source_variable = self.assert_instances_variable(source_type, model)?;
        let property_uri = self
            .map
            .uri_for_property(source_type, property_name)
            .ok_or_else(|| {
                Error::Mapping(format!(
                    "no RDF predicate mapping for property {}.{}",
                    source_type, property_name
                ))
            })?
            .to_string();
        let variable = self.assert_property_variable(&source_variable, &property_uri, model);
        Ok(BoundValue::Variable(variable))
    }

    /// Returns the existing instances variable for an entity type, or binds
    /// a fresh one with a type triple.
    fn assert_instances_variable(
        &self,
        entity_type: &str,
        model: &mut SparqlModel,
    ) -> Result<String> {
        let type_uri = self
            .map
            .uri_for_type(entity_type)
            .ok_or_else(|| {
                Error::Mapping(format!("no RDF class mapping for entity type {}", entity_type))
            })?
            .to_string();
        if let Some(existing) = model
            .current_graph_pattern()
            .find_type_variable(&type_uri)
            .map(str::to_string)
        {
            return Ok(existing);
        }
        let instances = model.next_variable();
        model.current_graph_pattern_mut().add(TriplePattern::new(
            PatternItem::Variable(instances.clone()),
            PatternItem::Resource(RDF_TYPE.to_string()),
            PatternItem::Resource(type_uri),
        ));
        Ok(instances)
    }

    /// Returns the existing object variable for a subject/predicate pair, or
    /// binds a fresh one.
    fn assert_property_variable(
        &self,
        source_variable: &str,
        property_uri: &str,
        model: &mut SparqlModel,
    ) -> String {
        if let Some(existing) = model
            .current_graph_pattern()
            .find_object_variable(source_variable, property_uri)
            .map(str::to_string)
        {
            return existing;
        }
        let variable = model.next_variable();
        model.current_graph_pattern_mut().add(TriplePattern::new(
            PatternItem::Variable(source_variable.to_string()),
            PatternItem::Resource(property_uri.to_string()),
            PatternItem::Variable(variable.clone()),
        ));
        variable
    }

    fn bind_amount(
        &self,
        amount: &QueryNode,
        option: &str,
        model: &mut SparqlModel,
    ) -> Result<u64> {
        match self.bind_expression(amount, model)? {
            BoundValue::Constant(value) => value.as_integer().ok_or_else(|| {
                Error::Parse(format!("{} requires a non-negative integer", option))
            }),
            _ => Err(Error::Parse(format!(
                "{} requires a constant integer amount",
                option
            ))),
        }
    }

    fn bind_binary_operator(
        &self,
        kind: BinaryOperatorKind,
        left: &QueryNode,
        right: &QueryNode,
        model: &mut SparqlModel,
    ) -> Result<String> {
        let left = self.bind_argument(left, model)?;
        let right = self.bind_argument(right, model)?;
        let text = match kind {
            // Comparison operators
            BinaryOperatorKind::Equal => format!("{} = {}", left, right),
            BinaryOperatorKind::NotEqual => format!("{} != {}", left, right),
            BinaryOperatorKind::GreaterThan => format!("{} > {}", left, right),
            BinaryOperatorKind::GreaterThanOrEqual => format!("{} >= {}", left, right),
            BinaryOperatorKind::LessThan => format!("{} < {}", left, right),
            BinaryOperatorKind::LessThanOrEqual => format!("{} <= {}", left, right),
            // Logical operators
            BinaryOperatorKind::And => format!("({}) && ({})", left, right),
            BinaryOperatorKind::Or => format!("({}) || ({})", left, right),
            // Arithmetic operators
            BinaryOperatorKind::Add => format!("({} + {})", left, right),
            BinaryOperatorKind::Subtract => format!("({} - {})", left, right),
            BinaryOperatorKind::Multiply => format!("({} * {})", left, right),
            BinaryOperatorKind::Divide => format!("({} / {})", left, right),
            BinaryOperatorKind::Modulo => {
                return Err(Error::UnsupportedConstruct(
                    "there is no SPARQL equivalent for the OData mod operator".to_string(),
                ))
            }
        };
        Ok(text)
    }

    fn bind_unary_operator(
        &self,
        kind: UnaryOperatorKind,
        operand: &QueryNode,
        model: &mut SparqlModel,
    ) -> Result<String> {
        let operand = self.bind_argument(operand, model)?;
        match kind {
            UnaryOperatorKind::Not => Ok(format!("!({})", operand)),
            UnaryOperatorKind::Negate => Ok(format!("-{}", operand)),
        }
    }

    /// Maps an OData canonical function onto its SPARQL built-in.
    fn bind_function_call(
        &self,
        name: &str,
        arguments: &[QueryNode],
        model: &mut SparqlModel,
    ) -> Result<String> {
        let args = arguments
            .iter()
            .map(|a| self.bind_argument(a, model))
            .collect::<Result<Vec<_>>>()?;
        let lower = name.to_lowercase();
        match lower.as_str() {
            // String functions
            "substringof" => {
                // SPARQL equivalent is contains(str, str) with the argument
                // ordering switched
                require_args(&lower, &args, 2)?;
                Ok(format!("contains({}, {})", args[1], args[0]))
            }
            "endswith" => {
                require_args(&lower, &args, 2)?;
                Ok(format!("strends({}, {})", args[0], args[1]))
            }
            "startswith" => {
                require_args(&lower, &args, 2)?;
                Ok(format!("strstarts({}, {})", args[0], args[1]))
            }
            "length" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("strlen({})", args[0]))
            }
            "indexof" => Err(Error::UnsupportedConstruct(
                "SPARQL does not support an equivalent to OData indexof(str)".to_string(),
            )),
            "substring" => {
                if args.len() != 2 && args.len() != 3 {
                    return Err(Error::Parse(
                        "substring expects two or three arguments".to_string(),
                    ));
                }
                Ok(format!("substr({})", args.join(", ")))
            }
            "tolower" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("lcase({})", args[0]))
            }
            "toupper" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("ucase({})", args[0]))
            }
            "trim" => {
                // SPARQL has no trim, so strip leading and trailing
                // whitespace with replace()
                require_args(&lower, &args, 1)?;
                Ok(format!("replace({}, '^\\\\s+|\\\\s+$', '')", args[0]))
            }
            "concat" => Ok(format!("concat({})", args.join(", "))),
            // Date functions
            "day" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("day({})", args[0]))
            }
            "hour" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("hours({})", args[0]))
            }
            "minute" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("minutes({})", args[0]))
            }
            "month" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("month({})", args[0]))
            }
            "second" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("seconds({})", args[0]))
            }
            "year" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("year({})", args[0]))
            }
            // Math functions
            "round" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("round({})", args[0]))
            }
            "ceiling" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("ceil({})", args[0]))
            }
            "floor" => {
                require_args(&lower, &args, 1)?;
                Ok(format!("floor({})", args[0]))
            }
            _ => Err(Error::UnsupportedConstruct(format!(
                "no support for function {}",
                name
            ))),
        }
    }

    /// Binds a function or operator argument and renders it as SPARQL text.
    fn bind_argument(&self, node: &QueryNode, model: &mut SparqlModel) -> Result<String> {
        let bound = self.bind_expression(node, model)?;
        self.render(&bound)
    }

    fn render(&self, value: &BoundValue) -> Result<String> {
        match value {
            BoundValue::Constant(constant) => self.sparql_constant(constant),
            BoundValue::Variable(variable) => Ok(format!("?{}", variable)),
            BoundValue::Resource(uri) => Ok(format!("<{}>", uri)),
            BoundValue::Expression(text) => Ok(text.clone()),
        }
    }

    /// Renders a constant as SPARQL literal syntax: quoted and language
    /// tagged for strings, bare for numerics and booleans.
    fn sparql_constant(&self, value: &ConstantValue) -> Result<String> {
        match value {
            ConstantValue::String(s) => {
                let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
                if self.default_language_code.is_empty() {
                    Ok(format!("'{}'", escaped))
                } else {
                    Ok(format!("'{}'@{}", escaped, self.default_language_code))
                }
            }
            ConstantValue::Boolean(b) => Ok(b.to_string()),
            ConstantValue::Int32(i) => Ok(i.to_string()),
            ConstantValue::Int64(i) => Ok(i.to_string()),
            ConstantValue::Double(d) => Ok(d.to_string()),
            ConstantValue::Decimal(d) => Ok(d.clone()),
            ConstantValue::Null | ConstantValue::DateTime(_) => Err(Error::UnsupportedConstruct(
                format!("no SPARQL conversion defined for constant {:?}", value),
            )),
        }
    }
}

fn require_args(name: &str, args: &[String], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::Parse(format!(
            "{} expects {} argument{}",
            name,
            expected,
            if expected == 1 { "" } else { "s" }
        )))
    }
}

fn convert_constant(value: ConstantValue, target: PrimitiveType) -> Result<ConstantValue> {
    match target {
        PrimitiveType::Int32 => match &value {
            ConstantValue::Int32(_) => Ok(value),
            ConstantValue::Int64(i) => i32::try_from(*i).map(ConstantValue::Int32).map_err(|_| {
                Error::Parse(format!("integer value {} does not fit in Int32", i))
            }),
            ConstantValue::String(s) => s
                .parse()
                .map(ConstantValue::Int32)
                .map_err(|_| Error::Parse(format!("cannot convert '{}' to Int32", s))),
            _ => Err(Error::UnsupportedConstruct(format!(
                "no conversion to Int32 from {:?}",
                value
            ))),
        },
        PrimitiveType::Int64 => match &value {
            ConstantValue::Int64(_) => Ok(value),
            ConstantValue::Int32(i) => Ok(ConstantValue::Int64(i64::from(*i))),
            ConstantValue::String(s) => s
                .parse()
                .map(ConstantValue::Int64)
                .map_err(|_| Error::Parse(format!("cannot convert '{}' to Int64", s))),
            _ => Err(Error::UnsupportedConstruct(format!(
                "no conversion to Int64 from {:?}",
                value
            ))),
        },
        PrimitiveType::String => Ok(ConstantValue::String(value.lexical_form())),
        PrimitiveType::Decimal => match &value {
            ConstantValue::Decimal(_) => Ok(value),
            ConstantValue::Int32(_)
            | ConstantValue::Int64(_)
            | ConstantValue::Double(_)
            | ConstantValue::String(_) => Ok(ConstantValue::Decimal(value.lexical_form())),
            _ => Err(Error::UnsupportedConstruct(format!(
                "no conversion to Decimal from {:?}",
                value
            ))),
        },
        PrimitiveType::Double => match &value {
            ConstantValue::Double(_) => Ok(value),
            ConstantValue::Int32(i) => Ok(ConstantValue::Double(f64::from(*i))),
            ConstantValue::Int64(i) => Ok(ConstantValue::Double(*i as f64)),
            ConstantValue::String(s) => s
                .parse()
                .map(ConstantValue::Double)
                .map_err(|_| Error::Parse(format!("cannot convert '{}' to Double", s))),
            _ => Err(Error::UnsupportedConstruct(format!(
                "no conversion to Double from {:?}",
                value
            ))),
        },
        other => Err(Error::UnsupportedConstruct(format!(
            "conversion to type {:?} is not implemented",
            other
        ))),
    }
}

fn node_kind(node: &QueryNode) -> &'static str {
    match node {
        QueryNode::EntitySet { .. } => "EntitySet",
        QueryNode::KeyLookup { .. } => "KeyLookup",
        QueryNode::Filter { .. } => "Filter",
        QueryNode::Top { .. } => "Top",
        QueryNode::Skip { .. } => "Skip",
        QueryNode::OrderBy { .. } => "OrderBy",
        QueryNode::Navigation { .. } => "Navigation",
        QueryNode::Constant(_) => "Constant",
        QueryNode::Convert { .. } => "Convert",
        QueryNode::BinaryOperator { .. } => "BinaryOperator",
        QueryNode::UnaryOperator { .. } => "UnaryOperator",
        QueryNode::PropertyAccess { .. } => "PropertyAccess",
        QueryNode::FunctionCall { .. } => "FunctionCall",
    }
}
