//! The parsed OData query tree.
//!
//! Every request is represented as one [`QueryNode`] tree. Collection
//! shaping nodes (`Top`, `Skip`, `OrderBy`, `Filter`) wrap the node they
//! apply to, so the resource path root sits at the bottom of the tree and
//! the translator reaches it by recursive descent. Names carried by nodes
//! are already resolved against the metadata model by the parser.

use crate::metadata::PrimitiveType;

/// A literal value appearing in a query
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    /// Kept in lexical form to avoid rounding on the way through
    Decimal(String),
    String(String),
    DateTime(String),
}

impl ConstantValue {
    /// The raw lexical form of this constant, without any quoting.
    pub fn lexical_form(&self) -> String {
        match self {
            ConstantValue::Null => String::new(),
            ConstantValue::Boolean(b) => b.to_string(),
            ConstantValue::Int32(i) => i.to_string(),
            ConstantValue::Int64(i) => i.to_string(),
            ConstantValue::Double(d) => d.to_string(),
            ConstantValue::Decimal(d) => d.clone(),
            ConstantValue::String(s) => s.clone(),
            ConstantValue::DateTime(s) => s.clone(),
        }
    }

    /// Reads this constant as an integer, for `$top`/`$skip` amounts.
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            ConstantValue::Int32(i) if *i >= 0 => Some(*i as u64),
            ConstantValue::Int64(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }
}

/// Binary operators of the OData expression grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorKind {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

/// Unary operators of the OData expression grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperatorKind {
    Not,
    Negate,
}

/// Sort direction of an `$orderby` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Ascending,
    Descending,
}

/// One node of the parsed query tree
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Access to a whole entity set
    EntitySet {
        set_name: String,
        /// Qualified name of the set's element type
        element_type: String,
    },
    /// Lookup of a single entity by key
    KeyLookup {
        collection: Box<QueryNode>,
        /// Qualified name of the entity type declaring the key property
        declaring_type: String,
        key_property: String,
        key_value: Box<QueryNode>,
    },
    /// `$filter` applied to a collection
    Filter {
        collection: Box<QueryNode>,
        /// Qualified name of the collection's element type
        item_type: String,
        expression: Box<QueryNode>,
    },
    /// `$top` applied to a collection
    Top {
        collection: Box<QueryNode>,
        amount: Box<QueryNode>,
    },
    /// `$skip` applied to a collection
    Skip {
        collection: Box<QueryNode>,
        amount: Box<QueryNode>,
    },
    /// One `$orderby` key applied to a collection
    OrderBy {
        collection: Box<QueryNode>,
        expression: Box<QueryNode>,
        direction: OrderByDirection,
    },
    /// A navigation property path segment
    Navigation {
        source: Box<QueryNode>,
        /// Qualified name of the entity type declaring the navigation
        declaring_type: String,
        property_name: String,
        /// Qualified name of the navigation target type
        target_type: String,
        is_collection: bool,
    },
    /// A literal constant
    Constant(ConstantValue),
    /// A type conversion applied to a sub-expression
    Convert {
        source: Box<QueryNode>,
        target_type: PrimitiveType,
    },
    /// A binary operator application
    BinaryOperator {
        kind: BinaryOperatorKind,
        left: Box<QueryNode>,
        right: Box<QueryNode>,
    },
    /// A unary operator application
    UnaryOperator {
        kind: UnaryOperatorKind,
        operand: Box<QueryNode>,
    },
    /// Access to a structural property of the current instance
    PropertyAccess {
        /// Qualified name of the entity type the access starts from
        source_type: String,
        property_name: String,
    },
    /// A call to one of the canonical OData functions
    FunctionCall {
        name: String,
        arguments: Vec<QueryNode>,
    },
}

impl QueryNode {
    /// Qualified element type of the collection (or single entity) this node
    /// evaluates to, when the node has one.
    pub fn item_type(&self) -> Option<&str> {
        match self {
            QueryNode::EntitySet { element_type, .. } => Some(element_type),
            QueryNode::Filter { item_type, .. } => Some(item_type),
            QueryNode::Navigation { target_type, .. } => Some(target_type),
            QueryNode::KeyLookup { collection, .. }
            | QueryNode::Top { collection, .. }
            | QueryNode::Skip { collection, .. }
            | QueryNode::OrderBy { collection, .. } => collection.item_type(),
            _ => None,
        }
    }
}
