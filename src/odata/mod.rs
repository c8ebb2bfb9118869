//! OData-facing data structures: the parsed query tree consumed by the
//! translator and the entry/feed payload model handed to the wire writer.

pub mod ast;
pub mod feed;

pub use ast::{
    BinaryOperatorKind, ConstantValue, OrderByDirection, QueryNode, UnaryOperatorKind,
};
pub use feed::{
    ODataAssociationLink, ODataEntry, ODataFeed, ODataPayload, ODataProperty, PropertyValue,
};
