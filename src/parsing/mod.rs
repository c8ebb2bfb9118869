//! Request parsing: translation of OData URIs and query options into the
//! typed query tree consumed by the SPARQL generator.

pub mod odata_parser;

pub use odata_parser::ODataParser;
