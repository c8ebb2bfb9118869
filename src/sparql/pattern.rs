//! Triple pattern primitives and their textual rendering.

use crate::sparql::RDF_TYPE;

/// A term usable as the subject, predicate or object of a triple pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternItem {
    /// An absolute resource identifier
    Resource(String),
    /// A query variable, stored without the leading `?`
    Variable(String),
}

impl PatternItem {
    /// Renders this item as it appears in a SPARQL query.
    pub fn sparql_representation(&self) -> String {
        match self {
            PatternItem::Resource(uri) => format!("<{}>", uri),
            PatternItem::Variable(name) => format!("?{}", name),
        }
    }

    /// The variable name, when this item is a variable.
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            PatternItem::Variable(name) => Some(name),
            PatternItem::Resource(_) => None,
        }
    }

    /// The resource identifier, when this item is a resource.
    pub fn resource_uri(&self) -> Option<&str> {
        match self {
            PatternItem::Resource(uri) => Some(uri),
            PatternItem::Variable(_) => None,
        }
    }
}

/// One subject-predicate-object clause.
///
/// Created once when the generator binds a query node, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternItem,
    pub predicate: PatternItem,
    pub object: PatternItem,
}

impl TriplePattern {
    pub fn new(subject: PatternItem, predicate: PatternItem, object: PatternItem) -> Self {
        TriplePattern {
            subject,
            predicate,
            object,
        }
    }

    pub fn sparql_representation(&self) -> String {
        format!(
            "{} {} {}",
            self.subject.sparql_representation(),
            self.predicate.sparql_representation(),
            self.object.sparql_representation()
        )
    }
}

/// An ordered collection of triple patterns plus filter expressions forming
/// one query scope. Child patterns are kept for nested sub-query scopes.
#[derive(Debug, Clone, Default)]
pub struct GraphPattern {
    pub triple_patterns: Vec<TriplePattern>,
    pub filter_expressions: Vec<String>,
    pub child_patterns: Vec<GraphPattern>,
}

impl GraphPattern {
    pub fn new() -> Self {
        GraphPattern::default()
    }

    /// Appends a triple pattern to this scope.
    pub fn add(&mut self, triple_pattern: TriplePattern) {
        self.triple_patterns.push(triple_pattern);
    }

    /// Appends a boolean filter expression; multiple expressions render as a
    /// conjunction.
    pub fn add_filter_expression(&mut self, expression: impl Into<String>) {
        self.filter_expressions.push(expression.into());
    }

    /// Looks for a variable already bound to instances of a class by an
    /// `?var rdf:type <class>` triple in this scope.
    pub fn find_type_variable(&self, type_uri: &str) -> Option<&str> {
        self.triple_patterns.iter().find_map(|p| {
            let subject = p.subject.variable_name()?;
            if p.predicate.resource_uri()? == RDF_TYPE && p.object.resource_uri()? == type_uri {
                Some(subject)
            } else {
                None
            }
        })
    }

    /// Looks for a variable already bound as the object of a
    /// `?subject <predicate> ?object` triple in this scope.
    pub fn find_object_variable(&self, subject_variable: &str, predicate_uri: &str) -> Option<&str> {
        self.triple_patterns.iter().find_map(|p| {
            if p.subject.variable_name()? == subject_variable
                && p.predicate.resource_uri()? == predicate_uri
            {
                p.object.variable_name()
            } else {
                None
            }
        })
    }

    /// Renders this scope as the body of a `WHERE` clause.
    pub fn sparql_representation(&self) -> String {
        let mut parts: Vec<String> = self
            .triple_patterns
            .iter()
            .map(|p| format!("{} .", p.sparql_representation()))
            .collect();
        if !self.filter_expressions.is_empty() {
            let conjunction = if self.filter_expressions.len() == 1 {
                self.filter_expressions[0].clone()
            } else {
                self.filter_expressions
                    .iter()
                    .map(|e| format!("({})", e))
                    .collect::<Vec<_>>()
                    .join(" && ")
            };
            parts.push(format!("FILTER ({})", conjunction));
        }
        for child in &self.child_patterns {
            parts.push(format!("{{ {} }}", child.sparql_representation()));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_render_with_their_sparql_syntax() {
        let resource = PatternItem::Resource("http://example.org/p".to_string());
        let variable = PatternItem::Variable("v1".to_string());
        assert_eq!(resource.sparql_representation(), "<http://example.org/p>");
        assert_eq!(variable.sparql_representation(), "?v1");
    }

    #[test]
    fn graph_pattern_renders_triples_and_filter_conjunction() {
        let mut pattern = GraphPattern::new();
        pattern.add(TriplePattern::new(
            PatternItem::Variable("v1".to_string()),
            PatternItem::Resource("http://example.org/age".to_string()),
            PatternItem::Variable("v2".to_string()),
        ));
        pattern.add_filter_expression("?v2 > 18");
        pattern.add_filter_expression("?v2 < 65");
        assert_eq!(
            pattern.sparql_representation(),
            "?v1 <http://example.org/age> ?v2 . FILTER ((?v2 > 18) && (?v2 < 65))"
        );
    }
}
