//! Naming conventions for deriving RDF identifiers from entity and property names.

use serde::Deserialize;

/// The different ways of turning an OData entity / property name into an RDF
/// identifier when no explicit `Uri` annotation is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum NameMapping {
    /// Use the name exactly as written
    #[default]
    Unchanged,
    /// Use the name as written but with the first character forced to lower case
    LowerCamelCase,
    /// Use the name as written but with the first character forced to upper case
    UpperCamelCase,
    /// Use the name forced entirely to lower case
    LowerCase,
    /// Use the name forced entirely to upper case
    UpperCase,
}

impl NameMapping {
    /// Applies this convention to a raw name and prepends the namespace prefix.
    pub fn apply(&self, namespace: &str, name: &str) -> String {
        let mapped = match self {
            NameMapping::Unchanged => name.to_string(),
            NameMapping::LowerCase => name.to_lowercase(),
            NameMapping::UpperCase => name.to_uppercase(),
            NameMapping::LowerCamelCase => change_first(name, char::to_lowercase),
            NameMapping::UpperCamelCase => change_first(name, char::to_uppercase),
        };
        format!("{}{}", namespace, mapped)
    }
}

fn change_first<I>(name: &str, transform: impl Fn(char) -> I) -> String
where
    I: Iterator<Item = char>,
{
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => transform(first).chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventions_map_names_as_documented() {
        let ns = "http://example.org/ontology/";
        assert_eq!(
            NameMapping::Unchanged.apply(ns, "PopulationTotal"),
            "http://example.org/ontology/PopulationTotal"
        );
        assert_eq!(
            NameMapping::LowerCamelCase.apply(ns, "PopulationTotal"),
            "http://example.org/ontology/populationTotal"
        );
        assert_eq!(
            NameMapping::UpperCamelCase.apply(ns, "populationTotal"),
            "http://example.org/ontology/PopulationTotal"
        );
        assert_eq!(
            NameMapping::LowerCase.apply(ns, "PopulationTotal"),
            "http://example.org/ontology/populationtotal"
        );
        assert_eq!(
            NameMapping::UpperCase.apply(ns, "film"),
            "http://example.org/ontology/FILM"
        );
    }

    #[test]
    fn empty_names_stay_empty() {
        assert_eq!(NameMapping::LowerCamelCase.apply("ns:", ""), "ns:");
    }
}
