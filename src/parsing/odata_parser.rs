//! OData URI and query-option parser.
//!
//! Translates a request URI (resource path plus `$filter`, `$top`, `$skip`
//! and `$orderby` options) into a [`QueryNode`] tree, resolving entity set,
//! property and navigation names against the metadata model as it goes.
//! Shaping options wrap the path root as `Top(Skip(OrderBy(Filter(path))))`
//! so the generator's recursive descent reaches the path root last.

use regex::Regex;

use crate::error::{Error, Result};
use crate::metadata::EdmModel;
use crate::odata::ast::{
    BinaryOperatorKind, ConstantValue, OrderByDirection, QueryNode, UnaryOperatorKind,
};

/// Parser for OData request URIs against one metadata model
pub struct ODataParser<'a> {
    model: &'a EdmModel,
    key_segment_regex: Regex,
}

impl<'a> ODataParser<'a> {
    pub fn new(model: &'a EdmModel) -> Result<Self> {
        Ok(ODataParser {
            model,
            // EntitySet('key') or EntitySet(42)
            key_segment_regex: Regex::new(r"^([A-Za-z_]\w*)\((.+)\)$")
                .map_err(|e| Error::Configuration(e.to_string()))?,
        })
    }

    /// Parses an absolute request URI located under the service base URI.
    pub fn parse_uri(&self, uri: &str, service_base: &str) -> Result<QueryNode> {
        let relative = uri.strip_prefix(service_base).ok_or_else(|| {
            Error::Parse(format!(
                "request URI {} is not under the service base {}",
                uri, service_base
            ))
        })?;
        self.parse_path_and_query(relative)
    }

    /// Parses a service-relative resource path with optional query options.
    pub fn parse_path_and_query(&self, relative: &str) -> Result<QueryNode> {
        let (path, query) = match relative.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (relative, None),
        };

        let mut segments = path.trim_matches('/').split('/');
        let first = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Parse("empty resource path".to_string()))?;
        let first = decode_component(first)?;

        let (mut node, mut item_type, mut is_collection) = self.parse_root_segment(&first)?;

        for segment in segments {
            if segment.is_empty() {
                continue;
            }
            let name = decode_component(segment)?;
            let (declaring, navigation) = self
                .model
                .find_navigation_property(&item_type, &name)
                .ok_or_else(|| {
                    Error::Parse(format!(
                        "no navigation property {} on type {}",
                        name, item_type
                    ))
                })?;
            let target_type = navigation.target_type.clone();
            let nav_is_collection = navigation.collection;
            node = QueryNode::Navigation {
                source: Box::new(node),
                declaring_type: self.model.qualified_name(declaring),
                property_name: navigation.name.clone(),
                target_type: target_type.clone(),
                is_collection: nav_is_collection,
            };
            item_type = target_type;
            is_collection = nav_is_collection;
        }

        let options = parse_query_options(query)?;

        if let Some(filter) = options.filter {
            if !is_collection {
                return Err(Error::Parse(
                    "$filter can only be applied to a collection".to_string(),
                ));
            }
            let expression = self.parse_expression(&filter, &item_type)?;
            node = QueryNode::Filter {
                collection: Box::new(node),
                item_type: item_type.clone(),
                expression: Box::new(expression),
            };
        }

        if let Some(orderby) = options.orderby {
            if !is_collection {
                return Err(Error::Parse(
                    "$orderby can only be applied to a collection".to_string(),
                ));
            }
            for (expression, direction) in self.parse_orderby(&orderby, &item_type)? {
                node = QueryNode::OrderBy {
                    collection: Box::new(node),
                    expression: Box::new(expression),
                    direction,
                };
            }
        }

        if let Some(skip) = options.skip {
            node = QueryNode::Skip {
                collection: Box::new(node),
                amount: Box::new(QueryNode::Constant(integer_constant(skip))),
            };
        }

        if let Some(top) = options.top {
            node = QueryNode::Top {
                collection: Box::new(node),
                amount: Box::new(QueryNode::Constant(integer_constant(top))),
            };
        }

        Ok(node)
    }

    fn parse_root_segment(&self, segment: &str) -> Result<(QueryNode, String, bool)> {
        if let Some(captures) = self.key_segment_regex.captures(segment) {
            let set_name = captures[1].to_string();
            let key_text = captures[2].to_string();
            let set = self.model.entity_set(&set_name).ok_or_else(|| {
                Error::Parse(format!("no entity set named {}", set_name))
            })?;
            let element_type = set.element_type.clone();
            let (declaring, key_property) = self
                .model
                .single_key_property(&element_type)
                .ok_or_else(|| {
                    Error::Mapping(format!(
                        "entity type {} does not declare a single key property",
                        element_type
                    ))
                })?;
            let key_value = parse_key_literal(&key_text)?;
            let node = QueryNode::KeyLookup {
                collection: Box::new(QueryNode::EntitySet {
                    set_name,
                    element_type: element_type.clone(),
                }),
                declaring_type: self.model.qualified_name(declaring),
                key_property: key_property.name.clone(),
                key_value: Box::new(QueryNode::Constant(key_value)),
            };
            Ok((node, element_type, false))
        } else {
            let set = self.model.entity_set(segment).ok_or_else(|| {
                Error::Parse(format!("no entity set named {}", segment))
            })?;
            let element_type = set.element_type.clone();
            let node = QueryNode::EntitySet {
                set_name: set.name.clone(),
                element_type: element_type.clone(),
            };
            Ok((node, element_type, true))
        }
    }

    /// Parses one boolean or scalar OData expression against an item type.
    pub fn parse_expression(&self, text: &str, item_type: &str) -> Result<QueryNode> {
        let tokens = tokenize(text)?;
        let mut parser = ExpressionParser {
            model: self.model,
            item_type,
            tokens,
            position: 0,
        };
        let expression = parser.parse_or()?;
        parser.expect_end()?;
        Ok(expression)
    }

    /// Parses a `$orderby` option: comma separated keys, each an expression
    /// with an optional trailing `asc`/`desc`.
    pub fn parse_orderby(
        &self,
        text: &str,
        item_type: &str,
    ) -> Result<Vec<(QueryNode, OrderByDirection)>> {
        let tokens = tokenize(text)?;
        let mut parser = ExpressionParser {
            model: self.model,
            item_type,
            tokens,
            position: 0,
        };
        let mut keys = Vec::new();
        loop {
            let expression = parser.parse_or()?;
            let direction = match parser.peek() {
                Some(Token::Identifier(word)) if word == "asc" => {
                    parser.advance();
                    OrderByDirection::Ascending
                }
                Some(Token::Identifier(word)) if word == "desc" => {
                    parser.advance();
                    OrderByDirection::Descending
                }
                _ => OrderByDirection::Ascending,
            };
            keys.push((expression, direction));
            match parser.peek() {
                Some(Token::Comma) => {
                    parser.advance();
                }
                None => break,
                Some(other) => {
                    return Err(Error::Parse(format!(
                        "unexpected {:?} in $orderby",
                        other
                    )))
                }
            }
        }
        Ok(keys)
    }
}

#[derive(Debug, Default)]
struct QueryOptions {
    filter: Option<String>,
    orderby: Option<String>,
    top: Option<u64>,
    skip: Option<u64>,
}

fn parse_query_options(query: Option<&str>) -> Result<QueryOptions> {
    let mut options = QueryOptions::default();
    let Some(query) = query else {
        return Ok(options);
    };
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key)?;
        let value = decode_query_value(value)?;
        match key.as_str() {
            "$filter" => options.filter = Some(value),
            "$orderby" => options.orderby = Some(value),
            "$top" => options.top = Some(parse_count_option("$top", &value)?),
            "$skip" => options.skip = Some(parse_count_option("$skip", &value)?),
            other => {
                return Err(Error::Parse(format!(
                    "query option {} is not supported",
                    other
                )))
            }
        }
    }
    Ok(options)
}

fn parse_count_option(name: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Parse(format!("{} requires a non-negative integer", name)))
}

fn integer_constant(value: u64) -> ConstantValue {
    match i32::try_from(value) {
        Ok(small) => ConstantValue::Int32(small),
        Err(_) => ConstantValue::Int64(value as i64),
    }
}

fn decode_component(text: &str) -> Result<String> {
    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::Parse(format!("invalid percent-encoding: {}", e)))
}

fn decode_query_value(text: &str) -> Result<String> {
    decode_component(&text.replace('+', " "))
}

fn parse_key_literal(text: &str) -> Result<ConstantValue> {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        let inner = &trimmed[1..trimmed.len() - 1];
        return Ok(ConstantValue::String(inner.replace("''", "'")));
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(match i32::try_from(value) {
            Ok(small) => ConstantValue::Int32(small),
            Err(_) => ConstantValue::Int64(value),
        });
    }
    Err(Error::Parse(format!("cannot parse key literal {}", text)))
}

/// Lexical token of the OData expression grammar
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    StringLiteral(String),
    IntegerLiteral(i64),
    DoubleLiteral(f64),
    DecimalLiteral(String),
    OpenParen,
    CloseParen,
    Comma,
    Minus,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::OpenParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::CloseParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => {
                            // Doubled quote escapes a literal quote
                            if chars.peek() == Some(&'\'') {
                                chars.next();
                                value.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some(other) => value.push(other),
                        None => {
                            return Err(Error::Parse(
                                "unterminated string literal".to_string(),
                            ))
                        }
                    }
                }
                tokens.push(Token::StringLiteral(value));
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                let mut is_double = false;
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        number.push(d);
                        chars.next();
                    } else if d == '.' && !is_double {
                        is_double = true;
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match chars.peek() {
                    Some('m' | 'M') => {
                        chars.next();
                        tokens.push(Token::DecimalLiteral(number));
                    }
                    Some('d' | 'D' | 'f' | 'F') => {
                        chars.next();
                        let value = number.parse().map_err(|_| {
                            Error::Parse(format!("invalid numeric literal {}", number))
                        })?;
                        tokens.push(Token::DoubleLiteral(value));
                    }
                    Some('l' | 'L') => {
                        chars.next();
                        let value = number.parse().map_err(|_| {
                            Error::Parse(format!("invalid numeric literal {}", number))
                        })?;
                        tokens.push(Token::IntegerLiteral(value));
                    }
                    _ if is_double => {
                        let value = number.parse().map_err(|_| {
                            Error::Parse(format!("invalid numeric literal {}", number))
                        })?;
                        tokens.push(Token::DoubleLiteral(value));
                    }
                    _ => {
                        let value = number.parse().map_err(|_| {
                            Error::Parse(format!("invalid numeric literal {}", number))
                        })?;
                        tokens.push(Token::IntegerLiteral(value));
                    }
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        word.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Identifier(word));
            }
            other => {
                return Err(Error::Parse(format!(
                    "unexpected character '{}' in expression",
                    other
                )))
            }
        }
    }
    Ok(tokens)
}

/// Recursive descent parser over the tokenized expression, with OData
/// operator precedence: or < and < comparison < additive < multiplicative
/// < unary < primary.
struct ExpressionParser<'a> {
    model: &'a EdmModel,
    item_type: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl ExpressionParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(Error::Parse(format!(
                "unexpected {:?} after end of expression",
                token
            ))),
        }
    }

    fn keyword_operator(&mut self, keywords: &[(&str, BinaryOperatorKind)]) -> Option<BinaryOperatorKind> {
        if let Some(Token::Identifier(word)) = self.peek() {
            for (keyword, kind) in keywords {
                if word == keyword {
                    self.advance();
                    return Some(*kind);
                }
            }
        }
        None
    }

    fn parse_or(&mut self) -> Result<QueryNode> {
        let mut left = self.parse_and()?;
        while let Some(kind) = self.keyword_operator(&[("or", BinaryOperatorKind::Or)]) {
            let right = self.parse_and()?;
            left = QueryNode::BinaryOperator {
                kind,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<QueryNode> {
        let mut left = self.parse_comparison()?;
        while let Some(kind) = self.keyword_operator(&[("and", BinaryOperatorKind::And)]) {
            let right = self.parse_comparison()?;
            left = QueryNode::BinaryOperator {
                kind,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<QueryNode> {
        let left = self.parse_additive()?;
        let comparison = self.keyword_operator(&[
            ("eq", BinaryOperatorKind::Equal),
            ("ne", BinaryOperatorKind::NotEqual),
            ("gt", BinaryOperatorKind::GreaterThan),
            ("ge", BinaryOperatorKind::GreaterThanOrEqual),
            ("lt", BinaryOperatorKind::LessThan),
            ("le", BinaryOperatorKind::LessThanOrEqual),
        ]);
        match comparison {
            Some(kind) => {
                let right = self.parse_additive()?;
                Ok(QueryNode::BinaryOperator {
                    kind,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            None => Ok(left),
        }
    }

    fn parse_additive(&mut self) -> Result<QueryNode> {
        let mut left = self.parse_multiplicative()?;
        while let Some(kind) = self.keyword_operator(&[
            ("add", BinaryOperatorKind::Add),
            ("sub", BinaryOperatorKind::Subtract),
        ]) {
            let right = self.parse_multiplicative()?;
            left = QueryNode::BinaryOperator {
                kind,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<QueryNode> {
        let mut left = self.parse_unary()?;
        while let Some(kind) = self.keyword_operator(&[
            ("mul", BinaryOperatorKind::Multiply),
            ("div", BinaryOperatorKind::Divide),
            ("mod", BinaryOperatorKind::Modulo),
        ]) {
            let right = self.parse_unary()?;
            left = QueryNode::BinaryOperator {
                kind,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<QueryNode> {
        match self.peek() {
            Some(Token::Identifier(word)) if word == "not" => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(QueryNode::UnaryOperator {
                    kind: UnaryOperatorKind::Not,
                    operand: Box::new(operand),
                })
            }
            Some(Token::Minus) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(QueryNode::UnaryOperator {
                    kind: UnaryOperatorKind::Negate,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<QueryNode> {
        match self.advance() {
            Some(Token::OpenParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::CloseParen) => Ok(inner),
                    _ => Err(Error::Parse("expected closing parenthesis".to_string())),
                }
            }
            Some(Token::StringLiteral(value)) => {
                Ok(QueryNode::Constant(ConstantValue::String(value)))
            }
            Some(Token::IntegerLiteral(value)) => {
                Ok(QueryNode::Constant(match i32::try_from(value) {
                    Ok(small) => ConstantValue::Int32(small),
                    Err(_) => ConstantValue::Int64(value),
                }))
            }
            Some(Token::DoubleLiteral(value)) => {
                Ok(QueryNode::Constant(ConstantValue::Double(value)))
            }
            Some(Token::DecimalLiteral(value)) => {
                Ok(QueryNode::Constant(ConstantValue::Decimal(value)))
            }
            Some(Token::Identifier(word)) => self.parse_identifier(word),
            Some(token) => Err(Error::Parse(format!(
                "unexpected {:?} in expression",
                token
            ))),
            None => Err(Error::Parse("unexpected end of expression".to_string())),
        }
    }

    fn parse_identifier(&mut self, word: String) -> Result<QueryNode> {
        match word.as_str() {
            "true" => return Ok(QueryNode::Constant(ConstantValue::Boolean(true))),
            "false" => return Ok(QueryNode::Constant(ConstantValue::Boolean(false))),
            "null" => return Ok(QueryNode::Constant(ConstantValue::Null)),
            _ => {}
        }
        if self.peek() == Some(&Token::OpenParen) {
            self.advance();
            let mut arguments = Vec::new();
            if self.peek() != Some(&Token::CloseParen) {
                loop {
                    arguments.push(self.parse_or()?);
                    match self.advance() {
                        Some(Token::Comma) => continue,
                        Some(Token::CloseParen) => break,
                        _ => {
                            return Err(Error::Parse(format!(
                                "malformed argument list for function {}",
                                word
                            )))
                        }
                    }
                }
            } else {
                self.advance();
            }
            return Ok(QueryNode::FunctionCall {
                name: word,
                arguments,
            });
        }
        if self
            .model
            .find_structural_property(self.item_type, &word)
            .is_none()
        {
            return Err(Error::Parse(format!(
                "no property {} on type {}",
                word, self.item_type
            )));
        }
        Ok(QueryNode::PropertyAccess {
            source_type: self.item_type.to_string(),
            property_name: word,
        })
    }
}
