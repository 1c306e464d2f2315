//! Typed attribute access over HCL block bodies.
//!
//! Packer templates are loosely typed: a port may be written as `8080` or
//! `"8080"`, a flag as `true` or `"true"`. The decoder projects HCL
//! expressions into [`AttributeValue`] and coerces between scalar kinds on
//! access, so callers ask for the shape they want and get `None` when the
//! attribute is absent or cannot be coerced.

use hcl::expr::{Expression, ObjectKey};
use hcl::{Block, Body};
use std::collections::BTreeMap;

use crate::variables::VariableTable;

/// An attribute value after variable substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(hcl::Number),
    String(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
    /// An expression that is not evaluated (function calls, conditionals,
    /// operators), kept as its HCL source text.
    Unevaluated(String),
}

impl AttributeValue {
    /// Project an HCL expression, substituting known variables.
    pub fn from_expression(expr: &Expression, vars: &VariableTable) -> Self {
        match expr {
            Expression::Null => AttributeValue::Null,
            Expression::Bool(b) => AttributeValue::Bool(*b),
            Expression::Number(n) => AttributeValue::Number(n.clone()),
            Expression::String(s) => AttributeValue::String(s.clone()),
            Expression::TemplateExpr(template) => {
                AttributeValue::String(vars.render_template(template))
            }
            Expression::Array(items) => AttributeValue::List(
                items
                    .iter()
                    .map(|item| AttributeValue::from_expression(item, vars))
                    .collect(),
            ),
            Expression::Object(object) => AttributeValue::Map(
                object
                    .iter()
                    .filter_map(|(key, value)| {
                        let key = object_key(key, vars)?;
                        Some((key, AttributeValue::from_expression(value, vars)))
                    })
                    .collect(),
            ),
            Expression::Traversal(traversal) => {
                // Unknown references stay visible in the output.
                let resolved = vars.resolve_traversal(traversal);
                AttributeValue::String(resolved.unwrap_or_else(|| format!("${{{expr}}}")))
            }
            other => AttributeValue::Unevaluated(other.to_string()),
        }
    }

    /// String form of a scalar. Numbers and booleans are rendered as text.
    pub fn as_string(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Number(n) => Some(n.to_string()),
            AttributeValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Boolean form. The strings `"true"` and `"false"` are accepted.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer form. Numeric strings are accepted.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Number(n) => n.as_i64(),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// List of scalars as strings; non-scalar items are skipped.
    ///
    /// A single string is not promoted to a one-element list.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            AttributeValue::List(items) => {
                Some(items.iter().filter_map(AttributeValue::as_string).collect())
            }
            _ => None,
        }
    }

    /// Map of scalars as strings; non-scalar values are skipped.
    pub fn as_string_map(&self) -> Option<BTreeMap<String, String>> {
        match self {
            AttributeValue::Map(entries) => Some(
                entries
                    .iter()
                    .filter_map(|(key, value)| Some((key.clone(), value.as_string()?)))
                    .collect(),
            ),
            _ => None,
        }
    }
}

fn object_key(key: &ObjectKey, vars: &VariableTable) -> Option<String> {
    match key {
        ObjectKey::Identifier(ident) => Some(ident.as_str().to_string()),
        ObjectKey::Expression(expr) => AttributeValue::from_expression(expr, vars).as_string(),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Attribute accessors for a single block body.
#[derive(Debug, Clone, Copy)]
pub struct BlockDecoder<'a> {
    body: &'a Body,
    vars: &'a VariableTable,
}

impl<'a> BlockDecoder<'a> {
    pub fn new(body: &'a Body, vars: &'a VariableTable) -> Self {
        Self { body, vars }
    }

    /// Decoder for a nested block, sharing the same variables.
    pub fn nested(&self, block: &'a Block) -> BlockDecoder<'a> {
        BlockDecoder::new(block.body(), self.vars)
    }

    /// The value of attribute `name`. When it is repeated, the last one wins.
    pub fn value(&self, name: &str) -> Option<AttributeValue> {
        self.body
            .attributes()
            .filter(|attr| attr.key() == name)
            .last()
            .map(|attr| AttributeValue::from_expression(attr.expr(), self.vars))
    }

    /// Raw expression of attribute `name`, without evaluation.
    pub fn expression(&self, name: &str) -> Option<&'a Expression> {
        self.body
            .attributes()
            .filter(|attr| attr.key() == name)
            .last()
            .map(|attr| attr.expr())
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.value(name)?.as_string()
    }

    /// Like [`get_string`](Self::get_string), but empty strings count as absent.
    pub fn get_non_empty_string(&self, name: &str) -> Option<String> {
        self.get_string(name).filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.value(name)?.as_bool()
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.value(name)?.as_int()
    }

    pub fn get_string_list(&self, name: &str) -> Option<Vec<String>> {
        self.value(name)?.as_string_list()
    }

    pub fn get_string_map(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.value(name)?.as_string_map()
    }

    /// Nested blocks with the given identifier, in declaration order.
    pub fn blocks(self, identifier: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.body
            .blocks()
            .filter(move |block| block.identifier() == identifier)
    }
}
