//! Turns a JSON filter into a `FilterNode` tree, validating its shape once.

use crate::{error::FilterError, operator::Operator};
use path::{PathSegment, parse_key};
use planner::query::ast::expr::LogicalOperator;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

pub mod path;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `_and` / `_or`; an object with several keys is an implicit `_and`.
    Combinator {
        op: LogicalOperator,
        children: Vec<FilterNode>,
    },
    Condition(Condition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Unique within one parsed filter, including sub-filters.
    pub id: usize,
    pub path: Vec<PathSegment>,
    pub operator: Operator,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(JsonValue),
    /// Sub-filter of `_some` / `_none`, relative to the related collection.
    Filter(Box<FilterNode>),
}

impl FilterNode {
    /// The empty filter `{}`, which matches every row.
    pub fn match_all() -> Self {
        FilterNode::Combinator {
            op: LogicalOperator::And,
            children: Vec::new(),
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(
            self,
            FilterNode::Combinator { op: LogicalOperator::And, children } if children.is_empty()
        )
    }
}

impl Condition {
    pub fn value(&self) -> Option<&JsonValue> {
        match &self.operand {
            Operand::Value(value) => Some(value),
            Operand::Filter(_) => None,
        }
    }
}

/// Parses a filter. `null` and `{}` both match every row.
pub fn parse_filter(filter: &JsonValue, max_depth: usize) -> Result<FilterNode, FilterError> {
    let mut parser = Parser {
        next_id: 0,
        max_depth,
    };
    match filter {
        JsonValue::Null => Ok(FilterNode::match_all()),
        JsonValue::Object(object) => parser.parse_object(object, &[], 0),
        other => Err(FilterError::invalid(format!(
            "A filter must be an object, got `{other}`"
        ))),
    }
}

struct Parser {
    next_id: usize,
    max_depth: usize,
}

impl Parser {
    fn parse_object(
        &mut self,
        object: &Map<String, JsonValue>,
        prefix: &[PathSegment],
        depth: usize,
    ) -> Result<FilterNode, FilterError> {
        if depth > self.max_depth {
            return Err(FilterError::invalid(format!(
                "Filter is nested deeper than {} levels",
                self.max_depth
            )));
        }

        let mut children = Vec::with_capacity(object.len());
        for (key, value) in object {
            let node = match key.as_str() {
                "_and" => self.parse_group(LogicalOperator::And, key, value, prefix, depth)?,
                "_or" => self.parse_group(LogicalOperator::Or, key, value, prefix, depth)?,
                k if k.starts_with('_') => self.parse_operator(k, value, prefix, depth)?,
                _ => {
                    let Some(nested) = value.as_object() else {
                        return Err(FilterError::invalid(format!(
                            "Field `{key}` expects an operator object, got `{value}`"
                        )));
                    };
                    let mut path = prefix.to_vec();
                    path.extend(parse_key(key)?);
                    self.parse_object(nested, &path, depth + 1)?
                }
            };
            children.push(node);
        }

        Ok(match children.len() {
            1 => children.remove(0),
            _ => FilterNode::Combinator {
                op: LogicalOperator::And,
                children,
            },
        })
    }

    fn parse_group(
        &mut self,
        op: LogicalOperator,
        key: &str,
        value: &JsonValue,
        prefix: &[PathSegment],
        depth: usize,
    ) -> Result<FilterNode, FilterError> {
        let Some(items) = value.as_array() else {
            return Err(FilterError::invalid(format!(
                "`{key}` expects an array of filters"
            )));
        };

        let children = items
            .iter()
            .map(|item| match item.as_object() {
                Some(object) => self.parse_object(object, prefix, depth + 1),
                None => Err(FilterError::invalid(format!(
                    "`{key}` items must be objects, got `{item}`"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FilterNode::Combinator { op, children })
    }

    fn parse_operator(
        &mut self,
        key: &str,
        value: &JsonValue,
        prefix: &[PathSegment],
        depth: usize,
    ) -> Result<FilterNode, FilterError> {
        if prefix.is_empty() {
            return Err(FilterError::invalid(format!(
                "Operator `{key}` must be nested under a field"
            )));
        }
        if prefix[..prefix.len() - 1]
            .iter()
            .any(|segment| segment.function.is_some())
        {
            return Err(FilterError::invalid(
                "Functions are only allowed on the last field of a path",
            ));
        }

        let operator = Operator::from_key(key).unwrap_or_else(|| {
            warn!(operator = %key, "Unrecognized filter operator, comparing with equality");
            Operator::Eq
        });

        let operand = if operator.is_relational() {
            if prefix.len() != 1 {
                return Err(FilterError::invalid(format!(
                    "`{key}` is only allowed directly under a top-level relational field"
                )));
            }
            let Some(object) = value.as_object() else {
                return Err(FilterError::invalid(format!(
                    "`{key}` expects a filter object"
                )));
            };
            Operand::Filter(Box::new(self.parse_object(object, &[], depth + 1)?))
        } else {
            Operand::Value(value.clone())
        };

        let id = self.next_id;
        self.next_id += 1;
        Ok(FilterNode::Condition(Condition {
            id,
            path: prefix.to_vec(),
            operator,
            operand,
        }))
    }
}
