//! Conditions on values inside JSON fields, compiled into correlated
//! `EXISTS` sub-queries over a row source that explodes the document.

use crate::{
    context::AliasRegistry,
    error::FilterError,
    operator::{Operator, Template, map_operator},
    parse::path::PathSegment,
};
use path::compile_path;
use planner::{
    ident,
    query::{
        ast::{
            expr::{Expr, LogicalOperator},
            select::{FromSource, JsonPathArg, Select},
        },
        builder::select::SelectBuilder,
    },
};
use serde_json::Value as JsonValue;
use tracing::debug;

pub mod path;

/// A leaf condition comparing a value inside a JSON field.
#[derive(Debug, Clone)]
pub struct JsonLeaf<'n> {
    pub id: usize,
    /// Table or alias holding the JSON column.
    pub qualifier: String,
    pub collection: String,
    pub field: String,
    /// Path inside the document, never empty.
    pub rest: &'n [PathSegment],
    pub operator: Operator,
    pub operand: &'n JsonValue,
}

impl JsonLeaf<'_> {
    /// Leaves ending in a plain key can be read by name from a shared element.
    pub fn mergeable(&self) -> bool {
        self.rest.last().is_some_and(|segment| segment.index.is_none())
    }

    /// Path to the elements holding the final key, e.g. `$.deliverables[*]`.
    pub fn base_path(&self) -> String {
        compile_path(&self.rest[..self.rest.len().saturating_sub(1)], true)
    }

    fn column(&self) -> Expr {
        ident!(&self.qualifier, &self.field)
    }
}

/// `EXISTS` over the values matched by one leaf's full path, or `None`
/// when the operator places no constraint on the value.
pub fn single(
    registry: &mut AliasRegistry,
    leaf: &JsonLeaf,
) -> Result<Option<Expr>, FilterError> {
    let mut mapped = map_operator(leaf.operator, leaf.operand)?;
    if matches!(mapped.template, Template::Always) {
        return Ok(None);
    }
    let source = registry.field_source(&leaf.collection, &leaf.field);

    let cast = mapped.json_cast();
    let value = Expr::cast(
        Expr::JsonValue {
            source: source.alias.clone(),
            key: None,
        },
        cast,
    );
    let Some(predicate) = mapped.apply(value) else {
        return Ok(None);
    };

    let path = JsonPathArg::Bound(compile_path(leaf.rest, false));
    Ok(Some(exists(leaf.column(), path, &source.alias, predicate)))
}

/// One `EXISTS` testing every leaf against the same element of their
/// shared base path. Leaves that place no constraint are left out, and a
/// group made only of those yields `None`.
pub fn merged(
    registry: &mut AliasRegistry,
    group: &[JsonLeaf],
) -> Result<Option<Expr>, FilterError> {
    let Some(first) = group.first() else {
        return Err(FilterError::invalid("Cannot merge an empty group of conditions"));
    };

    let mut constrained = Vec::with_capacity(group.len());
    for leaf in group {
        let Some(key) = leaf.rest.last() else {
            return Err(FilterError::invalid(format!(
                "Empty path inside JSON field `{}`",
                leaf.field
            )));
        };
        let mapped = map_operator(leaf.operator, leaf.operand)?;
        if !matches!(mapped.template, Template::Always) {
            constrained.push((key, mapped));
        }
    }
    if constrained.is_empty() {
        return Ok(None);
    }

    let base_path = first.base_path();
    let source = registry.base_path_source(&first.collection, &first.field, &base_path);

    let mut predicates = Vec::with_capacity(constrained.len());
    for (key, mut mapped) in constrained {
        let cast = mapped.json_cast();
        let value = Expr::cast(
            Expr::JsonValue {
                source: source.alias.clone(),
                key: Some(key.name.clone()),
            },
            cast,
        );
        predicates.extend(mapped.apply(value));
    }

    debug!(
        field = %first.field,
        base_path = %base_path,
        conditions = predicates.len(),
        "Merged sibling JSON conditions"
    );

    let Some(predicate) = Expr::logical(LogicalOperator::And, predicates) else {
        return Ok(None);
    };
    Ok(Some(exists(
        first.column(),
        JsonPathArg::Inline(base_path),
        &source.alias,
        predicate,
    )))
}

fn exists(document: Expr, path: JsonPathArg, alias: &str, predicate: Expr) -> Expr {
    let select: Select = SelectBuilder::new()
        .select(vec![Expr::Raw("1".to_string())])
        .from_source(
            FromSource::JsonRows {
                target: document,
                path,
            },
            Some(alias),
        )
        .where_clause(predicate)
        .build();
    Expr::Exists(Box::new(select))
}
