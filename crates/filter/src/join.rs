//! Resolves field paths against the schema and plans the joins they need.

use crate::{context::AliasRegistry, error::FilterError, parse::path::PathSegment};
use model::schema::{Cardinality, FieldOverview, Relation, SchemaOverview};
use planner::{
    ident,
    query::ast::{
        common::JoinKind,
        expr::{BinaryOperator, Expr},
        select::JoinClause,
    },
    table_ref,
};
use std::collections::HashMap;
use tracing::debug;

/// Result of asking the planner for the join behind a relation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// False when the same path was already joined.
    pub added: bool,
    /// The relation can yield more than one row.
    pub multi: bool,
    pub alias: String,
}

/// Where a field path lands once relations are followed.
#[derive(Debug)]
pub struct Target<'s, 'p> {
    /// Table or alias the field is read from.
    pub qualifier: String,
    pub collection: String,
    pub segment: &'p PathSegment,
    pub overview: &'s FieldOverview,
    pub relation: Option<&'s Relation>,
    pub kind: TargetKind<'p>,
}

#[derive(Debug, Clone, Copy)]
pub enum TargetKind<'p> {
    /// A column, possibly on a joined table.
    Column,
    /// A to-many relation; `rest` continues inside the related collection.
    ToMany { rest: &'p [PathSegment] },
    /// A JSON field; `rest` is the path inside the document.
    Json { rest: &'p [PathSegment] },
}

impl Target<'_, '_> {
    pub fn field(&self) -> &str {
        &self.segment.name
    }
}

/// Plans the joins of one query scope. Sub-queries get their own planner.
#[derive(Debug)]
pub struct JoinPlanner {
    collection: String,
    qualifier: String,
    aliases: HashMap<String, String>,
    joins: Vec<JoinClause>,
}

impl JoinPlanner {
    pub fn new(collection: &str, qualifier: &str) -> Self {
        Self {
            collection: collection.to_string(),
            qualifier: qualifier.to_string(),
            aliases: HashMap::new(),
            joins: Vec::new(),
        }
    }

    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    pub fn into_joins(self) -> Vec<JoinClause> {
        self.joins
    }

    /// Follows `path` from this scope's collection, joining every
    /// many-to-one relation crossed before the final field.
    pub fn resolve<'s, 'p>(
        &mut self,
        schema: &'s SchemaOverview,
        registry: &mut AliasRegistry,
        path: &'p [PathSegment],
    ) -> Result<Target<'s, 'p>, FilterError> {
        let mut collection = self.collection.clone();
        let mut qualifier = self.qualifier.clone();

        for (i, segment) in path.iter().enumerate() {
            let overview = schema.field(&collection, &segment.name).ok_or_else(|| {
                FilterError::invalid(format!(
                    "Field `{}` does not exist in collection `{collection}`",
                    segment.name
                ))
            })?;
            let relation = schema.relation(&collection, &segment.name);
            let rest = &path[i + 1..];

            let target = |kind| Target {
                qualifier: qualifier.clone(),
                collection: collection.clone(),
                segment,
                overview,
                relation,
                kind,
            };

            if overview.field_type.is_json() && relation.is_none() {
                if segment.scope.is_some() || segment.index.is_some() {
                    return Err(FilterError::invalid(format!(
                        "Malformed reference to JSON field `{}`",
                        segment.name
                    )));
                }
                return Ok(target(TargetKind::Json { rest }));
            }

            if segment.index.is_some() {
                return Err(FilterError::invalid(format!(
                    "Index access on `{}` is only allowed inside JSON fields",
                    segment.name
                )));
            }

            let Some(relation) = relation else {
                if segment.scope.is_some() {
                    return Err(FilterError::invalid(format!(
                        "Collection scope on `{}` requires an any-to-many relation",
                        segment.name
                    )));
                }
                if !rest.is_empty() {
                    return Err(FilterError::invalid(format!(
                        "Field `{}` of `{collection}` is not a relation",
                        segment.name
                    )));
                }
                return Ok(target(TargetKind::Column));
            };

            check_scope(segment, relation)?;

            if relation.cardinality.is_multi() {
                return Ok(target(TargetKind::ToMany { rest }));
            }
            if rest.is_empty() {
                return Ok(target(TargetKind::Column));
            }

            let outcome = self.join(schema, registry, &path[..=i], &qualifier, relation)?;
            qualifier = outcome.alias;
            collection = related_collection(relation)?.to_string();
        }

        Err(FilterError::invalid("Empty field path"))
    }

    /// Joins the many-to-one relation reached by `prefix`, reusing the alias
    /// of an earlier join over the same path.
    pub fn join(
        &mut self,
        schema: &SchemaOverview,
        registry: &mut AliasRegistry,
        prefix: &[PathSegment],
        parent: &str,
        relation: &Relation,
    ) -> Result<JoinOutcome, FilterError> {
        let key = prefix
            .iter()
            .map(PathSegment::normalized)
            .collect::<Vec<_>>()
            .join(".");
        let multi = relation.cardinality.is_multi();

        if let Some(alias) = self.aliases.get(&key) {
            return Ok(JoinOutcome {
                added: false,
                multi,
                alias: alias.clone(),
            });
        }

        let related = related_collection(relation)?;
        let primary = &schema
            .collection(related)
            .ok_or_else(|| {
                FilterError::invalid(format!("Related collection `{related}` does not exist"))
            })?
            .primary;

        let alias = registry.next_alias(related);
        self.joins.push(JoinClause {
            kind: JoinKind::Left,
            table: table_ref!(related),
            alias: Some(alias.clone()),
            on: Expr::binary(
                ident!(&alias, primary),
                BinaryOperator::Eq,
                ident!(parent, &relation.field),
            ),
        });
        self.aliases.insert(key.clone(), alias.clone());
        debug!(path = %key, table = %related, alias = %alias, "Planned join");

        Ok(JoinOutcome {
            added: true,
            multi,
            alias,
        })
    }
}

pub fn related_collection(relation: &Relation) -> Result<&str, FilterError> {
    relation.related_collection.as_deref().ok_or_else(|| {
        FilterError::invalid(format!(
            "Relation `{}.{}` has no related collection",
            relation.collection, relation.field
        ))
    })
}

fn check_scope(segment: &PathSegment, relation: &Relation) -> Result<(), FilterError> {
    match (&relation.cardinality, &segment.scope) {
        (Cardinality::AnyToMany, None) => Err(FilterError::invalid(format!(
            "Any-to-many field `{}` needs a collection scope, e.g. `{}:<collection>`",
            segment.name, segment.name
        ))),
        (Cardinality::AnyToMany, Some(scope)) => {
            if relation.allowed_collections.is_empty()
                || relation.allowed_collections.iter().any(|c| c == scope)
            {
                Ok(())
            } else {
                Err(FilterError::invalid(format!(
                    "Collection `{scope}` is not allowed for `{}`",
                    segment.name
                )))
            }
        }
        (_, Some(_)) => Err(FilterError::invalid(format!(
            "Collection scope on `{}` requires an any-to-many relation",
            segment.name
        ))),
        (_, None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::path::parse_key;
    use planner::query::{dialect::Postgres, renderer::render_to_sql};
    use serde_json::json;

    fn schema() -> SchemaOverview {
        SchemaOverview::from_value(json!({
            "collections": {
                "orders": { "primary": "id", "fields": {
                    "id": { "type": "integer" },
                    "customer": { "type": "integer", "special": ["m2o"] },
                    "items": { "type": "alias", "special": ["o2m"] },
                    "activities": { "type": "json" }
                } },
                "customers": { "primary": "id", "fields": {
                    "id": { "type": "integer" },
                    "name": { "type": "string" },
                    "country": { "type": "integer", "special": ["m2o"] }
                } },
                "countries": { "primary": "code", "fields": {
                    "code": { "type": "string" }
                } },
                "order_items": { "primary": "id", "fields": {
                    "id": { "type": "integer" },
                    "order": { "type": "integer" }
                } }
            },
            "relations": [
                { "collection": "orders", "field": "customer",
                  "related_collection": "customers", "cardinality": "many-to-one" },
                { "collection": "customers", "field": "country",
                  "related_collection": "countries", "cardinality": "many-to-one" },
                { "collection": "orders", "field": "items",
                  "related_collection": "order_items", "related_field": "order",
                  "cardinality": "one-to-many" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_joins_many_to_one_chain_once() {
        let schema = schema();
        let mut registry = AliasRegistry::new();
        let mut planner = JoinPlanner::new("orders", "orders");

        let path = parse_key("customer.country.code").unwrap();
        let target = planner.resolve(&schema, &mut registry, &path).unwrap();
        assert!(matches!(target.kind, TargetKind::Column));
        assert_eq!(target.qualifier, "countries_2");
        assert_eq!(target.field(), "code");

        let path = parse_key("customer.name").unwrap();
        let target = planner.resolve(&schema, &mut registry, &path).unwrap();
        assert_eq!(target.qualifier, "customers_1");
        assert_eq!(planner.joins().len(), 2);

        let (sql, _) = render_to_sql(&planner.joins()[1].on, &Postgres);
        assert_eq!(sql, r#"("countries_2"."code" = "customers_1"."country")"#);
    }

    #[test]
    fn test_join_reports_reuse() {
        let schema = schema();
        let mut registry = AliasRegistry::new();
        let mut planner = JoinPlanner::new("orders", "orders");
        let relation = schema.relation("orders", "customer").unwrap();
        let prefix = parse_key("customer").unwrap();

        let first = planner
            .join(&schema, &mut registry, &prefix, "orders", relation)
            .unwrap();
        let second = planner
            .join(&schema, &mut registry, &prefix, "orders", relation)
            .unwrap();
        assert!(first.added);
        assert!(!second.added);
        assert!(!first.multi);
        assert_eq!(first.alias, second.alias);
    }

    #[test]
    fn test_resolve_stops_at_to_many_and_json() {
        let schema = schema();
        let mut registry = AliasRegistry::new();
        let mut planner = JoinPlanner::new("orders", "orders");

        let path = parse_key("items.order").unwrap();
        let target = planner.resolve(&schema, &mut registry, &path).unwrap();
        assert!(matches!(target.kind, TargetKind::ToMany { rest } if rest.len() == 1));

        let path = parse_key("activities.deliverables.type").unwrap();
        let target = planner.resolve(&schema, &mut registry, &path).unwrap();
        assert!(matches!(target.kind, TargetKind::Json { rest } if rest.len() == 2));
        assert!(planner.joins().is_empty());
    }

    #[test]
    fn test_resolve_errors() {
        let schema = schema();
        let mut registry = AliasRegistry::new();
        let mut planner = JoinPlanner::new("orders", "orders");

        for key in ["missing", "id.value", "customer:customers.name", "customer[1]"] {
            let path = parse_key(key).unwrap();
            assert!(planner.resolve(&schema, &mut registry, &path).is_err(), "{key}");
        }
    }
}
