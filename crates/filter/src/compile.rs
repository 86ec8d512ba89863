//! The recursive compiler: walks a parsed filter and assembles one predicate.

use crate::{
    config::{CompilerOptions, DialectKind},
    context::AliasRegistry,
    error::FilterError,
    join::{JoinPlanner, Target, TargetKind, related_collection},
    json::{self, JsonLeaf},
    operator::{Operator, map_operator},
    parse::{
        Condition, FilterNode, Operand, parse_filter,
        path::{FieldFunction, PathSegment},
    },
    validate::{validate_field, validate_json_path},
};
use model::{
    core::value::Value,
    schema::{Cardinality, SchemaOverview},
};
use planner::{
    ident,
    query::{
        ast::{
            expr::{BinaryOperator, Expr, FunctionCall, LogicalOperator},
            select::{JoinClause, Select},
        },
        builder::select::SelectBuilder,
        renderer::render_to_sql,
    },
    table_ref,
};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Compiles filters against one schema.
///
/// The compiler holds no mutable state; each call to `compile` works with
/// its own alias registry, so one compiler can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct Compiler<'s> {
    schema: &'s SchemaOverview,
    options: CompilerOptions,
}

/// A compiled filter before rendering.
#[derive(Debug)]
pub struct CompiledFilter {
    pub collection: String,
    /// `None` when the filter matches every row.
    pub condition: Option<Expr>,
    /// Joins the condition relies on, in planning order.
    pub joins: Vec<JoinClause>,
    pub aliases: AliasRegistry,
    dialect: DialectKind,
}

/// SQL text with its positional parameters, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledClause {
    pub sql: String,
    pub params: Vec<Value>,
}

impl<'s> Compiler<'s> {
    pub fn new(schema: &'s SchemaOverview, options: CompilerOptions) -> Self {
        Self { schema, options }
    }

    /// Compiles `filter` for rows of `collection`.
    pub fn compile(
        &self,
        collection: &str,
        filter: &JsonValue,
    ) -> Result<CompiledFilter, FilterError> {
        if self.schema.collection(collection).is_none() {
            return Err(FilterError::invalid(format!(
                "Collection `{collection}` does not exist"
            )));
        }

        let root = parse_filter(filter, self.options.max_depth)?;
        let mut session = Session::new(self.schema, &self.options);
        let mut scope = JoinPlanner::new(collection, collection);

        session.discover_joins(&root, &mut scope)?;
        let condition = session.compile_node(&root, &mut scope)?;
        let joins = scope.into_joins();

        debug!(
            collection,
            joins = joins.len(),
            json_sources = session.registry.field_source_count(),
            match_all = condition.is_none(),
            "Compiled filter"
        );

        Ok(CompiledFilter {
            collection: collection.to_string(),
            condition,
            joins,
            aliases: session.registry,
            dialect: self.options.dialect,
        })
    }

    /// Compiles and renders only the predicate.
    pub fn compile_clause(
        &self,
        collection: &str,
        filter: &JsonValue,
    ) -> Result<CompiledClause, FilterError> {
        Ok(self.compile(collection, filter)?.render())
    }

    /// Compiles `filter` into a complete `SELECT` over `collection`.
    /// An empty column list selects `*`.
    pub fn select(
        &self,
        collection: &str,
        columns: &[&str],
        filter: &JsonValue,
    ) -> Result<CompiledClause, FilterError> {
        let compiled = self.compile(collection, filter)?;
        let (sql, params) =
            render_to_sql(&compiled.to_select(columns), compiled.dialect.dialect());
        Ok(CompiledClause { sql, params })
    }
}

impl CompiledFilter {
    pub fn is_match_all(&self) -> bool {
        self.condition.is_none()
    }

    /// Renders the predicate; a match-all filter renders as an empty clause.
    pub fn render(&self) -> CompiledClause {
        match &self.condition {
            Some(condition) => {
                let (sql, params) = render_to_sql(condition, self.dialect.dialect());
                CompiledClause { sql, params }
            }
            None => CompiledClause::default(),
        }
    }

    pub fn to_select(&self, columns: &[&str]) -> Select {
        let columns = if columns.is_empty() {
            vec![Expr::Raw("*".to_string())]
        } else {
            columns
                .iter()
                .map(|column| ident!(&self.collection, column))
                .collect()
        };

        let builder = SelectBuilder::new()
            .select(columns)
            .from(table_ref!(self.collection), None)
            .joins(self.joins.iter().cloned());

        let builder = match &self.condition {
            Some(condition) => builder.where_clause(condition.clone()),
            None => builder,
        };
        builder.build()
    }
}

impl CompiledClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// State owned by one compile call.
struct Session<'s, 'o> {
    schema: &'s SchemaOverview,
    options: &'o CompilerOptions,
    registry: AliasRegistry,
    /// Merged `EXISTS` keyed by the first condition folded into it.
    merged: HashMap<usize, Expr>,
    /// Conditions already folded into a merged group.
    consumed: HashSet<usize>,
}

impl<'s, 'o> Session<'s, 'o> {
    fn new(schema: &'s SchemaOverview, options: &'o CompilerOptions) -> Self {
        Self {
            schema,
            options,
            registry: AliasRegistry::new(),
            merged: HashMap::new(),
            consumed: HashSet::new(),
        }
    }

    /// Plans every join the tree needs before any predicate is built.
    /// Sub-filters of `_some` / `_none` are separate scopes and are skipped.
    fn discover_joins(
        &mut self,
        node: &FilterNode,
        scope: &mut JoinPlanner,
    ) -> Result<(), FilterError> {
        match node {
            FilterNode::Combinator {
                op: LogicalOperator::Or,
                children,
            } if children.iter().any(FilterNode::is_match_all) => {
                if self.options.permission_case && children.len() > 1 {
                    for child in children.iter().filter(|child| !child.is_match_all()) {
                        self.discover_joins(child, scope)?;
                    }
                }
                Ok(())
            }
            FilterNode::Combinator { children, .. } => {
                for child in children {
                    self.discover_joins(child, scope)?;
                }
                Ok(())
            }
            FilterNode::Condition(condition) => {
                scope.resolve(self.schema, &mut self.registry, &condition.path)?;
                Ok(())
            }
        }
    }

    fn compile_node(
        &mut self,
        node: &FilterNode,
        scope: &mut JoinPlanner,
    ) -> Result<Option<Expr>, FilterError> {
        match node {
            FilterNode::Combinator {
                op: LogicalOperator::And,
                children,
            } => self.compile_and(children, scope),
            FilterNode::Combinator {
                op: LogicalOperator::Or,
                children,
            } => self.compile_or(children, scope),
            FilterNode::Condition(condition) => self.compile_condition(condition, scope),
        }
    }

    fn compile_and(
        &mut self,
        children: &[FilterNode],
        scope: &mut JoinPlanner,
    ) -> Result<Option<Expr>, FilterError> {
        self.merge_json_siblings(children, scope)?;

        let mut operands = Vec::with_capacity(children.len());
        for child in children {
            if let Some(expr) = self.compile_node(child, scope)? {
                operands.push(expr);
            }
        }
        Ok(Expr::logical(LogicalOperator::And, operands))
    }

    fn compile_or(
        &mut self,
        children: &[FilterNode],
        scope: &mut JoinPlanner,
    ) -> Result<Option<Expr>, FilterError> {
        if children.iter().any(FilterNode::is_match_all) {
            debug!(branches = children.len(), "Skipping `_or` with an empty branch");
            return Ok(None);
        }

        let mut operands = Vec::with_capacity(children.len());
        for child in children {
            match self.compile_node(child, scope)? {
                Some(expr) => operands.push(expr),
                // A branch without a predicate matches every row.
                None => return Ok(None),
            }
        }
        Ok(Expr::logical(LogicalOperator::Or, operands))
    }

    /// Folds sibling JSON conditions sharing a field and base path into one
    /// `EXISTS`. Looks through nested `_and` groups but never into `_or`.
    fn merge_json_siblings(
        &mut self,
        children: &[FilterNode],
        scope: &mut JoinPlanner,
    ) -> Result<(), FilterError> {
        let mut leaves = Vec::new();
        self.collect_json_leaves(children, scope, &mut leaves)?;

        let mut groups: Vec<((String, String, String), Vec<JsonLeaf>)> = Vec::new();
        for leaf in leaves.into_iter().filter(JsonLeaf::mergeable) {
            let key = (leaf.qualifier.clone(), leaf.field.clone(), leaf.base_path());
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(leaf),
                None => groups.push((key, vec![leaf])),
            }
        }

        for (_, members) in groups {
            if members.len() < 2 {
                continue;
            }
            let expr = json::merged(&mut self.registry, &members)?;
            self.consumed.extend(members.iter().map(|leaf| leaf.id));
            if let Some(expr) = expr {
                self.merged.insert(members[0].id, expr);
            }
        }
        Ok(())
    }

    fn collect_json_leaves<'n>(
        &mut self,
        children: &'n [FilterNode],
        scope: &mut JoinPlanner,
        out: &mut Vec<JsonLeaf<'n>>,
    ) -> Result<(), FilterError> {
        for child in children {
            match child {
                FilterNode::Combinator {
                    op: LogicalOperator::And,
                    children,
                } => self.collect_json_leaves(children, scope, out)?,
                FilterNode::Combinator { .. } => {}
                FilterNode::Condition(condition) => {
                    if self.consumed.contains(&condition.id) {
                        continue;
                    }
                    let Some(operand) = condition.value() else {
                        continue;
                    };
                    let target = scope.resolve(self.schema, &mut self.registry, &condition.path)?;
                    if let TargetKind::Json { rest } = target.kind {
                        if rest.is_empty() {
                            continue;
                        }
                        validate_json_path(target.field(), rest, condition.operator)?;
                        out.push(json_leaf(condition, &target, rest, operand));
                    }
                }
            }
        }
        Ok(())
    }

    fn compile_condition(
        &mut self,
        condition: &Condition,
        scope: &mut JoinPlanner,
    ) -> Result<Option<Expr>, FilterError> {
        if self.consumed.contains(&condition.id) {
            return Ok(self.merged.remove(&condition.id));
        }

        let schema = self.schema;
        let target = scope.resolve(schema, &mut self.registry, &condition.path)?;

        match target.kind {
            TargetKind::Json { rest } if !rest.is_empty() => {
                validate_json_path(target.field(), rest, condition.operator)?;
                let operand = operand_value(condition)?;
                let leaf = json_leaf(condition, &target, rest, operand);
                json::single(&mut self.registry, &leaf)
            }
            TargetKind::ToMany { rest } => self.compile_to_many(&target, rest, condition),
            _ => self.compile_column(&target, condition),
        }
    }

    /// A column of the current scope or a joined table, or a JSON field
    /// compared as a whole.
    fn compile_column(
        &mut self,
        target: &Target,
        condition: &Condition,
    ) -> Result<Option<Expr>, FilterError> {
        let function = target.segment.function;
        validate_field(
            target.field(),
            target.overview,
            target.relation,
            function,
            condition.operator,
        )?;
        let column = ident!(&target.qualifier, target.field());

        if let Operand::Filter(filter) = &condition.operand {
            // Many-to-one: the referenced row must (not) match the sub-filter.
            let relation = target.relation.ok_or_else(|| {
                FilterError::invalid(format!(
                    "Field `{}` has no relation to filter through",
                    target.field()
                ))
            })?;
            let related = related_collection(relation)?;
            let primary = self.primary_key(related)?;
            let subquery = self.sub_select(related, &primary, filter, None)?;
            return Ok(Some(Expr::InSubquery {
                expr: Box::new(column),
                subquery: Box::new(subquery),
                negated: condition.operator == Operator::None,
            }));
        }

        let compared = match function {
            Some(FieldFunction::Count) => Expr::JsonArrayLength(Box::new(column)),
            Some(function) => match function.date_part() {
                Some(part) => Expr::DatePart {
                    part,
                    expr: Box::new(column),
                },
                None => column,
            },
            None => column,
        };

        let mapped = map_operator(condition.operator, operand_value(condition)?)?;
        Ok(mapped.apply(compared))
    }

    /// A one-to-many or any-to-many relation: a key sub-query, or a
    /// correlated count when `count()` is applied.
    fn compile_to_many(
        &mut self,
        target: &Target,
        rest: &[PathSegment],
        condition: &Condition,
    ) -> Result<Option<Expr>, FilterError> {
        let field = target.field();
        let relation = target.relation.ok_or_else(|| {
            FilterError::invalid(format!("Field `{field}` has no relation to filter through"))
        })?;
        let related = match relation.cardinality {
            Cardinality::AnyToMany => target.segment.scope.as_deref().ok_or_else(|| {
                FilterError::invalid(format!("Any-to-many field `{field}` needs a collection scope"))
            })?,
            _ => related_collection(relation)?,
        };
        let related_field = relation.related_field.as_deref().ok_or_else(|| {
            FilterError::invalid(format!("Relation `{field}` has no related field"))
        })?;
        let discriminator = match relation.cardinality {
            Cardinality::AnyToMany => {
                let collection_field = relation.collection_field.as_deref().ok_or_else(|| {
                    FilterError::invalid(format!(
                        "Any-to-many relation `{field}` has no collection field"
                    ))
                })?;
                Some((collection_field, target.collection.as_str()))
            }
            _ => None,
        };
        let parent_key = ident!(&target.qualifier, &self.primary_key(&target.collection)?);

        if !rest.is_empty() {
            // A nested path through a to-many relation behaves as `_some`.
            let nested = FilterNode::Condition(Condition {
                id: condition.id,
                path: rest.to_vec(),
                operator: condition.operator,
                operand: condition.operand.clone(),
            });
            let subquery = self.sub_select(related, related_field, &nested, discriminator)?;
            return Ok(Some(Expr::InSubquery {
                expr: Box::new(parent_key),
                subquery: Box::new(subquery),
                negated: false,
            }));
        }

        validate_field(
            field,
            target.overview,
            target.relation,
            target.segment.function,
            condition.operator,
        )?;

        match &condition.operand {
            Operand::Filter(filter) => {
                let subquery = self.sub_select(related, related_field, filter, discriminator)?;
                Ok(Some(Expr::InSubquery {
                    expr: Box::new(parent_key),
                    subquery: Box::new(subquery),
                    negated: condition.operator == Operator::None,
                }))
            }
            Operand::Value(operand) => {
                self.ensure_collection(related)?;
                let alias = self.registry.next_alias(related);
                let mut builder = SelectBuilder::new()
                    .select(vec![Expr::FunctionCall(FunctionCall {
                        name: "COUNT".to_string(),
                        args: vec![],
                        wildcard: true,
                    })])
                    .from(table_ref!(related), Some(&alias))
                    .and_where(Expr::binary(
                        ident!(&alias, related_field),
                        BinaryOperator::Eq,
                        parent_key,
                    ));
                if let Some((collection_field, parent)) = discriminator {
                    builder = builder.and_where(Expr::binary(
                        ident!(&alias, collection_field),
                        BinaryOperator::Eq,
                        Expr::Value(Value::from(parent)),
                    ));
                }
                let count = Expr::Subquery(Box::new(builder.build()));
                Ok(map_operator(condition.operator, operand)?.apply(count))
            }
        }
    }

    /// `SELECT alias.column FROM related AS alias ... WHERE <filter>`, with
    /// the filter compiled in its own join scope.
    fn sub_select(
        &mut self,
        related: &str,
        column: &str,
        filter: &FilterNode,
        discriminator: Option<(&str, &str)>,
    ) -> Result<Select, FilterError> {
        self.ensure_collection(related)?;
        let alias = self.registry.next_alias(related);
        let mut scope = JoinPlanner::new(related, &alias);

        self.discover_joins(filter, &mut scope)?;
        let mut predicates: Vec<Expr> = self.compile_node(filter, &mut scope)?.into_iter().collect();
        if let Some((collection_field, parent)) = discriminator {
            predicates.push(Expr::binary(
                ident!(&alias, collection_field),
                BinaryOperator::Eq,
                Expr::Value(Value::from(parent)),
            ));
        }

        let builder = SelectBuilder::new()
            .select(vec![ident!(&alias, column)])
            .from(table_ref!(related), Some(&alias))
            .joins(scope.into_joins());

        Ok(match Expr::logical(LogicalOperator::And, predicates) {
            Some(predicate) => builder.where_clause(predicate),
            None => builder,
        }
        .build())
    }

    fn ensure_collection(&self, collection: &str) -> Result<(), FilterError> {
        self.primary_key(collection).map(|_| ())
    }

    fn primary_key(&self, collection: &str) -> Result<String, FilterError> {
        self.schema
            .collection(collection)
            .map(|overview| overview.primary.clone())
            .ok_or_else(|| {
                FilterError::invalid(format!("Collection `{collection}` does not exist"))
            })
    }
}

fn json_leaf<'n>(
    condition: &Condition,
    target: &Target,
    rest: &'n [PathSegment],
    operand: &'n JsonValue,
) -> JsonLeaf<'n> {
    JsonLeaf {
        id: condition.id,
        qualifier: target.qualifier.clone(),
        collection: target.collection.clone(),
        field: target.field().to_string(),
        rest,
        operator: condition.operator,
        operand,
    }
}

fn operand_value(condition: &Condition) -> Result<&JsonValue, FilterError> {
    condition.value().ok_or_else(|| {
        FilterError::invalid(format!(
            "`{}` takes a sub-filter only on relational fields",
            condition.operator.key()
        ))
    })
}
