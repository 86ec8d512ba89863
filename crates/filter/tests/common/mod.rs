#![allow(dead_code)]

use filter::{CompiledClause, Compiler, CompilerOptions, DialectKind, FilterError};
use model::schema::SchemaOverview;
use serde_json::{Value, json};

pub fn schema() -> SchemaOverview {
    SchemaOverview::from_value(json!({
        "collections": {
            "orders": { "primary": "id", "fields": {
                "id": { "type": "integer" },
                "title": { "type": "string" },
                "status": { "type": "string" },
                "total": { "type": "decimal" },
                "created_on": { "type": "dateTime" },
                "customer": { "type": "integer", "special": ["m2o"] },
                "items": { "type": "alias", "special": ["o2m"] },
                "activities": { "type": "json", "special": ["cast-json"] },
                "secret": { "type": "hash", "special": ["conceal"] }
            } },
            "customers": { "primary": "id", "fields": {
                "id": { "type": "integer" },
                "name": { "type": "string" },
                "country": { "type": "string", "special": ["m2o"] },
                "profile": { "type": "json" }
            } },
            "countries": { "primary": "code", "fields": {
                "code": { "type": "string" },
                "name": { "type": "string" }
            } },
            "order_items": { "primary": "id", "fields": {
                "id": { "type": "integer" },
                "order": { "type": "integer" },
                "product": { "type": "string" },
                "price": { "type": "decimal" }
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
    .expect("fixture schema parses")
}

pub fn compile_with(
    dialect: DialectKind,
    collection: &str,
    filter: Value,
) -> Result<CompiledClause, FilterError> {
    let schema = schema();
    let options = CompilerOptions::default().with_dialect(dialect);
    Compiler::new(&schema, options).compile_clause(collection, &filter)
}

pub fn compile(filter: Value) -> CompiledClause {
    compile_with(DialectKind::Postgres, "orders", filter).expect("filter compiles")
}

/// Postgres placeholder numbers in the order they appear in `sql`.
pub fn placeholders(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                found.push(sql[start..end].parse().expect("digits"));
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }
    found
}
