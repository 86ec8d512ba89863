//! Read-only view of the collections, fields and relations a filter is
//! compiled against.

use crate::core::field_type::{FieldType, Special, deserialize_special, serialize_special};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaOverview {
    pub collections: HashMap<String, CollectionOverview>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionOverview {
    /// Primary key field name.
    pub primary: String,
    pub fields: HashMap<String, FieldOverview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOverview {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(
        default,
        deserialize_with = "deserialize_special",
        serialize_with = "serialize_special"
    )]
    pub special: Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// `collection.field` stores the key of a row in `related_collection`.
    ManyToOne,
    /// Rows of `related_collection` point back through `related_field`.
    OneToMany,
    /// Rows of a caller-scoped collection point back through `related_field`,
    /// tagged with the parent collection name in `collection_field`.
    AnyToMany,
}

impl Cardinality {
    /// True when following the relation can yield more than one row.
    pub fn is_multi(&self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::AnyToMany)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub collection: String,
    pub field: String,
    #[serde(default)]
    pub related_collection: Option<String>,
    #[serde(default)]
    pub related_field: Option<String>,
    #[serde(default)]
    pub collection_field: Option<String>,
    /// Collections an any-to-many scope may name. Empty means unrestricted.
    #[serde(default)]
    pub allowed_collections: Vec<String>,
    pub cardinality: Cardinality,
}

impl SchemaOverview {
    pub fn from_json_str(source: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionOverview> {
        self.collections.get(name)
    }

    pub fn field(&self, collection: &str, field: &str) -> Option<&FieldOverview> {
        self.collections.get(collection)?.fields.get(field)
    }

    pub fn relation(&self, collection: &str, field: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|rel| rel.collection == collection && rel.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_from_value() {
        let schema = SchemaOverview::from_value(json!({
            "collections": {
                "orders": {
                    "primary": "id",
                    "fields": {
                        "id": { "type": "integer" },
                        "items": { "type": "alias", "special": ["o2m"] },
                        "activities": { "type": "json", "special": ["cast-json"] }
                    }
                }
            },
            "relations": [
                {
                    "collection": "orders",
                    "field": "items",
                    "related_collection": "order_items",
                    "related_field": "order",
                    "cardinality": "one-to-many"
                }
            ]
        }))
        .unwrap();

        let items = schema.field("orders", "items").unwrap();
        assert_eq!(items.field_type, FieldType::Alias);
        assert!(items.special.contains(Special::O2M));
        assert_eq!(
            schema.field("orders", "activities").unwrap().field_type,
            FieldType::Json
        );

        let relation = schema.relation("orders", "items").unwrap();
        assert!(relation.cardinality.is_multi());
        assert_eq!(relation.related_field.as_deref(), Some("order"));
        assert!(schema.relation("orders", "activities").is_none());
    }

    #[test]
    fn test_schema_survives_serialization() {
        let schema = SchemaOverview::from_value(json!({
            "collections": {
                "orders": {
                    "primary": "id",
                    "fields": {
                        "customer": { "type": "bigInteger", "special": ["m2o"] },
                        "activities": { "type": "json", "special": ["cast-json", "conceal"] }
                    }
                }
            }
        }))
        .unwrap();

        let written = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            written["collections"]["orders"]["fields"]["activities"]["special"],
            json!(["cast-json", "conceal"])
        );

        let reread = SchemaOverview::from_value(written).unwrap();
        let customer = reread.field("orders", "customer").unwrap();
        assert_eq!(customer.field_type, FieldType::BigInteger);
        assert_eq!(customer.special, Special::M2O);
        assert_eq!(
            reread.field("orders", "activities").unwrap().special,
            Special::CAST_JSON | Special::CONCEAL
        );
    }

    #[test]
    fn test_schema_parse_error() {
        let err = SchemaOverview::from_json_str("{\"collections\": 3}").unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }
}
