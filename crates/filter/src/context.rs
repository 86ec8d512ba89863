//! Per-compile alias bookkeeping shared by join planning and JSON row sources.

use std::collections::HashMap;
use tracing::debug;

/// An alias handed out by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSource {
    pub alias: String,
    /// False when an earlier request already allocated this alias.
    pub created: bool,
}

/// Aliases allocated during one compile call.
///
/// Every JSON field gets one row-source alias keyed by `(collection, field)`;
/// every base path inside it used for merged conditions gets its own
/// sub-alias keyed by `(field, base path)`. Join and sub-query aliases draw
/// from the same counter so no two aliases collide.
#[derive(Debug, Default)]
pub struct AliasRegistry {
    counter: usize,
    fields: HashMap<(String, String), String>,
    base_paths: HashMap<(String, String), String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh alias named after `base`.
    pub fn next_alias(&mut self, base: &str) -> String {
        self.counter += 1;
        format!("{base}_{}", self.counter)
    }

    /// Row source exploding a whole JSON field.
    pub fn field_source(&mut self, collection: &str, field: &str) -> RowSource {
        let key = (collection.to_string(), field.to_string());
        if let Some(alias) = self.fields.get(&key) {
            return RowSource {
                alias: alias.clone(),
                created: false,
            };
        }

        let alias = self.next_alias(field);
        debug!(collection, field, alias = %alias, "Allocated JSON row source");
        self.fields.insert(key, alias.clone());
        RowSource {
            alias,
            created: true,
        }
    }

    /// Row source for one base path inside a JSON field.
    pub fn base_path_source(&mut self, collection: &str, field: &str, base_path: &str) -> RowSource {
        self.field_source(collection, field);

        let key = (format!("{collection}.{field}"), base_path.to_string());
        if let Some(alias) = self.base_paths.get(&key) {
            return RowSource {
                alias: alias.clone(),
                created: false,
            };
        }

        let alias = self.next_alias(field);
        debug!(collection, field, base_path, alias = %alias, "Allocated JSON base-path row source");
        self.base_paths.insert(key, alias.clone());
        RowSource {
            alias,
            created: true,
        }
    }

    pub fn field_alias(&self, collection: &str, field: &str) -> Option<&str> {
        self.fields
            .get(&(collection.to_string(), field.to_string()))
            .map(String::as_str)
    }

    pub fn field_source_count(&self) -> usize {
        self.fields.len()
    }

    pub fn base_path_source_count(&self) -> usize {
        self.base_paths.len()
    }
}
