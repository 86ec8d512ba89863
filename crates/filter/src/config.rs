use crate::error::FilterError;
use planner::query::dialect::{Dialect, MySql, Postgres};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Postgres,
    Mysql,
}

impl DialectKind {
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            DialectKind::Postgres => &Postgres,
            DialectKind::Mysql => &MySql,
        }
    }
}

/// Settings for one `Compiler`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub dialect: DialectKind,

    /// The filter is a permission case: an `_or` holding a match-all branch
    /// still plans the joins of its other branches.
    pub permission_case: bool,

    /// Deepest nesting of objects accepted by the parser.
    pub max_depth: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            dialect: DialectKind::Postgres,
            permission_case: false,
            max_depth: 32,
        }
    }
}

impl CompilerOptions {
    pub fn from_json_str(source: &str) -> Result<Self, FilterError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_permission_case(mut self, permission_case: bool) -> Self {
        self.permission_case = permission_case;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_fill_missing_keys() {
        let options = CompilerOptions::from_json_str(r#"{ "dialect": "mysql" }"#).unwrap();
        assert_eq!(options.dialect, DialectKind::Mysql);
        assert!(!options.permission_case);
        assert_eq!(options.max_depth, 32);
        assert_eq!(options.dialect.dialect().name(), "MySQL");
    }

    #[test]
    fn test_options_reject_unknown_dialect() {
        let err = CompilerOptions::from_json_str(r#"{ "dialect": "oracle" }"#).unwrap_err();
        assert!(matches!(err, FilterError::Options(_)));
    }
}
