//! Defines the `Dialect` trait for database-specific SQL syntax.

use crate::query::ast::expr::{CastType, DatePart};

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for a parameterized query.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    fn get_placeholder(&self, index: usize) -> String;

    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> String;

    /// Type name used by `CAST(... AS <type>)`.
    fn cast_type(&self, data_type: CastType) -> &'static str;

    /// Opening of the table function that yields one row per JSON path match.
    fn json_rows_open(&self) -> &'static str;

    /// Closing of the JSON row table function, after the path argument.
    fn json_rows_close(&self) -> &'static str;

    /// Wraps a placeholder so it can stand in for a JSON path, or `None`
    /// when the dialect only accepts literal paths.
    fn bound_json_path(&self, placeholder: &str) -> Option<String>;

    /// Text emitted before the key of a JSON member extraction, or the
    /// whole scalar extraction when `keyed` is false.
    fn json_value_open(&self, source: &str, keyed: bool) -> String;

    /// Text emitted after the key of a JSON member extraction.
    fn json_value_close(&self, keyed: bool) -> &'static str;

    /// Form in which a member key is bound for a JSON member extraction.
    fn json_member_key(&self, key: &str) -> String {
        key.to_string()
    }

    /// Function returning the length of a JSON array.
    fn json_array_length(&self) -> &'static str;

    /// Opening of a date-part extraction; closed with `)`.
    fn date_part_open(&self, part: DatePart) -> String;
}

#[derive(Debug, Clone)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident.replace('"', "\"\""))
    }

    fn get_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc.
        format!("${}", index + 1)
    }

    fn name(&self) -> String {
        "PostgreSQL".into()
    }

    fn cast_type(&self, data_type: CastType) -> &'static str {
        match data_type {
            CastType::Numeric => "NUMERIC",
            CastType::Text => "TEXT",
        }
    }

    fn json_rows_open(&self) -> &'static str {
        "jsonb_path_query("
    }

    fn json_rows_close(&self) -> &'static str {
        ")"
    }

    fn bound_json_path(&self, placeholder: &str) -> Option<String> {
        Some(format!("CAST({placeholder} AS jsonpath)"))
    }

    fn json_value_open(&self, source: &str, keyed: bool) -> String {
        if keyed {
            format!("{source} ->> ")
        } else {
            format!("{source} #>> '{{}}'")
        }
    }

    fn json_value_close(&self, _keyed: bool) -> &'static str {
        ""
    }

    fn json_array_length(&self) -> &'static str {
        "jsonb_array_length"
    }

    fn date_part_open(&self, part: DatePart) -> String {
        let field = match part {
            DatePart::Year => "YEAR",
            DatePart::Month => "MONTH",
            DatePart::Week => "WEEK",
            DatePart::Day => "DAY",
            DatePart::Weekday => "DOW",
            DatePart::Hour => "HOUR",
            DatePart::Minute => "MINUTE",
            DatePart::Second => "SECOND",
        };
        format!("EXTRACT({field} FROM ")
    }
}

#[derive(Debug, Clone)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn get_placeholder(&self, _index: usize) -> String {
        // MySQL uses ?
        "?".into()
    }

    fn name(&self) -> String {
        "MySQL".into()
    }

    fn cast_type(&self, data_type: CastType) -> &'static str {
        match data_type {
            CastType::Numeric => "DECIMAL(65, 10)",
            CastType::Text => "CHAR",
        }
    }

    fn json_rows_open(&self) -> &'static str {
        "JSON_TABLE("
    }

    fn json_rows_close(&self) -> &'static str {
        " COLUMNS (`value` JSON PATH '$'))"
    }

    fn bound_json_path(&self, _placeholder: &str) -> Option<String> {
        None
    }

    fn json_value_open(&self, source: &str, keyed: bool) -> String {
        if keyed {
            format!("JSON_UNQUOTE(JSON_EXTRACT({source}.`value`, CONCAT('$.\"', ")
        } else {
            format!("JSON_UNQUOTE({source}.`value`)")
        }
    }

    fn json_value_close(&self, keyed: bool) -> &'static str {
        if keyed { ", '\"')))" } else { "" }
    }

    // The key lands inside a quoted path member, so `"` and `\` are escaped.
    fn json_member_key(&self, key: &str) -> String {
        let mut escaped = String::with_capacity(key.len());
        for ch in key.chars() {
            if matches!(ch, '"' | '\\') {
                escaped.push('\\');
            }
            escaped.push(ch);
        }
        escaped
    }

    fn json_array_length(&self) -> &'static str {
        "JSON_LENGTH"
    }

    fn date_part_open(&self, part: DatePart) -> String {
        let function = match part {
            DatePart::Year => "YEAR",
            DatePart::Month => "MONTH",
            DatePart::Week => "WEEK",
            DatePart::Day => "DAYOFMONTH",
            DatePart::Weekday => "DAYOFWEEK",
            DatePart::Hour => "HOUR",
            DatePart::Minute => "MINUTE",
            DatePart::Second => "SECOND",
        };
        format!("{function}(")
    }
}
