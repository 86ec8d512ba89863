#[macro_export]
macro_rules! value {
    ($val:expr) => {
        $crate::query::ast::expr::Expr::Value($crate::__private::Value::from($val))
    };
}

#[macro_export]
macro_rules! table_ref {
    ($name:expr) => {
        $crate::query::ast::common::TableRef {
            schema: None,
            name: $name.to_string(),
        }
    };
    ($schema:expr, $name:expr) => {
        $crate::query::ast::common::TableRef {
            schema: Some($schema.to_string()),
            name: $name.to_string(),
        }
    };
}

/// Builds an identifier expression, optionally qualified: `ident!("t", "id")`.
#[macro_export]
macro_rules! ident {
    ($name:expr) => {
        $crate::query::ident($name)
    };
    ($qualifier:expr, $name:expr) => {
        $crate::query::qualified($qualifier, $name)
    };
}

#[cfg(test)]
mod tests {
    use crate::query::{ast::expr::Expr, dialect::Postgres, renderer::render_to_sql};
    use model::core::value::Value;

    #[test]
    fn test_macros_build_nodes() {
        let table = table_ref!("public", "orders");
        assert_eq!(table.schema.as_deref(), Some("public"));
        assert_eq!(table.name, "orders");

        assert_eq!(value!(5i64), Expr::Value(Value::Int(5)));
        assert_eq!(render_to_sql(&ident!("o", "id"), &Postgres).0, r#""o"."id""#);
    }
}
