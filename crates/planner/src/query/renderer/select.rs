use crate::query::{
    ast::{
        common::JoinKind,
        select::{FromClause, FromSource, JoinClause, JsonPathArg, Select},
    },
    renderer::{Render, Renderer},
};
use model::core::value::Value;

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        // 1. SELECT clause
        r.sql.push_str("SELECT ");
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            col.render(r);
        }

        // 2. FROM
        if let Some(from) = &self.from {
            r.sql.push(' ');
            from.render(r);
        }

        // 3. JOIN
        for join in &self.joins {
            r.sql.push(' ');
            join.render(r);
        }

        // 4. WHERE
        if let Some(where_clause) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            where_clause.render(r);
        }
    }
}

impl Render for FromClause {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("FROM ");
        match &self.source {
            FromSource::Table(table) => r.render_table_ref(table),
            FromSource::JsonRows { target, path } => {
                let dialect = r.dialect;
                r.sql.push_str(dialect.json_rows_open());
                target.render(r);
                r.sql.push_str(", ");
                match path {
                    JsonPathArg::Bound(path) => {
                        let placeholder = dialect.get_placeholder(r.params.len());
                        match dialect.bound_json_path(&placeholder) {
                            Some(bound) => {
                                r.params.push(Value::String(path.clone()));
                                r.sql.push_str(&bound);
                            }
                            None => r.render_string_literal(path),
                        }
                    }
                    JsonPathArg::Inline(path) => r.render_string_literal(path),
                }
                r.sql.push_str(dialect.json_rows_close());
            }
        }
        if let Some(alias) = &self.alias {
            r.sql.push_str(" AS ");
            r.sql.push_str(&r.dialect.quote_identifier(alias));
        }
    }
}

impl Render for JoinClause {
    fn render(&self, r: &mut Renderer) {
        let join_str = match self.kind {
            JoinKind::Left => "LEFT JOIN",
        };
        r.sql.push_str(&format!("{join_str} "));
        r.render_table_ref(&self.table);
        if let Some(alias) = &self.alias {
            r.sql.push_str(" AS ");
            r.sql.push_str(&r.dialect.quote_identifier(alias));
        }
        r.sql.push_str(" ON ");
        self.on.render(r);
    }
}

#[cfg(test)]
mod tests {
    use model::core::value::Value;

    use crate::query::{
        ast::{
            common::{JoinKind, TableRef},
            expr::{BinaryOp, BinaryOperator, Expr, Ident},
            select::{FromClause, FromSource, JoinClause, JsonPathArg, Select},
        },
        dialect::{MySql, Postgres},
        renderer::{Render, Renderer},
    };

    fn ident(name: &str) -> Expr {
        Expr::Identifier(Ident {
            qualifier: None,
            name: name.to_string(),
        })
    }

    fn qual_ident(qualifier: &str, name: &str) -> Expr {
        Expr::Identifier(Ident {
            qualifier: Some(qualifier.to_string()),
            name: name.to_string(),
        })
    }

    fn value(val: Value) -> Expr {
        Expr::Value(val)
    }

    fn table(name: &str) -> FromSource {
        FromSource::Table(TableRef {
            schema: None,
            name: name.to_string(),
        })
    }

    #[test]
    fn test_simple_select_postgres() {
        let ast = Select {
            columns: vec![ident("id"), ident("name")],
            from: Some(FromClause {
                source: table("users"),
                alias: None,
            }),
            where_clause: Some(Expr::BinaryOp(Box::new(BinaryOp {
                left: ident("id"),
                op: BinaryOperator::Eq,
                right: value(Value::Int(123)),
            }))),
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        assert_eq!(sql, r#"SELECT "id", "name" FROM "users" WHERE ("id" = $1)"#);
        assert_eq!(params, vec![Value::Int(123)]);
    }

    #[test]
    fn test_simple_select_mysql() {
        let ast = Select {
            columns: vec![ident("id"), ident("name")],
            from: Some(FromClause {
                source: table("users"),
                alias: None,
            }),
            where_clause: Some(Expr::BinaryOp(Box::new(BinaryOp {
                left: ident("id"),
                op: BinaryOperator::Eq,
                right: value(Value::String("abc".to_string())),
            }))),
            ..Default::default()
        };

        let dialect = MySql;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        assert_eq!(sql, "SELECT `id`, `name` FROM `users` WHERE (`id` = ?)");
        assert_eq!(params, vec![Value::String("abc".to_string())]);
    }

    #[test]
    fn test_select_with_join_postgres() {
        let ast = Select {
            columns: vec![qual_ident("u", "id")],
            from: Some(FromClause {
                source: table("users"),
                alias: Some("u".to_string()),
            }),
            joins: vec![JoinClause {
                kind: JoinKind::Left,
                table: TableRef {
                    schema: Some("public".to_string()),
                    name: "posts".to_string(),
                },
                alias: Some("p".to_string()),
                on: Expr::binary(
                    qual_ident("p", "user_id"),
                    BinaryOperator::Eq,
                    qual_ident("u", "id"),
                ),
            }],
            where_clause: Some(Expr::binary(
                qual_ident("p", "title"),
                BinaryOperator::NotEq,
                value(Value::String("draft".to_string())),
            )),
        };

        let mut renderer = Renderer::new(&Postgres);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        assert_eq!(
            sql,
            r#"SELECT "u"."id" FROM "users" AS "u" LEFT JOIN "public"."posts" AS "p" ON ("p"."user_id" = "u"."id") WHERE ("p"."title" != $1)"#
        );
        assert_eq!(params, vec![Value::String("draft".to_string())]);
    }

    #[test]
    fn test_json_rows_bound_path() {
        let ast = Select {
            columns: vec![Expr::Raw("1".to_string())],
            from: Some(FromClause {
                source: FromSource::JsonRows {
                    target: qual_ident("o", "data"),
                    path: JsonPathArg::Bound("$.tags[*]".to_string()),
                },
                alias: Some("j".to_string()),
            }),
            ..Default::default()
        };

        let mut renderer = Renderer::new(&Postgres);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();
        assert_eq!(
            sql,
            r#"SELECT 1 FROM jsonb_path_query("o"."data", CAST($1 AS jsonpath)) AS "j""#
        );
        assert_eq!(params, vec![Value::String("$.tags[*]".to_string())]);

        // MySQL only takes literal paths, so the bound path is inlined.
        let mut renderer = Renderer::new(&MySql);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();
        assert_eq!(
            sql,
            "SELECT 1 FROM JSON_TABLE(`o`.`data`, '$.tags[*]' COLUMNS (`value` JSON PATH '$')) AS `j`"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_json_rows_inline_path_escapes_quotes() {
        let ast = Select {
            columns: vec![Expr::Raw("1".to_string())],
            from: Some(FromClause {
                source: FromSource::JsonRows {
                    target: qual_ident("o", "data"),
                    path: JsonPathArg::Inline("$.\"it's\"[*]".to_string()),
                },
                alias: Some("j".to_string()),
            }),
            ..Default::default()
        };

        let mut renderer = Renderer::new(&Postgres);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();
        assert_eq!(
            sql,
            r#"SELECT 1 FROM jsonb_path_query("o"."data", '$."it''s"[*]') AS "j""#
        );
        assert!(params.is_empty());
    }
}
