use crate::query::{
    ast::expr::{BinaryOp, BinaryOperator, Expr, FunctionCall, Ident},
    renderer::{Render, Renderer},
};
use model::core::value::Value;

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => ident.render(r),
            Expr::Value(val) => r.add_param(val.clone()),
            Expr::Raw(fragment) => r.sql.push_str(fragment),
            Expr::BinaryOp(op) => op.render(r),
            Expr::Logical { op, operands } => {
                r.sql.push('(');
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        r.sql.push(' ');
                        r.sql.push_str(op.keyword());
                        r.sql.push(' ');
                    }
                    operand.render(r);
                }
                r.sql.push(')');
            }
            Expr::FunctionCall(func) => func.render(r),
            Expr::Cast { expr, data_type } => {
                r.sql.push_str("CAST(");
                expr.render(r);
                r.sql.push_str(" AS ");
                r.sql.push_str(r.dialect.cast_type(*data_type));
                r.sql.push(')');
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                r.sql.push('(');
                expr.render(r);
                r.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    item.render(r);
                }
                r.sql.push_str("))");
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                r.sql.push('(');
                expr.render(r);
                r.sql
                    .push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                low.render(r);
                r.sql.push_str(" AND ");
                high.render(r);
                r.sql.push(')');
            }
            Expr::IsNull { expr, negated } => {
                r.sql.push('(');
                expr.render(r);
                r.sql
                    .push_str(if *negated { " IS NOT NULL)" } else { " IS NULL)" });
            }
            Expr::Exists(subquery) => {
                r.sql.push_str("EXISTS (");
                subquery.render(r);
                r.sql.push(')');
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                r.sql.push('(');
                expr.render(r);
                r.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                subquery.render(r);
                r.sql.push_str("))");
            }
            Expr::Subquery(subquery) => {
                r.sql.push('(');
                subquery.render(r);
                r.sql.push(')');
            }
            Expr::JsonValue { source, key } => {
                let dialect = r.dialect;
                let source = dialect.quote_identifier(source);
                r.sql
                    .push_str(&dialect.json_value_open(&source, key.is_some()));
                if let Some(key) = key {
                    r.add_param(Value::String(dialect.json_member_key(key)));
                }
                r.sql.push_str(dialect.json_value_close(key.is_some()));
            }
            Expr::JsonArrayLength(expr) => {
                r.sql.push_str(r.dialect.json_array_length());
                r.sql.push('(');
                expr.render(r);
                r.sql.push(')');
            }
            Expr::DatePart { part, expr } => {
                r.sql.push_str(&r.dialect.date_part_open(*part));
                expr.render(r);
                r.sql.push(')');
            }
        }
    }
}

impl Render for Ident {
    fn render(&self, r: &mut Renderer) {
        if let Some(qualifier) = &self.qualifier {
            r.sql.push_str(&r.dialect.quote_identifier(qualifier));
            r.sql.push('.');
        }
        r.sql.push_str(&r.dialect.quote_identifier(&self.name));
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        r.sql.push('(');
        self.left.render(r);

        let op_str = match self.op {
            BinaryOperator::Eq => " = ",
            BinaryOperator::NotEq => " != ",
            BinaryOperator::Lt => " < ",
            BinaryOperator::LtEq => " <= ",
            BinaryOperator::Gt => " > ",
            BinaryOperator::GtEq => " >= ",
            BinaryOperator::Like => " LIKE ",
            BinaryOperator::NotLike => " NOT LIKE ",
        };
        r.sql.push_str(op_str);

        self.right.render(r);
        r.sql.push(')');
    }
}

impl Render for FunctionCall {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str(&self.name);
        r.sql.push('(');
        if self.wildcard {
            r.sql.push('*');
        } else {
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                arg.render(r);
            }
        }
        r.sql.push(')');
    }
}
