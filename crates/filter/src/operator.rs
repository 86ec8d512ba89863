//! Filter operators and their mapping onto SQL comparison templates.

use crate::error::FilterError;
use model::core::value::Value;
use planner::query::ast::expr::{BinaryOperator, CastType, Expr, FunctionCall};

/// Every operator a filter may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Null,
    Nnull,
    Contains,
    Ncontains,
    Icontains,
    Nicontains,
    StartsWith,
    NstartsWith,
    IstartsWith,
    NistartsWith,
    EndsWith,
    NendsWith,
    IendsWith,
    NiendsWith,
    Between,
    Nbetween,
    Empty,
    Nempty,
    Some,
    None,
}

impl Operator {
    pub const ALL: [Operator; 28] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::In,
        Operator::Nin,
        Operator::Null,
        Operator::Nnull,
        Operator::Contains,
        Operator::Ncontains,
        Operator::Icontains,
        Operator::Nicontains,
        Operator::StartsWith,
        Operator::NstartsWith,
        Operator::IstartsWith,
        Operator::NistartsWith,
        Operator::EndsWith,
        Operator::NendsWith,
        Operator::IendsWith,
        Operator::NiendsWith,
        Operator::Between,
        Operator::Nbetween,
        Operator::Empty,
        Operator::Nempty,
        Operator::Some,
        Operator::None,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Operator::ALL.into_iter().find(|op| op.key() == key)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Operator::Eq => "_eq",
            Operator::Neq => "_neq",
            Operator::Lt => "_lt",
            Operator::Lte => "_lte",
            Operator::Gt => "_gt",
            Operator::Gte => "_gte",
            Operator::In => "_in",
            Operator::Nin => "_nin",
            Operator::Null => "_null",
            Operator::Nnull => "_nnull",
            Operator::Contains => "_contains",
            Operator::Ncontains => "_ncontains",
            Operator::Icontains => "_icontains",
            Operator::Nicontains => "_nicontains",
            Operator::StartsWith => "_starts_with",
            Operator::NstartsWith => "_nstarts_with",
            Operator::IstartsWith => "_istarts_with",
            Operator::NistartsWith => "_nistarts_with",
            Operator::EndsWith => "_ends_with",
            Operator::NendsWith => "_nends_with",
            Operator::IendsWith => "_iends_with",
            Operator::NiendsWith => "_niends_with",
            Operator::Between => "_between",
            Operator::Nbetween => "_nbetween",
            Operator::Empty => "_empty",
            Operator::Nempty => "_nempty",
            Operator::Some => "_some",
            Operator::None => "_none",
        }
    }

    /// `LIKE`-based operators.
    pub fn is_pattern(&self) -> bool {
        self.pattern().is_some()
    }

    /// Operators that need an ordering on the compared type.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Operator::Lt
                | Operator::Lte
                | Operator::Gt
                | Operator::Gte
                | Operator::Between
                | Operator::Nbetween
        )
    }

    /// Operators that only test for absence of a value.
    pub fn is_null_check(&self) -> bool {
        matches!(
            self,
            Operator::Null | Operator::Nnull | Operator::Empty | Operator::Nempty
        )
    }

    /// `_some` / `_none`, which take a sub-filter over a related collection.
    pub fn is_relational(&self) -> bool {
        matches!(self, Operator::Some | Operator::None)
    }

    /// (prefix wildcard, suffix wildcard, negated, case-insensitive)
    fn pattern(&self) -> Option<(bool, bool, bool, bool)> {
        Some(match self {
            Operator::Contains => (true, true, false, false),
            Operator::Ncontains => (true, true, true, false),
            Operator::Icontains => (true, true, false, true),
            Operator::Nicontains => (true, true, true, true),
            Operator::StartsWith => (false, true, false, false),
            Operator::NstartsWith => (false, true, true, false),
            Operator::IstartsWith => (false, true, false, true),
            Operator::NistartsWith => (false, true, true, true),
            Operator::EndsWith => (true, false, false, false),
            Operator::NendsWith => (true, false, true, false),
            Operator::IendsWith => (true, false, false, true),
            Operator::NiendsWith => (true, false, true, true),
            _ => return None,
        })
    }
}

/// Shape of the SQL a mapped operator produces around its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Compare(BinaryOperator),
    Like { negated: bool, case_insensitive: bool },
    InList { negated: bool },
    Between { negated: bool },
    IsNull { negated: bool },
    /// Matches nothing (`_in` over an empty list).
    Never,
    /// Matches everything (`_nin` over an empty list); emits no predicate.
    Always,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedOperator {
    pub template: Template,
    pub values: Vec<Value>,
}

impl MappedOperator {
    fn new(template: Template, values: Vec<Value>) -> Self {
        Self { template, values }
    }

    /// Template text with `?` standing for each bound value, e.g. `IN (?, ?)`.
    pub fn sql_template(&self) -> String {
        match self.template {
            Template::Compare(op) => format!("{} ?", comparison_symbol(op)),
            Template::Like { negated, .. } => {
                String::from(if negated { "NOT LIKE ?" } else { "LIKE ?" })
            }
            Template::InList { negated } => {
                let placeholders = vec!["?"; self.values.len()].join(", ");
                let keyword = if negated { "NOT IN" } else { "IN" };
                format!("{keyword} ({placeholders})")
            }
            Template::Between { negated } => String::from(if negated {
                "NOT BETWEEN ? AND ?"
            } else {
                "BETWEEN ? AND ?"
            }),
            Template::IsNull { negated } => {
                String::from(if negated { "IS NOT NULL" } else { "IS NULL" })
            }
            Template::Never => "1 = 0".to_string(),
            Template::Always => String::new(),
        }
    }

    /// Decides how a JSON-extracted text value is cast before comparison
    /// and normalizes the bound values to match.
    pub fn json_cast(&mut self) -> CastType {
        let numeric = !self.values.is_empty() && self.values.iter().all(Value::is_numeric);
        let values = std::mem::take(&mut self.values);
        if numeric {
            self.values = values.into_iter().map(Value::coerce_numeric).collect();
            CastType::Numeric
        } else {
            self.values = values.into_iter().map(Value::into_text).collect();
            CastType::Text
        }
    }

    /// Builds the predicate comparing `target`, or `None` when it would
    /// match every row.
    pub fn apply(self, target: Expr) -> Option<Expr> {
        let mut values = self.values.into_iter().map(Expr::Value);
        Some(match self.template {
            Template::Compare(op) => Expr::binary(target, op, values.next()?),
            Template::Like {
                negated,
                case_insensitive,
            } => {
                let target = if case_insensitive { lower(target) } else { target };
                let op = if negated {
                    BinaryOperator::NotLike
                } else {
                    BinaryOperator::Like
                };
                Expr::binary(target, op, values.next()?)
            }
            Template::InList { negated } => Expr::InList {
                expr: Box::new(target),
                list: values.collect(),
                negated,
            },
            Template::Between { negated } => {
                let low = values.next()?;
                let high = values.next()?;
                Expr::Between {
                    expr: Box::new(target),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                }
            }
            Template::IsNull { negated } => Expr::IsNull {
                expr: Box::new(target),
                negated,
            },
            Template::Never => Expr::Raw("1 = 0".to_string()),
            Template::Always => return None,
        })
    }
}

fn comparison_symbol(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Eq => "=",
        BinaryOperator::NotEq => "!=",
        BinaryOperator::Lt => "<",
        BinaryOperator::LtEq => "<=",
        BinaryOperator::Gt => ">",
        BinaryOperator::GtEq => ">=",
        BinaryOperator::Like => "LIKE",
        BinaryOperator::NotLike => "NOT LIKE",
    }
}

fn lower(expr: Expr) -> Expr {
    Expr::FunctionCall(FunctionCall {
        name: "LOWER".to_string(),
        args: vec![expr],
        wildcard: false,
    })
}

/// Maps an operator and its raw operand onto a template and bound values.
pub fn map_operator(
    operator: Operator,
    operand: &serde_json::Value,
) -> Result<MappedOperator, FilterError> {
    let value = Value::from_json(operand);

    let mapped = match operator {
        Operator::Eq | Operator::Neq => {
            let negated = operator == Operator::Neq;
            if value == Value::Null {
                MappedOperator::new(Template::IsNull { negated }, vec![])
            } else {
                let op = if negated {
                    BinaryOperator::NotEq
                } else {
                    BinaryOperator::Eq
                };
                MappedOperator::new(Template::Compare(op), vec![value])
            }
        }
        Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
            let op = match operator {
                Operator::Lt => BinaryOperator::Lt,
                Operator::Lte => BinaryOperator::LtEq,
                Operator::Gt => BinaryOperator::Gt,
                _ => BinaryOperator::GtEq,
            };
            MappedOperator::new(Template::Compare(op), vec![value.coerce_numeric()])
        }
        Operator::In | Operator::Nin => {
            let negated = operator == Operator::Nin;
            let values = list_operand(operand);
            let template = match (values.is_empty(), negated) {
                (true, false) => Template::Never,
                (true, true) => Template::Always,
                (false, _) => Template::InList { negated },
            };
            MappedOperator::new(template, values)
        }
        Operator::Null | Operator::Nnull => {
            let wanted = value.as_bool().unwrap_or(true);
            let negated = (operator == Operator::Nnull) == wanted;
            MappedOperator::new(Template::IsNull { negated }, vec![])
        }
        Operator::Empty | Operator::Nempty => MappedOperator::new(
            Template::IsNull {
                negated: operator == Operator::Nempty,
            },
            vec![],
        ),
        Operator::Between | Operator::Nbetween => {
            let bounds = list_operand(operand);
            let mut bounds = bounds.into_iter().map(|v| match v {
                Value::Null => None,
                other => Some(other.coerce_numeric()),
            });
            let low = bounds.next().flatten().unwrap_or(Value::Int(0));
            let high = bounds.next().flatten().unwrap_or_else(|| low.clone());
            MappedOperator::new(
                Template::Between {
                    negated: operator == Operator::Nbetween,
                },
                vec![low, high],
            )
        }
        Operator::Some | Operator::None => {
            return Err(FilterError::invalid(format!(
                "`{}` takes a sub-filter, not a comparison value",
                operator.key()
            )));
        }
        pattern => {
            let Some((prefix, suffix, negated, case_insensitive)) = pattern.pattern() else {
                return Err(FilterError::invalid(format!(
                    "`{}` cannot be mapped to SQL",
                    pattern.key()
                )));
            };
            let text = value.as_string().ok_or_else(|| {
                FilterError::invalid(format!("`{}` needs a value to match", pattern.key()))
            })?;
            let text = if case_insensitive {
                text.to_lowercase()
            } else {
                text
            };
            let pattern_text = format!(
                "{}{text}{}",
                if prefix { "%" } else { "" },
                if suffix { "%" } else { "" }
            );
            MappedOperator::new(
                Template::Like {
                    negated,
                    case_insensitive,
                },
                vec![Value::String(pattern_text)],
            )
        }
    };

    Ok(mapped)
}

/// Reads a list operand: arrays as-is, strings split on commas.
fn list_operand(operand: &serde_json::Value) -> Vec<Value> {
    match operand {
        serde_json::Value::Array(items) => items.iter().map(Value::from_json).collect(),
        serde_json::Value::String(s) if s.trim().is_empty() => Vec::new(),
        serde_json::Value::String(s) => s
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect(),
        serde_json::Value::Null => Vec::new(),
        other => vec![Value::from_json(other)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_operand(operator: Operator) -> serde_json::Value {
        match operator {
            Operator::In | Operator::Nin => json!([1, 2, 3]),
            Operator::Between | Operator::Nbetween => json!([1, 10]),
            Operator::Null | Operator::Nnull => json!(true),
            _ => json!("value"),
        }
    }

    #[test]
    fn test_placeholder_count_matches_values() {
        for operator in Operator::ALL {
            if operator.is_relational() {
                continue;
            }
            let mapped = map_operator(operator, &sample_operand(operator)).unwrap();
            let placeholders = mapped.sql_template().matches('?').count();
            assert_eq!(placeholders, mapped.values.len(), "{}", operator.key());
        }
    }

    #[test]
    fn test_templates() {
        let between = map_operator(Operator::Between, &json!([1, 10])).unwrap();
        assert_eq!(between.sql_template(), "BETWEEN ? AND ?");
        assert_eq!(between.values.len(), 2);

        let empty = map_operator(Operator::Empty, &json!(true)).unwrap();
        assert_eq!(empty.sql_template(), "IS NULL");
        assert!(empty.values.is_empty());

        let nin = map_operator(Operator::Nin, &json!("a, b")).unwrap();
        assert_eq!(nin.sql_template(), "NOT IN (?, ?)");
        assert_eq!(nin.values, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_between_defaults() {
        let upper_only = map_operator(Operator::Between, &json!([null, 5])).unwrap();
        assert_eq!(upper_only.values, vec![Value::Int(0), Value::Int(5)]);

        let lower_only = map_operator(Operator::Between, &json!([3, null])).unwrap();
        assert_eq!(lower_only.values, vec![Value::Int(3), Value::Int(3)]);

        let single = map_operator(Operator::Nbetween, &json!([3])).unwrap();
        assert_eq!(single.values, vec![Value::Int(3), Value::Int(3)]);
    }

    #[test]
    fn test_pattern_wrapping() {
        let contains = map_operator(Operator::Contains, &json!("ab")).unwrap();
        assert_eq!(contains.values, vec![Value::from("%ab%")]);

        let starts = map_operator(Operator::StartsWith, &json!("ab")).unwrap();
        assert_eq!(starts.values, vec![Value::from("ab%")]);

        let ends = map_operator(Operator::NendsWith, &json!("ab")).unwrap();
        assert_eq!(ends.values, vec![Value::from("%ab")]);
        assert_eq!(ends.sql_template(), "NOT LIKE ?");

        let insensitive = map_operator(Operator::Icontains, &json!("AbC")).unwrap();
        assert_eq!(insensitive.values, vec![Value::from("%abc%")]);
    }

    #[test]
    fn test_range_coerces_numeric_strings() {
        let gt = map_operator(Operator::Gt, &json!("42")).unwrap();
        assert_eq!(gt.values, vec![Value::Int(42)]);

        let lte = map_operator(Operator::Lte, &json!("2024-01-01")).unwrap();
        assert_eq!(lte.values, vec![Value::from("2024-01-01")]);
    }

    #[test]
    fn test_null_flags_and_empty_sets() {
        let not_null = map_operator(Operator::Null, &json!(false)).unwrap();
        assert_eq!(not_null.template, Template::IsNull { negated: true });

        let eq_null = map_operator(Operator::Eq, &json!(null)).unwrap();
        assert_eq!(eq_null.template, Template::IsNull { negated: false });

        let empty_in = map_operator(Operator::In, &json!([])).unwrap();
        assert_eq!(empty_in.template, Template::Never);
        assert!(empty_in.apply(Expr::Raw("x".into())).is_some());

        let empty_nin = map_operator(Operator::Nin, &json!([])).unwrap();
        assert!(empty_nin.apply(Expr::Raw("x".into())).is_none());
    }

    #[test]
    fn test_json_cast_decision() {
        let mut numeric = map_operator(Operator::Eq, &json!("2.5")).unwrap();
        assert_eq!(numeric.json_cast(), CastType::Numeric);
        assert_eq!(numeric.values, vec![Value::Float(2.5)]);

        let mut text = map_operator(Operator::Eq, &json!(true)).unwrap();
        assert_eq!(text.json_cast(), CastType::Text);
        assert_eq!(text.values, vec![Value::from("true")]);
    }

    #[test]
    fn test_relational_operators_do_not_map() {
        assert!(map_operator(Operator::Some, &json!({})).is_err());
        assert_eq!(Operator::from_key("_nicontains"), Some(Operator::Nicontains));
        assert_eq!(Operator::from_key("_regex"), None);
    }
}
