//! Rejects operator and field-type combinations before any SQL is built.

use crate::{
    error::FilterError,
    operator::Operator,
    parse::path::{FieldFunction, PathSegment},
};
use model::{
    core::field_type::{FieldType, Special},
    schema::{FieldOverview, Relation},
};

/// Checks an operator against a field of the current collection.
///
/// `relation` is the relation declared on the field, if any. When a
/// function is applied, the operator is checked against the function's
/// numeric result instead of the field's own type.
pub fn validate_field(
    field: &str,
    overview: &FieldOverview,
    relation: Option<&Relation>,
    function: Option<FieldFunction>,
    operator: Operator,
) -> Result<(), FilterError> {
    let to_many = relation.is_some_and(|rel| rel.cardinality.is_multi());
    let relational = relation.is_some() || overview.special.is_relational();

    if operator.is_relational() {
        if !relational {
            return Err(FilterError::invalid(format!(
                "`{}` can only be used on relational fields, `{field}` is not one",
                operator.key()
            )));
        }
        if function.is_some() {
            return Err(FilterError::invalid(format!(
                "`{}` cannot be combined with a function on `{field}`",
                operator.key()
            )));
        }
        return Ok(());
    }

    if overview.special.contains(Special::CONCEAL) && !operator.is_null_check() {
        return Err(FilterError::invalid(format!(
            "Concealed field `{field}` only supports null checks"
        )));
    }

    let effective = match function {
        Some(function) => {
            validate_function(field, overview, to_many, function)?;
            FieldType::Integer
        }
        None => {
            if to_many {
                return Err(FilterError::invalid(format!(
                    "To-many field `{field}` must be filtered with `_some`, `_none` or a nested field"
                )));
            }
            if overview.field_type.is_alias() && relation.is_none() {
                return Err(FilterError::invalid(format!(
                    "Field `{field}` holds no data and cannot be filtered"
                )));
            }
            if overview.field_type.is_json() && !operator.is_null_check() {
                return Err(FilterError::invalid(format!(
                    "JSON field `{field}` can only be null-checked directly; filter on a path inside it"
                )));
            }
            overview.field_type
        }
    };

    if operator.is_pattern() && !effective.is_text() {
        return Err(FilterError::invalid(format!(
            "`{}` needs a text field, `{field}` is {effective}",
            operator.key()
        )));
    }
    if operator.is_range() && !effective.is_ordered() {
        return Err(FilterError::invalid(format!(
            "`{}` needs an ordered field, `{field}` is {effective}",
            operator.key()
        )));
    }

    Ok(())
}

fn validate_function(
    field: &str,
    overview: &FieldOverview,
    to_many: bool,
    function: FieldFunction,
) -> Result<(), FilterError> {
    let field_type = overview.field_type;
    let allowed = match function {
        FieldFunction::Count => to_many || field_type.is_json(),
        f if f.needs_time() => field_type.has_time(),
        _ => field_type.has_date(),
    };

    if allowed {
        Ok(())
    } else {
        Err(FilterError::invalid(format!(
            "Function `{}` cannot be applied to `{field}` of type {field_type}",
            function.name()
        )))
    }
}

/// Checks a condition that reaches into a JSON document.
pub fn validate_json_path(
    field: &str,
    rest: &[PathSegment],
    operator: Operator,
) -> Result<(), FilterError> {
    if rest.iter().any(|segment| segment.function.is_some()) {
        return Err(FilterError::invalid(format!(
            "Functions are not supported inside JSON field `{field}`"
        )));
    }
    if let Some(segment) = rest.iter().find(|segment| segment.scope.is_some()) {
        return Err(FilterError::invalid(format!(
            "Collection scope `{}` is not allowed inside JSON field `{field}`",
            segment.normalized()
        )));
    }
    if operator.is_relational() {
        return Err(FilterError::invalid(format!(
            "`{}` cannot be used inside JSON field `{field}`",
            operator.key()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::schema::Cardinality;

    fn field(field_type: &str, special: Special) -> FieldOverview {
        FieldOverview {
            field_type: FieldType::from(field_type),
            special,
        }
    }

    fn relation(cardinality: Cardinality) -> Relation {
        Relation {
            collection: "orders".into(),
            field: "items".into(),
            related_collection: Some("order_items".into()),
            related_field: Some("order".into()),
            collection_field: None,
            allowed_collections: vec![],
            cardinality,
        }
    }

    #[test]
    fn test_pattern_requires_text() {
        let title = field("string", Special::empty());
        let total = field("integer", Special::empty());
        assert!(validate_field("title", &title, None, None, Operator::Contains).is_ok());
        assert!(validate_field("total", &total, None, None, Operator::Contains).is_err());
        assert!(validate_field("total", &total, None, None, Operator::Between).is_ok());
    }

    #[test]
    fn test_range_requires_ordered_type() {
        let flag = field("boolean", Special::empty());
        assert!(validate_field("flag", &flag, None, None, Operator::Gt).is_err());
        assert!(validate_field("flag", &flag, None, None, Operator::Eq).is_ok());
    }

    #[test]
    fn test_relational_operators() {
        let title = field("string", Special::empty());
        assert!(validate_field("title", &title, None, None, Operator::Some).is_err());

        let items = field("alias", Special::O2M);
        let rel = relation(Cardinality::OneToMany);
        assert!(validate_field("items", &items, Some(&rel), None, Operator::None).is_ok());
        assert!(validate_field("items", &items, Some(&rel), None, Operator::Eq).is_err());
        assert!(
            validate_field("items", &items, Some(&rel), Some(FieldFunction::Count), Operator::Gt)
                .is_ok()
        );
    }

    #[test]
    fn test_conceal_and_json_root_allow_only_null_checks() {
        let secret = field("hash", Special::CONCEAL);
        assert!(validate_field("secret", &secret, None, None, Operator::Eq).is_err());
        assert!(validate_field("secret", &secret, None, None, Operator::Nnull).is_ok());

        let doc = field("json", Special::CAST_JSON);
        assert!(validate_field("doc", &doc, None, None, Operator::Eq).is_err());
        assert!(validate_field("doc", &doc, None, None, Operator::Empty).is_ok());
        assert!(validate_field("doc", &doc, None, Some(FieldFunction::Count), Operator::Gte).is_ok());
    }

    #[test]
    fn test_functions_need_matching_types() {
        let created = field("date", Special::empty());
        let title = field("string", Special::empty());
        assert!(validate_field("created", &created, None, Some(FieldFunction::Year), Operator::Eq).is_ok());
        assert!(validate_field("created", &created, None, Some(FieldFunction::Hour), Operator::Eq).is_err());
        assert!(validate_field("title", &title, None, Some(FieldFunction::Month), Operator::Eq).is_err());
        assert!(validate_field("title", &title, None, Some(FieldFunction::Count), Operator::Eq).is_err());
        assert!(
            validate_field("created", &created, None, Some(FieldFunction::Day), Operator::Contains)
                .is_err()
        );
    }

    #[test]
    fn test_alias_without_relation_holds_no_data() {
        let divider = field("alias", Special::NO_DATA);
        assert!(validate_field("divider", &divider, None, None, Operator::Null).is_err());
    }
}
