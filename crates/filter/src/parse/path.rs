//! Field keys: `name`, `a.b.c`, `field:scope`, `tags[2]` and `year(created)`.

use crate::error::FilterError;
use planner::query::ast::expr::DatePart;

/// A function applied to the final field of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldFunction {
    Year,
    Month,
    Week,
    Day,
    Weekday,
    Hour,
    Minute,
    Second,
    Count,
}

impl FieldFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "year" => FieldFunction::Year,
            "month" => FieldFunction::Month,
            "week" => FieldFunction::Week,
            "day" => FieldFunction::Day,
            "weekday" => FieldFunction::Weekday,
            "hour" => FieldFunction::Hour,
            "minute" => FieldFunction::Minute,
            "second" => FieldFunction::Second,
            "count" => FieldFunction::Count,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldFunction::Year => "year",
            FieldFunction::Month => "month",
            FieldFunction::Week => "week",
            FieldFunction::Day => "day",
            FieldFunction::Weekday => "weekday",
            FieldFunction::Hour => "hour",
            FieldFunction::Minute => "minute",
            FieldFunction::Second => "second",
            FieldFunction::Count => "count",
        }
    }

    /// The date component extracted, or `None` for `count`.
    pub fn date_part(&self) -> Option<DatePart> {
        Some(match self {
            FieldFunction::Year => DatePart::Year,
            FieldFunction::Month => DatePart::Month,
            FieldFunction::Week => DatePart::Week,
            FieldFunction::Day => DatePart::Day,
            FieldFunction::Weekday => DatePart::Weekday,
            FieldFunction::Hour => DatePart::Hour,
            FieldFunction::Minute => DatePart::Minute,
            FieldFunction::Second => DatePart::Second,
            FieldFunction::Count => return None,
        })
    }

    /// Whether the function reads the time-of-day rather than the date.
    pub fn needs_time(&self) -> bool {
        matches!(
            self,
            FieldFunction::Hour | FieldFunction::Minute | FieldFunction::Second
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    /// Related collection picked for an any-to-many field (`field:scope`).
    pub scope: Option<String>,
    pub function: Option<FieldFunction>,
    /// Array position (`tags[2]`), only meaningful inside a JSON document.
    pub index: Option<usize>,
}

impl PathSegment {
    pub fn field(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scope: None,
            function: None,
            index: None,
        }
    }

    /// Key used to recognise the same relation chain twice.
    pub fn normalized(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}:{scope}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Splits a filter key into path segments.
pub fn parse_key(key: &str) -> Result<Vec<PathSegment>, FilterError> {
    split_outside_parens(key)?
        .into_iter()
        .map(parse_segment)
        .collect()
}

fn split_outside_parens(key: &str) -> Result<Vec<&str>, FilterError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in key.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| FilterError::invalid(format!("Unbalanced `)` in `{key}`")))?;
            }
            '.' if depth == 0 => {
                parts.push(&key[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(FilterError::invalid(format!("Unbalanced `(` in `{key}`")));
    }
    parts.push(&key[start..]);
    Ok(parts)
}

fn parse_segment(raw: &str) -> Result<PathSegment, FilterError> {
    let raw = raw.trim();
    let malformed = || FilterError::invalid(format!("Malformed field path segment `{raw}`"));

    let (function, inner) = match raw.find('(') {
        Some(open) => {
            let inner = raw[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
            let name = &raw[..open];
            let function = FieldFunction::from_name(name)
                .ok_or_else(|| FilterError::invalid(format!("Unknown function `{name}`")))?;
            if inner.contains('.') {
                return Err(FilterError::invalid(format!(
                    "Function `{name}` takes a single field, got `{inner}`"
                )));
            }
            (Some(function), inner)
        }
        None => (None, raw),
    };

    let (inner, index) = match inner.strip_suffix(']').and_then(|s| s.rsplit_once('[')) {
        Some((name, position)) => (
            name,
            Some(position.trim().parse::<usize>().map_err(|_| malformed())?),
        ),
        None => (inner, None),
    };

    let (name, scope) = match inner.split_once(':') {
        Some((name, scope)) => (name, Some(scope.to_string())),
        None => (inner, None),
    };

    if name.is_empty()
        || scope.as_deref() == Some("")
        || name.contains(['(', ')', '[', ']'])
    {
        return Err(malformed());
    }

    Ok(PathSegment {
        name: name.to_string(),
        scope,
        function,
        index,
    })
}
