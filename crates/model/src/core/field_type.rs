use bitflags::bitflags;
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::HashMap, fmt};

/// Declared type of a collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum FieldType {
    Alias,
    BigInteger,
    Binary,
    Boolean,
    Csv,
    Date,
    DateTime,
    Decimal,
    Float,
    Geometry,
    Hash,
    Integer,
    Json,
    String,
    Text,
    Time,
    Timestamp,
    Uuid,
    Unknown,
}

lazy_static! {
    static ref FIELD_TYPE_MAP: HashMap<&'static str, FieldType> = build_field_type_map();
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Alias => "alias",
            FieldType::BigInteger => "bigInteger",
            FieldType::Binary => "binary",
            FieldType::Boolean => "boolean",
            FieldType::Csv => "csv",
            FieldType::Date => "date",
            FieldType::DateTime => "dateTime",
            FieldType::Decimal => "decimal",
            FieldType::Float => "float",
            FieldType::Geometry => "geometry",
            FieldType::Hash => "hash",
            FieldType::Integer => "integer",
            FieldType::Json => "json",
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Time => "time",
            FieldType::Timestamp => "timestamp",
            FieldType::Uuid => "uuid",
            FieldType::Unknown => "unknown",
        }
    }

    /// Types that can be matched with `LIKE` patterns.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Text | FieldType::Csv | FieldType::Hash | FieldType::Uuid
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::BigInteger | FieldType::Decimal | FieldType::Float | FieldType::Integer
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::DateTime | FieldType::Time | FieldType::Timestamp
        )
    }

    /// Temporal types that carry a calendar date component.
    pub fn has_date(&self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::DateTime | FieldType::Timestamp
        )
    }

    /// Temporal types that carry a time-of-day component.
    pub fn has_time(&self) -> bool {
        matches!(
            self,
            FieldType::DateTime | FieldType::Time | FieldType::Timestamp
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self, FieldType::Json)
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, FieldType::Alias)
    }

    /// Types that order meaningfully under `<`, `>` and `BETWEEN`.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || self.is_temporal() || self.is_text()
    }
}

impl From<&str> for FieldType {
    fn from(s: &str) -> Self {
        FIELD_TYPE_MAP
            .get(s.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or(FieldType::Unknown)
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        FieldType::from(s.as_str())
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn build_field_type_map() -> HashMap<&'static str, FieldType> {
    use FieldType::*;

    let entries = [
        ("alias", Alias),
        ("biginteger", BigInteger),
        ("binary", Binary),
        ("boolean", Boolean),
        ("csv", Csv),
        ("date", Date),
        ("datetime", DateTime),
        ("decimal", Decimal),
        ("float", Float),
        ("geometry", Geometry),
        ("hash", Hash),
        ("integer", Integer),
        ("json", Json),
        ("string", String),
        ("text", Text),
        ("time", Time),
        ("timestamp", Timestamp),
        ("uuid", Uuid),
    ];

    let mut map = HashMap::new();
    for (name, field_type) in entries {
        map.insert(name, field_type);
    }
    map
}

bitflags! {
    /// Modifier flags attached to a field definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Special: u16 {
        const ALIAS     = 1 << 0;
        const NO_DATA   = 1 << 1;
        const O2M       = 1 << 2;
        const M2O       = 1 << 3;
        const M2M       = 1 << 4;
        const M2A       = 1 << 5;
        const CAST_JSON = 1 << 6;
        const CAST_CSV  = 1 << 7;
        const CONCEAL   = 1 << 8;
        const GROUP     = 1 << 9;
    }
}

/// Schema names of the flags, in serialization order.
const SPECIAL_NAMES: [(&str, Special); 10] = [
    ("alias", Special::ALIAS),
    ("no-data", Special::NO_DATA),
    ("o2m", Special::O2M),
    ("m2o", Special::M2O),
    ("m2m", Special::M2M),
    ("m2a", Special::M2A),
    ("cast-json", Special::CAST_JSON),
    ("cast-csv", Special::CAST_CSV),
    ("conceal", Special::CONCEAL),
    ("group", Special::GROUP),
];

impl Special {
    pub fn from_special_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        SPECIAL_NAMES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, flag)| *flag)
    }

    /// Schema names of the flags that are set.
    pub fn special_names(&self) -> Vec<&'static str> {
        SPECIAL_NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Flags that mark a field as a relational alias rather than a column.
    pub fn is_relational(&self) -> bool {
        self.intersects(Special::O2M | Special::M2O | Special::M2M | Special::M2A)
    }

    /// Flags that mark a field as carrying no column of its own.
    pub fn is_pass_through(&self) -> bool {
        self.intersects(Special::ALIAS | Special::NO_DATA | Special::GROUP)
    }
}

/// Deserializes the schema's `special: ["o2m", "cast-json"]` list.
/// Unknown flag names are ignored.
pub fn deserialize_special<'de, D>(deserializer: D) -> Result<Special, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(names
        .iter()
        .filter_map(|name| Special::from_special_name(name))
        .fold(Special::empty(), |acc, flag| acc | flag))
}

/// Writes flags back as the list of names `deserialize_special` reads.
pub fn serialize_special<S>(special: &Special, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    special.special_names().serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_from_name() {
        assert_eq!(FieldType::from("json"), FieldType::Json);
        assert_eq!(FieldType::from("dateTime"), FieldType::DateTime);
        assert_eq!(FieldType::from("bigInteger"), FieldType::BigInteger);
        assert_eq!(FieldType::from("point"), FieldType::Unknown);
    }

    #[test]
    fn test_field_type_classes() {
        assert!(FieldType::Text.is_text());
        assert!(!FieldType::Integer.is_text());
        assert!(FieldType::Timestamp.has_time());
        assert!(!FieldType::Date.has_time());
        assert!(!FieldType::Json.is_ordered());
    }

    #[test]
    fn test_special_from_names() {
        let special: Special =
            deserialize_special(serde_json::json!(["o2m", "alias", "bogus"])).unwrap();
        assert!(special.contains(Special::O2M | Special::ALIAS));
        assert!(special.is_relational());
        assert!(special.is_pass_through());
        assert_eq!(special.special_names(), vec!["alias", "o2m"]);
    }

    #[test]
    fn test_special_serializes_as_names() {
        let special = Special::M2O | Special::CAST_JSON;
        let written = serialize_special(&special, serde_json::value::Serializer).unwrap();
        assert_eq!(written, serde_json::json!(["m2o", "cast-json"]));
        assert_eq!(deserialize_special(written).unwrap(), special);
    }
}
