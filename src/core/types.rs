use super::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic kind of a grant table column.
///
/// Only used for comparison and display; it carries no wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Blob,
}

impl FieldKind {
    /// Returns true if `value` may be stored in a column of this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Text | Self::Blob, Value::Text(_)) => true,
            _ => false,
        }
    }

    /// Normalizes a raw value into this kind.
    ///
    /// Integer columns commonly arrive as decimal text and are parsed here.
    /// Returns `None` when the value cannot represent this kind.
    pub fn normalize(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (Self::Integer, Value::Text(s)) => s.trim().parse::<i64>().ok().map(Value::Integer),
            (kind, value) if kind.accepts(&value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "TEXT"),
            Self::Integer => write!(f, "INTEGER"),
            Self::Blob => write!(f, "BLOB"),
        }
    }
}

/// A named, typed column of a grant table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn blob(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Blob)
    }

    /// Same name and same semantic kind.
    pub fn is_compatible(&self, other: &Field) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_columns_parse_decimal_text() {
        assert_eq!(
            FieldKind::Integer.normalize(Value::text("10")),
            Some(Value::Integer(10))
        );
        assert_eq!(FieldKind::Integer.normalize(Value::text("ten")), None);
    }

    #[test]
    fn text_columns_reject_integers() {
        assert_eq!(FieldKind::Text.normalize(Value::Integer(1)), None);
        assert_eq!(FieldKind::Blob.normalize(Value::Null), Some(Value::Null));
    }

    #[test]
    fn compatibility_requires_name_and_kind() {
        assert!(Field::text("Host").is_compatible(&Field::text("Host")));
        assert!(!Field::text("Host").is_compatible(&Field::blob("Host")));
        assert!(!Field::text("Host").is_compatible(&Field::text("Db")));
    }
}
