use super::GrantTable;
use crate::core::{Field, PermError, Result, Value};

/// One record of a grant table, aligned to the owning table's field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeRow {
    values: Vec<Value>,
}

impl PrivilegeRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the first field whose value differs from `other`.
    ///
    /// Both rows must be aligned to `fields`. Text and blob values compare
    /// byte for byte, integers numerically. A value whose kind disagrees with
    /// the declared field kind is an error, never a plain inequality.
    pub fn first_difference(
        &self,
        other: &PrivilegeRow,
        fields: &[Field],
        table: GrantTable,
    ) -> Result<Option<usize>> {
        for (index, field) in fields.iter().enumerate() {
            let left = self.value(index).unwrap_or(&Value::Null);
            let right = other.value(index).unwrap_or(&Value::Null);
            if !field.kind.accepts(left) || !field.kind.accepts(right) {
                return Err(PermError::KindMismatch {
                    table: table.name().to_string(),
                    field: field.name.clone(),
                    reference: left.type_name().to_string(),
                    candidate: right.type_name().to_string(),
                });
            }
            if !values_equal(left, right) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    pub fn equals(&self, other: &PrivilegeRow, fields: &[Field], table: GrantTable) -> Result<bool> {
        Ok(self.first_difference(other, fields, table)?.is_none())
    }

    /// Stable identifying key, e.g. `test_host:test_db` for a host grant.
    ///
    /// Built from the table's key columns that are present in `fields`.
    pub fn describe(&self, fields: &[Field], table: GrantTable) -> String {
        let parts: Vec<String> = table
            .key_columns()
            .iter()
            .filter_map(|column| fields.iter().position(|f| f.name == *column))
            .map(|index| {
                self.value(index)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "NULL".to_string())
            })
            .collect();

        if parts.is_empty() {
            format!("{} row", table.name())
        } else {
            parts.join(":")
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Text(a), Value::Text(b)) => a.as_bytes() == b.as_bytes(),
        _ => false,
    }
}
