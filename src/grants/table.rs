use super::{GrantTable, PrivilegeRow, display_value};
use crate::core::{Field, Value};
use crate::result::QueryResult;
use std::collections::HashSet;

/// The contents of one grant table on one server, in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeTable {
    table: GrantTable,
    query: String,
    fields: Vec<Field>,
    rows: Vec<PrivilegeRow>,
}

impl PrivilegeTable {
    /// Builds a table from a raw result set.
    ///
    /// Field lists and row order are kept verbatim. Integer columns sent as
    /// decimal text are parsed; any other value that does not fit its column
    /// makes the result malformed and the returned error describes why.
    pub fn from_result(
        table: GrantTable,
        query: impl Into<String>,
        result: QueryResult,
    ) -> std::result::Result<Self, String> {
        let QueryResult { fields, rows } = result;

        let mut names = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err("field with an empty name".to_string());
            }
            if !names.insert(field.name.as_str()) {
                return Err(format!("field '{}' appears more than once", field.name));
            }
        }

        let mut parsed = Vec::with_capacity(rows.len());
        for (row_index, values) in rows.into_iter().enumerate() {
            if values.len() != fields.len() {
                return Err(format!(
                    "row {} has {} values for {} fields",
                    row_index,
                    values.len(),
                    fields.len()
                ));
            }
            let mut normalized = Vec::with_capacity(values.len());
            for (field, value) in fields.iter().zip(values) {
                let type_name = value.type_name();
                let value = field.kind.normalize(value).ok_or_else(|| {
                    format!(
                        "row {} field '{}' expects {}, got {}",
                        row_index, field.name, field.kind, type_name
                    )
                })?;
                normalized.push(value);
            }
            parsed.push(PrivilegeRow::new(normalized));
        }

        Ok(Self {
            table,
            query: query.into(),
            fields,
            rows: parsed,
        })
    }

    pub fn table(&self) -> GrantTable {
        self.table
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn rows(&self) -> &[PrivilegeRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn describe_row(&self, row: &PrivilegeRow) -> String {
        row.describe(&self.fields, self.table)
    }

    pub fn to_query_result(&self) -> QueryResult {
        QueryResult::new(
            self.fields.clone(),
            self.rows.iter().map(|r| r.values().to_vec()).collect(),
        )
    }

    /// Aligned text rendering with credential columns redacted.
    pub fn render(&self) -> String {
        self.to_query_result().render_with(display_value)
    }

    pub(crate) fn value_text(&self, row: &PrivilegeRow, index: usize) -> String {
        match (self.fields.get(index), row.value(index)) {
            (Some(field), Some(value)) => display_value(field, value),
            _ => Value::Null.to_string(),
        }
    }
}
