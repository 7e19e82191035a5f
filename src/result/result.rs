use crate::core::{Field, Value};
use serde::{Deserialize, Serialize};

/// Raw result set of one query: the field list and the rows in server order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub fields: Vec<Field>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Self {
        Self { fields, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the result as an aligned text table.
    ///
    /// `display` maps each `(field, value)` pair to the text shown in its cell.
    pub fn render_with<F>(&self, display: F) -> String
    where
        F: Fn(&Field, &Value) -> String,
    {
        if self.fields.is_empty() {
            return "Empty result set\n".to_string();
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                self.fields
                    .iter()
                    .zip(row.iter())
                    .map(|(field, value)| display(field, value))
                    .collect()
            })
            .collect();

        // Calculate column widths
        let mut widths: Vec<usize> = self.fields.iter().map(|f| f.name.len()).collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let mut out = String::new();
        let header: Vec<String> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| format!("{:width$}", field.name, width = widths[i]))
            .collect();
        out.push_str(header.join(" | ").trim_end());
        out.push('\n');

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        out.push_str(&separator);
        out.push('\n');

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
                .collect();
            out.push_str(line.join(" | ").trim_end());
            out.push('\n');
        }

        out.push_str(&format!("\n{} row(s)\n", self.rows.len()));
        out
    }

    pub fn render(&self) -> String {
        self.render_with(|_, value| value.to_string())
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_aligns_columns_and_counts_rows() {
        let result = QueryResult::new(
            vec![Field::text("Host"), Field::text("Db")],
            vec![vec![Value::text("test_host"), Value::text("test_db")]],
        );
        let text = result.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Host      | Db");
        assert_eq!(lines[1], "----------+--------");
        assert_eq!(lines[2], "test_host | test_db");
        assert!(text.ends_with("1 row(s)\n"));
    }

    #[test]
    fn render_without_fields_reports_empty_set() {
        assert_eq!(QueryResult::empty().render(), "Empty result set\n");
    }
}
