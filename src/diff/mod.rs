//! Compares a candidate snapshot against a reference snapshot.
//!
//! Tables are compared in the order user, db, host and the first difference
//! stops the comparison. For each table the field lists are checked first,
//! then the row counts, then the rows themselves.

pub mod disagreement;

pub use disagreement::Disagreement;

use crate::core::{Field, Result};
use crate::grants::{PermissionSnapshot, PrivilegeRow, PrivilegeTable};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// How rows of two tables are paired up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// Row `i` of the reference against row `i` of the candidate. Reordered
    /// but otherwise identical tables are reported as different.
    #[default]
    Positional,
    /// Rows are paired by their natural key (host, user, db), so order does
    /// not matter.
    Keyed,
}

/// Returns the first disagreement, or `None` if the candidate is consistent.
///
/// Errors only when a value's kind contradicts its declared field kind.
pub fn compare_snapshots(
    reference: &PermissionSnapshot,
    candidate: &PermissionSnapshot,
    mode: DiffMode,
) -> Result<Option<Disagreement>> {
    for table in crate::grants::GrantTable::ALL {
        if let Some(disagreement) =
            compare_tables(reference.table(table), candidate.table(table), mode)?
        {
            return Ok(Some(disagreement));
        }
    }
    Ok(None)
}

pub fn compare_tables(
    reference: &PrivilegeTable,
    candidate: &PrivilegeTable,
    mode: DiffMode,
) -> Result<Option<Disagreement>> {
    if let Some(disagreement) = compare_fields(reference, candidate.fields()) {
        return Ok(Some(disagreement));
    }

    if reference.row_count() != candidate.row_count() {
        return Ok(Some(Disagreement::RowCountMismatch {
            table: reference.table(),
            reference: reference.row_count(),
            candidate: candidate.row_count(),
        }));
    }

    match mode {
        DiffMode::Positional => compare_positional(reference, candidate),
        DiffMode::Keyed => compare_keyed(reference, candidate),
    }
}

fn compare_fields(reference: &PrivilegeTable, candidate: &[Field]) -> Option<Disagreement> {
    let table = reference.table();
    let schema_mismatch = |field: &str, detail: String| Disagreement::SchemaMismatch {
        table,
        field: field.to_string(),
        detail,
    };

    for field in reference.fields() {
        if !candidate.iter().any(|c| c.name == field.name) {
            return Some(schema_mismatch(
                &field.name,
                "missing on candidate".to_string(),
            ));
        }
    }
    for field in candidate {
        if reference.field_index(&field.name).is_none() {
            return Some(schema_mismatch(&field.name, "only on candidate".to_string()));
        }
    }

    // Same set of names; order and kinds must match too.
    for (position, (expected, actual)) in reference.fields().iter().zip(candidate).enumerate() {
        if expected.name != actual.name {
            return Some(schema_mismatch(
                &expected.name,
                format!(
                    "expected at position {}, candidate has {} there",
                    position, actual.name
                ),
            ));
        }
        if expected.kind != actual.kind {
            return Some(schema_mismatch(
                &expected.name,
                format!("reference is {}, candidate is {}", expected.kind, actual.kind),
            ));
        }
    }
    None
}

fn compare_positional(
    reference: &PrivilegeTable,
    candidate: &PrivilegeTable,
) -> Result<Option<Disagreement>> {
    for (expected, actual) in reference.rows().iter().zip(candidate.rows()) {
        if let Some(disagreement) = compare_rows(reference, candidate, expected, actual)? {
            return Ok(Some(disagreement));
        }
    }
    Ok(None)
}

fn compare_keyed(
    reference: &PrivilegeTable,
    candidate: &PrivilegeTable,
) -> Result<Option<Disagreement>> {
    // Rows sharing a key are paired in server order.
    let mut by_key: HashMap<String, VecDeque<&PrivilegeRow>> = HashMap::new();
    for row in candidate.rows() {
        by_key
            .entry(candidate.describe_row(row))
            .or_default()
            .push_back(row);
    }

    for expected in reference.rows() {
        let key = reference.describe_row(expected);
        let Some(actual) = by_key.get_mut(&key).and_then(|rows| rows.pop_front()) else {
            return Ok(Some(Disagreement::MissingRow {
                table: reference.table(),
                key,
            }));
        };
        if let Some(disagreement) = compare_rows(reference, candidate, expected, actual)? {
            return Ok(Some(disagreement));
        }
    }

    // Row counts are equal, so every candidate row has been paired.
    Ok(None)
}

fn compare_rows(
    reference: &PrivilegeTable,
    candidate: &PrivilegeTable,
    expected: &PrivilegeRow,
    actual: &PrivilegeRow,
) -> Result<Option<Disagreement>> {
    let Some(index) = expected.first_difference(actual, reference.fields(), reference.table())?
    else {
        return Ok(None);
    };
    Ok(Some(Disagreement::ValueMismatch {
        table: reference.table(),
        key: reference.describe_row(expected),
        field: reference.fields()[index].name.clone(),
        reference: reference.value_text(expected, index),
        candidate: candidate.value_text(actual, index),
    }))
}
