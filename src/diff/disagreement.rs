use crate::grants::GrantTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The first difference found between a reference and a candidate snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disagreement {
    /// The field lists of a table differ.
    SchemaMismatch {
        table: GrantTable,
        field: String,
        detail: String,
    },
    RowCountMismatch {
        table: GrantTable,
        reference: usize,
        candidate: usize,
    },
    /// Same schema and row, different value in one field.
    ValueMismatch {
        table: GrantTable,
        key: String,
        field: String,
        reference: String,
        candidate: String,
    },
    /// A row of the reference has no counterpart on the candidate.
    MissingRow { table: GrantTable, key: String },
}

impl Disagreement {
    pub fn table(&self) -> GrantTable {
        match self {
            Self::SchemaMismatch { table, .. }
            | Self::RowCountMismatch { table, .. }
            | Self::ValueMismatch { table, .. }
            | Self::MissingRow { table, .. } => *table,
        }
    }

    /// What the two servers disagree on: a row key for content differences,
    /// the table for structural ones.
    pub fn subject(&self) -> String {
        match self {
            Self::ValueMismatch { key, .. } | Self::MissingRow { key, .. } => key.clone(),
            Self::SchemaMismatch { table, .. } | Self::RowCountMismatch { table, .. } => {
                format!("{} table", table)
            }
        }
    }
}

impl fmt::Display for Disagreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch {
                table,
                field,
                detail,
            } => write!(f, "{} table schema mismatch on field {}: {}", table, field, detail),
            Self::RowCountMismatch {
                table,
                reference,
                candidate,
            } => write!(
                f,
                "{} table row count mismatch: reference={} candidate={}",
                table, reference, candidate
            ),
            Self::ValueMismatch {
                table,
                key,
                field,
                reference,
                candidate,
            } => write!(
                f,
                "{} {} differs: reference={} candidate={} (key={})",
                table, field, reference, candidate, key
            ),
            Self::MissingRow { table, key } => {
                write!(f, "{} row missing on candidate (key={})", table, key)
            }
        }
    }
}
