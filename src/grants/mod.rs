//! Typed model of the three MySQL grant tables and a server's snapshot of them.

pub mod row;
pub mod snapshot;
pub mod table;

pub use row::PrivilegeRow;
pub use snapshot::PermissionSnapshot;
pub use table::PrivilegeTable;

use crate::core::{Field, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns whose contents are credentials. They are compared like any other
/// column but never rendered.
const SECRET_COLUMNS: &[&str] = &["password", "authentication_string"];

pub const REDACTED: &str = "<redacted>";

/// One of the three grant tables every server is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantTable {
    /// Global privileges per user account.
    User,
    /// Per-database privileges.
    Db,
    /// Per-host privileges.
    Host,
}

impl GrantTable {
    /// Comparison order: user, then db, then host.
    pub const ALL: [GrantTable; 3] = [GrantTable::User, GrantTable::Db, GrantTable::Host];

    pub fn name(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Db => "db",
            Self::Host => "host",
        }
    }

    /// The fixed introspection query for this table.
    pub fn query(&self, grants_database: &str) -> String {
        format!("SELECT * FROM {}.{}", grants_database, self.name())
    }

    /// Columns forming the natural identity of a row, in key order.
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Self::User => &["Host", "User"],
            Self::Db => &["Host", "Db", "User"],
            Self::Host => &["Host", "Db"],
        }
    }
}

impl fmt::Display for GrantTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub fn is_secret_field(name: &str) -> bool {
    SECRET_COLUMNS
        .iter()
        .any(|secret| secret.eq_ignore_ascii_case(name))
}

/// Text shown for `value` in reports and printed tables.
pub fn display_value(field: &Field, value: &Value) -> String {
    if is_secret_field(&field.name) && !value.is_null() {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}
