use super::{GrantTable, PrivilegeTable};
use crate::core::{PermError, Result};
use crate::topology::ServerId;
use chrono::{DateTime, Utc};

/// Point-in-time capture of one server's three grant tables.
///
/// Immutable once built; shared read-only between comparisons.
#[derive(Debug, Clone)]
pub struct PermissionSnapshot {
    server: ServerId,
    fetched_at: DateTime<Utc>,
    user: PrivilegeTable,
    db: PrivilegeTable,
    host: PrivilegeTable,
}

impl PermissionSnapshot {
    pub fn new(
        server: ServerId,
        user: PrivilegeTable,
        db: PrivilegeTable,
        host: PrivilegeTable,
    ) -> Result<Self> {
        for (expected, table) in GrantTable::ALL.iter().zip([&user, &db, &host]) {
            if table.table() != *expected {
                return Err(PermError::InvalidTopology(format!(
                    "snapshot for {} expects the {} table, got {}",
                    server,
                    expected,
                    table.table()
                )));
            }
        }

        Ok(Self {
            server,
            fetched_at: Utc::now(),
            user,
            db,
            host,
        })
    }

    pub fn server(&self) -> &ServerId {
        &self.server
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn table(&self, table: GrantTable) -> &PrivilegeTable {
        match table {
            GrantTable::User => &self.user,
            GrantTable::Db => &self.db,
            GrantTable::Host => &self.host,
        }
    }

    /// Tables in comparison order.
    pub fn tables(&self) -> impl Iterator<Item = &PrivilegeTable> {
        GrantTable::ALL.into_iter().map(move |t| self.table(t))
    }

    pub fn render(&self) -> String {
        let mut out = format!("Permissions of {}\n", self.server);
        for table in self.tables() {
            out.push_str(&format!("\n== {} ({})\n", table.table(), table.query()));
            out.push_str(&table.render());
        }
        out
    }
}
