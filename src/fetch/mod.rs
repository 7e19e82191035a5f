//! Fetches a server's grant tables into a `PermissionSnapshot`.

use crate::client::DatabaseClient;
use crate::core::{PermError, Result};
use crate::grants::{GrantTable, PermissionSnapshot, PrivilegeTable};
use crate::topology::ServerId;
use log::debug;
use std::sync::Arc;

/// Runs the three fixed grant-table queries against one server.
///
/// No retries: a failed query fails the whole fetch and partial snapshots
/// are never returned.
#[derive(Clone)]
pub struct SnapshotFetcher {
    client: Arc<dyn DatabaseClient>,
    grants_database: String,
}

impl SnapshotFetcher {
    pub fn new(client: Arc<dyn DatabaseClient>, grants_database: impl Into<String>) -> Self {
        Self {
            client,
            grants_database: grants_database.into(),
        }
    }

    pub fn grants_database(&self) -> &str {
        &self.grants_database
    }

    pub fn query_for(&self, table: GrantTable) -> String {
        table.query(&self.grants_database)
    }

    pub async fn fetch(&self, server: &ServerId) -> Result<PermissionSnapshot> {
        let (user, db, host) = futures::try_join!(
            self.fetch_table(server, GrantTable::User),
            self.fetch_table(server, GrantTable::Db),
            self.fetch_table(server, GrantTable::Host),
        )?;
        debug!(
            "Fetched permissions of {}: {} user, {} db, {} host rows",
            server,
            user.row_count(),
            db.row_count(),
            host.row_count()
        );
        PermissionSnapshot::new(server.clone(), user, db, host)
    }

    async fn fetch_table(&self, server: &ServerId, table: GrantTable) -> Result<PrivilegeTable> {
        let query = self.query_for(table);
        let result = self
            .client
            .execute_query(server, &query)
            .await
            .map_err(|err| match err {
                PermError::ServerUnreachable(_)
                | PermError::QueryFailed { .. }
                | PermError::Timeout(_) => err,
                other => PermError::QueryFailed {
                    server: server.to_string(),
                    query: query.clone(),
                    reason: other.to_string(),
                },
            })?;

        PrivilegeTable::from_result(table, query.clone(), result).map_err(|reason| {
            PermError::MalformedResult {
                server: server.to_string(),
                query,
                reason,
            }
        })
    }
}
