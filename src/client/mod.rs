//! The database client seam: run one query on one server.

pub mod in_memory;

pub use in_memory::InMemoryDatabaseClient;

use crate::core::Result;
use crate::result::QueryResult;
use crate::topology::ServerId;
use async_trait::async_trait;

/// Executes read-only queries against remote servers.
///
/// Implementations bound their own concurrency; callers may issue requests
/// for many servers at once.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Runs `query` on `server` and returns its field list and rows.
    ///
    /// Fails with `PermError::ServerUnreachable` when the server cannot be
    /// contacted and `PermError::QueryFailed` when the server rejects the query.
    async fn execute_query(&self, server: &ServerId, query: &str) -> Result<QueryResult>;
}
