// ============================================================================
// permcheck Library
// ============================================================================

//! Validates that every server of a sharded MySQL-compatible keyspace carries
//! the same grant tables (`user`, `db`, `host`) as its shard master.
//!
//! # Examples
//!
//! ```
//! use permcheck::{
//!     Field, InMemoryDatabaseClient, InMemoryTopology, KeyspaceRoutingTable,
//!     PermissionValidator, QueryResult, ValidatorConfig, GrantTable, Value,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> permcheck::Result<()> {
//! let mut routing = KeyspaceRoutingTable::new("commerce")?;
//! routing.set_shard_master("0", "cell1-100")?;
//! routing.set_shard_replicas("0", vec!["cell1-101".into()])?;
//!
//! let topology = InMemoryTopology::new();
//! topology.register_keyspace(routing).await?;
//!
//! let client = InMemoryDatabaseClient::new();
//! for server in ["cell1-100", "cell1-101"] {
//!     for table in GrantTable::ALL {
//!         let rows = QueryResult::new(
//!             vec![Field::text("Host"), Field::text("User")],
//!             vec![vec![Value::text("%"), Value::text("app")]],
//!         );
//!         client.set_query_result(server, table.query("mysql"), rows).await;
//!     }
//! }
//!
//! let validator = PermissionValidator::new(
//!     Arc::new(topology),
//!     Arc::new(client),
//!     ValidatorConfig::new(),
//! )?;
//! validator.validate_keyspace("commerce").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod core;
pub mod diff;
pub mod fetch;
pub mod grants;
pub mod manifest;
pub mod result;
pub mod topology;
pub mod validator;

// Re-export main types for convenience
pub use client::{DatabaseClient, InMemoryDatabaseClient};
pub use crate::core::{Field, FieldKind, PermError, Result, Value};
pub use diff::{DiffMode, Disagreement, compare_snapshots, compare_tables};
pub use fetch::SnapshotFetcher;
pub use grants::{GrantTable, PermissionSnapshot, PrivilegeRow, PrivilegeTable};
pub use manifest::ClusterManifest;
pub use result::QueryResult;
pub use topology::{
    InMemoryTopology, KeyspaceRoutingTable, ServerId, ShardTopology, TopologyServer,
};
pub use validator::{
    PermissionValidator, ServerOutcome, ServerRole, ServerVerdict, ShardReport,
    ValidationReport, ValidatorConfig,
};
