//! Cluster topology as seen by the validator: keyspaces, shards, and the
//! servers serving each shard.

pub mod in_memory;
pub mod routing;

pub use in_memory::InMemoryTopology;
pub use routing::{KeyspaceRoutingTable, ShardAssignment, ShardMasterMovement};

use crate::core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one database server (a tablet), e.g. `cell1-0000000100`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ServerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Servers of one shard: the master, if one is set, and its replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTopology {
    pub keyspace: String,
    pub name: String,
    pub master: Option<ServerId>,
    #[serde(default)]
    pub replicas: Vec<ServerId>,
}

impl ShardTopology {
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
            master: None,
            replicas: Vec::new(),
        }
    }

    pub fn with_master(mut self, master: impl Into<ServerId>) -> Self {
        self.master = Some(master.into());
        self
    }

    pub fn with_replica(mut self, replica: impl Into<ServerId>) -> Self {
        self.replicas.push(replica.into());
        self
    }

    /// `keyspace/shard`, the way shards are named on the command line.
    pub fn path(&self) -> String {
        format!("{}/{}", self.keyspace, self.name)
    }
}

/// Read-only access to the topology service.
#[async_trait]
pub trait TopologyServer: Send + Sync {
    /// Names of all known keyspaces, sorted.
    async fn get_keyspaces(&self) -> Result<Vec<String>>;

    /// Shards of `keyspace` in shard-name order.
    ///
    /// Fails with `PermError::KeyspaceNotFound` for an unknown keyspace.
    async fn get_shards_for_keyspace(&self, keyspace: &str) -> Result<Vec<ShardTopology>>;
}
