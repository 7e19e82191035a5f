use super::{ServerId, ShardTopology};
use crate::core::{PermError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Servers assigned to one shard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardAssignment {
    pub master: Option<ServerId>,
    #[serde(default)]
    pub replicas: Vec<ServerId>,
}

/// Result of a reparent: the shard's master before and after the move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMasterMovement {
    pub shard: String,
    pub previous_master: Option<ServerId>,
    pub next_master: ServerId,
    pub replicas: Vec<ServerId>,
}

/// Maps every shard of one keyspace to its master and replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyspaceRoutingTable {
    pub keyspace: String,
    #[serde(default)]
    pub shards: BTreeMap<String, ShardAssignment>,
}

impl KeyspaceRoutingTable {
    pub fn new(keyspace: impl Into<String>) -> Result<Self> {
        let keyspace = keyspace.into();
        if keyspace.trim().is_empty() {
            return Err(PermError::InvalidTopology(
                "keyspace name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            keyspace,
            shards: BTreeMap::new(),
        })
    }

    /// Declares a shard without servers. Re-adding an existing shard is a no-op.
    pub fn add_shard(&mut self, shard: impl Into<String>) -> Result<()> {
        let shard = shard.into();
        if shard.trim().is_empty() {
            return Err(PermError::InvalidTopology(format!(
                "shard name in keyspace {} must not be empty",
                self.keyspace
            )));
        }
        self.shards.entry(shard).or_default();
        Ok(())
    }

    /// Sets the master of a shard, declaring the shard if needed.
    ///
    /// A server that was a replica of the shard stops being one.
    pub fn set_shard_master(&mut self, shard: &str, master: impl Into<ServerId>) -> Result<()> {
        let master = master.into();
        if master.as_str().trim().is_empty() {
            return Err(PermError::InvalidTopology(format!(
                "master of {}/{} must not be empty",
                self.keyspace, shard
            )));
        }
        self.add_shard(shard)?;
        if let Some(assignment) = self.shards.get_mut(shard) {
            assignment.replicas.retain(|replica| replica != &master);
            assignment.master = Some(master);
        }
        Ok(())
    }

    /// Replaces the replica list of a shard. Duplicates are dropped.
    pub fn set_shard_replicas(&mut self, shard: &str, replicas: Vec<ServerId>) -> Result<()> {
        self.add_shard(shard)?;
        let keyspace = self.keyspace.clone();
        let Some(assignment) = self.shards.get_mut(shard) else {
            return Err(PermError::ShardNotFound(keyspace, shard.to_string()));
        };

        let mut seen = HashSet::new();
        let mut normalized = Vec::new();
        for replica in replicas {
            let replica = ServerId::new(replica.as_str().trim());
            if replica.as_str().is_empty() {
                return Err(PermError::InvalidTopology(format!(
                    "replica of {}/{} must not be empty",
                    keyspace, shard
                )));
            }
            if assignment.master.as_ref() == Some(&replica) {
                return Err(PermError::InvalidTopology(format!(
                    "replica '{}' of {}/{} cannot be the current master",
                    replica, keyspace, shard
                )));
            }
            if seen.insert(replica.clone()) {
                normalized.push(replica);
            }
        }
        assignment.replicas = normalized;
        Ok(())
    }

    /// Promotes `new_master` and demotes the previous master to replica.
    pub fn move_master(
        &mut self,
        shard: &str,
        new_master: impl Into<ServerId>,
    ) -> Result<ShardMasterMovement> {
        let new_master = new_master.into();
        if new_master.as_str().trim().is_empty() {
            return Err(PermError::InvalidTopology(
                "new master must not be empty".to_string(),
            ));
        }
        let keyspace = self.keyspace.clone();
        let Some(assignment) = self.shards.get_mut(shard) else {
            return Err(PermError::ShardNotFound(keyspace, shard.to_string()));
        };

        let previous_master = assignment.master.clone();
        let mut replicas = assignment.replicas.clone();
        replicas.retain(|replica| replica != &new_master);
        if let Some(previous) = previous_master.as_ref() {
            if previous != &new_master && !replicas.contains(previous) {
                replicas.push(previous.clone());
            }
        }

        assignment.master = Some(new_master.clone());
        assignment.replicas = replicas.clone();

        Ok(ShardMasterMovement {
            shard: shard.to_string(),
            previous_master,
            next_master: new_master,
            replicas,
        })
    }

    /// Checks the integrity of the table:
    /// - non-empty shard and server names,
    /// - a master is never listed among its own replicas,
    /// - no duplicate replicas,
    /// - no server serves two shards.
    ///
    /// A shard without a master is valid here; the validator rejects it.
    pub fn validate(&self) -> Result<()> {
        if self.keyspace.trim().is_empty() {
            return Err(PermError::InvalidTopology(
                "keyspace name must not be empty".to_string(),
            ));
        }

        let mut owner: HashMap<&ServerId, &str> = HashMap::new();
        for (shard, assignment) in &self.shards {
            if shard.trim().is_empty() {
                return Err(PermError::InvalidTopology(format!(
                    "shard name in keyspace {} must not be empty",
                    self.keyspace
                )));
            }

            let mut seen = HashSet::new();
            let servers = assignment.master.iter().chain(assignment.replicas.iter());
            for server in servers {
                if server.as_str().trim().is_empty() {
                    return Err(PermError::InvalidTopology(format!(
                        "empty server id in {}/{}",
                        self.keyspace, shard
                    )));
                }
                if !seen.insert(server) {
                    return Err(PermError::InvalidTopology(format!(
                        "server '{}' appears more than once in {}/{}",
                        server, self.keyspace, shard
                    )));
                }
                if let Some(other) = owner.insert(server, shard.as_str()) {
                    return Err(PermError::InvalidTopology(format!(
                        "server '{}' is assigned to both {}/{} and {}/{}",
                        server, self.keyspace, other, self.keyspace, shard
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn shard(&self, shard: &str) -> Option<ShardTopology> {
        self.shards.get(shard).map(|assignment| ShardTopology {
            keyspace: self.keyspace.clone(),
            name: shard.to_string(),
            master: assignment.master.clone(),
            replicas: assignment.replicas.clone(),
        })
    }

    /// All shards in shard-name order.
    pub fn shard_topologies(&self) -> Vec<ShardTopology> {
        self.shards
            .keys()
            .filter_map(|name| self.shard(name))
            .collect()
    }
}
