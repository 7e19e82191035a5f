use super::{KeyspaceRoutingTable, ShardTopology, TopologyServer};
use crate::core::{PermError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory `TopologyServer` backed by one routing table per keyspace.
#[derive(Clone, Default)]
pub struct InMemoryTopology {
    keyspaces: Arc<RwLock<BTreeMap<String, KeyspaceRoutingTable>>>,
}

impl InMemoryTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the routing table of a keyspace.
    pub async fn register_keyspace(&self, table: KeyspaceRoutingTable) -> Result<()> {
        table.validate()?;
        let mut keyspaces = self.keyspaces.write().await;
        keyspaces.insert(table.keyspace.clone(), table);
        Ok(())
    }

    /// Applies `update` to a keyspace's routing table, keeping the previous
    /// table if the updated one does not validate.
    pub async fn update_keyspace<F, T>(&self, keyspace: &str, update: F) -> Result<T>
    where
        F: FnOnce(&mut KeyspaceRoutingTable) -> Result<T>,
    {
        let mut keyspaces = self.keyspaces.write().await;
        let current = keyspaces
            .get(keyspace)
            .ok_or_else(|| PermError::KeyspaceNotFound(keyspace.to_string()))?;
        let mut next = current.clone();
        let output = update(&mut next)?;
        next.validate()?;
        keyspaces.insert(keyspace.to_string(), next);
        Ok(output)
    }

    pub async fn routing_table(&self, keyspace: &str) -> Option<KeyspaceRoutingTable> {
        self.keyspaces.read().await.get(keyspace).cloned()
    }
}

#[async_trait]
impl TopologyServer for InMemoryTopology {
    async fn get_keyspaces(&self) -> Result<Vec<String>> {
        Ok(self.keyspaces.read().await.keys().cloned().collect())
    }

    async fn get_shards_for_keyspace(&self, keyspace: &str) -> Result<Vec<ShardTopology>> {
        let keyspaces = self.keyspaces.read().await;
        let table = keyspaces
            .get(keyspace)
            .ok_or_else(|| PermError::KeyspaceNotFound(keyspace.to_string()))?;
        Ok(table.shard_topologies())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::ServerId;

    #[tokio::test]
    async fn unknown_keyspace_is_not_found() {
        let topology = InMemoryTopology::new();
        let err = topology.get_shards_for_keyspace("nope").await.unwrap_err();
        assert_eq!(err, PermError::KeyspaceNotFound("nope".into()));
    }

    #[tokio::test]
    async fn rejected_update_keeps_previous_table() {
        let topology = InMemoryTopology::new();
        let mut table = KeyspaceRoutingTable::new("ks").unwrap();
        table.set_shard_master("-80", "cell1-100").unwrap();
        table.set_shard_master("80-", "cell1-200").unwrap();
        topology.register_keyspace(table).await.unwrap();

        let result = topology
            .update_keyspace("ks", |table| {
                table.set_shard_replicas("80-", vec![ServerId::from("cell1-100")])
            })
            .await;
        assert!(result.is_err());

        let shards = topology.get_shards_for_keyspace("ks").await.unwrap();
        assert!(shards.iter().all(|s| s.replicas.is_empty()));
        assert_eq!(topology.get_keyspaces().await.unwrap(), vec!["ks".to_string()]);
    }
}
