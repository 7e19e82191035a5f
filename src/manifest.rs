//! JSON description of a cluster: its topology and what each server answers
//! to the grant-table queries. Backs the in-memory topology and client.

use crate::client::InMemoryDatabaseClient;
use crate::core::{PermError, Result};
use crate::grants::GrantTable;
use crate::result::QueryResult;
use crate::topology::{InMemoryTopology, KeyspaceRoutingTable, ServerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterManifest {
    #[serde(default)]
    pub keyspaces: Vec<KeyspaceManifest>,
    #[serde(default)]
    pub servers: BTreeMap<ServerId, ServerManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyspaceManifest {
    pub name: String,
    #[serde(default)]
    pub shards: Vec<ShardManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardManifest {
    pub name: String,
    #[serde(default)]
    pub master: Option<ServerId>,
    #[serde(default)]
    pub replicas: Vec<ServerId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerManifest {
    #[serde(default)]
    pub unreachable: bool,
    /// Start from another server's grants; tables listed in `grants` override.
    #[serde(default)]
    pub same_as: Option<ServerId>,
    #[serde(default)]
    pub grants: BTreeMap<GrantTable, QueryResult>,
}

impl ClusterManifest {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PermError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn routing_tables(&self) -> Result<Vec<KeyspaceRoutingTable>> {
        let mut seen = HashSet::new();
        let mut tables = Vec::with_capacity(self.keyspaces.len());
        for keyspace in &self.keyspaces {
            if !seen.insert(keyspace.name.as_str()) {
                return Err(PermError::InvalidTopology(format!(
                    "keyspace '{}' is declared more than once",
                    keyspace.name
                )));
            }
            let mut table = KeyspaceRoutingTable::new(keyspace.name.clone())?;
            for shard in &keyspace.shards {
                table.add_shard(shard.name.clone())?;
                if let Some(master) = &shard.master {
                    table.set_shard_master(&shard.name, master.clone())?;
                }
                table.set_shard_replicas(&shard.name, shard.replicas.clone())?;
            }
            table.validate()?;
            tables.push(table);
        }
        Ok(tables)
    }

    pub async fn build_topology(&self) -> Result<InMemoryTopology> {
        let topology = InMemoryTopology::new();
        for table in self.routing_tables()? {
            topology.register_keyspace(table).await?;
        }
        Ok(topology)
    }

    /// Builds a client answering each server's grant queries against
    /// `grants_database`.
    pub async fn build_client(&self, grants_database: &str) -> Result<InMemoryDatabaseClient> {
        let client = InMemoryDatabaseClient::new();
        for (server, manifest) in &self.servers {
            client.register_server(server.clone()).await?;
            client.set_unreachable(server.clone(), manifest.unreachable).await;
            for (table, result) in self.resolve_grants(server)? {
                client
                    .set_query_result(server.clone(), table.query(grants_database), result)
                    .await;
            }
        }
        Ok(client)
    }

    /// Grants of `server` after following its `same_as` chain.
    pub fn resolve_grants(&self, server: &ServerId) -> Result<BTreeMap<GrantTable, QueryResult>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(server);
        while let Some(id) = current {
            if !visited.insert(id) {
                return Err(PermError::Config(format!(
                    "server '{}' has a same_as cycle",
                    server
                )));
            }
            let manifest = self.servers.get(id).ok_or_else(|| {
                PermError::Config(format!(
                    "server '{}' refers to unknown server '{}'",
                    server, id
                ))
            })?;
            chain.push(manifest);
            current = manifest.same_as.as_ref();
        }

        let mut grants = BTreeMap::new();
        for manifest in chain.into_iter().rev() {
            for (table, result) in &manifest.grants {
                grants.insert(*table, result.clone());
            }
        }
        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    const MANIFEST: &str = r#"{
        "keyspaces": [
            {"name": "ks", "shards": [
                {"name": "0", "master": "cell1-100", "replicas": ["cell1-101"]}
            ]}
        ],
        "servers": {
            "cell1-100": {"grants": {
                "host": {"fields": [{"name": "Host", "kind": "text"}], "rows": [["h"]]}
            }},
            "cell1-101": {"same_as": "cell1-100", "grants": {
                "user": {"fields": [{"name": "Host", "kind": "text"}], "rows": []}
            }}
        }
    }"#;

    #[test]
    fn same_as_inherits_and_overrides() {
        let manifest = ClusterManifest::from_json_str(MANIFEST).unwrap();
        let grants = manifest.resolve_grants(&ServerId::from("cell1-101")).unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[&GrantTable::Host].rows, vec![vec![Value::text("h")]]);
        assert!(grants[&GrantTable::User].rows.is_empty());
    }

    #[test]
    fn same_as_cycles_are_rejected() {
        let manifest = ClusterManifest::from_json_str(
            r#"{"servers": {"a": {"same_as": "b"}, "b": {"same_as": "a"}}}"#,
        )
        .unwrap();
        assert!(manifest.resolve_grants(&ServerId::from("a")).is_err());
    }

    #[test]
    fn duplicate_keyspaces_are_rejected() {
        let manifest = ClusterManifest::from_json_str(
            r#"{"keyspaces": [{"name": "ks"}, {"name": "ks"}]}"#,
        )
        .unwrap();
        assert!(manifest.routing_tables().is_err());
    }

    #[tokio::test]
    async fn builds_topology_with_masters_and_replicas() {
        let manifest = ClusterManifest::from_json_str(MANIFEST).unwrap();
        let topology = manifest.build_topology().await.unwrap();
        let table = topology.routing_table("ks").await.unwrap();
        let shard = table.shard("0").unwrap();
        assert_eq!(shard.master, Some(ServerId::from("cell1-100")));
        assert_eq!(shard.replicas, vec![ServerId::from("cell1-101")]);
    }
}
