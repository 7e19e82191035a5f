use super::DatabaseClient;
use crate::core::{PermError, Result};
use crate::result::QueryResult;
use crate::topology::ServerId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Scripted state of one simulated server.
#[derive(Clone, Default)]
struct InMemoryServer {
    results: HashMap<String, QueryResult>,
    failures: HashMap<String, String>,
    unreachable: bool,
    latency: Option<Duration>,
    queries_served: usize,
}

/// A `DatabaseClient` that answers from per-server scripted result sets.
///
/// Each server owns its own copy of every result it serves; changing one
/// server never affects another.
#[derive(Clone, Default)]
pub struct InMemoryDatabaseClient {
    servers: Arc<Mutex<HashMap<ServerId, InMemoryServer>>>,
}

impl InMemoryDatabaseClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a server with no scripted results. Registering twice keeps
    /// the existing state.
    pub async fn register_server(&self, server: impl Into<ServerId>) -> Result<()> {
        let server = server.into();
        if server.as_str().trim().is_empty() {
            return Err(PermError::Config("server id must not be empty".to_string()));
        }
        self.servers.lock().await.entry(server).or_default();
        Ok(())
    }

    /// Scripts the answer `server` gives to `query`.
    pub async fn set_query_result(
        &self,
        server: impl Into<ServerId>,
        query: impl Into<String>,
        result: QueryResult,
    ) {
        let query = query.into();
        let mut servers = self.servers.lock().await;
        let entry = servers.entry(server.into()).or_default();
        entry.failures.remove(&query);
        entry.results.insert(query, result);
    }

    /// Makes `query` fail on `server` with `reason`.
    pub async fn fail_query(
        &self,
        server: impl Into<ServerId>,
        query: impl Into<String>,
        reason: impl Into<String>,
    ) {
        let mut servers = self.servers.lock().await;
        let entry = servers.entry(server.into()).or_default();
        entry.failures.insert(query.into(), reason.into());
    }

    pub async fn set_unreachable(&self, server: impl Into<ServerId>, unreachable: bool) {
        let mut servers = self.servers.lock().await;
        servers.entry(server.into()).or_default().unreachable = unreachable;
    }

    /// Delays every answer from `server` by `latency`.
    pub async fn set_latency(&self, server: impl Into<ServerId>, latency: Duration) {
        let mut servers = self.servers.lock().await;
        servers.entry(server.into()).or_default().latency = Some(latency);
    }

    /// Number of queries `server` has answered successfully.
    pub async fn queries_served(&self, server: &ServerId) -> usize {
        self.servers
            .lock()
            .await
            .get(server)
            .map(|s| s.queries_served)
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for InMemoryDatabaseClient {
    async fn execute_query(&self, server: &ServerId, query: &str) -> Result<QueryResult> {
        let latency = {
            let servers = self.servers.lock().await;
            let state = servers
                .get(server)
                .ok_or_else(|| PermError::ServerUnreachable(server.to_string()))?;
            if state.unreachable {
                return Err(PermError::ServerUnreachable(server.to_string()));
            }
            state.latency
        };

        // The lock is not held while "on the wire".
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut servers = self.servers.lock().await;
        let state = servers
            .get_mut(server)
            .ok_or_else(|| PermError::ServerUnreachable(server.to_string()))?;
        if let Some(reason) = state.failures.get(query) {
            return Err(PermError::QueryFailed {
                server: server.to_string(),
                query: query.to_string(),
                reason: reason.clone(),
            });
        }
        let result = state
            .results
            .get(query)
            .cloned()
            .ok_or_else(|| PermError::QueryFailed {
                server: server.to_string(),
                query: query.to_string(),
                reason: "unexpected query".to_string(),
            })?;
        state.queries_served += 1;
        Ok(result)
    }
}
