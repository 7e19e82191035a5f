use crate::core::{PermError, Result};
use crate::diff::{DiffMode, Disagreement};
use crate::topology::ServerId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerRole {
    Master,
    Replica,
}

/// What happened to one server during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServerOutcome {
    /// The master's snapshot was fetched and used as the reference.
    Reference,
    Consistent,
    Disagreement { disagreement: Disagreement },
    FetchFailed { error: String },
    /// The deadline expired before the server answered.
    TimedOut,
    /// The replica was fetched but the master's snapshot never materialized.
    ReferenceUnavailable,
    ComparisonFailed { error: String },
}

impl ServerOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Reference | Self::Consistent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerVerdict {
    pub server: ServerId,
    pub role: ServerRole,
    pub outcome: ServerOutcome,
}

impl ServerVerdict {
    pub fn new(server: ServerId, role: ServerRole, outcome: ServerOutcome) -> Self {
        Self {
            server,
            role,
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardReport {
    pub shard: String,
    pub master: ServerId,
    pub servers: Vec<ServerVerdict>,
}

impl ShardReport {
    pub fn new(shard: impl Into<String>, master: ServerId) -> Self {
        Self {
            shard: shard.into(),
            master,
            servers: Vec::new(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.servers.iter().all(|v| v.outcome.is_ok())
    }

    pub fn verdict(&self, server: &ServerId) -> Option<&ServerVerdict> {
        self.servers.iter().find(|v| &v.server == server)
    }

    fn details(&self, keyspace: &str) -> Vec<String> {
        self.servers
            .iter()
            .filter_map(|verdict| self.detail(keyspace, verdict))
            .collect()
    }

    fn detail(&self, keyspace: &str, verdict: &ServerVerdict) -> Option<String> {
        let server = &verdict.server;
        let master = &self.master;
        let shard = format!("{}/{}", keyspace, self.shard);
        let role = match verdict.role {
            ServerRole::Master => "master",
            ServerRole::Replica => "replica",
        };
        let text = match &verdict.outcome {
            ServerOutcome::Reference | ServerOutcome::Consistent => return None,
            ServerOutcome::Disagreement { disagreement } => format!(
                "{} and {} disagree on {}: {}",
                master,
                server,
                disagreement.subject(),
                disagreement
            ),
            ServerOutcome::FetchFailed { error } => format!(
                "cannot fetch permissions of {} {} of {}: {}",
                role, server, shard, error
            ),
            ServerOutcome::TimedOut => format!(
                "timed out fetching permissions of {} {} of {}",
                role, server, shard
            ),
            ServerOutcome::ReferenceUnavailable => format!(
                "{} of {} not compared: permissions of master {} are unavailable",
                server, shard, master
            ),
            ServerOutcome::ComparisonFailed { error } => format!(
                "cannot compare {} against {}: {}",
                server, master, error
            ),
        };
        Some(text)
    }
}

/// Outcome of validating one keyspace (or one shard of it).
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub run_id: Uuid,
    pub keyspace: String,
    pub diff_mode: DiffMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub shards: Vec<ShardReport>,
}

impl ValidationReport {
    pub fn new(keyspace: impl Into<String>, diff_mode: DiffMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            keyspace: keyspace.into(),
            diff_mode,
            started_at: Utc::now(),
            finished_at: None,
            shards: Vec::new(),
        }
    }

    /// True when every server of every shard was fetched and agrees with its master.
    pub fn is_consistent(&self) -> bool {
        self.shards.iter().all(ShardReport::is_consistent)
    }

    pub fn shard(&self, shard: &str) -> Option<&ShardReport> {
        self.shards.iter().find(|s| s.shard == shard)
    }

    pub fn disagreements(&self) -> impl Iterator<Item = (&ShardReport, &ServerVerdict)> {
        self.shards.iter().flat_map(|shard| {
            shard.servers.iter().filter_map(move |verdict| {
                matches!(verdict.outcome, ServerOutcome::Disagreement { .. })
                    .then_some((shard, verdict))
            })
        })
    }

    /// One line per problem, ordered by shard, role, then server.
    pub fn details(&self) -> Vec<String> {
        self.shards
            .iter()
            .flat_map(|shard| shard.details(&self.keyspace))
            .collect()
    }

    /// Converts the report into the aggregate verdict.
    pub fn into_result(self) -> Result<()> {
        if self.is_consistent() {
            return Ok(());
        }
        let details = self.details();
        Err(PermError::Inconsistent {
            keyspace: self.keyspace,
            details,
        })
    }

    pub(crate) fn record(&mut self, shard: &str, verdict: ServerVerdict) {
        if let Some(report) = self.shards.iter_mut().find(|s| s.shard == shard) {
            report.servers.push(verdict);
        }
    }

    /// Sorts shards and servers so the report does not depend on completion order.
    pub(crate) fn finish(&mut self) {
        self.shards.sort_by(|a, b| a.shard.cmp(&b.shard));
        for shard in &mut self.shards {
            shard
                .servers
                .sort_by(|a, b| (a.role, &a.server).cmp(&(b.role, &b.server)));
        }
        self.finished_at = Some(Utc::now());
    }
}
