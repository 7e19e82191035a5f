//! Keyspace-wide permission validation.
//!
//! Every shard's master snapshot is the reference its replicas are compared
//! against. One task runs per (shard, server) pair; verdicts are funneled
//! through a bounded channel into a single report.

pub mod config;
pub mod report;

pub use config::ValidatorConfig;
pub use report::{ServerOutcome, ServerRole, ServerVerdict, ShardReport, ValidationReport};

use crate::client::DatabaseClient;
use crate::core::{PermError, Result};
use crate::diff::{DiffMode, compare_snapshots};
use crate::fetch::SnapshotFetcher;
use crate::grants::PermissionSnapshot;
use crate::topology::{ServerId, ShardTopology, TopologyServer};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, Level, event, info_span};

type SharedReference = Shared<BoxFuture<'static, Result<Arc<PermissionSnapshot>>>>;

/// A shard whose master is known, ready to be fetched.
struct ShardPlan {
    shard: String,
    master: ServerId,
    replicas: Vec<ServerId>,
}

/// Checks that every server's grant tables match its shard master's.
pub struct PermissionValidator {
    topology: Arc<dyn TopologyServer>,
    fetcher: SnapshotFetcher,
    config: ValidatorConfig,
}

impl PermissionValidator {
    pub fn new(
        topology: Arc<dyn TopologyServer>,
        client: Arc<dyn DatabaseClient>,
        config: ValidatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let fetcher = SnapshotFetcher::new(client, config.grants_database.trim());
        Ok(Self {
            topology,
            fetcher,
            config,
        })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Fetches the permissions of a single server.
    ///
    /// ```no_run
    /// # use permcheck::{PermissionValidator, ServerId};
    /// # fn validator() -> PermissionValidator { unimplemented!() }
    /// # tokio_test::block_on(async {
    /// let snapshot = validator().get_permissions(&ServerId::from("cell1-100")).await.unwrap();
    /// println!("{}", snapshot.render());
    /// # });
    /// ```
    pub async fn get_permissions(&self, server: &ServerId) -> Result<PermissionSnapshot> {
        with_deadline(self.deadline(), server, self.fetcher.fetch(server)).await
    }

    /// Validates every shard of `keyspace`.
    ///
    /// Returns `Ok(())` only if every server was fetched and agrees with its
    /// master; otherwise `PermError::Inconsistent` listing every problem, or a
    /// configuration error if the topology is unusable.
    pub async fn validate_keyspace(&self, keyspace: &str) -> Result<()> {
        self.keyspace_report(keyspace).await?.into_result()
    }

    /// Validates one shard of `keyspace`.
    pub async fn validate_shard(&self, keyspace: &str, shard: &str) -> Result<()> {
        self.shard_report(keyspace, shard).await?.into_result()
    }

    /// Runs a keyspace validation and returns the full report.
    pub async fn keyspace_report(&self, keyspace: &str) -> Result<ValidationReport> {
        let shards = self.topology.get_shards_for_keyspace(keyspace).await?;
        self.run(keyspace, shards).await
    }

    pub async fn shard_report(&self, keyspace: &str, shard: &str) -> Result<ValidationReport> {
        let shards = self.topology.get_shards_for_keyspace(keyspace).await?;
        let selected: Vec<ShardTopology> = shards.into_iter().filter(|s| s.name == shard).collect();
        if selected.is_empty() {
            return Err(PermError::ShardNotFound(
                keyspace.to_string(),
                shard.to_string(),
            ));
        }
        self.run(keyspace, selected).await
    }

    fn deadline(&self) -> Option<Instant> {
        self.config.deadline.map(|d| Instant::now() + d)
    }

    async fn run(&self, keyspace: &str, shards: Vec<ShardTopology>) -> Result<ValidationReport> {
        let plans = plan(keyspace, shards)?;
        let mut report = ValidationReport::new(keyspace, self.config.diff_mode);
        let span = info_span!(
            "permissions.validate",
            keyspace = %keyspace,
            run_id = %report.run_id
        );

        async {
            info!(
                "Validating permissions of {} shard(s) in keyspace {}",
                plans.len(),
                keyspace
            );
            self.fan_out(plans, &mut report).await;
            report.finish();
            if report.is_consistent() {
                info!("Keyspace {} permissions are consistent", keyspace);
            } else {
                event!(
                    Level::WARN,
                    problems = report.details().len(),
                    "keyspace permissions are inconsistent"
                );
            }
        }
        .instrument(span)
        .await;

        Ok(report)
    }

    async fn fan_out(&self, plans: Vec<ShardPlan>, report: &mut ValidationReport) {
        let deadline = self.deadline();
        let mode = self.config.diff_mode;
        let (tx, mut rx) = mpsc::channel::<(String, ServerVerdict)>(
            self.config.result_channel_capacity,
        );
        let mut tasks = JoinSet::new();
        let mut pending: HashSet<(String, ServerId, ServerRole)> = HashSet::new();

        for plan in plans {
            report
                .shards
                .push(ShardReport::new(plan.shard.clone(), plan.master.clone()));

            let reference = {
                let fetcher = self.fetcher.clone();
                let master = plan.master.clone();
                async move {
                    with_deadline(deadline, &master, fetcher.fetch(&master))
                        .await
                        .map(Arc::new)
                }
                .boxed()
                .shared()
            };

            pending.insert((plan.shard.clone(), plan.master.clone(), ServerRole::Master));
            tasks.spawn(master_task(
                plan.shard.clone(),
                plan.master.clone(),
                reference.clone(),
                tx.clone(),
            ));

            for replica in plan.replicas {
                pending.insert((plan.shard.clone(), replica.clone(), ServerRole::Replica));
                tasks.spawn(replica_task(
                    plan.shard.clone(),
                    replica,
                    self.fetcher.clone(),
                    reference.clone(),
                    mode,
                    deadline,
                    tx.clone(),
                ));
            }
        }
        drop(tx);

        while let Some((shard, verdict)) = rx.recv().await {
            pending.remove(&(shard.clone(), verdict.server.clone(), verdict.role));
            report.record(&shard, verdict);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!("Permission check task failed: {}", err);
            }
        }

        // A task that died before reporting still counts against the run.
        for (shard, server, role) in pending {
            report.record(
                &shard,
                ServerVerdict::new(
                    server,
                    role,
                    ServerOutcome::FetchFailed {
                        error: "check aborted before completion".to_string(),
                    },
                ),
            );
        }
    }
}

/// Rejects shards without a master before any server is contacted.
fn plan(keyspace: &str, shards: Vec<ShardTopology>) -> Result<Vec<ShardPlan>> {
    shards
        .into_iter()
        .map(|shard| {
            let Some(master) = shard.master else {
                return Err(PermError::MasterNotSet {
                    keyspace: keyspace.to_string(),
                    shard: shard.name,
                });
            };
            let replicas = shard
                .replicas
                .into_iter()
                .filter(|replica| replica != &master)
                .collect();
            Ok(ShardPlan {
                shard: shard.name,
                master,
                replicas,
            })
        })
        .collect()
}

async fn with_deadline<T, F>(deadline: Option<Instant>, server: &ServerId, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future)
            .await
            .unwrap_or_else(|_| Err(PermError::Timeout(server.to_string()))),
        None => future.await,
    }
}

fn fetch_failure(err: PermError) -> ServerOutcome {
    match err {
        PermError::Timeout(_) => ServerOutcome::TimedOut,
        other => ServerOutcome::FetchFailed {
            error: other.to_string(),
        },
    }
}

async fn master_task(
    shard: String,
    master: ServerId,
    reference: SharedReference,
    tx: mpsc::Sender<(String, ServerVerdict)>,
) {
    let outcome = match reference.await {
        Ok(_) => ServerOutcome::Reference,
        Err(err) => {
            warn!("Cannot fetch permissions of master {}: {}", master, err);
            fetch_failure(err)
        }
    };
    let verdict = ServerVerdict::new(master, ServerRole::Master, outcome);
    let _ = tx.send((shard, verdict)).await;
}

async fn replica_task(
    shard: String,
    replica: ServerId,
    fetcher: SnapshotFetcher,
    reference: SharedReference,
    mode: DiffMode,
    deadline: Option<Instant>,
    tx: mpsc::Sender<(String, ServerVerdict)>,
) {
    let outcome = match with_deadline(deadline, &replica, fetcher.fetch(&replica)).await {
        Err(err) => {
            warn!("Cannot fetch permissions of replica {}: {}", replica, err);
            fetch_failure(err)
        }
        Ok(candidate) => match reference.await {
            Err(_) => ServerOutcome::ReferenceUnavailable,
            Ok(reference) => match compare_snapshots(&reference, &candidate, mode) {
                Ok(None) => {
                    debug!("{} agrees with {}", replica, reference.server());
                    ServerOutcome::Consistent
                }
                Ok(Some(disagreement)) => {
                    warn!(
                        "{} and {} disagree: {}",
                        reference.server(),
                        replica,
                        disagreement
                    );
                    ServerOutcome::Disagreement { disagreement }
                }
                Err(err) => ServerOutcome::ComparisonFailed {
                    error: err.to_string(),
                },
            },
        },
    };
    let verdict = ServerVerdict::new(replica, ServerRole::Replica, outcome);
    let _ = tx.send((shard, verdict)).await;
}
