use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use permcheck::{
    ClusterManifest, DiffMode, PermError, PermissionValidator, ServerId, ValidationReport,
    ValidatorConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "permcheck")]
#[command(about = "Checks that grant tables agree across every server of a keyspace")]
struct Cli {
    /// JSON file describing keyspaces, shards, and server grant tables
    #[arg(long, global = true, default_value = "cluster.json")]
    manifest: PathBuf,

    /// Overall deadline in seconds (0 waits indefinitely)
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Pair rows by host/user/db instead of by position
    #[arg(long, global = true)]
    keyed: bool,

    /// Schema holding the grant tables
    #[arg(long, global = true, default_value = "mysql")]
    grants_db: String,

    /// Print the report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare every server of every shard against its shard master
    ValidateKeyspace { keyspace: String },
    /// Compare every server of one shard (`keyspace/shard`) against its master
    ValidateShard { shard: String },
    /// Print the grant tables of one server
    GetPermissions { server: String },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn config_from(cli: &Cli) -> ValidatorConfig {
    let mut config = ValidatorConfig::new()
        .grants_database(&cli.grants_db)
        .diff_mode(if cli.keyed {
            DiffMode::Keyed
        } else {
            DiffMode::Positional
        });
    config = match cli.timeout_secs {
        0 => config.no_deadline(),
        secs => config.deadline(Duration::from_secs(secs)),
    };
    config
}

fn split_shard_path(path: &str) -> Result<(&str, &str)> {
    match path.split_once('/') {
        Some((keyspace, shard)) if !keyspace.is_empty() && !shard.is_empty() => {
            Ok((keyspace, shard))
        }
        _ => bail!("expected <keyspace>/<shard>, got '{}'", path),
    }
}

fn emit(report: ValidationReport, json: bool) -> Result<ExitCode> {
    if json {
        let text = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        println!("{}", text);
    }
    match report.into_result() {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(PermError::Inconsistent { keyspace, details }) => {
            eprintln!("Keyspace {} has permission inconsistencies:", keyspace);
            for detail in details {
                eprintln!("  {}", detail);
            }
            Ok(ExitCode::FAILURE)
        }
        Err(other) => Err(anyhow!(other)),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = config_from(&cli);
    let manifest = ClusterManifest::from_path(&cli.manifest)
        .with_context(|| format!("Failed to load manifest '{}'", cli.manifest.display()))?;
    let topology = manifest.build_topology().await?;
    let client = manifest.build_client(config.grants_database.trim()).await?;
    let validator = PermissionValidator::new(Arc::new(topology), Arc::new(client), config)?;

    match &cli.command {
        Command::ValidateKeyspace { keyspace } => {
            let report = validator.keyspace_report(keyspace).await?;
            emit(report, cli.json)
        }
        Command::ValidateShard { shard } => {
            let (keyspace, shard) = split_shard_path(shard)?;
            let report = validator.shard_report(keyspace, shard).await?;
            emit(report, cli.json)
        }
        Command::GetPermissions { server } => {
            let snapshot = validator
                .get_permissions(&ServerId::from(server.as_str()))
                .await
                .with_context(|| format!("Failed to fetch permissions of {}", server))?;
            print!("{}", snapshot.render());
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("permcheck: {:#}", err);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_paths_need_both_parts() {
        assert_eq!(split_shard_path("ks/-80").unwrap(), ("ks", "-80"));
        assert!(split_shard_path("ks").is_err());
        assert!(split_shard_path("/0").is_err());
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "permcheck",
            "--keyed",
            "--timeout-secs",
            "0",
            "validate-keyspace",
            "ks",
        ]);
        let config = config_from(&cli);
        assert_eq!(config.diff_mode, DiffMode::Keyed);
        assert_eq!(config.deadline, None);
    }
}
