use crate::core::{PermError, Result};
use crate::diff::DiffMode;
use std::time::Duration;

/// Validation run configuration
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Overall deadline of one validation run; `None` waits indefinitely
    pub deadline: Option<Duration>,

    /// How rows are paired when comparing tables
    pub diff_mode: DiffMode,

    /// Capacity of the channel verdicts are funneled through
    pub result_channel_capacity: usize,

    /// Schema holding the grant tables
    pub grants_database: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            deadline: Some(Duration::from_secs(30)),
            diff_mode: DiffMode::Positional,
            result_channel_capacity: 64,
            grants_database: "mysql".to_string(),
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overall run deadline
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Wait for every server regardless of how long it takes
    pub fn no_deadline(mut self) -> Self {
        self.deadline = None;
        self
    }

    /// Set the row pairing mode
    pub fn diff_mode(mut self, mode: DiffMode) -> Self {
        self.diff_mode = mode;
        self
    }

    /// Set the verdict channel capacity
    pub fn result_channel_capacity(mut self, capacity: usize) -> Self {
        self.result_channel_capacity = capacity;
        self
    }

    /// Set the schema holding the grant tables
    pub fn grants_database(mut self, database: &str) -> Self {
        self.grants_database = database.to_string();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(PermError::Config("deadline must be greater than zero".into()));
        }
        if self.result_channel_capacity == 0 {
            return Err(PermError::Config(
                "result_channel_capacity must be >= 1".into(),
            ));
        }
        let database = self.grants_database.trim();
        if database.is_empty() {
            return Err(PermError::Config("grants_database must not be empty".into()));
        }
        if !database
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(PermError::Config(format!(
                "grants_database '{}' is not a plain identifier",
                database
            )));
        }
        Ok(())
    }
}
