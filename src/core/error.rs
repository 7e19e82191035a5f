use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermError {
    #[error("Keyspace '{0}' not found")]
    KeyspaceNotFound(String),

    #[error("Shard '{1}' not found in keyspace '{0}'")]
    ShardNotFound(String, String),

    #[error("Shard {keyspace}/{shard} has no master")]
    MasterNotSet { keyspace: String, shard: String },

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server '{0}' is unreachable")]
    ServerUnreachable(String),

    #[error("Query '{query}' failed on {server}: {reason}")]
    QueryFailed {
        server: String,
        query: String,
        reason: String,
    },

    #[error("Malformed result for '{query}' from {server}: {reason}")]
    MalformedResult {
        server: String,
        query: String,
        reason: String,
    },

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Type mismatch in {table} field {field}: reference is {reference}, candidate is {candidate}")]
    KindMismatch {
        table: String,
        field: String,
        reference: String,
        candidate: String,
    },

    #[error("Keyspace {keyspace} has permission inconsistencies:\n{}", details.join("\n"))]
    Inconsistent {
        keyspace: String,
        details: Vec<String>,
    },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PermError {
    /// Configuration errors abort a validation run; everything else is localized
    /// to one server and collected into the report.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::KeyspaceNotFound(_)
                | Self::ShardNotFound(..)
                | Self::MasterNotSet { .. }
                | Self::InvalidTopology(_)
                | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PermError>;

impl From<std::io::Error> for PermError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PermError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inconsistent_lists_every_detail_on_its_own_line() {
        let err = PermError::Inconsistent {
            keyspace: "ks".into(),
            details: vec!["first".into(), "second".into()],
        };
        let text = err.to_string();
        assert!(text.starts_with("Keyspace ks has permission inconsistencies:"));
        assert!(text.contains("\nfirst\nsecond"));
    }

    #[test]
    fn only_topology_problems_are_configuration_errors() {
        assert!(PermError::KeyspaceNotFound("ks".into()).is_configuration());
        assert!(
            PermError::MasterNotSet {
                keyspace: "ks".into(),
                shard: "0".into()
            }
            .is_configuration()
        );
        assert!(!PermError::ServerUnreachable("cell1-100".into()).is_configuration());
        assert!(!PermError::Timeout("cell1-100".into()).is_configuration());
    }
}
