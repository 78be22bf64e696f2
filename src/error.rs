use std::fmt;
use thiserror::Error;

/// Catalog operation that was running when an introspection call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrospectionOp {
    ListTables,
    DescribeTable,
    ForeignKeys,
}

impl fmt::Display for IntrospectionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntrospectionOp::ListTables => write!(f, "list tables"),
            IntrospectionOp::DescribeTable => write!(f, "describe table"),
            IntrospectionOp::ForeignKeys => write!(f, "look up foreign keys"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RelgraphError {
    #[error("Data API error: {0}")]
    DataApi(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Failed to {operation} for '{table}': {source}")]
    Introspection {
        operation: IntrospectionOp,
        table: String,
        #[source]
        source: Box<RelgraphError>,
    },

    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema generation error: {0}")]
    SchemaGeneration(String),

    #[error("Failed to write template '{path}': {source}")]
    TemplateWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RelgraphError {
    /// Wrap a catalog failure with the operation and the table it concerned
    pub fn introspection(
        operation: IntrospectionOp,
        table: impl Into<String>,
        source: RelgraphError,
    ) -> Self {
        RelgraphError::Introspection {
            operation,
            table: table.into(),
            source: Box::new(source),
        }
    }
}

impl From<toml::de::Error> for RelgraphError {
    fn from(err: toml::de::Error) -> Self {
        RelgraphError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for RelgraphError {
    fn from(err: toml::ser::Error) -> Self {
        RelgraphError::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl From<serde_json::Error> for RelgraphError {
    fn from(err: serde_json::Error) -> Self {
        RelgraphError::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<::config::ConfigError> for RelgraphError {
    fn from(err: ::config::ConfigError) -> Self {
        RelgraphError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelgraphError>;
