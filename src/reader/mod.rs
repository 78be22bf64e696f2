/// Database catalog readers
///
/// Every supported engine exposes the same capability set (list tables,
/// describe a table, look up foreign keys, hydrate the template context)
/// behind the `DatabaseReader` trait. `EngineReader` is the closed set of
/// engine implementations, selected once from the configured `Engine`.

mod catalog;
mod client;
mod mysql;
mod postgres;
mod types;

pub use client::{DataApiClient, HttpDataApiClient};
pub use mysql::MySqlReader;
pub use postgres::PostgresReader;
pub use types::{Field, Record, SqlParameter};

use crate::error::{RelgraphError, Result};
use crate::resolver::sql::Dialect;
use crate::schema::TemplateContext;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[serde(alias = "postgresql", alias = "aurora-postgresql")]
    Postgres,
    #[serde(alias = "aurora-mysql")]
    MySql,
}

impl Engine {
    pub fn dialect(self) -> Dialect {
        match self {
            Engine::Postgres => Dialect::Postgres,
            Engine::MySql => Dialect::MySql,
        }
    }
}

impl FromStr for Engine {
    type Err = RelgraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "aurora-postgresql" => Ok(Engine::Postgres),
            "mysql" | "aurora-mysql" => Ok(Engine::MySql),
            other => Err(RelgraphError::Config(format!(
                "Unsupported database engine '{}' (expected 'postgres' or 'mysql')",
                other
            ))),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Postgres => write!(f, "postgres"),
            Engine::MySql => write!(f, "mysql"),
        }
    }
}

/// A table as named in the generated artifacts.
///
/// The schema is omitted for tables living in the connection's default schema.
/// Generated queries therefore depend on that default schema staying the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Build a name from catalog output, dropping the schema when it is the default one
    pub fn from_catalog(schema: &str, name: &str, default_schema: &str) -> Self {
        if schema == default_schema {
            Self::new(name)
        } else {
            Self::qualified(schema, name)
        }
    }

    /// Parse `schema.table` or `table`
    pub fn parse(s: &str) -> Self {
        match s.split_once('.') {
            Some((schema, name)) => Self::qualified(schema, name),
            None => Self::new(s),
        }
    }

    /// Schema and table name, falling back to `default_schema` when unqualified
    pub fn resolve<'a>(&'a self, default_schema: &'a str) -> (&'a str, &'a str) {
        (self.schema.as_deref().unwrap_or(default_schema), &self.name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for TableName {
    fn from(s: &str) -> Self {
        TableName::parse(s)
    }
}

/// One column as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    /// Source type name, e.g. `integer` or `character varying`
    pub data_type: String,
    /// Element type for array columns
    pub array_type: Option<String>,
    pub nullable: bool,
    pub primary_key: bool,
    /// Position within the primary key, 1-based
    pub key_ordinal: Option<u32>,
    /// Default expression text, `None` when the column has no default
    pub default: Option<String>,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            array_type: None,
            nullable: true,
            primary_key: false,
            key_ordinal: None,
            default: None,
        }
    }

    pub fn primary_key(mut self, ordinal: u32) -> Self {
        self.primary_key = true;
        self.key_ordinal = Some(ordinal);
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn array_of(mut self, element: impl Into<String>) -> Self {
        self.array_type = Some(element.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// `(local column, foreign table, foreign column)`.
///
/// For an outgoing edge the local column holds the foreign key. For an
/// incoming edge the local column is the referenced column on this table and
/// the foreign column is the referencing column on the other table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub local_column: String,
    pub foreign_table: TableName,
    pub foreign_column: String,
}

impl RelationshipEdge {
    pub fn new(
        local_column: impl Into<String>,
        foreign_table: TableName,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            local_column: local_column.into(),
            foreign_table,
            foreign_column: foreign_column.into(),
        }
    }
}

/// Foreign-key edges of one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipEdges {
    /// Edges where this table holds the foreign key, keyed by local column
    pub outgoing: IndexMap<String, RelationshipEdge>,
    /// Edges where another table references this one, keyed by that table
    pub incoming: IndexMap<TableName, RelationshipEdge>,
}

impl RelationshipEdges {
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }
}

/// Connectivity metadata attached to the template context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub region: String,
    /// Cluster or instance identifier
    pub resource_arn: String,
    /// Credential-store reference
    pub secret_arn: String,
    pub database: String,
}

/// Catalog capabilities every engine provides
#[async_trait]
pub trait DatabaseReader: Send + Sync {
    fn engine(&self) -> Engine;

    /// Name of the database being introspected
    fn database(&self) -> &str;

    /// All user tables across the configured schemas, system schemas excluded
    async fn list_tables(&self) -> Result<Vec<TableName>>;

    /// Columns of `table` in ordinal order; fails with `Query` if the table does not exist
    async fn describe_table(&self, table: &TableName) -> Result<Vec<ColumnDescription>>;

    /// Outgoing and incoming foreign-key edges of `table`
    async fn foreign_key_references(&self, table: &TableName) -> Result<RelationshipEdges>;

    /// Attach connectivity metadata to the finished context
    fn hydrate_context(&self, context: TemplateContext) -> TemplateContext;
}

/// The closed set of engine readers
pub enum EngineReader {
    Postgres(PostgresReader),
    MySql(MySqlReader),
}

impl EngineReader {
    pub fn new(
        engine: Engine,
        client: Arc<dyn DataApiClient>,
        connection: ConnectionInfo,
        schemas: Vec<String>,
    ) -> Self {
        match engine {
            Engine::Postgres => EngineReader::Postgres(PostgresReader::new(client, connection, schemas)),
            Engine::MySql => EngineReader::MySql(MySqlReader::new(client, connection, schemas)),
        }
    }
}

#[async_trait]
impl DatabaseReader for EngineReader {
    fn engine(&self) -> Engine {
        match self {
            EngineReader::Postgres(r) => r.engine(),
            EngineReader::MySql(r) => r.engine(),
        }
    }

    fn database(&self) -> &str {
        match self {
            EngineReader::Postgres(r) => r.database(),
            EngineReader::MySql(r) => r.database(),
        }
    }

    async fn list_tables(&self) -> Result<Vec<TableName>> {
        match self {
            EngineReader::Postgres(r) => r.list_tables().await,
            EngineReader::MySql(r) => r.list_tables().await,
        }
    }

    async fn describe_table(&self, table: &TableName) -> Result<Vec<ColumnDescription>> {
        match self {
            EngineReader::Postgres(r) => r.describe_table(table).await,
            EngineReader::MySql(r) => r.describe_table(table).await,
        }
    }

    async fn foreign_key_references(&self, table: &TableName) -> Result<RelationshipEdges> {
        match self {
            EngineReader::Postgres(r) => r.foreign_key_references(table).await,
            EngineReader::MySql(r) => r.foreign_key_references(table).await,
        }
    }

    fn hydrate_context(&self, context: TemplateContext) -> TemplateContext {
        match self {
            EngineReader::Postgres(r) => r.hydrate_context(context),
            EngineReader::MySql(r) => r.hydrate_context(context),
        }
    }
}
