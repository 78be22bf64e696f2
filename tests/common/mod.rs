//! In-memory catalog shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use relgraph::error::{RelgraphError, Result};
use relgraph::reader::{
    ColumnDescription, ConnectionInfo, DatabaseReader, Engine, RelationshipEdge, RelationshipEdges,
    TableName,
};
use relgraph::schema::TemplateContext;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct InMemoryCatalog {
    engine: Engine,
    tables: IndexMap<TableName, Vec<ColumnDescription>>,
    edges: IndexMap<TableName, RelationshipEdges>,
    failing: Option<TableName>,
    foreign_key_calls: Mutex<HashMap<TableName, usize>>,
}

impl InMemoryCatalog {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            tables: IndexMap::new(),
            edges: IndexMap::new(),
            failing: None,
            foreign_key_calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn table(mut self, name: &str, columns: Vec<ColumnDescription>) -> Self {
        self.tables.insert(TableName::new(name), columns);
        self
    }

    /// Declare `table.column -> target.target_column`, recording both directions
    pub fn foreign_key(mut self, table: &str, column: &str, target: &str, target_column: &str) -> Self {
        self.edges
            .entry(TableName::new(table))
            .or_default()
            .outgoing
            .insert(
                column.to_string(),
                RelationshipEdge::new(column, TableName::new(target), target_column),
            );
        self.edges
            .entry(TableName::new(target))
            .or_default()
            .incoming
            .insert(
                TableName::new(table),
                RelationshipEdge::new(target_column, TableName::new(table), column),
            );
        self
    }

    /// Make `describe_table` fail for `table`
    pub fn failing_describe(mut self, table: &str) -> Self {
        self.failing = Some(TableName::new(table));
        self
    }

    pub fn foreign_key_calls(&self, table: &str) -> usize {
        self.foreign_key_calls
            .lock()
            .unwrap()
            .get(&TableName::new(table))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DatabaseReader for InMemoryCatalog {
    fn engine(&self) -> Engine {
        self.engine
    }

    fn database(&self) -> &str {
        "pets"
    }

    async fn list_tables(&self) -> Result<Vec<TableName>> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn describe_table(&self, table: &TableName) -> Result<Vec<ColumnDescription>> {
        if self.failing.as_ref() == Some(table) {
            return Err(RelgraphError::DataApi("connection reset".to_string()));
        }
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| RelgraphError::Query(format!("Table {} does not exist", table)))
    }

    async fn foreign_key_references(&self, table: &TableName) -> Result<RelationshipEdges> {
        *self
            .foreign_key_calls
            .lock()
            .unwrap()
            .entry(table.clone())
            .or_insert(0) += 1;
        Ok(self.edges.get(table).cloned().unwrap_or_default())
    }

    fn hydrate_context(&self, context: TemplateContext) -> TemplateContext {
        context.with_connection(
            ConnectionInfo {
                region: "us-east-1".to_string(),
                resource_arn: "arn:aws:rds:us-east-1:1:cluster:pets".to_string(),
                secret_arn: "arn:aws:secretsmanager:us-east-1:1:secret:pets".to_string(),
                database: "pets".to_string(),
            },
            "public".to_string(),
        )
    }
}

pub fn dog_columns() -> Vec<ColumnDescription> {
    vec![
        ColumnDescription::new("id", "integer").primary_key(1),
        ColumnDescription::new("name", "character varying"),
    ]
}

pub fn owner_columns() -> Vec<ColumnDescription> {
    vec![
        ColumnDescription::new("id", "integer").primary_key(1),
        ColumnDescription::new("name", "character varying"),
        ColumnDescription::new("dogId", "integer"),
    ]
}

/// Dog and Owner, with `Owner.dogId -> Dog.id`
pub fn parent_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(Engine::Postgres)
        .table("Dog", dog_columns())
        .table("Owner", owner_columns())
        .foreign_key("Owner", "dogId", "Dog", "id")
}

/// Dog and Owner joined through `DogOwner(dogId, ownerId)`
pub fn junction_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(Engine::Postgres)
        .table("Dog", dog_columns())
        .table(
            "Owner",
            vec![
                ColumnDescription::new("id", "integer").primary_key(1),
                ColumnDescription::new("name", "character varying"),
            ],
        )
        .table(
            "DogOwner",
            vec![
                ColumnDescription::new("dogId", "integer").primary_key(1),
                ColumnDescription::new("ownerId", "integer").primary_key(2),
            ],
        )
        .foreign_key("DogOwner", "dogId", "Dog", "id")
        .foreign_key("DogOwner", "ownerId", "Owner", "id")
}
