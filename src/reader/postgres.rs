use crate::error::Result;
use crate::reader::catalog::{self, CatalogQueries};
use crate::reader::{
    ColumnDescription, ConnectionInfo, DataApiClient, DatabaseReader, Engine, RelationshipEdges,
    TableName,
};
use crate::schema::TemplateContext;
use async_trait::async_trait;
use std::sync::Arc;

const QUERIES: CatalogQueries = CatalogQueries {
    current_schema: "SELECT CURRENT_SCHEMA()",
    list_select: "SELECT table_schema, table_name, CURRENT_SCHEMA() FROM information_schema.tables",
    list_condition: " AND table_type = 'BASE TABLE'",
    schema_column: "table_schema",
    table_column: "table_name",
    system_schemas: &["pg_catalog", "information_schema", "pg_toast"],
    describe_table: "SELECT c.column_name, c.data_type, \
        CASE WHEN c.data_type = 'ARRAY' THEN \
            (SELECT format_type(t.typelem, NULL) FROM pg_catalog.pg_type t WHERE t.typname = c.udt_name) \
        END, \
        c.is_nullable, pk.ordinal_position, c.column_default \
        FROM information_schema.columns c \
        LEFT JOIN ( \
            SELECT kcu.column_name, kcu.ordinal_position \
            FROM information_schema.table_constraints tc \
            JOIN information_schema.key_column_usage kcu \
              ON tc.constraint_name = kcu.constraint_name \
             AND tc.table_schema = kcu.table_schema \
             AND tc.table_name = kcu.table_name \
            WHERE tc.constraint_type = 'PRIMARY KEY' \
              AND tc.table_schema = :schema AND tc.table_name = :table \
        ) pk ON pk.column_name = c.column_name \
        WHERE c.table_schema = :schema AND c.table_name = :table \
        ORDER BY c.ordinal_position",
    outgoing_foreign_keys: "SELECT kcu.column_name, ccu.column_name, ccu.table_schema, ccu.table_name \
        FROM information_schema.table_constraints tc \
        JOIN information_schema.key_column_usage kcu \
          ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
        JOIN information_schema.constraint_column_usage ccu \
          ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.table_schema \
        WHERE tc.constraint_type = 'FOREIGN KEY' \
          AND tc.table_schema = :schema AND tc.table_name = :table \
        ORDER BY kcu.ordinal_position",
    incoming_foreign_keys: "SELECT tc.table_schema, tc.table_name, ccu.column_name, kcu.column_name \
        FROM information_schema.table_constraints tc \
        JOIN information_schema.key_column_usage kcu \
          ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
        JOIN information_schema.constraint_column_usage ccu \
          ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.table_schema \
        WHERE tc.constraint_type = 'FOREIGN KEY' \
          AND ccu.table_schema = :schema AND ccu.table_name = :table \
        ORDER BY tc.table_schema, tc.table_name",
};

/// Catalog reader for the Postgres family (Aurora PostgreSQL and compatibles)
pub struct PostgresReader {
    client: Arc<dyn DataApiClient>,
    connection: ConnectionInfo,
    schemas: Vec<String>,
}

impl PostgresReader {
    pub fn new(client: Arc<dyn DataApiClient>, connection: ConnectionInfo, schemas: Vec<String>) -> Self {
        Self {
            client,
            connection,
            schemas,
        }
    }
}

#[async_trait]
impl DatabaseReader for PostgresReader {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn database(&self) -> &str {
        &self.connection.database
    }

    async fn list_tables(&self) -> Result<Vec<TableName>> {
        catalog::list_tables(self.client.as_ref(), &QUERIES, &self.schemas).await
    }

    async fn describe_table(&self, table: &TableName) -> Result<Vec<ColumnDescription>> {
        catalog::describe_table(self.client.as_ref(), &QUERIES, table).await
    }

    async fn foreign_key_references(&self, table: &TableName) -> Result<RelationshipEdges> {
        catalog::foreign_key_references(self.client.as_ref(), &QUERIES, table).await
    }

    fn hydrate_context(&self, context: TemplateContext) -> TemplateContext {
        context.with_connection(self.connection.clone(), String::new())
    }
}
