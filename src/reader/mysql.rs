use crate::error::Result;
use crate::reader::catalog::{self, CatalogQueries};
use crate::reader::{
    ColumnDescription, ConnectionInfo, DataApiClient, DatabaseReader, Engine, RelationshipEdges,
    TableName,
};
use crate::schema::TemplateContext;
use async_trait::async_trait;
use std::sync::Arc;

// MySQL has no array columns, so the element type is always NULL.
const QUERIES: CatalogQueries = CatalogQueries {
    current_schema: "SELECT DATABASE()",
    list_select: "SELECT TABLE_SCHEMA, TABLE_NAME, DATABASE() FROM information_schema.TABLES",
    list_condition: " AND TABLE_TYPE = 'BASE TABLE'",
    schema_column: "TABLE_SCHEMA",
    table_column: "TABLE_NAME",
    system_schemas: &["mysql", "information_schema", "performance_schema", "sys"],
    describe_table: "SELECT c.COLUMN_NAME, c.DATA_TYPE, NULL, c.IS_NULLABLE, \
        k.ORDINAL_POSITION, c.COLUMN_DEFAULT \
        FROM information_schema.COLUMNS c \
        LEFT JOIN information_schema.KEY_COLUMN_USAGE k \
          ON k.TABLE_SCHEMA = c.TABLE_SCHEMA \
         AND k.TABLE_NAME = c.TABLE_NAME \
         AND k.COLUMN_NAME = c.COLUMN_NAME \
         AND k.CONSTRAINT_NAME = 'PRIMARY' \
        WHERE c.TABLE_SCHEMA = :schema AND c.TABLE_NAME = :table \
        ORDER BY c.ORDINAL_POSITION",
    outgoing_foreign_keys: "SELECT COLUMN_NAME, REFERENCED_COLUMN_NAME, \
        REFERENCED_TABLE_SCHEMA, REFERENCED_TABLE_NAME \
        FROM information_schema.KEY_COLUMN_USAGE \
        WHERE REFERENCED_TABLE_NAME IS NOT NULL \
          AND TABLE_SCHEMA = :schema AND TABLE_NAME = :table \
        ORDER BY ORDINAL_POSITION",
    incoming_foreign_keys: "SELECT TABLE_SCHEMA, TABLE_NAME, REFERENCED_COLUMN_NAME, COLUMN_NAME \
        FROM information_schema.KEY_COLUMN_USAGE \
        WHERE REFERENCED_TABLE_SCHEMA = :schema AND REFERENCED_TABLE_NAME = :table \
        ORDER BY TABLE_SCHEMA, TABLE_NAME",
};

/// Catalog reader for the MySQL family (Aurora MySQL and compatibles)
pub struct MySqlReader {
    client: Arc<dyn DataApiClient>,
    connection: ConnectionInfo,
    schemas: Vec<String>,
}

impl MySqlReader {
    pub fn new(client: Arc<dyn DataApiClient>, connection: ConnectionInfo, schemas: Vec<String>) -> Self {
        Self {
            client,
            connection,
            schemas,
        }
    }
}

#[async_trait]
impl DatabaseReader for MySqlReader {
    fn engine(&self) -> Engine {
        Engine::MySql
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
        // A MySQL schema is the database itself
        let database = self.connection.database.clone();
        context.with_connection(self.connection.clone(), database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::catalog::testing::{null, s, ScriptedClient};
    use crate::reader::types::Field;
    use tokio_test::block_on;

    fn reader(client: ScriptedClient) -> (MySqlReader, Arc<ScriptedClient>) {
        let client = Arc::new(client);
        let connection = ConnectionInfo {
            region: "eu-west-1".to_string(),
            resource_arn: "arn:cluster".to_string(),
            secret_arn: "arn:secret".to_string(),
            database: "kennel".to_string(),
        };
        (MySqlReader::new(client.clone(), connection, vec![]), client)
    }

    #[test]
    fn test_list_tables_excludes_system_schemas() {
        let (reader, client) = reader(
            ScriptedClient::new().respond(vec![vec![s("kennel"), s("dogs"), s("kennel")]]),
        );

        let tables = block_on(reader.list_tables()).unwrap();
        assert_eq!(tables, vec![TableName::new("dogs")]);

        let sql = &client.statements()[0].0;
        assert!(sql.contains("'mysql', 'information_schema', 'performance_schema', 'sys'"));
        assert!(sql.ends_with("ORDER BY TABLE_SCHEMA, TABLE_NAME"));
    }

    #[test]
    fn test_describe_composite_key() {
        let (reader, client) = reader(
            ScriptedClient::new()
                .respond(vec![vec![s("kennel")]])
                .respond(vec![
                    vec![s("dog_id"), s("int"), null(), s("NO"), Field::LongValue(1), null()],
                    vec![s("owner_id"), s("int"), null(), s("NO"), Field::LongValue(2), null()],
                    vec![s("since"), s("date"), null(), s("YES"), null(), s("CURRENT_DATE")],
                ]),
        );

        let columns = block_on(reader.describe_table(&TableName::new("dog_owners"))).unwrap();
        let keys: Vec<_> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| (c.name.as_str(), c.key_ordinal))
            .collect();
        assert_eq!(keys, vec![("dog_id", Some(1)), ("owner_id", Some(2))]);
        assert_eq!(columns[2].default.as_deref(), Some("CURRENT_DATE"));

        assert_eq!(client.statements()[0].0, "SELECT DATABASE()");
    }

    #[test]
    fn test_foreign_keys_outside_default_schema_stay_qualified() {
        let (reader, _) = reader(
            ScriptedClient::new()
                .respond(vec![vec![s("kennel")]])
                .respond(vec![vec![s("vet_id"), s("id"), s("clinic"), s("vets")]])
                .respond(vec![]),
        );

        let edges = block_on(reader.foreign_key_references(&TableName::new("dogs"))).unwrap();
        assert_eq!(
            edges.outgoing["vet_id"].foreign_table,
            TableName::qualified("clinic", "vets")
        );
        assert!(edges.incoming.is_empty());
    }

    #[test]
    fn test_hydrate_context_uses_database_as_schema() {
        let (reader, _) = reader(ScriptedClient::new());
        let context = reader.hydrate_context(TemplateContext::default());
        assert_eq!(context.database_schema, "kennel");
        assert_eq!(context.connection.unwrap().region, "eu-west-1");
    }
}
