//! Shared catalog plumbing for the engine readers.
//!
//! Both engines issue their own SQL but shape every result set identically,
//! so decoding lives here once.

use crate::error::{RelgraphError, Result};
use crate::reader::client::DataApiClient;
use crate::reader::types::{Record, SqlParameter};
use crate::reader::{ColumnDescription, RelationshipEdge, RelationshipEdges, TableName};

/// Engine-specific catalog statements.
///
/// Result column order is fixed per statement:
/// - `list_select`: schema, table, current schema
/// - `describe_table`: name, data type, array element type, is_nullable (`YES`/`NO`),
///   primary-key ordinal (null when not a key column), default
/// - `outgoing_foreign_keys`: column, foreign column, foreign schema, foreign table
/// - `incoming_foreign_keys`: referencing schema, referencing table, referenced column, referencing column
pub(crate) struct CatalogQueries {
    pub current_schema: &'static str,
    pub list_select: &'static str,
    pub list_condition: &'static str,
    pub schema_column: &'static str,
    pub table_column: &'static str,
    pub system_schemas: &'static [&'static str],
    pub describe_table: &'static str,
    pub outgoing_foreign_keys: &'static str,
    pub incoming_foreign_keys: &'static str,
}

impl CatalogQueries {
    /// Table listing restricted to `schemas` (all non-system schemas when empty)
    pub fn list_tables_statement(&self, schemas: &[String]) -> (String, Vec<SqlParameter>) {
        let ignored = self
            .system_schemas
            .iter()
            .map(|s| format!("'{}'", s))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "{} WHERE {} NOT IN ({}){}",
            self.list_select, self.schema_column, ignored, self.list_condition
        );

        let parameters: Vec<SqlParameter> = schemas
            .iter()
            .enumerate()
            .map(|(i, schema)| SqlParameter::string(&format!("schema{}", i), schema.as_str()))
            .collect();

        if !parameters.is_empty() {
            let placeholders = parameters
                .iter()
                .map(|p| format!(":{}", p.name))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" AND {} IN ({})", self.schema_column, placeholders));
        }

        sql.push_str(&format!(" ORDER BY {}, {}", self.schema_column, self.table_column));
        (sql, parameters)
    }
}

pub(crate) async fn current_schema(client: &dyn DataApiClient, queries: &CatalogQueries) -> Result<String> {
    let records = client.execute_statement(queries.current_schema, &[]).await?;
    records
        .first()
        .and_then(|record| record.first())
        .and_then(|field| field.as_str())
        .map(str::to_string)
        .ok_or_else(|| RelgraphError::Query("Connection has no current schema".to_string()))
}

pub(crate) async fn list_tables(
    client: &dyn DataApiClient,
    queries: &CatalogQueries,
    schemas: &[String],
) -> Result<Vec<TableName>> {
    let (sql, parameters) = queries.list_tables_statement(schemas);
    let records = client.execute_statement(&sql, &parameters).await?;

    records
        .iter()
        .map(|record| {
            let schema = text(record, 0, "schema name")?;
            let name = text(record, 1, "table name")?;
            let default_schema = text(record, 2, "current schema")?;
            Ok(TableName::from_catalog(&schema, &name, &default_schema))
        })
        .collect()
}

pub(crate) async fn describe_table(
    client: &dyn DataApiClient,
    queries: &CatalogQueries,
    table: &TableName,
) -> Result<Vec<ColumnDescription>> {
    let default_schema = current_schema(client, queries).await?;
    let (schema, name) = table.resolve(&default_schema);
    let parameters = table_parameters(schema, name);

    let records = client.execute_statement(queries.describe_table, &parameters).await?;
    if records.is_empty() {
        return Err(RelgraphError::Query(format!(
            "Table {}.{} does not exist",
            schema, name
        )));
    }

    records.iter().map(decode_column).collect()
}

pub(crate) async fn foreign_key_references(
    client: &dyn DataApiClient,
    queries: &CatalogQueries,
    table: &TableName,
) -> Result<RelationshipEdges> {
    let default_schema = current_schema(client, queries).await?;
    let (schema, name) = table.resolve(&default_schema);
    let parameters = table_parameters(schema, name);

    let mut edges = RelationshipEdges::default();

    let records = client
        .execute_statement(queries.outgoing_foreign_keys, &parameters)
        .await?;
    for record in &records {
        let column = text(record, 0, "column name")?;
        let foreign_column = text(record, 1, "foreign column name")?;
        let foreign_schema = text(record, 2, "foreign table schema")?;
        let foreign_table = text(record, 3, "foreign table name")?;
        let edge = RelationshipEdge::new(
            column.clone(),
            TableName::from_catalog(&foreign_schema, &foreign_table, &default_schema),
            foreign_column,
        );
        edges.outgoing.insert(column, edge);
    }

    let records = client
        .execute_statement(queries.incoming_foreign_keys, &parameters)
        .await?;
    for record in &records {
        let referencing_schema = text(record, 0, "referencing table schema")?;
        let referencing_table = text(record, 1, "referencing table name")?;
        let referenced_column = text(record, 2, "referenced column name")?;
        let referencing_column = text(record, 3, "referencing column name")?;
        let foreign_table =
            TableName::from_catalog(&referencing_schema, &referencing_table, &default_schema);
        edges.incoming.insert(
            foreign_table.clone(),
            RelationshipEdge::new(referenced_column, foreign_table, referencing_column),
        );
    }

    Ok(edges)
}

fn table_parameters(schema: &str, name: &str) -> Vec<SqlParameter> {
    vec![
        SqlParameter::string("schema", schema),
        SqlParameter::string("table", name),
    ]
}

fn decode_column(record: &Record) -> Result<ColumnDescription> {
    let key_ordinal = record
        .get(4)
        .filter(|f| !f.is_null())
        .and_then(|f| f.as_i64())
        .map(|v| v as u32);

    Ok(ColumnDescription {
        name: text(record, 0, "column name")?,
        data_type: text(record, 1, "data type")?,
        array_type: optional_text(record, 2),
        nullable: text(record, 3, "nullability")?.eq_ignore_ascii_case("YES"),
        primary_key: key_ordinal.is_some(),
        key_ordinal,
        default: optional_text(record, 5),
    })
}

fn text(record: &Record, index: usize, what: &str) -> Result<String> {
    optional_text(record, index)
        .ok_or_else(|| RelgraphError::Query(format!("Catalog record is missing {}", what)))
}

fn optional_text(record: &Record, index: usize) -> Option<String> {
    record
        .get(index)
        .filter(|f| !f.is_null())
        .and_then(|f| f.as_str())
        .map(str::to_string)
}
