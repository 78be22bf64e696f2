/// Dialect-aware SQL building on top of sea-query
///
/// Identifiers are validated here before they reach a statement. Values never
/// pass through this module: they travel as bound `:name` parameters.

use crate::error::{RelgraphError, Result};
use crate::reader::TableName;
use sea_query::{
    Alias, ColumnRef, Iden, IntoColumnRef, IntoTableRef, MysqlQueryBuilder, Order,
    PostgresQueryBuilder, QueryStatementWriter, Quote, QuotedBuilder, TableRef,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
}

impl Dialect {
    pub fn quote_char(self) -> char {
        match self {
            Dialect::Postgres => '"',
            Dialect::MySql => '`',
        }
    }

    fn quote_style(self) -> Quote {
        match self {
            Dialect::Postgres => PostgresQueryBuilder.quote(),
            Dialect::MySql => MysqlQueryBuilder.quote(),
        }
    }

    /// Quote one identifier with the backend's escaping
    pub fn quote(self, identifier: &str) -> Result<String> {
        let mut quoted = String::new();
        ident(identifier)?.prepare(&mut quoted, self.quote_style());
        Ok(quoted)
    }

    /// Quote a possibly schema-qualified name part by part
    pub fn quote_qualified(self, schema: Option<&str>, name: &str) -> Result<String> {
        match schema {
            Some(schema) => Ok(format!("{}.{}", self.quote(schema)?, self.quote(name)?)),
            None => self.quote(name),
        }
    }

    /// `alias.column`, both quoted
    pub fn column(self, alias: &str, column: &str) -> Result<String> {
        Ok(format!("{}.{}", self.quote(alias)?, self.quote(column)?))
    }

    /// Render a statement with this dialect's query builder
    pub fn render(self, statement: &impl QueryStatementWriter) -> String {
        match self {
            Dialect::Postgres => statement.to_string(PostgresQueryBuilder),
            Dialect::MySql => statement.to_string(MysqlQueryBuilder),
        }
    }

    /// Aggregate every row of `alias` into one JSON array value.
    ///
    /// On Postgres rows with a NULL `join_column` come from an unmatched LEFT
    /// JOIN and are left out. MySQL aggregates inside a correlated subquery,
    /// projecting `columns` (or just the join column when none are known).
    pub fn aggregate_rows(self, alias: &str, join_column: &str, columns: &[String]) -> Result<String> {
        match self {
            Dialect::Postgres => Ok(format!(
                "COALESCE(jsonb_agg(DISTINCT to_jsonb({}.*)) FILTER (WHERE {} IS NOT NULL), '[]')",
                self.quote(alias)?,
                self.column(alias, join_column)?
            )),
            Dialect::MySql => {
                let projected: Vec<String> = if columns.is_empty() {
                    vec![join_column.to_string()]
                } else {
                    columns.to_vec()
                };
                let pairs = projected
                    .iter()
                    .map(|c| Ok(format!("'{}', {}", c.replace('\'', "''"), self.column(alias, c)?)))
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                Ok(format!(
                    "COALESCE(JSON_ARRAYAGG(JSON_OBJECT({})), JSON_ARRAY())",
                    pairs
                ))
            }
        }
    }
}

/// Reject identifiers that cannot be safely quoted.
///
/// `$` and `#` are mapping-template syntax and would be interpreted once the
/// identifier is embedded in a template.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(RelgraphError::SchemaGeneration(
            "Empty SQL identifier".to_string(),
        ));
    }
    if identifier.contains(['\0', '$', '#']) {
        return Err(RelgraphError::SchemaGeneration(format!(
            "Unsupported character in SQL identifier '{}'",
            identifier.escape_debug()
        )));
    }
    Ok(())
}

/// Validated identifier for use in a statement
pub fn ident(identifier: &str) -> Result<Alias> {
    validate_identifier(identifier)?;
    Ok(Alias::new(identifier))
}

pub fn table_ref(table: &TableName) -> Result<TableRef> {
    let name = ident(&table.name)?;
    Ok(match &table.schema {
        Some(schema) => (ident(schema)?, name).into_table_ref(),
        None => name.into_table_ref(),
    })
}

/// `alias.column` reference
pub fn column(alias: &str, column: &str) -> Result<ColumnRef> {
    Ok((ident(alias)?, ident(column)?).into_column_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Some(SortDirection::Asc),
            "DESC" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn order(self) -> Order {
        match self {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Asterisk, Expr, Query};

    #[test]
    fn test_quote_per_dialect() {
        assert_eq!(Dialect::Postgres.quote("name").unwrap(), "\"name\"");
        assert_eq!(Dialect::MySql.quote("name").unwrap(), "`name`");
    }

    #[test]
    fn test_quote_doubles_embedded_quotes() {
        assert_eq!(Dialect::Postgres.quote("we\"ird").unwrap(), "\"we\"\"ird\"");
        assert_eq!(Dialect::MySql.quote("we`ird").unwrap(), "`we``ird`");
    }

    #[test]
    fn test_invalid_identifiers_are_rejected() {
        assert!(Dialect::Postgres.quote("").is_err());
        assert!(Dialect::Postgres.quote("a$b").is_err());
        assert!(Dialect::MySql.quote("a\0b").is_err());
        assert!(column("dogs", "a#b").is_err());
        assert!(table_ref(&TableName::new("")).is_err());
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(
            Dialect::Postgres.quote_qualified(Some("sales"), "orders").unwrap(),
            "\"sales\".\"orders\""
        );
        assert_eq!(Dialect::MySql.quote_qualified(None, "dogs").unwrap(), "`dogs`");
    }

    #[test]
    fn test_aggregate_rows_postgres() {
        let sql = Dialect::Postgres.aggregate_rows("owners", "id", &[]).unwrap();
        assert_eq!(
            sql,
            "COALESCE(jsonb_agg(DISTINCT to_jsonb(\"owners\".*)) FILTER (WHERE \"owners\".\"id\" IS NOT NULL), '[]')"
        );
    }

    #[test]
    fn test_aggregate_rows_mysql() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let sql = Dialect::MySql.aggregate_rows("owners", "id", &columns).unwrap();
        assert_eq!(
            sql,
            "COALESCE(JSON_ARRAYAGG(JSON_OBJECT('id', `owners`.`id`, 'name', `owners`.`name`)), JSON_ARRAY())"
        );

        let fallback = Dialect::MySql.aggregate_rows("owners", "dogId", &[]).unwrap();
        assert!(fallback.contains("JSON_OBJECT('dogId', `owners`.`dogId`)"));
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("sideways"), None);
        assert!(matches!(SortDirection::Asc.order(), Order::Asc));
        assert!(matches!(SortDirection::Desc.order(), Order::Desc));
    }

    #[test]
    fn test_render_per_dialect() {
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(table_ref(&TableName::qualified("sales", "orders")).unwrap())
            .and_where(Expr::col(ident("id").unwrap()).eq(Expr::cust(":k0")));

        assert_eq!(
            Dialect::Postgres.render(&select),
            "SELECT * FROM \"sales\".\"orders\" WHERE \"id\" = :k0"
        );
        assert_eq!(
            Dialect::MySql.render(&select),
            "SELECT * FROM `sales`.`orders` WHERE `id` = :k0"
        );
    }
}
