/// Seek pagination
///
/// The same protocol the generated list templates implement, as plain Rust
/// for hosts that run statements themselves. A page of `limit` rows is read
/// as `limit + 1` rows; the extra row, if present, supplies the next token.

use crate::error::{RelgraphError, Result};
use crate::reader::{Field, SqlParameter, TableName};
use crate::resolver::sql::{ident, table_ref, Dialect, SortDirection};
use crate::schema::KeyField;
use sea_query::{Asterisk, Expr, Query};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Arguments of a `list<T>s` operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArgs {
    pub limit: Option<usize>,
    pub next_token: Option<Map<String, Value>>,
    pub token_fields: Option<Vec<String>>,
    pub token_field_types: Option<Vec<String>>,
    pub sort_directions: Option<Vec<String>>,
    pub filter: Option<String>,
}

/// A validated list request with every default applied
#[derive(Debug, Clone, PartialEq)]
pub struct ListPlan {
    pub limit: usize,
    pub next_token: Option<Map<String, Value>>,
    pub token_fields: Vec<String>,
    pub token_field_types: Vec<String>,
    pub sort_directions: Vec<SortDirection>,
    pub filter: Option<String>,
}

impl ListPlan {
    /// Apply defaults from the table's primary key and validate the parallel lists
    pub fn new(args: ListArgs, key_fields: &[KeyField]) -> Result<Self> {
        let token_fields = args
            .token_fields
            .unwrap_or_else(|| key_fields.iter().map(|k| k.name.clone()).collect());
        let token_field_types = args.token_field_types.unwrap_or_else(|| {
            key_fields
                .iter()
                .map(|k| k.kind.graphql_name().to_string())
                .collect()
        });

        let sort_directions = match args.sort_directions {
            Some(directions) if !directions.is_empty() => directions
                .iter()
                .map(|d| {
                    SortDirection::parse(d).ok_or_else(|| {
                        RelgraphError::Validation(format!("Invalid sort direction '{}'", d))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            _ => vec![SortDirection::Asc; token_fields.len()],
        };

        if token_field_types.len() != token_fields.len() || sort_directions.len() != token_fields.len() {
            return Err(RelgraphError::Validation(
                "tokenFields, tokenFieldTypes and sortDirections must have the same length".to_string(),
            ));
        }
        if token_fields.is_empty() {
            return Err(RelgraphError::Validation(
                "Listing requires at least one token field".to_string(),
            ));
        }

        Ok(Self {
            limit: args.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            next_token: args.next_token,
            token_fields,
            token_field_types,
            sort_directions,
            filter: args.filter,
        })
    }

    /// Statement text and bound parameters for `table`
    pub fn to_sql(&self, dialect: Dialect, table: &TableName) -> Result<(String, Vec<SqlParameter>)> {
        let mut select = Query::select();
        select.column(Asterisk).from(table_ref(table)?);
        let mut parameters = Vec::new();

        for (i, field) in self.token_fields.iter().enumerate() {
            let column = ident(field)?;
            let direction = self.sort_directions[i];

            if let Some(token) = &self.next_token {
                let value = token.get(field).unwrap_or(&Value::Null);
                let name = format!("t{}", i);
                let placeholder = Expr::cust(format!(":{}", name));
                select.and_where(match direction {
                    SortDirection::Asc => Expr::col(column.clone()).gte(placeholder),
                    SortDirection::Desc => Expr::col(column.clone()).lte(placeholder),
                });
                parameters.push(SqlParameter {
                    name,
                    value: token_value(value, &self.token_field_types[i]),
                });
            }

            select
                .group_by_col(column.clone())
                .order_by(column, direction.order());
        }

        if let Some(filter) = &self.filter {
            select.and_where(Expr::cust(format!("({})", filter)));
        }

        select.limit(self.fetch_limit());
        Ok((dialect.render(&select), parameters))
    }

    /// Rows to read: one past the page so the extra row can become the token
    pub fn fetch_limit(&self) -> u64 {
        u64::try_from(self.limit)
            .unwrap_or(u64::MAX)
            .saturating_add(1)
    }
}

/// Numeric token types are bound as numbers, everything else as text
fn token_value(value: &Value, declared_type: &str) -> Field {
    let numeric = matches!(declared_type, "Int" | "Float");
    match value {
        Value::Null => Field::null(),
        Value::Number(n) if numeric => match n.as_i64() {
            Some(i) => Field::LongValue(i),
            None => Field::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        Value::Bool(b) => Field::BooleanValue(*b),
        Value::String(s) => Field::string(s.as_str()),
        other => Field::string(other.to_string()),
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub limit: usize,
    pub items: Vec<Map<String, Value>>,
    pub next_token: Option<Map<String, Value>>,
}

/// Split `rows` (read with `LIMIT limit + 1`) into a page and its next token
pub fn paginate(mut rows: Vec<Map<String, Value>>, limit: usize, token_fields: &[String]) -> Page {
    let next_token = if rows.len() > limit {
        rows.truncate(limit + 1);
        rows.pop().map(|extra| {
            token_fields
                .iter()
                .map(|f| (f.clone(), extra.get(f).cloned().unwrap_or(Value::Null)))
                .collect()
        })
    } else {
        None
    };

    Page {
        limit,
        items: rows,
        next_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarKind;
    use async_graphql::dynamic::TypeRef;
    use serde_json::json;

    fn id_key() -> Vec<KeyField> {
        vec![KeyField {
            name: "id".to_string(),
            kind: ScalarKind::Int,
            ty: TypeRef::named(TypeRef::INT),
        }]
    }

    fn rows(n: i64) -> Vec<Map<String, Value>> {
        (1..=n)
            .map(|i| match json!({ "id": i, "name": format!("dog {}", i) }) {
                Value::Object(map) => map,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_defaults_come_from_primary_key() {
        let plan = ListPlan::new(ListArgs::default(), &id_key()).unwrap();
        assert_eq!(plan.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(plan.token_fields, vec!["id"]);
        assert_eq!(plan.token_field_types, vec!["Int"]);
        assert_eq!(plan.sort_directions, vec![SortDirection::Asc]);
    }

    #[test]
    fn test_first_page_requests_one_extra_row() {
        let plan = ListPlan::new(ListArgs::default(), &id_key()).unwrap();
        let (sql, parameters) = plan.to_sql(Dialect::Postgres, &TableName::new("dogs")).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"dogs\" GROUP BY \"id\" ORDER BY \"id\" ASC LIMIT 11"
        );
        assert!(parameters.is_empty());
    }

    #[test]
    fn test_seek_predicates_and_filter() {
        let args: ListArgs = serde_json::from_value(json!({
            "limit": 5,
            "nextToken": { "name": "rex", "id": 7 },
            "tokenFields": ["name", "id"],
            "tokenFieldTypes": ["String", "Int"],
            "sortDirections": ["DESC", "asc"],
            "filter": "age > 3"
        }))
        .unwrap();
        let plan = ListPlan::new(args, &id_key()).unwrap();
        let (sql, parameters) = plan.to_sql(Dialect::MySql, &TableName::new("dogs")).unwrap();

        assert!(sql.starts_with("SELECT * FROM `dogs` WHERE `name` <= :t0 AND `id` >= :t1 AND "));
        assert!(sql.contains("(age > 3)"));
        assert!(sql.ends_with("GROUP BY `name`, `id` ORDER BY `name` DESC, `id` ASC LIMIT 6"));
        assert_eq!(parameters[0].value, Field::string("rex"));
        assert_eq!(parameters[1].value, Field::LongValue(7));
    }

    #[test]
    fn test_numeric_strings_stay_text_for_string_tokens() {
        assert_eq!(token_value(&json!(42), "String"), Field::string("42"));
        assert_eq!(token_value(&json!(1.5), "Float"), Field::DoubleValue(1.5));
        assert_eq!(token_value(&Value::Null, "Int"), Field::null());
    }

    #[test]
    fn test_mismatched_lists_are_rejected() {
        let args = ListArgs {
            token_fields: Some(vec!["id".to_string(), "name".to_string()]),
            ..Default::default()
        };
        assert!(ListPlan::new(args, &id_key()).is_err());

        let args = ListArgs {
            sort_directions: Some(vec!["UP".to_string()]),
            ..Default::default()
        };
        assert!(ListPlan::new(args, &id_key()).is_err());
    }

    #[test]
    fn test_bad_arguments_are_validation_errors() {
        let args = ListArgs {
            sort_directions: Some(vec!["UP".to_string()]),
            ..Default::default()
        };
        let err = ListPlan::new(args, &id_key()).unwrap_err();
        assert!(matches!(err, RelgraphError::Validation(_)));
        assert!(err.to_string().contains("UP"));

        let err = ListPlan::new(ListArgs::default(), &[]).unwrap_err();
        assert!(matches!(err, RelgraphError::Validation(_)));
    }

    #[test]
    fn test_unbounded_limit_does_not_overflow() {
        let args = ListArgs {
            limit: Some(usize::MAX),
            ..Default::default()
        };
        let plan = ListPlan::new(args, &id_key()).unwrap();
        assert_eq!(plan.fetch_limit(), u64::MAX);

        let (sql, _) = plan.to_sql(Dialect::Postgres, &TableName::new("dogs")).unwrap();
        assert!(sql.ends_with(&format!("LIMIT {}", u64::MAX)));
    }

    #[test]
    fn test_full_page_yields_next_token() {
        let page = paginate(rows(11), 10, &["id".to_string()]);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.items.last().unwrap()["id"], json!(10));
        assert_eq!(page.next_token.unwrap()["id"], json!(11));
    }

    #[test]
    fn test_short_page_ends_pagination() {
        let page = paginate(rows(9), 10, &["id".to_string()]);
        assert_eq!(page.items.len(), 9);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_page_serializes_like_the_connection_type() {
        let page = paginate(rows(2), 1, &["id".to_string()]);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["limit"], json!(1));
        assert_eq!(value["nextToken"], json!({ "id": 2 }));
    }
}
