use serde::{Deserialize, Serialize};

/// A single typed value in a Data API record or parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    StringValue(String),
    LongValue(i64),
    DoubleValue(f64),
    BooleanValue(bool),
    IsNull(bool),
}

impl Field {
    pub fn string(value: impl Into<String>) -> Self {
        Field::StringValue(value.into())
    }

    pub fn null() -> Self {
        Field::IsNull(true)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::IsNull(true))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::StringValue(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Field::LongValue(v) => Some(*v),
            Field::StringValue(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Named statement parameter, referenced as `:name` in the SQL text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: Field,
}

impl SqlParameter {
    pub fn string(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: Field::string(value),
        }
    }
}

pub type Record = Vec<Field>;

/// Body of an `ExecuteStatement` call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteStatementRequest<'a> {
    pub resource_arn: &'a str,
    pub secret_arn: &'a str,
    pub database: &'a str,
    pub sql: &'a str,
    #[serde(skip_serializing_if = "<[SqlParameter]>::is_empty")]
    pub parameters: &'a [SqlParameter],
}

/// Response from an `ExecuteStatement` call
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteStatementResponse {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub number_of_records_updated: Option<i64>,
}

/// Error body returned by the Data API on a rejected statement
#[derive(Debug, Deserialize)]
pub struct DataApiErrorBody {
    #[serde(alias = "Message")]
    pub message: Option<String>,
}
