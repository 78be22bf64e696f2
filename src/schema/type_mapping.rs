/// SQL to GraphQL type mapping
///
/// Each engine has its own coercion table. Matching is case-insensitive and
/// exact: parameterized or truncated type names such as `varchar(20)` are not
/// recognised and fall through to `String`.

use crate::reader::{ColumnDescription, Engine};
use async_graphql::dynamic::TypeRef;
use std::fmt;

/// Scalar categories a column can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Int,
    Float,
    List,
    String,
    Json,
    Date,
    Time,
    DateTime,
    Timestamp,
    Id,
}

impl ScalarKind {
    /// Name of the scalar as printed in the schema document
    pub fn graphql_name(self) -> &'static str {
        match self {
            ScalarKind::Boolean => TypeRef::BOOLEAN,
            ScalarKind::Int => TypeRef::INT,
            ScalarKind::Float => TypeRef::FLOAT,
            // Unwrapped lists have no element type to print; callers use `column_type`
            ScalarKind::List | ScalarKind::String => TypeRef::STRING,
            ScalarKind::Json => "AWSJSON",
            ScalarKind::Date => "AWSDate",
            ScalarKind::Time => "AWSTime",
            ScalarKind::DateTime => "AWSDateTime",
            ScalarKind::Timestamp => "AWSTimestamp",
            ScalarKind::Id => TypeRef::ID,
        }
    }

    /// Values of numeric kinds are written into SQL unquoted
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Float)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::List => write!(f, "List"),
            ScalarKind::Json => write!(f, "JSON"),
            kind => write!(f, "{}", kind.graphql_name()),
        }
    }
}

const POSTGRES_TYPES: &[(&str, ScalarKind)] = &[
    ("INTEGER", ScalarKind::Int),
    ("SMALLINT", ScalarKind::Int),
    ("BIGINT", ScalarKind::Int),
    ("SERIAL", ScalarKind::Int),
    ("SMALLSERIAL", ScalarKind::Int),
    ("BIGSERIAL", ScalarKind::Int),
    ("FLOAT", ScalarKind::Float),
    ("DECIMAL", ScalarKind::Float),
    ("REAL", ScalarKind::Float),
    ("NUMERIC", ScalarKind::Float),
    ("DOUBLE PRECISION", ScalarKind::Float),
    ("ARRAY", ScalarKind::List),
    ("BOOLEAN", ScalarKind::Boolean),
    ("JSON", ScalarKind::Json),
    ("JSONB", ScalarKind::Json),
    ("TIME", ScalarKind::Time),
    ("TIME WITHOUT TIME ZONE", ScalarKind::Time),
    ("DATE", ScalarKind::Date),
    ("DATETIME", ScalarKind::DateTime),
    ("TIMESTAMP WITH TIME ZONE", ScalarKind::DateTime),
    ("TIMESTAMP", ScalarKind::Timestamp),
    ("TIMESTAMP WITHOUT TIME ZONE", ScalarKind::Timestamp),
    ("UUID", ScalarKind::Id),
];

const MYSQL_TYPES: &[(&str, ScalarKind)] = &[
    ("INT", ScalarKind::Int),
    ("INTEGER", ScalarKind::Int),
    ("SMALLINT", ScalarKind::Int),
    ("TINYINT", ScalarKind::Int),
    ("MEDIUMINT", ScalarKind::Int),
    ("BIGINT", ScalarKind::Int),
    ("BIT", ScalarKind::Int),
    ("FLOAT", ScalarKind::Float),
    ("DOUBLE", ScalarKind::Float),
    ("REAL", ScalarKind::Float),
    ("REAL_AS_FLOAT", ScalarKind::Float),
    ("DOUBLE PRECISION", ScalarKind::Float),
    ("DEC", ScalarKind::Float),
    ("DECIMAL", ScalarKind::Float),
    ("FIXED", ScalarKind::Float),
    ("NUMERIC", ScalarKind::Float),
    ("BOOL", ScalarKind::Boolean),
    ("BOOLEAN", ScalarKind::Boolean),
    ("JSON", ScalarKind::Json),
    ("DATE", ScalarKind::Date),
    ("TIME", ScalarKind::Time),
    ("DATETIME", ScalarKind::DateTime),
    ("TIMESTAMP", ScalarKind::Timestamp),
];

/// Map a source SQL type name to its scalar kind
///
/// Total over all inputs: anything not in the engine's table is `String`.
pub fn map_scalar_type(engine: Engine, source_type: &str) -> ScalarKind {
    let table = match engine {
        Engine::Postgres => POSTGRES_TYPES,
        Engine::MySql => MYSQL_TYPES,
    };

    let normalized = source_type.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(normalized))
        .map(|(_, kind)| *kind)
        .unwrap_or(ScalarKind::String)
}

/// Scalar kind of a column's declared type (`List` for arrays)
pub fn column_kind(engine: Engine, column: &ColumnDescription) -> ScalarKind {
    map_scalar_type(engine, &column.data_type)
}

/// Nullable GraphQL type of a column; arrays become a list of the element's scalar
pub fn column_type(engine: Engine, column: &ColumnDescription) -> TypeRef {
    match (column_kind(engine, column), &column.array_type) {
        (ScalarKind::List, Some(element)) => {
            TypeRef::named_list(map_scalar_type(engine, element).graphql_name())
        }
        (ScalarKind::List, None) => TypeRef::named_list(TypeRef::STRING),
        (kind, _) => TypeRef::named(kind.graphql_name()),
    }
}

/// Wrap `ty` as non-null unless it already is
pub fn non_null(ty: TypeRef) -> TypeRef {
    match ty {
        TypeRef::NonNull(_) => ty,
        other => TypeRef::NonNull(Box::new(other)),
    }
}
