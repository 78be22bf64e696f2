/// GraphQL schema generation from relational catalogs
///
/// This module maps column types to GraphQL scalars, classifies foreign keys
/// into relation fields, builds per-table contexts and assembles them into one
/// schema document.

mod builder;
pub mod context;
pub mod document;
pub mod naming;
pub mod relationships;
pub mod type_mapping;

pub use builder::{SchemaAssembler, SchemaBuilder};
pub use context::{KeyField, TableContext, TemplateContext, TemplateContextBuilder};
pub use document::Document;
pub use relationships::{RelationField, RelationKind, RelationshipResolver};
pub use type_mapping::{map_scalar_type, ScalarKind};
