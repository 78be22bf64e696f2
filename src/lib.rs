pub mod config;
pub mod error;
pub mod reader;
pub mod resolver;
pub mod schema;

// Re-export commonly used types
pub use config::{Config, DataApiConfig, DatabaseConfig, OutputConfig};
pub use error::{RelgraphError, Result};
pub use reader::{DatabaseReader, EngineReader};
pub use resolver::QueryTemplateGenerator;
pub use schema::{SchemaBuilder, TemplateContext};
