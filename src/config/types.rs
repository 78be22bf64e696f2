use crate::reader::{ConnectionInfo, Engine};
use serde::{Deserialize, Serialize};

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub data_api: DataApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Database to introspect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres` or `mysql`
    pub engine: Engine,

    pub region: String,

    /// Cluster or instance identifier
    pub resource_arn: String,

    /// Credential-store reference used by the Data API
    pub secret_arn: String,

    pub database: String,

    /// Schemas to introspect; empty means every non-system schema
    #[serde(default)]
    pub schemas: Vec<String>,
}

impl DatabaseConfig {
    pub fn connection(&self) -> ConnectionInfo {
        ConnectionInfo {
            region: self.region.clone(),
            resource_arn: self.resource_arn.clone(),
            secret_arn: self.secret_arn.clone(),
            database: self.database.clone(),
        }
    }
}

/// Data API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataApiConfig {
    /// Base URL, e.g. "https://rds-data.us-east-1.amazonaws.com"
    pub endpoint: String,
    // Bearer token is read from RELGRAPH_DATA_API_TOKEN
}

/// Where generated artifacts go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(default = "default_schema_file")]
    pub schema_file: String,

    /// Symbolic data-source name referenced by every resolver
    #[serde(default = "default_data_source_name")]
    pub data_source_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            schema_file: default_schema_file(),
            data_source_name: default_data_source_name(),
        }
    }
}

fn default_directory() -> String {
    "build/resolvers".to_string()
}

fn default_schema_file() -> String {
    "schema.graphql".to_string()
}

fn default_data_source_name() -> String {
    "RelationalDatabaseDataSource".to_string()
}

impl Config {
    /// Validate configuration values that serde cannot check
    pub fn validate(&self) -> Result<(), String> {
        let endpoint = &self.data_api.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(format!(
                "Data API endpoint '{}' must be a valid URL (http:// or https://)",
                endpoint
            ));
        }

        if self.database.database.trim().is_empty() {
            return Err("Database name must not be empty".to_string());
        }

        let name = &self.output.data_source_name;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("Data source name '{}' must be alphanumeric", name));
        }

        if self.output.schema_file.contains(['/', '\\']) {
            return Err(format!(
                "Schema file '{}' must be a plain file name inside the output directory",
                self.output.schema_file
            ));
        }

        Ok(())
    }

    /// Configuration written by `relgraph init`
    pub fn example() -> Self {
        Self {
            database: DatabaseConfig {
                engine: Engine::Postgres,
                region: "us-east-1".to_string(),
                resource_arn: "arn:aws:rds:us-east-1:123456789012:cluster:pets".to_string(),
                secret_arn: "arn:aws:secretsmanager:us-east-1:123456789012:secret:pets".to_string(),
                database: "pets".to_string(),
                schemas: vec!["public".to_string()],
            },
            data_api: DataApiConfig {
                endpoint: "https://rds-data.us-east-1.amazonaws.com".to_string(),
            },
            output: OutputConfig::default(),
        }
    }
}
