use anyhow::Context;
use relgraph::config::load_config;
use relgraph::reader::{DatabaseReader, EngineReader, HttpDataApiClient};
use relgraph::resolver::{ArtifactSink, DirectorySink, QueryTemplateGenerator};
use relgraph::schema::SchemaBuilder;
use std::sync::Arc;

/// Environment variable holding the Data API bearer token
pub const TOKEN_ENV: &str = "RELGRAPH_DATA_API_TOKEN";

/// File listing every resolver and its templates
pub const RESOURCES_FILE: &str = "resolvers.json";

/// Run the generate command: introspect the database and write every artifact
pub async fn run(config_path: String) -> anyhow::Result<()> {
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let token = std::env::var(TOKEN_ENV)
        .with_context(|| format!("{} environment variable not set", TOKEN_ENV))?;

    let connection = config.database.connection();
    let client = HttpDataApiClient::new(config.data_api.endpoint.clone(), token, connection.clone())?;
    let reader = EngineReader::new(
        config.database.engine,
        Arc::new(client),
        connection,
        config.database.schemas.clone(),
    );

    tracing::info!(
        "Introspecting {} database '{}' in {}",
        reader.engine(),
        config.database.database,
        config.database.region
    );

    let context = SchemaBuilder::new(&reader)
        .build()
        .await
        .context("Schema generation failed")?;

    if context.tables.is_empty() {
        tracing::warn!("No tables with a primary key were found; the schema will be empty");
    }

    let mut sink = DirectorySink::new(&config.output.directory)?;
    let generator = QueryTemplateGenerator::new(&context, &config.output.data_source_name);
    let resources = generator.write_templates(&mut sink)?;

    sink.write(&config.output.schema_file, &context.document.to_string())?;
    sink.write(RESOURCES_FILE, &serde_json::to_string_pretty(&resources)?)?;
    sink.finish()
        .with_context(|| format!("Failed to publish {}", config.output.directory))?;

    tracing::info!(
        "Generated {} table(s), {} resolver(s) in {}",
        context.tables.len(),
        resources.len(),
        sink.output().display()
    );
    for warning in &context.warnings {
        tracing::warn!("{}", warning);
    }

    Ok(())
}
