use anyhow::Context;
use relgraph::config::{save_config, Config};

/// Run the init command: write an example configuration to a file or stdout
pub async fn run(output: Option<String>) -> anyhow::Result<()> {
    let config = Config::example();

    if let Some(output_path) = output {
        save_config(&config, &output_path)
            .with_context(|| format!("Failed to write configuration to {}", output_path))?;
        tracing::info!("Generated {}", output_path);
        tracing::info!("Edit the database section, then run: relgraph generate --config {}", output_path);
    } else {
        let toml_string = toml::to_string_pretty(&config)?;
        println!("{}", toml_string);
        tracing::info!("Tip: Add --output <file> to save to a file instead of stdout");
    }

    Ok(())
}
