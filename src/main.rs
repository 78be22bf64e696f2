use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "relgraph")]
#[command(version = "0.1.0")]
#[command(about = "Turn relational database catalogs into GraphQL schemas and query templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an example configuration
    Init {
        /// Output config file path (if not specified, outputs to stdout)
        #[arg(long)]
        output: Option<String>,
    },

    /// Introspect the database and write the schema, templates and resolver list
    Generate {
        /// Config file path
        #[arg(long, default_value = "relgraph.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { output } => {
            cli::init::run(output).await?;
        }
        Commands::Generate { config } => {
            cli::generate::run(config).await?;
        }
    }

    Ok(())
}
