use clap::{Parser, Subcommand};

mod commands;
mod util;

#[derive(Parser)]
#[command(
    name = "oilwatch",
    version,
    about = "Oilwatch CLI: score lubricant samples and read assessment history"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "OILWATCH_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Print single-line JSON instead of pretty output
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Score a lab sample and record the assessment
    Assess {
        /// Sample JSON file, or "-" for stdin
        #[arg(long)]
        sample_file: String,
        /// Entity to score against; overrides entity_id in the file
        #[arg(long)]
        entity: Option<String>,
    },
    /// Recent assessments of an entity, oldest first
    History {
        /// Entity identifier (default entity when omitted)
        #[arg(long)]
        entity: Option<String>,
        /// Maximum number of assessments (server default 60, max 500)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Latest assessment of an entity
    Latest {
        /// Entity identifier (default entity when omitted)
        #[arg(long)]
        entity: Option<String>,
    },
    /// Entities with recorded history
    Entities,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url, cli.compact).await,
        Commands::Assess {
            sample_file,
            entity,
        } => {
            commands::assessment::assess(&cli.api_url, &sample_file, entity.as_deref(), cli.compact)
                .await
        }
        Commands::History { entity, limit } => {
            commands::assessment::history(&cli.api_url, entity.as_deref(), limit, cli.compact).await
        }
        Commands::Latest { entity } => {
            commands::assessment::latest(&cli.api_url, entity.as_deref(), cli.compact).await
        }
        Commands::Entities => commands::assessment::entities(&cli.api_url, cli.compact).await,
    };

    std::process::exit(code);
}
