use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chainplace",
    about = "Chainplace: switch/CPU placement for service chains",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a placement and persist the ranked candidates.
    ///
    /// Modes: 0 full search, 1 uniform cost, 2 greedy, 3 all switch,
    /// 4 no replicas, 5 minimum bounce, 7 all CPU.
    Place {
        /// Path to chainplace.toml (defaults apply when missing)
        #[arg(short, long, default_value = "chainplace.toml")]
        config: String,
        /// Module graph JSON
        #[arg(short, long)]
        graph: String,
        /// Policy mode
        #[arg(short, long, default_value_t = 0)]
        mode: u8,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Reject the adopted candidate and adopt the next one.
    Next {
        #[arg(short, long, default_value = "chainplace.toml")]
        config: String,
        #[arg(short, long)]
        graph: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a chainplace.toml scaffold.
    Init {
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Latency budget file to reference
        #[arg(long)]
        delay: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chainplace=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Place { config, graph, mode, format } => {
            commands::place::place(&config, &graph, mode, &format)
        }
        Commands::Next { config, graph, format } => {
            commands::next::next(&config, &graph, &format)
        }
        Commands::Init { path, delay } => {
            commands::init::init(&path, delay.as_deref())
        }
    }
}
