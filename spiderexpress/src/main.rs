// spiderexpress/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            config_path,
            interactive,
            non_interactive: _,
        } => commands::create::execute(config_path, interactive),

        Commands::Start { config_path } => commands::start::execute(config_path).await,

        Commands::List => commands::list::execute(),
    }
}
