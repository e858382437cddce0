mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use terabridge::logging::Logger;

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    Logger::init(cli.verbose);

    match cli.command {
        Commands::Render {
            template,
            config,
            data,
            context,
        } => commands::render::run(template, config, data, context),
        Commands::Check { config } => commands::check::run(config),
        Commands::Lex { file, config } => commands::lex::run(file, config),
    }
}
