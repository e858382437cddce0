use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "terabridge",
    about = "Render Tera templates through a configured extension bridge",
    version
)]
pub struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a template to stdout
    Render {
        /// Template name, with or without its file extension
        template: String,

        /// Path to bridge.toml or the directory holding it
        #[arg(short, long, default_value = ".")]
        config: String,

        /// Set context values (can be repeated: -d key=value)
        #[arg(short, long = "data", value_name = "KEY=VALUE")]
        data: Vec<String>,

        /// JSON file with context values
        #[arg(long, value_name = "FILE")]
        context: Option<String>,
    },

    /// Build the renderer and report what was loaded
    Check {
        /// Path to bridge.toml or the directory holding it
        #[arg(short, long, default_value = ".")]
        config: String,
    },

    /// Print a template translated to native Tera delimiters
    Lex {
        /// Template file to translate
        file: String,

        /// Path to bridge.toml or the directory holding it
        #[arg(short, long, default_value = ".")]
        config: String,
    },
}
