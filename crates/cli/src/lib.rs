pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sourcely",
    about = "Sourcely operator CLI",
    long_about = "Operate the Sourcely catalog: migrations, demo data, config inspection, readiness checks, and one-off catalog questions.",
    after_help = "Examples:\n  sourcely doctor --json\n  sourcely seed\n  sourcely ask \"gaming monitors under $500\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo suppliers and products (idempotent)")]
    Seed,
    #[command(about = "Answer one catalog question through the query pipeline")]
    Ask {
        #[arg(help = "Natural-language question, e.g. \"suppliers offering gaming gear\"")]
        utterance: String,
        #[arg(
            long,
            value_name = "JSON",
            help = "Use this classification instead of calling the model"
        )]
        classification: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM settings, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Ask { utterance, classification } => {
            commands::ask::run(&utterance, classification.as_deref())
        }
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
