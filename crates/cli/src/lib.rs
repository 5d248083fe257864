pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::history::HistoryCommand;
use commands::quote::QuoteArgs;

#[derive(Debug, Parser)]
#[command(
    name = "autoquote",
    about = "Autoquote operator CLI",
    long_about = "Rate car insurance quotes offline, manage the history database, and inspect runtime readiness.",
    after_help = "Examples:\n  autoquote quote --make Toyota --model Corolla --year 2016 --value 100000 --deductible 0.1\n  autoquote migrate\n  autoquote history list --car-make Toyota\n  autoquote doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Rate a quote with the configured engine and print the premium as JSON")]
    Quote(QuoteArgs),
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, DB connectivity, and history schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Browse recorded quotes in the history database")]
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Quote(args) => commands::quote::run(&args),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            let (output, passed) = commands::doctor::run(json);
            commands::CommandResult { exit_code: if passed { 0 } else { 1 }, output }
        }
        Command::History { command } => commands::history::run(&command),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
