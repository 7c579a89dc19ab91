pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tilly",
    about = "Tilly counter operator CLI",
    long_about = "Operate the Tilly pharmacy counter: inspect config, check the customer directory, search it directly, and run an interactive picker session.",
    after_help = "Examples:\n  tilly doctor --json\n  tilly config\n  tilly search jane\n  tilly counter"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and customer directory reachability checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one customer directory search and print the rendered entries")]
    Search {
        #[arg(default_value = "", help = "Name or phone fragment; empty lists the whole roster")]
        term: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run an interactive counter session against the customer picker")]
    Counter,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Search { term, json } => commands::search::run(&term, json),
        Command::Counter => commands::counter::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
