//! `sprout`: run declarative seed documents against an in-memory backend.

mod commands;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sprout", version, about = "Declarative seed document runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the suite documents under a directory
    List {
        #[arg(long, default_value = "suites")]
        dir: PathBuf,
    },
    /// Validate a document's structure without creating anything
    Check { file: PathBuf },
    /// Execute a document and print the created-object ledger
    Run {
        file: PathBuf,
        /// Revert all side effects after the run
        #[arg(long)]
        read_only: bool,
        /// Emit the ledger as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ok = match cli.command {
        Command::List { dir } => {
            commands::list::run(&dir);
            true
        }
        Command::Check { file } => commands::check::run(&file),
        Command::Run {
            file,
            read_only,
            json,
        } => commands::run::run(&file, read_only, json),
    };
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
