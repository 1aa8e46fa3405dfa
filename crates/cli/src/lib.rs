pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use procura_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "procura",
    about = "Procura operator CLI",
    long_about = "Inspect configuration, check RFQ drafts, submit them and move projects across the board.",
    after_help = "Examples:\n  procura config\n  procura rfq validate --file draft.json --stage 2\n  procura kanban move --file board.json --project 3 --to review"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(subcommand, about = "Validate and submit RFQ drafts")]
    Rfq(RfqCommand),
    #[command(subcommand, about = "Work with the project board")]
    Kanban(KanbanCommand),
    #[command(about = "Run the calendar, wizard and board flow against mock data")]
    Demo,
}

#[derive(Debug, Subcommand)]
enum RfqCommand {
    #[command(about = "Validate a draft file through the given wizard stage (default: all)")]
    Validate {
        #[arg(long, help = "Path to the draft JSON file")]
        file: PathBuf,
        #[arg(long, help = "Last stage to validate, 1-3")]
        stage: Option<u8>,
    },
    #[command(about = "Walk a draft through the wizard and send it to vendors")]
    Submit {
        #[arg(long, help = "Path to the draft JSON file")]
        file: PathBuf,
        #[arg(long, help = "Save as draft instead of sending")]
        draft: bool,
    },
}

#[derive(Debug, Subcommand)]
enum KanbanCommand {
    #[command(about = "Drag a project into another column and write the board back")]
    Move {
        #[arg(long, help = "Path to the board JSON file")]
        file: PathBuf,
        #[arg(long, help = "Project id")]
        project: u64,
        #[arg(long, help = "Target column id")]
        to: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Rfq(RfqCommand::Validate { file, stage }) => commands::rfq::validate(&file, stage),
        Command::Rfq(RfqCommand::Submit { file, draft }) => commands::rfq::submit(&file, draft),
        Command::Kanban(KanbanCommand::Move { file, project, to }) => {
            commands::kanban::move_project(&file, project, &to)
        }
        Command::Demo => commands::demo::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON outcome. A config that
/// fails to load is reported by the command itself.
fn init_logging() {
    use tracing::Level;

    let Ok(config) = AppConfig::load(LoadOptions::default()) else {
        return;
    };
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
