pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "quickquote",
    about = "QuickQuote voice-to-quote CLI",
    long_about = "Turn spoken job notes into quote drafts, send them, and browse quote history.",
    after_help = "Examples:\n  quickquote draft --transcript \"paint two walls at fifty each\"\n  quickquote send 6f1c...\n  quickquote history --csv"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Extract a quote from a transcript and save it as a draft")]
    Draft(DraftArgs),
    #[command(about = "Send a saved draft and optionally notify the accounting webhook")]
    Send(SendArgs),
    #[command(about = "Print quote history, newest first")]
    History {
        #[arg(long, help = "Emit CSV instead of JSON")]
        csv: bool,
    },
    #[command(about = "Rewrite a scope of work into customer-facing text")]
    Rewrite {
        #[arg(long, help = "Scope text to rewrite")]
        text: String,
    },
}

#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct DraftArgs {
    #[arg(long, help = "Transcript text")]
    pub transcript: Option<String>,
    #[arg(long, help = "Read the transcript from a file")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SendArgs {
    #[arg(help = "Record id of the saved draft")]
    pub record_id: String,
    #[arg(long, help = "Post the sent quote to the configured webhook")]
    pub notify: bool,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init_from_env();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Draft(args) => commands::draft::run(&args),
        Command::Send(args) => commands::send::run(&args),
        Command::History { csv } => commands::history::run(csv),
        Command::Rewrite { text } => commands::rewrite::run(&text),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
