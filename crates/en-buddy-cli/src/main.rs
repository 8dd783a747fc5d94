use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod context;
mod logging;

use context::{AppContext, Overrides};

#[derive(Parser)]
#[command(name = "en-buddy")]
#[command(about = "En-Buddy CLI - chat practice, coach analysis and flashcards", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8080
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Analysis history store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Write logs to a daily rolling file instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the tutor (interactive)
    Chat,
    /// Analyse a chat history and save the report
    Analyze {
        /// Read the history from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Manage stored analyses
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Review vocabulary flashcards
    Vocab {
        #[command(subcommand)]
        action: commands::vocab::VocabAction,
    },
    /// Manage server-side conversations
    Conversations {
        #[command(subcommand)]
        action: commands::conversations::ConversationAction,
    },
    /// Translate text (language is detected automatically)
    Translate {
        /// Text to translate
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_file)?;

    let ctx = AppContext::load(Overrides {
        config: cli.config,
        base_url: cli.base_url,
        store: cli.store,
    })?;

    match cli.command {
        Commands::Chat => commands::chat::run(&ctx).await?,
        Commands::Analyze { file } => commands::analyze::run(&ctx, file).await?,
        Commands::History { action } => commands::history::run(&ctx, action)?,
        Commands::Vocab { action } => commands::vocab::run(&ctx, action).await?,
        Commands::Conversations { action } => commands::conversations::run(&ctx, action).await?,
        Commands::Translate { text } => commands::translate::run(&ctx, &text.join(" ")).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "en-buddy",
            "history",
            "takeaway",
            "42",
            "use",
            "past",
            "tense",
            "--base-url",
            "http://example.test",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("http://example.test"));
        match cli.command {
            Commands::History {
                action: commands::history::HistoryAction::Takeaway { id, text },
            } => {
                assert_eq!(id, "42");
                assert_eq!(text.join(" "), "use past tense");
            }
            _ => panic!("expected history takeaway"),
        }
    }

    #[test]
    fn test_rejects_unknown_card_status() {
        assert!(Cli::try_parse_from(["en-buddy", "vocab", "status", "1", "forgotten"]).is_err());
    }
}
