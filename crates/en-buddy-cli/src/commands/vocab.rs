use super::input::read_text;
use crate::context::AppContext;
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use en_buddy_application::VocabularyService;
use en_buddy_core::session::{SessionFactory, UuidSessionFactory};
use en_buddy_core::vocabulary::{CardStatus, VocabularyCard};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum VocabAction {
    /// List every card
    List,
    /// Show the cards still to review
    Review,
    /// Set a card's status (new, remembered or mastered)
    Status { id: i64, status: CardStatus },
    /// Delete a card
    Delete { id: i64 },
    /// Extract cards from a chat history
    Extract {
        /// Read the history from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// Session the cards belong to (random when omitted)
        #[arg(long)]
        session: Option<String>,
    },
}

pub async fn run(ctx: &AppContext, action: VocabAction) -> Result<()> {
    let service = VocabularyService::new(ctx.backend()?);

    match action {
        VocabAction::List => {
            let cards = service.list().await.context("Failed to load vocabulary")?;
            for card in &cards {
                print_card(card, false);
            }
        }
        VocabAction::Review => {
            let queue = service.review_queue().await.context("Failed to load vocabulary")?;
            if queue.is_empty() {
                println!("{}", "Nothing to review. 🎉".green());
            }
            for card in &queue {
                print_card(card, true);
            }
        }
        VocabAction::Status { id, status } => {
            let card = service.mark(id, status).await.context("Failed to update card")?;
            println!("{} → {}", card.word.bold(), card.status);
        }
        VocabAction::Delete { id } => {
            service.delete(id).await.context("Failed to delete card")?;
            println!("{} {}", "Deleted".green(), id);
        }
        VocabAction::Extract { file, session } => {
            let history = read_text(file.as_deref())?;
            let session = session.unwrap_or_else(|| UuidSessionFactory.new_session_id());
            let extraction = service
                .extract(&session, &history)
                .await
                .context("Failed to extract cards")?;

            println!("{} {}", "Saved cards:".green(), extraction.saved_count);
            for draft in &extraction.cards {
                println!("  {}  {}", draft.word.bold(), draft.meaning);
            }
        }
    }

    Ok(())
}

fn print_card(card: &VocabularyCard, cloze: bool) {
    println!(
        "{} {}  {}  [{}]",
        card.id.to_string().yellow(),
        card.word.bold(),
        card.meaning,
        card.status
    );
    if cloze {
        let sentence = card.cloze();
        if !sentence.is_empty() {
            println!("    {}", sentence.dimmed());
        }
    } else if let Some(sentence) = &card.original_sentence {
        println!("    {}", sentence.dimmed());
    }
    if let Some(tip) = &card.tip {
        println!("    {} {}", "tip:".cyan(), tip);
    }
}
