use crate::context::AppContext;
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List stored analyses, most recent first
    List,
    /// Show one analysis
    Show { id: String },
    /// Make an analysis the current one
    Select { id: String },
    /// Delete an analysis
    Delete { id: String },
    /// Set the takeaway of an analysis
    Takeaway {
        id: String,
        /// One-line takeaway
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Delete every stored analysis
    Clear,
}

pub fn run(ctx: &AppContext, action: HistoryAction) -> Result<()> {
    let mut store = ctx.record_store()?;

    match action {
        HistoryAction::List => {
            if store.records().is_empty() {
                println!("{}", "No analyses yet.".dimmed());
                return Ok(());
            }
            let current = store.state().current_record_id.clone();
            for record in store.records() {
                let marker = if current.as_deref() == Some(record.id.as_str()) {
                    "*".green().bold()
                } else {
                    " ".normal()
                };
                let takeaway = if record.takeaway.is_some() { " ✎" } else { "" };
                println!(
                    "{} {}  {}  {}{}",
                    marker,
                    record.id.yellow(),
                    record.updated_at.dimmed(),
                    record.title,
                    takeaway
                );
            }
        }
        HistoryAction::Show { id } => {
            let Some(record) = store.get(&id) else {
                bail!("No analysis with id {id}");
            };
            println!("{} {}", "Title:".bold(), record.title);
            println!("{} {}", "Created:".bold(), record.created_at);
            println!("{} {}", "Updated:".bold(), record.updated_at);
            if let Some(takeaway) = &record.takeaway {
                println!("{} {}", "Takeaway:".bold(), takeaway.green());
            }
            println!("\n{}\n{}", "Chat history".bold().underline(), record.chat_history);
            println!("\n{}\n{}", "Analysis".bold().underline(), record.analysis);
        }
        HistoryAction::Select { id } => {
            if store.get(&id).is_none() {
                bail!("No analysis with id {id}");
            }
            store.select(&id).context("Failed to save selection")?;
            println!("{} {}", "Current analysis:".green(), id);
        }
        HistoryAction::Delete { id } => {
            if store.delete(&id).context("Failed to save store")? {
                println!("{} {}", "Deleted".green(), id);
            } else {
                println!("{} {}", "No analysis with id".yellow(), id);
            }
        }
        HistoryAction::Takeaway { id, text } => {
            let text = text.join(" ");
            if !store
                .update_takeaway(&id, text.trim())
                .context("Failed to save takeaway")?
            {
                bail!("No analysis with id {id}");
            }
            println!("{}", "Takeaway saved".green());
        }
        HistoryAction::Clear => {
            store.clear_all().context("Failed to clear store")?;
            println!("{}", "History cleared".green());
        }
    }

    Ok(())
}
