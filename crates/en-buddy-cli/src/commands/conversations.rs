use crate::context::AppContext;
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand)]
pub enum ConversationAction {
    /// List conversations
    List {
        /// Page number (0-based)
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Page size
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
    /// Create a conversation
    Create {
        #[arg(long)]
        title: Option<String>,
    },
    /// Rename a conversation
    Rename {
        id: i64,
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Delete a conversation
    Delete { id: i64 },
    /// Print the messages of a conversation
    Messages { id: i64 },
}

pub async fn run(ctx: &AppContext, action: ConversationAction) -> Result<()> {
    let backend = ctx.backend()?;

    match action {
        ConversationAction::List { page, size } => {
            let conversations = backend
                .list_conversations(page, size)
                .await
                .context("Failed to list conversations")?;
            if conversations.is_empty() {
                println!("{}", "No conversations.".dimmed());
            }
            for conversation in &conversations {
                println!(
                    "{}  {}  {}",
                    conversation.id.to_string().yellow(),
                    conversation.display_title(),
                    conversation.updated_at.as_deref().unwrap_or_default().dimmed()
                );
            }
        }
        ConversationAction::Create { title } => {
            let created = backend
                .create_conversation(title.as_deref())
                .await
                .context("Failed to create conversation")?;
            println!(
                "{} {} ({})",
                "Created".green(),
                created.id,
                created.display_title()
            );
        }
        ConversationAction::Rename { id, title } => {
            backend
                .rename_conversation(id, &title.join(" "))
                .await
                .context("Failed to rename conversation")?;
            println!("{}", "Renamed".green());
        }
        ConversationAction::Delete { id } => {
            backend
                .delete_conversation(id)
                .await
                .context("Failed to delete conversation")?;
            println!("{} {}", "Deleted".green(), id);
        }
        ConversationAction::Messages { id } => {
            let messages = backend
                .conversation_messages(id)
                .await
                .context("Failed to load messages")?;
            for message in messages {
                let role = message.role.to_string();
                println!("{} {}", format!("{role}>").cyan().bold(), message.content);
            }
        }
    }

    Ok(())
}
