use super::input::print_delta;
use crate::context::AppContext;
use anyhow::{Context, Result};
use colored::Colorize;
use en_buddy_core::message::{Message, MessageRole};
use en_buddy_core::session::UuidSessionFactory;
use en_buddy_interaction::{ChatOutcome, MessageAssembler};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const HELP: &str = "Commands: /clear (forget this conversation), /new (start a new session), /quit";

pub async fn run(ctx: &AppContext) -> Result<()> {
    let mut chat = MessageAssembler::new(
        ctx.stream_client()?,
        &ctx.config.backend.endpoints,
        Arc::new(UuidSessionFactory),
    );

    println!("{}", "En-Buddy chat. Ctrl-C stops a reply.".bold());
    println!("{}", HELP.dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "you>".cyan().bold());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP.dimmed()),
            "/new" => {
                chat.new_session();
                println!("{} {}", "New session".green(), chat.session_id().dimmed());
            }
            "/clear" => match chat.clear_memory().await {
                Ok(()) => println!("{}", "Conversation memory cleared".green()),
                Err(e) => eprintln!("{} {}", "Could not clear memory:".red(), e),
            },
            message => send(&mut chat, message).await,
        }
    }

    Ok(())
}

/// Sends one message and prints the reply as it streams in.
async fn send(chat: &mut MessageAssembler, message: &str) {
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut snapshots = chat.subscribe();
    let first_new = chat.messages().len();
    let mut printed = 0usize;
    print!("{} ", "buddy>".magenta().bold());

    let result = {
        let sending = chat.send_message(message, &cancel);
        tokio::pin!(sending);
        loop {
            tokio::select! {
                result = &mut sending => break result,
                changed = snapshots.changed() => {
                    if changed.is_ok() {
                        let reply = latest_reply(&snapshots.borrow_and_update(), first_new);
                        print_delta(&reply, &mut printed);
                    }
                }
            }
        }
    };
    ctrl_c.abort();

    print_delta(&latest_reply(chat.messages(), first_new), &mut printed);
    println!();

    match result {
        Ok(ChatOutcome::Completed) => {}
        Ok(ChatOutcome::Cancelled) => eprintln!("{}", "(stopped)".yellow()),
        Ok(ChatOutcome::TimedOut) => eprintln!("{}", "(the tutor stopped responding)".yellow()),
        Ok(ChatOutcome::Interrupted(reason)) => {
            tracing::debug!(reason = %reason, "Reply interrupted");
        }
        Err(e) if e.is_validation() => {}
        Err(e) => eprintln!("{} {}", "Request failed:".red(), e),
    }
}

/// Content of the assistant reply added after `first_new`, if any.
fn latest_reply(messages: &[Message], first_new: usize) -> String {
    messages
        .iter()
        .skip(first_new)
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}
