use super::input::{print_delta, read_text};
use crate::context::AppContext;
use anyhow::{Context, Result};
use colored::Colorize;
use en_buddy_application::PlaygroundUseCase;
use en_buddy_interaction::AnalysisAssembler;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub async fn run(ctx: &AppContext, file: Option<PathBuf>) -> Result<()> {
    let history = read_text(file.as_deref())?;

    let coach = AnalysisAssembler::new(ctx.stream_client()?, &ctx.config.backend.endpoints);
    let mut playground = PlaygroundUseCase::new(coach, ctx.record_store()?);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut snapshots = playground.coach().subscribe();
    let mut printed = 0usize;

    let result = {
        let analysis = playground.analyze(&history, &cancel);
        tokio::pin!(analysis);
        loop {
            tokio::select! {
                result = &mut analysis => break result,
                changed = snapshots.changed() => {
                    if changed.is_ok() {
                        let text = snapshots.borrow_and_update().analysis.clone();
                        print_delta(&text, &mut printed);
                    }
                }
            }
        }
    };
    ctrl_c.abort();

    print_delta(playground.coach().analysis(), &mut printed);
    println!();

    match result.context("Analysis failed")? {
        Some(saved) => {
            println!("{} {}", "Saved as record".green(), saved.record_id.bold());
        }
        None => {
            let reason = playground.coach().error().unwrap_or("unknown error");
            eprintln!("{} {}", "Analysis did not complete:".red(), reason);
        }
    }

    Ok(())
}
