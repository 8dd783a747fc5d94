use crate::context::AppContext;
use anyhow::{Context, Result};
use colored::Colorize;

pub async fn run(ctx: &AppContext, text: &str) -> Result<()> {
    let translation = ctx
        .backend()?
        .translate(text)
        .await
        .context("Translation failed")?;

    let direction = match (&translation.source_language, &translation.target_language) {
        (Some(source), Some(target)) => format!("{source} → {target}"),
        _ => String::new(),
    };
    if !direction.is_empty() {
        println!("{}", direction.dimmed());
    }
    println!("{}", translation.translated_text);
    Ok(())
}
