use super::{short_name, Context};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stylesync_workspace::RecordingHost;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Stylesheet to inspect
    pub file: PathBuf,
}

pub async fn status(args: StatusArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open(&args.file, RecordingHost::new()).await?;
    let controller = &session.controller;
    let state = controller.state().ok_or_else(|| anyhow!("No active file"))?;

    println!("{}", short_name(&session.path).bold());

    let Some(file_key) = &state.file_key else {
        println!("  {}", "not synced".yellow());
        return Ok(());
    };

    let display_name = state.file_display_name.as_deref().unwrap_or("-");
    println!("  design file   {} ({})", display_name.bright_blue(), file_key);

    match state.cache.document() {
        Some(document) => println!(
            "  revision      {} ({} layers)",
            document.revision_stamp,
            document.node_count()
        ),
        None => println!("  revision      {}", "not fetched".yellow()),
    }

    let refreshed = state
        .last_refreshed_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("  refreshed     {}", refreshed);

    let drawn = controller.decorations().count();
    println!(
        "  links         {} ({} matched in stylesheet)",
        state.links.len(),
        drawn
    );

    if let Some(index) = controller.index() {
        println!("  rules         {}", index.len());
        if !index.skipped().is_empty() {
            println!(
                "  {} {} regions could not be parsed",
                "!".yellow(),
                index.skipped().len()
            );
        }
    }

    Ok(())
}
