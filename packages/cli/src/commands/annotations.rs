use super::Context;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stylesync_workspace::{Decoration, RecordingHost};

#[derive(Debug, Args)]
pub struct AnnotationsArgs {
    /// Synced stylesheet
    pub file: PathBuf,

    /// Print decorations as JSON
    #[arg(long)]
    pub json: bool,
}

/// Print the decorations the stylesheet would currently show
pub async fn annotations(args: AnnotationsArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open(&args.file, RecordingHost::new()).await?;
    let controller = &session.controller;
    let index = controller.index().ok_or_else(|| anyhow!("No active file"))?;

    let decorations: Vec<&Decoration> = controller.decorations().collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decorations)?);
        return Ok(());
    }

    if decorations.is_empty() {
        println!("{}", "No linked rules".dimmed());
    }

    for decoration in &decorations {
        let line = index.line_of(decoration.range.start) + 1;
        let mut hover = decoration.hover_text.lines();
        println!(
            "{:>5}  {}  {}",
            line.to_string().dimmed(),
            decoration.selector.bright_blue(),
            hover.next().unwrap_or_default()
        );
    }

    // Links whose selector is missing from the stylesheet
    if let Some(state) = controller.state() {
        for link in state
            .links
            .all()
            .filter(|link| controller.annotations().decoration(&link.layer_id).is_none())
        {
            println!(
                "{:>5}  {}  {} {}",
                "-".dimmed(),
                link.selector.yellow(),
                "unmatched:".yellow(),
                link.layer_path.join(" › ")
            );
        }
    }

    Ok(())
}
