use super::{short_name, Context};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stylesync_workspace::RecordingHost;

#[derive(Debug, Args)]
pub struct AttachArgs {
    /// Stylesheet to sync
    pub file: PathBuf,

    /// Design file key, or a design file URL
    pub file_key: String,
}

pub async fn attach(args: AttachArgs, ctx: &Context) -> Result<()> {
    let file_key = parse_file_key(&args.file_key)
        .ok_or_else(|| anyhow!("Cannot find a file key in {:?}", args.file_key))?;

    let mut session = ctx.open(&args.file, RecordingHost::new()).await?;
    session.controller.attach(file_key).await?;

    let state = session
        .controller
        .state()
        .ok_or_else(|| anyhow!("No active file"))?;
    let document = state.cache.document();

    println!(
        "{} Attached {} to {}",
        "✓".green(),
        short_name(&session.path).bold(),
        state
            .file_display_name
            .as_deref()
            .unwrap_or(file_key)
            .bright_blue()
    );
    if let Some(document) = document {
        println!(
            "  {} layers, revision {}",
            document.node_count(),
            document.revision_stamp
        );
    }

    Ok(())
}

/// Accept a bare key or a URL such as `https://www.figma.com/file/<key>/Name`
pub fn parse_file_key(input: &str) -> Option<&str> {
    let input = input.trim();
    if !input.contains('/') {
        return (!input.is_empty()).then_some(input);
    }

    let mut segments = input.split(['/', '?', '#']);
    while let Some(segment) = segments.next() {
        if matches!(segment, "file" | "design" | "proto" | "board") {
            return segments.next().filter(|key| !key.is_empty());
        }
    }
    None
}
