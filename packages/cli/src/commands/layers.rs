use super::Context;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stylesync_workspace::{Layer, RecordingHost};

#[derive(Debug, Args)]
pub struct LayersArgs {
    /// Synced stylesheet
    pub file: PathBuf,

    /// Only expand this many levels
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Only list linked layers
    #[arg(long)]
    pub linked: bool,
}

/// Print the cached layer tree, marking linked layers
pub async fn layers(args: LayersArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open(&args.file, RecordingHost::new()).await?;
    let controller = &session.controller;

    let state = controller.state().ok_or_else(|| anyhow!("No active file"))?;
    if !state.is_attached() {
        return Err(anyhow!(
            "{} is not attached to a design document; run `stylesync attach` first",
            args.file.display()
        ));
    }

    let mut stack: Vec<(Layer, usize)> = controller
        .get_roots()
        .into_iter()
        .rev()
        .map(|layer| (layer, 0))
        .collect();

    while let Some((layer, depth)) = stack.pop() {
        if !args.linked || layer.linked_selector.is_some() {
            print_layer(&layer, depth);
        }

        if layer.expandable && args.depth.map_or(true, |max| depth < max) {
            let children = controller.get_children(&layer.id);
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
    }

    Ok(())
}

fn print_layer(layer: &Layer, depth: usize) {
    let marker = if layer.expandable { "▸" } else { "·" };
    let indent = "  ".repeat(depth);

    match &layer.linked_selector {
        Some(selector) => println!(
            "{}{} {} {} {}  {} {}",
            indent,
            marker,
            layer.display_name.bold(),
            layer.kind.to_string().dimmed(),
            layer.id.dimmed(),
            "→".green(),
            selector.bright_blue()
        ),
        None => println!(
            "{}{} {} {} {}",
            indent,
            marker,
            layer.display_name,
            layer.kind.to_string().dimmed(),
            layer.id.dimmed()
        ),
    }
}
