use super::Context;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stylesync_workspace::RecordingHost;

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Synced stylesheet
    pub file: PathBuf,

    /// Layer to link (see `stylesync layers`)
    pub layer_id: String,

    /// Selector to link the layer to
    #[arg(long, conflicts_with = "line", required_unless_present = "line")]
    pub selector: Option<String>,

    /// Link the rule enclosing this line instead (1-based)
    #[arg(long)]
    pub line: Option<usize>,
}

pub async fn link(args: LinkArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.open(&args.file, RecordingHost::new()).await?;

    let selector = match (args.selector, args.line) {
        (Some(selector), _) => selector,
        (None, Some(line)) => session
            .controller
            .selector_at(line.saturating_sub(1))
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("No rule encloses line {}", line))?,
        (None, None) => return Err(anyhow!("Pass --selector or --line")),
    };

    let displaced = session.controller.link(&args.layer_id, &selector).await?;

    let path = session
        .controller
        .state()
        .and_then(|state| state.links.get(&args.layer_id))
        .map(|link| link.layer_path.join(" › "))
        .unwrap_or_default();
    println!(
        "{} Linked {} to {}",
        "✓".green(),
        path.bold(),
        selector.bright_blue()
    );

    for previous in displaced
        .iter()
        .filter(|previous| previous.layer_id != args.layer_id)
    {
        println!(
            "  {} {} is no longer linked to {}",
            "-".yellow(),
            previous.layer_path.join(" › "),
            previous.selector
        );
    }

    if session.controller.annotations().decoration(&args.layer_id).is_none() {
        println!(
            "  {} {} does not match a rule in {}; the link is kept",
            "!".yellow(),
            selector,
            args.file.display()
        );
    }

    Ok(())
}
