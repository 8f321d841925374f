use super::Context;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stylesync_workspace::RecordingHost;

#[derive(Debug, Args)]
pub struct UnlinkArgs {
    /// Synced stylesheet
    pub file: PathBuf,

    /// Layer to unlink
    pub layer_id: String,
}

pub async fn unlink(args: UnlinkArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.open(&args.file, RecordingHost::new()).await?;

    match session.controller.unlink(&args.layer_id).await? {
        Some(link) => println!(
            "{} Unlinked {} from {}",
            "✓".green(),
            link.layer_path.join(" › ").bold(),
            link.selector.bright_blue()
        ),
        None => println!("{} Layer {} was not linked", "✓".green(), args.layer_id),
    }

    Ok(())
}
