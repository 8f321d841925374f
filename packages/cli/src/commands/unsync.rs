use super::{short_name, Context};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stylesync_workspace::RecordingHost;

#[derive(Debug, Args)]
pub struct UnsyncArgs {
    /// Synced stylesheet
    pub file: PathBuf,
}

/// Forget the design document and every link of a stylesheet
pub async fn unsync(args: UnsyncArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.open(&args.file, RecordingHost::new()).await?;

    let links = session
        .controller
        .state()
        .map_or(0, |state| state.links.len());
    session.controller.remove_sync().await?;

    println!(
        "{} Removed sync from {} ({} links dropped)",
        "✓".green(),
        short_name(&session.path).bold(),
        links
    );
    Ok(())
}
