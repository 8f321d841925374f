use super::{short_name, Context};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stylesync_workspace::{RecordingHost, RefreshOutcome};

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Synced stylesheet
    pub file: PathBuf,
}

pub async fn refresh(args: RefreshArgs, ctx: &Context) -> Result<()> {
    let mut session = ctx.open(&args.file, RecordingHost::new()).await?;
    let outcome = session.controller.refresh_now().await?;

    let revision = session
        .controller
        .state()
        .and_then(|state| state.cache.revision_stamp())
        .unwrap_or("-")
        .to_string();

    match outcome {
        RefreshOutcome::Replaced => println!(
            "{} Updated {} to revision {}",
            "✓".green(),
            short_name(&session.path).bold(),
            revision
        ),
        RefreshOutcome::Unchanged | RefreshOutcome::Discarded => println!(
            "{} {} is up to date (revision {})",
            "✓".green(),
            short_name(&session.path).bold(),
            revision
        ),
    }

    Ok(())
}
