use super::{file_uri, short_name, Context};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;
use stylesync_parser::SourceRange;
use stylesync_workspace::{DecorationHandle, DecorationHost, StylesheetWatcher, SyncNotification};
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stylesheet to watch
    pub file: PathBuf,
}

/// Draws decorations as lines on stdout
#[derive(Default)]
struct PrintingHost {
    next_handle: u64,
    labels: HashMap<DecorationHandle, String>,
}

impl DecorationHost for PrintingHost {
    fn render(
        &mut self,
        range: SourceRange,
        hover_text: &str,
        _style_token: &str,
    ) -> DecorationHandle {
        self.next_handle += 1;
        let handle = DecorationHandle(self.next_handle);
        let label = hover_text.lines().next().unwrap_or_default().to_string();

        println!("  {} {} {}", "+".green(), range.to_string().dimmed(), label);
        self.labels.insert(handle, label);
        handle
    }

    fn dispose(&mut self, handle: DecorationHandle) {
        if let Some(label) = self.labels.remove(&handle) {
            println!("  {} {}", "-".red(), label);
        }
    }
}

/// Keep a stylesheet's decorations up to date as it changes on disk
pub async fn watch(args: WatchArgs, ctx: &Context) -> Result<()> {
    let (path, text) = ctx.read(&args.file).await?;
    let uri = file_uri(&path);

    let (controller, handle) = ctx.controller(PrintingHost::default());
    let mut notifications = controller.subscribe();
    let running = tokio::spawn(controller.run());

    println!(
        "{} Watching {} (Ctrl-C to stop)",
        "👀".bright_blue(),
        short_name(&path).bold()
    );
    handle.activate(uri.clone(), text).await?;
    let _watcher = StylesheetWatcher::new(path.clone(), uri, handle.clone())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notification = notifications.recv() => match notification {
                Ok(SyncNotification::Message(message)) => {
                    println!("  {} {}", "!".yellow(), message);
                }
                Ok(SyncNotification::TreeChanged) => {
                    println!("  {}", "design document updated".dimmed());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Notification receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown();
    running.await?;
    println!("{} Stopped", "✓".green());
    Ok(())
}
