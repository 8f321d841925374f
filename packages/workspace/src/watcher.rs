use crate::controller::{SyncHandle, TextEdit};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("Cannot watch {0}: not a file path")]
    NotAFile(PathBuf),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

/// Feeds on-disk changes of one stylesheet into a running controller as
/// whole-document edits.
///
/// The parent directory is watched rather than the file itself so editors
/// that save by writing a new file and renaming it over the old one keep
/// being observed.
pub struct StylesheetWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl StylesheetWatcher {
    pub fn new(
        path: impl Into<PathBuf>,
        uri: impl Into<String>,
        handle: SyncHandle,
    ) -> WatcherResult<Self> {
        let path: PathBuf = path.into();
        if path.file_name().is_none() {
            return Err(WatcherError::NotAFile(path));
        }
        let uri = uri.into();
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let target = path.clone();
        let mut last_text = std::fs::read_to_string(&path).ok();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "File watcher error");
                        return;
                    }
                };

                if !touches(&event, &target) {
                    return;
                }

                let text = match std::fs::read_to_string(&target) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::debug!(path = %target.display(), error = %err, "Stylesheet unreadable");
                        return;
                    }
                };

                if last_text.as_deref() == Some(text.as_str()) {
                    return;
                }
                last_text = Some(text.clone());

                if handle
                    .document_changed(uri.clone(), TextEdit::replace_all(text))
                    .is_err()
                {
                    tracing::debug!("Controller stopped, dropping file change");
                }
            },
            Config::default(),
        )?;

        watcher.watch(&parent, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Watching stylesheet");

        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == target.file_name())
}
