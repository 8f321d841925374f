//! Synchronization engine between a stylesheet and a remote design document.
//!
//! `SyncController` owns the state of the active file and reacts to
//! activation, edits, link mutations and remote refreshes. The remaining
//! modules are the pieces it composes: the cached document and its layer
//! view, the link store, persistence, the remote client and annotations.

pub mod annotations;
pub mod cache;
pub mod config;
pub mod controller;
pub mod debounce;
mod json;
pub mod layers;
pub mod links;
pub mod remote;
pub mod state;
pub mod store;
pub mod watcher;

pub use annotations::{
    AnnotationManager, Decoration, DecorationHandle, DecorationHost, RecordingHost,
};
pub use cache::{should_refetch, CacheUpdate, RemoteTreeCache};
pub use config::SyncConfig;
pub use controller::{
    RefreshOutcome, SyncController, SyncEvent, SyncHandle, SyncNotification, TextEdit,
};
pub use debounce::Debouncer;
pub use layers::{Layer, LayerIndex, LayerTree};
pub use links::{Link, LinkStore};
pub use remote::{decode_file_response, FetchedDocument, HttpRemoteSource, RemoteSource};
pub use state::FileSyncState;
pub use store::{JsonStateStore, MemoryStateStore, StateStore};
pub use watcher::{StylesheetWatcher, WatcherError, WatcherResult};
