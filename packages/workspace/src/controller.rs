//! # Sync Controller
//!
//! Orchestrates the cache, layer tree, selector index, link store and
//! annotations for the active stylesheet. All core state lives in one
//! `SyncController` value driven by a single event loop, so nothing here is
//! shared or locked. The only suspension points are remote fetches,
//! persistence I/O and the debounce timer.
//!
//! Background fetches run in their own tasks and report back through a
//! completion queue. Every fetch is stamped with the controller's generation
//! at spawn time; activating another file, attaching, removing sync or
//! starting a newer fetch bumps the generation, and completions carrying an
//! older stamp are dropped.

use crate::annotations::{AnnotationManager, Decoration, DecorationHost};
use crate::cache::CacheUpdate;
use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::layers::Layer;
use crate::links::Link;
use crate::remote::{FetchedDocument, RemoteSource};
use crate::state::FileSyncState;
use crate::store::StateStore;
use chrono::Utc;
use stylesync_common::{SyncError, SyncResult};
use stylesync_parser::{SelectorIndex, SourceRange};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

const NOTIFICATION_CAPACITY: usize = 64;

/// A change to the stylesheet text. `range: None` replaces the whole text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Option<SourceRange>,
    pub text: String,
}

impl TextEdit {
    pub fn replace(range: SourceRange, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }

    pub fn replace_all(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    /// Apply to `document`. Returns false, leaving `document` untouched, when
    /// the range does not fit the text.
    pub fn apply(&self, document: &mut String) -> bool {
        let Some(range) = self.range else {
            document.clone_from(&self.text);
            return true;
        };

        let fits = range.start <= range.end
            && range.end <= document.len()
            && document.is_char_boundary(range.start)
            && document.is_char_boundary(range.end);
        if fits {
            document.replace_range(range.start..range.end, &self.text);
        }
        fits
    }
}

/// Signals for the host UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotification {
    /// The layer tree must be re-read
    TreeChanged,
    LinksChanged,
    DecorationsUpdated,
    /// Something the user should see
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Replaced,
    Unchanged,
    /// The result arrived for a file or generation that is no longer current
    Discarded,
}

impl From<CacheUpdate> for RefreshOutcome {
    fn from(update: CacheUpdate) -> Self {
        match update {
            CacheUpdate::Replaced => RefreshOutcome::Replaced,
            CacheUpdate::Unchanged => RefreshOutcome::Unchanged,
        }
    }
}

type Reply<T> = oneshot::Sender<SyncResult<T>>;

/// Requests accepted by the event loop
#[derive(Debug)]
pub enum SyncEvent {
    Activate {
        uri: String,
        text: String,
        reply: Reply<()>,
    },
    DocumentChanged {
        uri: String,
        edit: TextEdit,
    },
    Attach {
        file_key: String,
        reply: Reply<()>,
    },
    Refresh {
        reply: Reply<()>,
    },
    Link {
        layer_id: String,
        selector: String,
        reply: Reply<Vec<Link>>,
    },
    Unlink {
        layer_id: String,
        reply: Reply<Option<Link>>,
    },
    RemoveSync {
        reply: Reply<()>,
    },
    Shutdown,
}

/// Cloneable front door to a running controller
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl SyncHandle {
    async fn request<T>(&self, event: impl FnOnce(Reply<T>) -> SyncEvent) -> SyncResult<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(event(reply))
            .map_err(|_| SyncError::ControllerStopped)?;
        response.await.map_err(|_| SyncError::ControllerStopped)?
    }

    pub async fn activate(
        &self,
        uri: impl Into<String>,
        text: impl Into<String>,
    ) -> SyncResult<()> {
        let (uri, text) = (uri.into(), text.into());
        self.request(|reply| SyncEvent::Activate { uri, text, reply })
            .await
    }

    /// Fire and forget; edits are coalesced by the debounce slot
    pub fn document_changed(&self, uri: impl Into<String>, edit: TextEdit) -> SyncResult<()> {
        self.tx
            .send(SyncEvent::DocumentChanged {
                uri: uri.into(),
                edit,
            })
            .map_err(|_| SyncError::ControllerStopped)
    }

    pub async fn attach(&self, file_key: impl Into<String>) -> SyncResult<()> {
        let file_key = file_key.into();
        self.request(|reply| SyncEvent::Attach { file_key, reply })
            .await
    }

    /// Starts a background refresh; the outcome arrives as notifications
    pub async fn refresh(&self) -> SyncResult<()> {
        self.request(|reply| SyncEvent::Refresh { reply }).await
    }

    pub async fn link(
        &self,
        layer_id: impl Into<String>,
        selector: impl Into<String>,
    ) -> SyncResult<Vec<Link>> {
        let (layer_id, selector) = (layer_id.into(), selector.into());
        self.request(|reply| SyncEvent::Link {
            layer_id,
            selector,
            reply,
        })
        .await
    }

    pub async fn unlink(&self, layer_id: impl Into<String>) -> SyncResult<Option<Link>> {
        let layer_id = layer_id.into();
        self.request(|reply| SyncEvent::Unlink { layer_id, reply })
            .await
    }

    pub async fn remove_sync(&self) -> SyncResult<()> {
        self.request(|reply| SyncEvent::RemoveSync { reply }).await
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(SyncEvent::Shutdown);
    }
}

enum FetchPurpose {
    Refresh,
    /// A handle's attach request, answered once the fetch is applied
    Attach { file_key: String, reply: Reply<()> },
}

struct FetchCompletion {
    uri: String,
    generation: u64,
    purpose: FetchPurpose,
    result: SyncResult<FetchedDocument>,
}

struct ActiveFile {
    uri: String,
    text: String,
    state: FileSyncState,
    index: SelectorIndex,
}

enum Step {
    Event(SyncEvent),
    Completion(FetchCompletion),
    Fire,
    Stop,
}

pub struct SyncController<S, R, H> {
    config: SyncConfig,
    store: S,
    remote: R,
    annotations: AnnotationManager<H>,
    credential: Option<String>,
    active: Option<ActiveFile>,
    debouncer: Debouncer<String>,
    generation: u64,
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,
    events_tx: mpsc::WeakUnboundedSender<SyncEvent>,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
    notifications: broadcast::Sender<SyncNotification>,
}

impl<S, R, H> SyncController<S, R, H>
where
    S: StateStore,
    R: RemoteSource,
    H: DecorationHost,
{
    /// The controller only keeps a weak reference to its event queue, so the
    /// loop in `run` ends once every handle has been dropped.
    pub fn new(config: SyncConfig, store: S, remote: R, host: H) -> (Self, SyncHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let controller = Self {
            annotations: AnnotationManager::new(host, config.style_token.clone()),
            debouncer: Debouncer::new(config.change_wait()),
            config,
            store,
            remote,
            credential: None,
            active: None,
            generation: 0,
            events_rx,
            events_tx: events_tx.downgrade(),
            completions_tx,
            completions_rx,
            notifications,
        };

        (controller, SyncHandle { tx: events_tx })
    }

    pub fn set_credential(&mut self, credential: Option<String>) {
        self.credential = credential;
    }

    /// Another handle, while at least one is still alive
    pub fn handle(&self) -> Option<SyncHandle> {
        self.events_tx.upgrade().map(|tx| SyncHandle { tx })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotification> {
        self.notifications.subscribe()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn annotations(&self) -> &AnnotationManager<H> {
        &self.annotations
    }

    pub fn decorations(&self) -> impl Iterator<Item = &Decoration> {
        self.annotations.decorations()
    }

    pub fn active_uri(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.uri.as_str())
    }

    pub fn state(&self) -> Option<&FileSyncState> {
        self.active.as_ref().map(|active| &active.state)
    }

    pub fn index(&self) -> Option<&SelectorIndex> {
        self.active.as_ref().map(|active| &active.index)
    }

    /// Current text of the active file, including unreconciled edits
    pub fn text(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.text.as_str())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| self.debouncer.is_pending(&active.uri))
    }

    pub fn get_roots(&self) -> Vec<Layer> {
        match &self.active {
            Some(active) => active.state.layer_tree().roots(),
            None => Vec::new(),
        }
    }

    pub fn get_children(&self, layer_id: &str) -> Vec<Layer> {
        match &self.active {
            Some(active) => active.state.layer_tree().get_children(layer_id),
            None => Vec::new(),
        }
    }

    /// Selector enclosing a 0-based line of the last reconciled text
    pub fn selector_at(&self, line: usize) -> Option<&str> {
        self.active.as_ref()?.index.token_at(line)
    }

    /// Make `uri` the active file: load its state, parse `text` and draw its
    /// decorations. The previous file's pending reconciliation and in-flight
    /// fetches are abandoned.
    pub async fn activate(
        &mut self,
        uri: impl Into<String>,
        text: impl Into<String>,
    ) -> SyncResult<()> {
        let uri = uri.into();
        let text = text.into();

        if let Some(previous) = self.active.take() {
            self.debouncer.cancel(&previous.uri);
            tracing::debug!(uri = %previous.uri, "Deactivated file");
        }
        self.annotations.clear();
        self.generation += 1;

        let state = self.store.load(&uri).await?;
        let index = SelectorIndex::parse(&text);

        tracing::info!(
            uri = %uri,
            attached = state.is_attached(),
            links = state.links.len(),
            scopes = index.len(),
            "Activated file"
        );

        self.active = Some(ActiveFile {
            uri,
            text,
            state,
            index,
        });
        self.reconcile_all();

        self.notify(SyncNotification::TreeChanged);
        self.notify(SyncNotification::DecorationsUpdated);
        Ok(())
    }

    /// Bind the active file to a design document and fetch it
    pub async fn attach(&mut self, file_key: impl Into<String>) -> SyncResult<()> {
        let file_key = file_key.into();
        let (_, credential) = self.begin_attach()?;

        let fetched = self.fetch(&file_key, &credential).await?;
        self.apply_attach(file_key, fetched).await.map(|_| ())
    }

    /// `attach` for the event loop: the fetch runs in its own task and
    /// `reply` is answered when its completion is applied, so other requests
    /// are served in the meantime.
    fn attach_in_background(&mut self, file_key: String, reply: Reply<()>) {
        let (uri, credential) = match self.begin_attach() {
            Ok(target) => target,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };

        tracing::debug!(uri = %uri, file_key = %file_key, "Starting attach fetch");
        let purpose = FetchPurpose::Attach {
            file_key: file_key.clone(),
            reply,
        };
        self.spawn_fetch(uri, file_key, credential, purpose);
    }

    fn begin_attach(&mut self) -> SyncResult<(String, String)> {
        let credential = self.credential()?.to_string();
        let uri = self
            .active
            .as_ref()
            .ok_or(SyncError::NoActiveFile)?
            .uri
            .clone();
        self.generation += 1;
        Ok((uri, credential))
    }

    async fn apply_attach(
        &mut self,
        file_key: String,
        fetched: FetchedDocument,
    ) -> SyncResult<RefreshOutcome> {
        let active = self.active.as_mut().ok_or(SyncError::NoActiveFile)?;
        let snapshot = active.state.clone();

        if active.state.file_key.as_deref() != Some(file_key.as_str()) {
            // Links point at layers of the previous document
            active.state = FileSyncState::attached(file_key.clone());
        }
        active.state.file_display_name = fetched.display_name;
        active.state.last_refreshed_at = Some(Utc::now());
        let update = active.state.cache.offer(fetched.document);

        self.commit(move |state| *state = snapshot).await?;

        tracing::info!(file_key = %file_key, "Attached design document");
        self.reconcile_all();
        self.notify(SyncNotification::TreeChanged);
        self.notify(SyncNotification::LinksChanged);
        self.notify(SyncNotification::DecorationsUpdated);
        Ok(update.into())
    }

    /// Start a background fetch of the attached document. The result is
    /// applied when the event loop receives it, unless it has gone stale.
    pub fn refresh(&mut self) -> SyncResult<()> {
        let (uri, file_key) = self.refresh_target()?;
        let credential = self.credential()?.to_string();

        self.generation += 1;
        tracing::debug!(uri = %uri, generation = self.generation, "Starting background refresh");
        self.spawn_fetch(uri, file_key, credential, FetchPurpose::Refresh);
        Ok(())
    }

    /// Fetch in a separate task, stamped with the current generation
    fn spawn_fetch(
        &self,
        uri: String,
        file_key: String,
        credential: String,
        purpose: FetchPurpose,
    ) {
        let generation = self.generation;
        let remote = self.remote.clone();
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            let result = remote.fetch_document(&file_key, &credential).await;
            let _ = completions.send(FetchCompletion {
                uri,
                generation,
                purpose,
                result,
            });
        });
    }

    /// Fetch the attached document and apply it before returning
    pub async fn refresh_now(&mut self) -> SyncResult<RefreshOutcome> {
        let (_, file_key) = self.refresh_target()?;
        let credential = self.credential()?.to_string();
        self.generation += 1;

        let fetched = self.fetch(&file_key, &credential).await?;
        self.apply_fetched(fetched).await
    }

    /// Wait for the next background fetch to finish and apply it. A pending
    /// attach request is answered as part of applying its fetch.
    pub async fn wait_for_refresh(&mut self) -> SyncResult<RefreshOutcome> {
        match self.completions_rx.recv().await {
            Some(completion) => self.apply_completion(completion).await,
            None => Err(SyncError::ControllerStopped),
        }
    }

    /// Bind `layer_id` to `selector`, displacing whatever either side was
    /// bound to. Returns the displaced links.
    pub async fn link(&mut self, layer_id: &str, selector: &str) -> SyncResult<Vec<Link>> {
        self.flush_pending();

        let active = self.active.as_mut().ok_or(SyncError::NoActiveFile)?;
        if !active.state.is_attached() {
            return Err(SyncError::NotAttached);
        }

        let layer_path = active
            .state
            .layer_tree()
            .path_to(layer_id)
            .ok_or_else(|| SyncError::unknown_layer(layer_id))?;
        let link = Link::new(layer_id, selector, layer_path);

        if active.state.links.get(layer_id) == Some(&link) {
            return Ok(Vec::new());
        }

        let snapshot = active.state.links.clone();
        let displaced = active.state.links.add_or_replace(link.clone());
        self.commit(move |state| state.links = snapshot).await?;

        for previous in displaced.iter().filter(|l| l.layer_id != link.layer_id) {
            self.annotations.unlink(&previous.layer_id);
        }
        if let Some(active) = &self.active {
            self.annotations.render_link(&link, &active.index);
        }

        tracing::info!(
            layer_id,
            selector,
            displaced = displaced.len(),
            "Linked layer"
        );
        self.notify(SyncNotification::LinksChanged);
        self.notify(SyncNotification::DecorationsUpdated);
        Ok(displaced)
    }

    /// Remove the link of `layer_id`. Unlinking an unlinked layer is a no-op.
    pub async fn unlink(&mut self, layer_id: &str) -> SyncResult<Option<Link>> {
        let active = self.active.as_mut().ok_or(SyncError::NoActiveFile)?;
        if active.state.links.get(layer_id).is_none() {
            return Ok(None);
        }

        let snapshot = active.state.links.clone();
        let removed = active.state.links.remove(layer_id);
        self.commit(move |state| state.links = snapshot).await?;

        self.annotations.unlink(layer_id);
        tracing::info!(layer_id, "Unlinked layer");
        self.notify(SyncNotification::LinksChanged);
        self.notify(SyncNotification::DecorationsUpdated);
        Ok(removed)
    }

    /// Forget the design document and every link of the active file
    pub async fn remove_sync(&mut self) -> SyncResult<()> {
        let active = self.active.as_mut().ok_or(SyncError::NoActiveFile)?;
        let snapshot = std::mem::take(&mut active.state);

        if let Err(err) = self.store.clear(&active.uri).await {
            tracing::error!(uri = %active.uri, error = %err, "Failed to remove sync state");
            active.state = snapshot;
            return Err(err);
        }

        tracing::info!(uri = %active.uri, "Removed sync");
        self.generation += 1;
        self.reconcile_all();
        self.notify(SyncNotification::TreeChanged);
        self.notify(SyncNotification::LinksChanged);
        self.notify(SyncNotification::DecorationsUpdated);
        Ok(())
    }

    /// Record an edit to the active file and (re)start its debounce slot
    pub fn document_changed(&mut self, uri: &str, edit: TextEdit) {
        let Some(active) = self.active.as_mut().filter(|active| active.uri == uri) else {
            tracing::debug!(uri, "Ignoring edit to inactive file");
            return;
        };

        if !edit.apply(&mut active.text) {
            tracing::warn!(uri, range = ?edit.range, "Edit does not fit document, ignoring");
            return;
        }

        if self.debouncer.schedule(uri.to_string(), Instant::now()) {
            tracing::debug!(uri, "Superseded pending reconciliation");
        }
    }

    /// Reconcile every file whose debounce slot expired by `now`. Returns
    /// whether the active file was reconciled.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        let due = self.debouncer.take_due(now);
        let fired = self
            .active
            .as_ref()
            .is_some_and(|active| due.contains(&active.uri));

        if fired {
            self.reconcile_edits();
        }
        fired
    }

    /// Drive the controller from its event queue until shutdown or until
    /// every handle is dropped. Returns the controller for inspection.
    pub async fn run(mut self) -> Self {
        tracing::debug!("Sync controller running");

        loop {
            let deadline = self.debouncer.next_deadline();

            let step = tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(SyncEvent::Shutdown) | None => Step::Stop,
                    Some(event) => Step::Event(event),
                },
                Some(completion) = self.completions_rx.recv() => Step::Completion(completion),
                _ = sleep_until(deadline) => Step::Fire,
            };

            match step {
                Step::Event(event) => self.handle_event(event).await,
                Step::Completion(completion) => {
                    // Attach errors go back through the request's reply
                    let answered = matches!(completion.purpose, FetchPurpose::Attach { .. });
                    if let Err(err) = self.apply_completion(completion).await {
                        if !answered {
                            self.report(&err);
                        }
                    }
                }
                Step::Fire => {
                    self.fire_due(Instant::now());
                }
                Step::Stop => break,
            }
        }

        tracing::debug!("Sync controller stopped");
        self
    }

    async fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Activate { uri, text, reply } => {
                let result = self.activate(uri, text).await;
                if result.is_ok() {
                    self.refresh_if_attached();
                }
                let _ = reply.send(result);
            }
            SyncEvent::DocumentChanged { uri, edit } => self.document_changed(&uri, edit),
            SyncEvent::Attach { file_key, reply } => self.attach_in_background(file_key, reply),
            SyncEvent::Refresh { reply } => {
                let _ = reply.send(self.refresh());
            }
            SyncEvent::Link {
                layer_id,
                selector,
                reply,
            } => {
                let _ = reply.send(self.link(&layer_id, &selector).await);
            }
            SyncEvent::Unlink { layer_id, reply } => {
                let _ = reply.send(self.unlink(&layer_id).await);
            }
            SyncEvent::RemoveSync { reply } => {
                let _ = reply.send(self.remove_sync().await);
            }
            SyncEvent::Shutdown => {}
        }
    }

    fn refresh_if_attached(&mut self) {
        let attached = self
            .active
            .as_ref()
            .is_some_and(|active| active.state.is_attached());
        if attached && self.credential.is_some() {
            if let Err(err) = self.refresh() {
                tracing::debug!(error = %err, "Skipped refresh on activation");
            }
        }
    }

    async fn apply_completion(
        &mut self,
        completion: FetchCompletion,
    ) -> SyncResult<RefreshOutcome> {
        let FetchCompletion {
            uri,
            generation,
            purpose,
            result,
        } = completion;
        let current = self.active.as_ref().is_some_and(|active| active.uri == uri);

        if !current || generation != self.generation {
            tracing::warn!(
                uri = %uri,
                generation,
                current_generation = self.generation,
                "Discarding stale fetch result"
            );
            if let FetchPurpose::Attach { reply, .. } = purpose {
                let _ = reply.send(Err(SyncError::Superseded));
            }
            return Ok(RefreshOutcome::Discarded);
        }

        let result = result.inspect_err(|err| {
            tracing::warn!(uri = %uri, error = %err, "Background fetch failed");
        });

        match purpose {
            FetchPurpose::Refresh => self.apply_fetched(result?).await,
            FetchPurpose::Attach { file_key, reply } => {
                let outcome = match result {
                    Ok(fetched) => self.apply_attach(file_key, fetched).await,
                    Err(err) => Err(err),
                };
                let _ = reply.send(outcome.clone().map(|_| ()));
                outcome
            }
        }
    }

    async fn apply_fetched(&mut self, fetched: FetchedDocument) -> SyncResult<RefreshOutcome> {
        let active = self.active.as_mut().ok_or(SyncError::NoActiveFile)?;
        let snapshot = active.state.clone();

        if fetched.display_name.is_some() {
            active.state.file_display_name = fetched.display_name;
        }
        active.state.last_refreshed_at = Some(Utc::now());
        let update = active.state.cache.offer(fetched.document);

        self.commit(move |state| *state = snapshot).await?;

        match update {
            CacheUpdate::Replaced => self.notify(SyncNotification::TreeChanged),
            CacheUpdate::Unchanged => tracing::debug!("Design document is up to date"),
        }
        Ok(update.into())
    }

    async fn fetch(&self, file_key: &str, credential: &str) -> SyncResult<FetchedDocument> {
        self.remote
            .fetch_document(file_key, credential)
            .await
            .inspect_err(|err| {
                tracing::warn!(file_key, error = %err, "Failed to fetch design document");
            })
    }

    /// Persist the active state. On failure the in-memory state is rolled
    /// back with `rollback` and the error is returned.
    async fn commit(&mut self, rollback: impl FnOnce(&mut FileSyncState) + Send) -> SyncResult<()> {
        let active = self.active.as_mut().ok_or(SyncError::NoActiveFile)?;

        if let Err(err) = self.store.save(&active.uri, &active.state).await {
            tracing::error!(
                uri = %active.uri,
                error = %err,
                "Failed to persist sync state, rolling back"
            );
            rollback(&mut active.state);
            return Err(err);
        }
        Ok(())
    }

    /// Re-parse the active text and redraw only the layers whose range
    /// changed
    fn reconcile_edits(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        active.index = SelectorIndex::parse(&active.text);
        let stale = self.annotations.stale_layers(&active.state.links, &active.index);
        self.annotations.reconcile_layers(
            stale.iter().map(String::as_str),
            &active.state.links,
            &active.index,
        );

        tracing::debug!(
            uri = %active.uri,
            scopes = active.index.len(),
            redrawn = stale.len(),
            "Reconciled edits"
        );

        if !stale.is_empty() {
            self.notify(SyncNotification::DecorationsUpdated);
        }
    }

    /// Apply a pending reconciliation immediately so link targets resolve
    /// against the text the user sees
    fn flush_pending(&mut self) {
        let pending = self
            .active
            .as_ref()
            .is_some_and(|active| self.debouncer.cancel(&active.uri));
        if pending {
            self.reconcile_edits();
        }
    }

    fn reconcile_all(&mut self) {
        match &self.active {
            Some(active) => self
                .annotations
                .reconcile_all(&active.state.links, &active.index),
            None => self.annotations.clear(),
        }
    }

    fn refresh_target(&self) -> SyncResult<(String, String)> {
        let active = self.active.as_ref().ok_or(SyncError::NoActiveFile)?;
        let file_key = active
            .state
            .file_key
            .clone()
            .ok_or(SyncError::NotAttached)?;
        Ok((active.uri.clone(), file_key))
    }

    fn credential(&self) -> SyncResult<&str> {
        self.credential
            .as_deref()
            .ok_or_else(|| SyncError::remote_fetch_failed("no access token configured"))
    }

    fn report(&self, err: &SyncError) {
        if err.is_user_facing() {
            self.notify(SyncNotification::Message(err.to_string()));
        }
    }

    fn notify(&self, notification: SyncNotification) {
        // No subscribers is fine
        let _ = self.notifications.send(notification);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_edit_replace_range() {
        let mut text = ".header { color: red; }".to_string();
        assert!(TextEdit::replace(SourceRange::new(1, 7), "banner").apply(&mut text));
        assert_eq!(text, ".banner { color: red; }");
    }

    #[test]
    fn test_text_edit_rejects_out_of_bounds() {
        let mut text = ".a { }".to_string();
        assert!(!TextEdit::replace(SourceRange::new(4, 40), "x").apply(&mut text));
        assert!(!TextEdit::replace(SourceRange::new(5, 2), "x").apply(&mut text));
        assert_eq!(text, ".a { }");
    }

    #[test]
    fn test_text_edit_rejects_split_char() {
        let mut text = ".é { }".to_string();
        assert!(!TextEdit::replace(SourceRange::new(2, 3), "e").apply(&mut text));
    }

    #[test]
    fn test_text_edit_replace_all() {
        let mut text = "old".to_string();
        assert!(TextEdit::replace_all("new").apply(&mut text));
        assert_eq!(text, "new");
    }
}
