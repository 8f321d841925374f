#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stylesync_common::{NodeKind, RawNode, RemoteDocument, SyncError, SyncResult};
use stylesync_workspace::{
    FetchedDocument, MemoryStateStore, RecordingHost, RemoteSource, SyncConfig, SyncController,
    SyncHandle,
};

pub const URI: &str = "file:///project/styles/site.less";
pub const OTHER_URI: &str = "file:///project/styles/admin.less";
pub const FILE_KEY: &str = "FgK3yQ2";

pub const SHEET: &str = ".header {\n    color: red;\n}\n\n.footer {\n    margin: 0;\n}\n";

pub type TestController = SyncController<MemoryStateStore, StubRemote, RecordingHost>;

/// Serves whatever document it was last told to, counting fetches. With a
/// latency set, each response is held back by that long.
#[derive(Clone, Default)]
pub struct StubRemote {
    inner: Arc<Mutex<StubState>>,
}

#[derive(Default)]
struct StubState {
    response: Option<SyncResult<FetchedDocument>>,
    latency: Option<Duration>,
    fetches: usize,
}

impl StubRemote {
    pub fn serving(fetched: FetchedDocument) -> Self {
        let remote = Self::default();
        remote.serve(fetched);
        remote
    }

    pub fn serve(&self, fetched: FetchedDocument) {
        self.inner.lock().unwrap().response = Some(Ok(fetched));
    }

    pub fn fail(&self, cause: &str) {
        self.inner.lock().unwrap().response = Some(Err(SyncError::remote_fetch_failed(cause)));
    }

    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().unwrap().latency = Some(latency);
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetches
    }
}

impl RemoteSource for StubRemote {
    fn fetch_document(
        &self,
        _file_key: &str,
        _credential: &str,
    ) -> impl Future<Output = SyncResult<FetchedDocument>> + Send {
        let (result, latency) = {
            let mut state = self.inner.lock().unwrap();
            state.fetches += 1;
            let result = state
                .response
                .clone()
                .unwrap_or_else(|| Err(SyncError::remote_fetch_failed("nothing to serve")));
            (result, state.latency)
        };
        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            result
        }
    }
}

/// Page > Header > Logo, plus a top-level Footer
pub fn design(revision_stamp: &str, header_name: &str) -> FetchedDocument {
    FetchedDocument {
        display_name: Some("Marketing Site".to_string()),
        document: RemoteDocument::new(
            revision_stamp,
            vec![
                RawNode::new("1:1", "Page", NodeKind::Frame).with_children(vec![
                    RawNode::new("1:2", header_name, NodeKind::Frame).with_children(vec![
                        RawNode::new("1:3", "Logo", NodeKind::from("VECTOR")),
                    ]),
                ]),
                RawNode::new("1:4", "Footer", NodeKind::Frame),
            ],
        ),
    }
}

pub fn controller(remote: StubRemote, store: MemoryStateStore) -> (TestController, SyncHandle) {
    let (mut controller, handle) =
        SyncController::new(SyncConfig::default(), store, remote, RecordingHost::new());
    controller.set_credential(Some("figd_test".to_string()));
    (controller, handle)
}

/// A controller with `SHEET` active and attached at revision `rev-1`
pub async fn attached() -> (TestController, SyncHandle, StubRemote) {
    let remote = StubRemote::serving(design("rev-1", "Header"));
    let (mut controller, handle) = controller(remote.clone(), MemoryStateStore::new());

    controller.activate(URI, SHEET).await.unwrap();
    controller.attach(FILE_KEY).await.unwrap();
    (controller, handle, remote)
}
