//! Async driver for a list controller.
//!
//! A session owns one [`ListController`] and is its only writer. Intents
//! arrive from [`ListHandle`]s over a bounded channel, every issued request
//! runs as its own task, and responses come back over a second channel to
//! be settled on the same loop. Each change is published as a
//! [`ListSnapshot`] on a watch channel.
//!
//! Dropping every handle ends the loop; responses still in flight are then
//! ignored.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{BackofficeError, Result};
use crate::fetch::{
    FetchRequest, FetchResponse, Identified, ListController, ListSource, Settlement, Status,
};
use crate::projection::ListView;
use crate::query::{Filters, QueryState, QueryStore};

const INTENT_CAPACITY: usize = 32;
const RESPONSE_CAPACITY: usize = 32;

/// Patch applied to one record of the accepted page
pub type PatchFn<T> = Box<dyn FnOnce(&mut T) + Send>;

/// What a session publishes after every state change
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T> {
    pub query: QueryState,
    pub view: ListView<T>,
    pub discarded_responses: u64,
}

impl<T> ListSnapshot<T> {
    /// Nothing left to wait for: the latest request has settled either way.
    pub fn is_settled(&self) -> bool {
        !self.view.is_loading && self.view.status != Status::Idle
    }
}

enum Intent<T> {
    SetFilters {
        filters: Filters,
        reply: oneshot::Sender<Result<bool>>,
    },
    SetPage {
        page: u32,
        reply: oneshot::Sender<Result<bool>>,
    },
    SetPageSize {
        size: u32,
        reply: oneshot::Sender<Result<bool>>,
    },
    Refresh {
        reply: oneshot::Sender<Result<bool>>,
    },
    ClampPage {
        reply: oneshot::Sender<Result<bool>>,
    },
    Patch {
        id: String,
        patch: PatchFn<T>,
        reply: oneshot::Sender<bool>,
    },
}

/// Cloneable front end of a running session.
pub struct ListHandle<T> {
    intents: mpsc::Sender<Intent<T>>,
    snapshots: watch::Receiver<ListSnapshot<T>>,
}

impl<T> Clone for ListHandle<T> {
    fn clone(&self) -> Self {
        Self {
            intents: self.intents.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<T> ListHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Replace the filters; always refetches from page 1.
    pub async fn set_filters(&self, filters: Filters) -> Result<bool> {
        self.request(|reply| Intent::SetFilters { filters, reply })
            .await
    }

    /// Returns `Ok(false)` when already on `page`.
    pub async fn set_page(&self, page: u32) -> Result<bool> {
        self.request(|reply| Intent::SetPage { page, reply }).await
    }

    /// Fails with `ValidationFailure` for sizes outside the allowed set.
    pub async fn set_page_size(&self, size: u32) -> Result<bool> {
        self.request(|reply| Intent::SetPageSize { size, reply })
            .await
    }

    pub async fn refresh(&self) -> Result<bool> {
        self.request(|reply| Intent::Refresh { reply }).await
    }

    /// Move back into range after a page size change shrank the page count.
    pub async fn clamp_page(&self) -> Result<bool> {
        self.request(|reply| Intent::ClampPage { reply }).await
    }

    /// Patch the accepted record with `id`. Returns whether one was found.
    pub async fn patch_item<F>(&self, id: impl Into<String>, patch: F) -> Result<bool>
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.intents
            .send(Intent::Patch {
                id: id.into(),
                patch: Box::new(patch),
                reply,
            })
            .await
            .map_err(|_| BackofficeError::SessionClosed)?;
        rx.await.map_err(|_| BackofficeError::SessionClosed)
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<T>> {
        self.snapshots.clone()
    }

    /// Wait until the latest request has settled and return that snapshot.
    pub async fn settled(&self) -> Result<ListSnapshot<T>> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(ListSnapshot::is_settled)
            .await
            .map_err(|_| BackofficeError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    async fn request<F>(&self, build: F) -> Result<bool>
    where
        F: FnOnce(oneshot::Sender<Result<bool>>) -> Intent<T>,
    {
        let (reply, rx) = oneshot::channel();
        self.intents
            .send(build(reply))
            .await
            .map_err(|_| BackofficeError::SessionClosed)?;
        rx.await.map_err(|_| BackofficeError::SessionClosed)?
    }
}

/// The event loop behind a [`ListHandle`]
pub struct ListSession<S: ListSource> {
    source: Arc<S>,
    controller: ListController<S::Item>,
    intents: mpsc::Receiver<Intent<S::Item>>,
    responses_tx: mpsc::Sender<FetchResponse<S::Item>>,
    responses: mpsc::Receiver<FetchResponse<S::Item>>,
    snapshots: watch::Sender<ListSnapshot<S::Item>>,
}

impl<S> ListSession<S>
where
    S: ListSource + 'static,
    S::Item: Identified + Clone + Send + Sync + 'static,
{
    /// Spawn a session over `store` and issue the initial fetch.
    pub fn spawn(source: Arc<S>, store: QueryStore) -> (ListHandle<S::Item>, JoinHandle<()>) {
        let controller = ListController::with_store(store);
        let (intents_tx, intents) = mpsc::channel(INTENT_CAPACITY);
        let (responses_tx, responses) = mpsc::channel(RESPONSE_CAPACITY);
        let (snapshots, snapshots_rx) = watch::channel(ListSnapshot {
            query: controller.query().clone(),
            view: controller.view(),
            discarded_responses: 0,
        });

        let session = ListSession {
            source,
            controller,
            intents,
            responses_tx,
            responses,
            snapshots,
        };
        let task = tokio::spawn(session.run());

        let handle = ListHandle {
            intents: intents_tx,
            snapshots: snapshots_rx,
        };
        (handle, task)
    }

    async fn run(mut self) {
        let request = self.controller.start();
        self.dispatch(request);
        self.publish();

        loop {
            tokio::select! {
                intent = self.intents.recv() => match intent {
                    Some(intent) => self.apply(intent),
                    None => break,
                },
                Some(response) = self.responses.recv() => {
                    if self.controller.settle(response) != Settlement::Discarded {
                        self.publish();
                    } else {
                        self.publish_if_counters_changed();
                    }
                }
            }
        }
        tracing::debug!("list session closed");
    }

    fn apply(&mut self, intent: Intent<S::Item>) {
        match intent {
            Intent::SetFilters { filters, reply } => {
                let request = self.controller.set_filters(filters);
                self.finish(Ok(Some(request)), reply);
            }
            Intent::SetPage { page, reply } => {
                let outcome = self.controller.set_page(page);
                self.finish(outcome, reply);
            }
            Intent::SetPageSize { size, reply } => {
                let outcome = self.controller.set_page_size(size);
                self.finish(outcome, reply);
            }
            Intent::Refresh { reply } => {
                let request = self.controller.refresh();
                self.finish(Ok(Some(request)), reply);
            }
            Intent::ClampPage { reply } => {
                let outcome = self.controller.clamp_page();
                self.finish(outcome, reply);
            }
            Intent::Patch { id, patch, reply } => {
                let found = self.controller.patch_item(&id, patch);
                if found {
                    self.publish();
                }
                let _ = reply.send(found);
            }
        }
    }

    /// Dispatch the request (if any) and report back whether one was issued.
    fn finish(
        &mut self,
        outcome: Result<Option<FetchRequest>>,
        reply: oneshot::Sender<Result<bool>>,
    ) {
        let reply_value = match outcome {
            Ok(Some(request)) => {
                self.dispatch(request);
                self.publish();
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => Err(err),
        };
        let _ = reply.send(reply_value);
    }

    fn dispatch(&self, request: FetchRequest) {
        let source = Arc::clone(&self.source);
        let responses = self.responses_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_page(&request).await;
            let response = FetchResponse::from_result(&request, result);
            // the session may already be gone; nothing to deliver to then
            let _ = responses.send(response).await;
        });
    }

    fn publish(&self) {
        self.snapshots.send_replace(ListSnapshot {
            query: self.controller.query().clone(),
            view: self.controller.view(),
            discarded_responses: self.controller.state().discarded_responses,
        });
    }

    fn publish_if_counters_changed(&self) {
        let discarded = self.controller.state().discarded_responses;
        self.snapshots.send_if_modified(|snapshot| {
            if snapshot.discarded_responses == discarded {
                return false;
            }
            snapshot.discarded_responses = discarded;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::error::FetchErrorKind;
    use crate::fetch::Page;
    use crate::query::{Epoch, FilterValue, PageSizeOptions};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        read: bool,
    }

    impl Identified for Row {
        fn id(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(&self.id))
        }
    }

    fn row(id: &str) -> Row {
        Row {
            id: id.to_string(),
            read: false,
        }
    }

    type Reply = oneshot::Sender<Result<Page<Row>>>;

    /// Source whose responses the test releases by hand, in any order.
    struct ScriptedSource {
        pending: Mutex<HashMap<u64, Reply>>,
        issued: mpsc::UnboundedSender<FetchRequest>,
    }

    impl ScriptedSource {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FetchRequest>) {
            let (issued, issued_rx) = mpsc::unbounded_channel();
            let source = Arc::new(Self {
                pending: Mutex::new(HashMap::new()),
                issued,
            });
            (source, issued_rx)
        }

        async fn release(&self, epoch: Epoch, result: Result<Page<Row>>) {
            let reply = self
                .pending
                .lock()
                .await
                .remove(&epoch.value())
                .expect("no pending request for epoch");
            reply.send(result).ok();
        }
    }

    #[async_trait]
    impl ListSource for ScriptedSource {
        type Item = Row;

        async fn fetch_page(&self, request: &FetchRequest) -> Result<Page<Row>> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().await.insert(request.epoch.value(), tx);
            self.issued.send(request.clone()).ok();
            rx.await
                .unwrap_or_else(|_| Err(BackofficeError::NetworkFailure("dropped".into())))
        }
    }

    fn page(items: Vec<Row>, total_count: u64) -> Page<Row> {
        Page {
            items,
            total_count,
            effective_page_size: 10,
        }
    }

    async fn next_request(rx: &mut mpsc::UnboundedReceiver<FetchRequest>) -> FetchRequest {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for request")
            .expect("source dropped")
    }

    async fn wait_for<T, F>(handle: &ListHandle<T>, predicate: F) -> ListSnapshot<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut(&ListSnapshot<T>) -> bool,
    {
        let mut rx = handle.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for snapshot")
            .expect("session closed");
        snapshot.clone()
    }

    #[tokio::test]
    async fn test_initial_fetch_on_spawn() {
        let (source, mut issued) = ScriptedSource::new();
        let (handle, _task) = ListSession::spawn(source.clone(), QueryStore::default());

        let request = next_request(&mut issued).await;
        assert_eq!(request.page, 1);
        assert_eq!(request.epoch, Epoch::new(1));
        let loading = wait_for(&handle, |s| s.view.status == Status::Loading).await;
        assert!(loading.view.is_loading);
        assert!(loading.view.rows.is_empty());
        assert_eq!(loading.query.epoch, request.epoch);

        source.release(request.epoch, Ok(page(vec![], 0))).await;
        let snapshot = handle.settled().await.unwrap();
        assert!(snapshot.view.is_empty);
        assert_eq!(snapshot.view.error_message, None);
    }

    #[tokio::test]
    async fn test_late_response_from_superseded_filter_is_dropped() {
        let (source, mut issued) = ScriptedSource::new();
        let (handle, _task) = ListSession::spawn(source.clone(), QueryStore::default());
        let unfiltered = next_request(&mut issued).await;

        handle
            .set_filters(Filters::new().with("type", FilterValue::choice("bug-report")))
            .await
            .unwrap();
        let filtered = next_request(&mut issued).await;
        assert!(filtered.epoch > unfiltered.epoch);

        source
            .release(filtered.epoch, Ok(page(vec![row("bug-1")], 1)))
            .await;
        let snapshot = wait_for(&handle, |s| s.view.status == Status::Success).await;
        assert_eq!(snapshot.view.rows, vec![row("bug-1")]);

        source
            .release(unfiltered.epoch, Ok(page(vec![row("a"), row("b")], 2)))
            .await;
        let snapshot = wait_for(&handle, |s| s.discarded_responses == 1).await;
        assert_eq!(snapshot.view.rows, vec![row("bug-1")]);
        assert_eq!(snapshot.view.total_count, 1);
        assert_eq!(snapshot.query.page, 1);
    }

    #[tokio::test]
    async fn test_validation_failure_reported_without_request() {
        let (source, mut issued) = ScriptedSource::new();
        let (handle, _task) = ListSession::spawn(source.clone(), QueryStore::default());
        let first = next_request(&mut issued).await;

        let err = handle.set_page_size(7).await.unwrap_err();
        assert!(matches!(err, BackofficeError::ValidationFailure(_)));
        let err = handle.set_page(0).await.unwrap_err();
        assert!(matches!(err, BackofficeError::ValidationFailure(_)));
        assert!(issued.try_recv().is_err());
        assert_eq!(handle.snapshot().query.epoch, first.epoch);
    }

    #[tokio::test]
    async fn test_same_page_twice_issues_one_request() {
        let (source, mut issued) = ScriptedSource::new();
        let (handle, _task) = ListSession::spawn(source.clone(), QueryStore::default());
        next_request(&mut issued).await;

        assert!(handle.set_page(2).await.unwrap());
        assert!(!handle.set_page(2).await.unwrap());
        let request = next_request(&mut issued).await;
        assert_eq!(request.page, 2);
        assert!(issued.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failure_keeps_rows_and_reports_error() {
        let (source, mut issued) = ScriptedSource::new();
        let (handle, _task) = ListSession::spawn(source.clone(), QueryStore::default());
        let first = next_request(&mut issued).await;
        source.release(first.epoch, Ok(page(vec![row("a")], 1))).await;
        handle.settled().await.unwrap();

        handle.refresh().await.unwrap();
        let second = next_request(&mut issued).await;
        source
            .release(
                second.epoch,
                Err(BackofficeError::ServerError {
                    status: Some(502),
                    message: "bad gateway".into(),
                }),
            )
            .await;

        let snapshot = wait_for(&handle, |s| s.view.status == Status::Error).await;
        assert_eq!(snapshot.view.rows, vec![row("a")]);
        let message = snapshot.view.error_message.unwrap();
        assert!(message.starts_with(&FetchErrorKind::ServerError.to_string()));
    }

    #[tokio::test]
    async fn test_patch_item_publishes_without_fetch() {
        let (source, mut issued) = ScriptedSource::new();
        let (handle, _task) = ListSession::spawn(source.clone(), QueryStore::default());
        let first = next_request(&mut issued).await;
        source
            .release(first.epoch, Ok(page(vec![row("a"), row("b")], 2)))
            .await;
        handle.settled().await.unwrap();

        assert!(handle.patch_item("b", |r| r.read = true).await.unwrap());
        assert!(!handle.patch_item("missing", |r| r.read = true).await.unwrap());

        let snapshot = handle.snapshot();
        assert!(snapshot.view.rows[1].read);
        assert_eq!(snapshot.view.rows.len(), 2);
        assert_eq!(snapshot.query.epoch, first.epoch);
        assert!(issued.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_initial_store_shapes_first_request() {
        let (source, mut issued) = ScriptedSource::new();
        let mut store = QueryStore::new(PageSizeOptions::default());
        store.set_filters(Filters::new().with("query", FilterValue::text("rust")));
        store.set_page_size(25).unwrap();

        let (_handle, _task) = ListSession::spawn(source, store);
        let request = next_request(&mut issued).await;
        assert_eq!(request.page_size, 25);
        assert_eq!(
            request.filters.get("query"),
            Some(&FilterValue::text("rust"))
        );
    }

    #[tokio::test]
    async fn test_dropping_handles_ends_session() {
        let (source, mut issued) = ScriptedSource::new();
        let (handle, task) = ListSession::spawn(source.clone(), QueryStore::default());
        let request = next_request(&mut issued).await;

        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("session did not stop")
            .unwrap();

        // the in-flight fetch resolves into a closed channel without panicking
        source.release(request.epoch, Ok(page(vec![row("a")], 1))).await;
    }
}
