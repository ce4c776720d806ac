use crate::query::{Epoch, QueryState};

use super::{ControllerState, FetchRequest, FetchResponse, FetchResult, Identified, Status};

/// What happened to a response handed to [`FetchCoordinator::settle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Current response, stored as the last accepted result
    Accepted,
    /// Current response, but the fetch failed
    Failed,
    /// Superseded by a newer request; state untouched
    Discarded,
}

/// Issues epoch-tagged requests and gates responses on the latest epoch.
#[derive(Debug, Clone)]
pub struct FetchCoordinator<T> {
    state: ControllerState<T>,
}

impl<T> Default for FetchCoordinator<T> {
    fn default() -> Self {
        Self {
            state: ControllerState::default(),
        }
    }
}

impl<T> FetchCoordinator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ControllerState<T> {
        &self.state
    }

    /// Start a fetch for `query`: loading, error cleared, epoch recorded.
    pub fn issue(&mut self, query: &QueryState) -> FetchRequest {
        self.state.status = Status::Loading;
        self.state.last_error = None;
        self.state.epoch_issued = Some(query.epoch);
        tracing::debug!(
            epoch = query.epoch.value(),
            page = query.page,
            page_size = query.page_size,
            "issuing list fetch"
        );
        FetchRequest::from_state(query)
    }

    /// Apply a response if it was issued under `current`, the store's epoch
    /// at arrival time. Anything else is dropped without touching state.
    pub fn settle(&mut self, current: Epoch, response: FetchResponse<T>) -> Settlement {
        if response.epoch != current || self.state.epoch_issued != Some(current) {
            self.state.discarded_responses += 1;
            tracing::debug!(
                responded = response.epoch.value(),
                current = current.value(),
                "discarding stale list response"
            );
            return Settlement::Discarded;
        }

        match response.outcome {
            Ok(page) => {
                self.state.last_accepted = Some(FetchResult {
                    items: page.items,
                    total_count: page.total_count,
                    effective_page_size: page.effective_page_size,
                    page: response.page,
                    responded_epoch: response.epoch,
                });
                self.state.status = Status::Success;
                self.state.last_error = None;
                Settlement::Accepted
            }
            Err(error) => {
                tracing::warn!(epoch = current.value(), "list fetch failed: {error}");
                self.state.status = Status::Error;
                self.state.last_error = Some(error);
                Settlement::Failed
            }
        }
    }
}

impl<T: Identified> FetchCoordinator<T> {
    /// Patch one accepted item in place. Returns false when no item has `id`.
    ///
    /// Total count and epoch are left alone; the next accepted fetch replaces
    /// the patched item.
    pub fn patch_item<F>(&mut self, id: &str, patch: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let Some(accepted) = self.state.last_accepted.as_mut() else {
            return false;
        };
        match accepted
            .items
            .iter_mut()
            .find(|item| item.id().is_some_and(|item_id| item_id == id))
        {
            Some(item) => {
                patch(item);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::error::FetchErrorKind;
    use crate::fetch::{FetchError, Page};
    use crate::query::{FilterValue, Filters, QueryStore};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        title: String,
    }

    impl Identified for Row {
        fn id(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(&self.id))
        }
    }

    fn row(id: &str, title: &str) -> Row {
        Row {
            id: id.to_string(),
            title: title.to_string(),
        }
    }

    fn page(items: Vec<Row>, total_count: u64) -> Page<Row> {
        Page {
            items,
            total_count,
            effective_page_size: 10,
        }
    }

    #[test]
    fn test_issue_sets_loading_and_clears_error() {
        let mut store = QueryStore::default();
        let mut coordinator = FetchCoordinator::<Row>::new();

        store.refresh();
        let request = coordinator.issue(store.state());
        coordinator.settle(
            store.epoch(),
            FetchResponse::failure(&request, FetchError::new(FetchErrorKind::ServerError, "500")),
        );
        assert!(coordinator.state().last_error.is_some());

        store.refresh();
        coordinator.issue(store.state());
        assert_eq!(coordinator.state().status, Status::Loading);
        assert!(coordinator.state().last_error.is_none());
    }

    #[test]
    fn test_matching_response_accepted() {
        let mut store = QueryStore::default();
        let mut coordinator = FetchCoordinator::new();

        store.refresh();
        let request = coordinator.issue(store.state());
        let settlement = coordinator.settle(
            store.epoch(),
            FetchResponse::success(&request, page(vec![row("a", "A")], 1)),
        );

        assert_eq!(settlement, Settlement::Accepted);
        let state = coordinator.state();
        assert_eq!(state.status, Status::Success);
        let accepted = state.last_accepted.as_ref().unwrap();
        assert_eq!(accepted.responded_epoch, store.epoch());
        assert_eq!(accepted.items, vec![row("a", "A")]);
    }

    #[test]
    fn test_late_response_for_older_epoch_discarded() {
        let mut store = QueryStore::default();
        let mut coordinator = FetchCoordinator::new();

        store.set_filters(Filters::new().with("type", FilterValue::choice("")));
        let first = coordinator.issue(store.state());
        store.set_filters(Filters::new().with("type", FilterValue::choice("bug-report")));
        let second = coordinator.issue(store.state());

        let newer = coordinator.settle(
            store.epoch(),
            FetchResponse::success(&second, page(vec![row("b", "bug")], 1)),
        );
        let older = coordinator.settle(
            store.epoch(),
            FetchResponse::success(&first, page(vec![row("x", "any"), row("y", "any")], 2)),
        );

        assert_eq!(newer, Settlement::Accepted);
        assert_eq!(older, Settlement::Discarded);
        let accepted = coordinator.state().last_accepted.as_ref().unwrap();
        assert_eq!(accepted.items, vec![row("b", "bug")]);
        assert_eq!(accepted.responded_epoch, second.epoch);
        assert_eq!(coordinator.state().discarded_responses, 1);
    }

    #[test]
    fn test_stale_failure_does_not_flip_status() {
        let mut store = QueryStore::default();
        let mut coordinator = FetchCoordinator::<Row>::new();

        store.refresh();
        let first = coordinator.issue(store.state());
        store.set_page(2).unwrap();
        coordinator.issue(store.state());

        let settlement = coordinator.settle(
            store.epoch(),
            FetchResponse::failure(&first, FetchError::new(FetchErrorKind::NetworkFailure, "")),
        );
        assert_eq!(settlement, Settlement::Discarded);
        assert_eq!(coordinator.state().status, Status::Loading);
        assert!(coordinator.state().last_error.is_none());
    }

    #[test]
    fn test_failure_keeps_last_accepted() {
        let mut store = QueryStore::default();
        let mut coordinator = FetchCoordinator::new();

        store.refresh();
        let request = coordinator.issue(store.state());
        coordinator.settle(
            store.epoch(),
            FetchResponse::success(&request, page(vec![row("a", "A")], 1)),
        );

        store.set_page(2).unwrap();
        let request = coordinator.issue(store.state());
        let settlement = coordinator.settle(
            store.epoch(),
            FetchResponse::failure(
                &request,
                FetchError::new(FetchErrorKind::NetworkFailure, "timed out"),
            ),
        );

        assert_eq!(settlement, Settlement::Failed);
        let state = coordinator.state();
        assert_eq!(state.status, Status::Error);
        assert_eq!(
            state.last_error.as_ref().map(|e| e.kind),
            Some(FetchErrorKind::NetworkFailure)
        );
        assert_eq!(state.last_accepted.as_ref().unwrap().items, vec![row("a", "A")]);
    }

    #[test]
    fn test_response_for_unissued_epoch_discarded() {
        let mut store = QueryStore::default();
        let mut coordinator = FetchCoordinator::<Row>::new();

        store.refresh();
        let request = FetchRequest::from_state(store.state());
        let settlement =
            coordinator.settle(store.epoch(), FetchResponse::success(&request, page(vec![], 0)));
        assert_eq!(settlement, Settlement::Discarded);
        assert_eq!(coordinator.state().status, Status::Idle);
    }

    #[test]
    fn test_patch_item_in_place() {
        let mut store = QueryStore::default();
        let mut coordinator = FetchCoordinator::new();

        store.refresh();
        let request = coordinator.issue(store.state());
        coordinator.settle(
            store.epoch(),
            FetchResponse::success(&request, page(vec![row("a", "A"), row("b", "B")], 12)),
        );

        let epoch_before = store.epoch();
        assert!(coordinator.patch_item("b", |r| r.title = "read".to_string()));

        let accepted = coordinator.state().last_accepted.as_ref().unwrap();
        assert_eq!(accepted.items[1].title, "read");
        assert_eq!(accepted.total_count, 12);
        assert_eq!(store.epoch(), epoch_before);
    }

    #[test]
    fn test_patch_missing_item_is_noop() {
        let mut store = QueryStore::default();
        let mut coordinator = FetchCoordinator::new();

        assert!(!coordinator.patch_item("a", |r: &mut Row| r.title.clear()));

        store.refresh();
        let request = coordinator.issue(store.state());
        coordinator.settle(
            store.epoch(),
            FetchResponse::success(&request, page(vec![row("a", "A")], 1)),
        );
        let before = coordinator.state().clone();

        assert!(!coordinator.patch_item("zzz", |r| r.title.clear()));
        assert_eq!(coordinator.state(), &before);
    }
}
