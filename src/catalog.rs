//! Catalog state store.
//!
//! Holds the observable fetch state (video list, loading flag, last error,
//! page bookkeeping) and applies the pending/fulfilled/rejected lifecycle of
//! every fetch. The store is constructed explicitly with its provider and
//! token cache injected; binaries own one process-lifetime instance behind
//! an `Arc`.
//!
//! Overlapping fetches are legal — a user may change filters while a request
//! is in flight. Every fetch takes a monotonically increasing sequence
//! number and a completion is discarded when a newer sequence has already
//! committed, so rapid filter changes settle on the last-issued result
//! instead of whichever network call happened to finish last.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::task;

use crate::cursor::TokenCache;
use crate::error::CatalogError;
use crate::normalize::{self, VideoSummary};
use crate::provider::SearchProvider;
use crate::query::{self, FetchRequest, PAGE_SIZE};

/// Snapshot of the catalog exposed to presentation surfaces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogState {
    pub videos: Vec<VideoSummary>,
    pub current_video: Option<VideoSummary>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub total_pages: u64,
    pub current_page: u32,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            videos: Vec::new(),
            current_video: None,
            is_loading: false,
            error: None,
            total_pages: 0,
            current_page: 1,
        }
    }
}

struct Inner {
    state: CatalogState,
    committed_seq: u64,
}

pub struct CatalogStore {
    provider: Arc<dyn SearchProvider>,
    tokens: TokenCache,
    inner: RwLock<Inner>,
    issued_seq: AtomicU64,
}

struct FetchOutcome {
    videos: Vec<VideoSummary>,
    total_pages: u64,
}

impl CatalogStore {
    pub fn new(provider: Arc<dyn SearchProvider>, tokens: TokenCache) -> Self {
        Self {
            provider,
            tokens,
            inner: RwLock::new(Inner {
                state: CatalogState::default(),
                committed_seq: 0,
            }),
            issued_seq: AtomicU64::new(0),
        }
    }

    /// Current state as seen by presentation surfaces.
    pub fn snapshot(&self) -> CatalogState {
        self.inner.read().state.clone()
    }

    pub fn clear_error(&self) {
        self.inner.write().state.error = None;
    }

    /// Runs one fetch lifecycle and returns the state after it settled.
    ///
    /// Page 1 replaces the video list; later pages append to it. The page
    /// counter tracks provider pages: a fulfilled fetch records the page
    /// that was requested, so "load more" asks for `current_page + 1`. A
    /// rejected fetch records the error and leaves stale results visible.
    /// No retry happens here; callers re-issue the fetch to retry.
    pub async fn fetch_videos(&self, request: FetchRequest) -> CatalogState {
        let seq = self.issued_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.begin();

        let outcome = self.run_fetch(&request).await;

        let mut inner = self.inner.write();
        if inner.committed_seq > seq {
            tracing::debug!(seq, "discarding superseded catalog fetch");
            return inner.state.clone();
        }
        inner.committed_seq = seq;
        inner.state.is_loading = false;

        match outcome {
            Ok(outcome) => {
                if request.page <= 1 {
                    inner.state.videos = outcome.videos;
                } else {
                    inner.state.videos.extend(outcome.videos);
                }
                inner.state.total_pages = outcome.total_pages;
                inner.state.current_page = request.page;
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(error = %message, "catalog fetch failed");
                inner.state.error = Some(message);
            }
        }

        inner.state.clone()
    }

    /// Single-video lookup. Fills the `current_video` slot on success and
    /// records the error on failure; never touches the video list, so it
    /// does not participate in the catalog sequence guard.
    pub async fn fetch_video(&self, video_id: &str) -> Result<VideoSummary, CatalogError> {
        self.begin();

        let provider = self.provider.clone();
        let id = video_id.to_owned();
        let result = match task::spawn_blocking(move || provider.video_details(&id)).await {
            Ok(result) => result,
            Err(err) => Err(CatalogError::Network(format!("task join error: {err}"))),
        };

        let mut inner = self.inner.write();
        inner.state.is_loading = false;
        match result {
            Ok(details) => {
                let summary = normalize::summarize_detail(&details);
                inner.state.current_video = Some(summary.clone());
                Ok(summary)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(error = %message, "video lookup failed");
                inner.state.error = Some(message);
                Err(err)
            }
        }
    }

    fn begin(&self) {
        let mut inner = self.inner.write();
        inner.state.is_loading = true;
        inner.state.error = None;
    }

    async fn run_fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, CatalogError> {
        let fingerprint = query::query_fingerprint(request);

        // Cache failures never fail the fetch: a lost read degrades to
        // page-1 content, a lost write only costs resumability.
        let cached_token = if request.page > 1 {
            let tokens = self.tokens.clone();
            let key = fingerprint.clone();
            task::spawn_blocking(move || tokens.retrieve(&key))
                .await
                .map_err(|err| CatalogError::Network(format!("task join error: {err}")))?
                .unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "token cache read failed; serving first page");
                    None
                })
        } else {
            None
        };

        let search_query = query::build_search_query(request, cached_token);
        let provider = self.provider.clone();
        let call_query = search_query.clone();
        let response = task::spawn_blocking(move || provider.search(&call_query))
            .await
            .map_err(|err| CatalogError::Network(format!("task join error: {err}")))??;

        if let Some(token) = response.next_page_token.clone() {
            let tokens = self.tokens.clone();
            let key = fingerprint.clone();
            let stored = task::spawn_blocking(move || tokens.store(&key, &token))
                .await
                .map_err(|err| CatalogError::Network(format!("task join error: {err}")))?;
            if let Err(err) = stored {
                tracing::warn!(error = %err, "token cache write failed; load more will restart");
            }
        }

        let total_pages = response
            .page_info
            .total_results
            .div_ceil(u64::from(PAGE_SIZE));
        let videos = normalize::normalize_batch(self.provider.clone(), response.items).await;

        Ok(FetchOutcome {
            videos,
            total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{
        ContentDetails, SearchItem, SearchItemId, SearchResponse, Snippet, Statistics, VideoItem,
    };
    use crate::query::{SearchQuery, SortKey};
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Condvar, Mutex};
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};

    type SearchFn = dyn Fn(&SearchQuery) -> Result<SearchResponse, CatalogError> + Send + Sync;
    type DetailFn = dyn Fn(&str) -> Result<VideoItem, CatalogError> + Send + Sync;

    struct StubProvider {
        search_calls: AtomicUsize,
        on_search: Box<SearchFn>,
        on_details: Box<DetailFn>,
    }

    impl StubProvider {
        fn new(
            on_search: impl Fn(&SearchQuery) -> Result<SearchResponse, CatalogError>
            + Send
            + Sync
            + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                search_calls: AtomicUsize::new(0),
                on_search: Box::new(on_search),
                on_details: Box::new(|id| Ok(detail_for(id))),
            })
        }
    }

    impl SearchProvider for StubProvider {
        fn search(&self, query: &SearchQuery) -> Result<SearchResponse, CatalogError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            (self.on_search)(query)
        }

        fn video_details(&self, video_id: &str) -> Result<VideoItem, CatalogError> {
            (self.on_details)(video_id)
        }
    }

    fn search_item(id: &str) -> SearchItem {
        SearchItem {
            id: SearchItemId {
                video_id: Some(id.to_owned()),
            },
            snippet: Snippet {
                title: format!("video {id}"),
                channel_title: "Example Channel".to_owned(),
                ..Default::default()
            },
        }
    }

    fn detail_for(id: &str) -> VideoItem {
        VideoItem {
            id: id.to_owned(),
            content_details: Some(ContentDetails {
                duration: Some("PT1M30S".to_owned()),
            }),
            statistics: Some(Statistics {
                view_count: Some("1500".to_owned()),
            }),
            ..Default::default()
        }
    }

    fn search_page(ids: &[&str], total: u64, next_token: Option<&str>) -> SearchResponse {
        SearchResponse {
            items: ids.iter().map(|id| search_item(id)).collect(),
            next_page_token: next_token.map(str::to_owned),
            page_info: crate::provider::PageInfo {
                total_results: total,
                results_per_page: PAGE_SIZE,
            },
        }
    }

    fn store_with(provider: Arc<StubProvider>) -> (CatalogStore, TempDir) {
        let temp = tempdir().unwrap();
        let tokens = TokenCache::open(temp.path().join("catalog.db")).unwrap();
        (CatalogStore::new(provider, tokens), temp)
    }

    #[tokio::test]
    async fn first_page_replaces_and_load_more_appends() {
        let provider = StubProvider::new(|query| {
            if query.page_token.is_none() {
                Ok(search_page(&["a", "b"], 25, Some("tok1")))
            } else {
                assert_eq!(query.page_token.as_deref(), Some("tok1"));
                Ok(search_page(&["c"], 25, Some("tok2")))
            }
        });
        let (store, _temp) = store_with(provider);

        let state = store
            .fetch_videos(FetchRequest::first_page("music", SortKey::Date))
            .await;
        assert_eq!(state.videos.len(), 2);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 3);
        assert!(!state.is_loading);
        assert_eq!(state.error, None);

        let state = store
            .fetch_videos(FetchRequest::new(2, "music", SortKey::Date))
            .await;
        let ids: Vec<&str> = state.videos.iter().map(|video| video.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(state.current_page, 2);
    }

    #[tokio::test]
    async fn fresh_selection_replaces_accumulated_results() {
        let provider = StubProvider::new(|query| {
            if query.text == "cats" {
                Ok(search_page(&["cat1"], 5, None))
            } else {
                Ok(search_page(&["dog1", "dog2"], 5, None))
            }
        });
        let (store, _temp) = store_with(provider);

        store
            .fetch_videos(FetchRequest::first_page("dogs", SortKey::Date))
            .await;
        let state = store
            .fetch_videos(FetchRequest::first_page("cats", SortKey::Date))
            .await;

        assert_eq!(state.videos.len(), 1);
        assert_eq!(state.videos[0].id, "cat1");
    }

    #[tokio::test]
    async fn rejected_fetch_keeps_stale_results_visible() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = {
            let calls = calls.clone();
            StubProvider::new(move |_query| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(search_page(&["a", "b"], 20, None))
                } else {
                    Err(CatalogError::Provider {
                        status: 500,
                        message: "Backend Error".to_owned(),
                    })
                }
            })
        };
        let (store, _temp) = store_with(provider);

        store
            .fetch_videos(FetchRequest::first_page("music", SortKey::Date))
            .await;
        let state = store
            .fetch_videos(FetchRequest::first_page("music", SortKey::Date))
            .await;

        assert_eq!(state.error.as_deref(), Some("Backend Error"));
        assert_eq!(state.videos.len(), 2);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn access_denied_surfaces_the_distinguished_message() {
        let provider = StubProvider::new(|_query| Err(CatalogError::AccessDenied));
        let (store, _temp) = store_with(provider);

        let state = store
            .fetch_videos(FetchRequest::first_page("music", SortKey::Date))
            .await;

        assert_eq!(
            state.error.as_deref(),
            Some(CatalogError::AccessDenied.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn pending_clears_a_previous_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = {
            let calls = calls.clone();
            StubProvider::new(move |_query| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(CatalogError::Network("connection refused".to_owned()))
                } else {
                    Ok(search_page(&["a"], 10, None))
                }
            })
        };
        let (store, _temp) = store_with(provider);

        let state = store
            .fetch_videos(FetchRequest::first_page("music", SortKey::Date))
            .await;
        assert!(state.error.is_some());

        let state = store
            .fetch_videos(FetchRequest::first_page("music", SortKey::Date))
            .await;
        assert_eq!(state.error, None);
        assert_eq!(state.videos.len(), 1);
    }

    #[tokio::test]
    async fn clear_error_resets_the_recorded_message() {
        let provider = StubProvider::new(|_query| Err(CatalogError::AccessDenied));
        let (store, _temp) = store_with(provider);

        store
            .fetch_videos(FetchRequest::first_page("music", SortKey::Date))
            .await;
        assert!(store.snapshot().error.is_some());

        store.clear_error();
        assert_eq!(store.snapshot().error, None);
    }

    #[tokio::test]
    async fn fetch_video_fills_the_current_video_slot() {
        let provider = StubProvider::new(|_query| Ok(search_page(&[], 0, None)));
        let (store, _temp) = store_with(provider);

        let summary = store.fetch_video("abc123").await.unwrap();
        assert_eq!(summary.id, "abc123");
        assert_eq!(summary.duration, "1:30");

        let state = store.snapshot();
        assert_eq!(state.current_video.as_ref().map(|video| video.id.as_str()), Some("abc123"));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn unknown_video_records_not_found() {
        let provider = Arc::new(StubProvider {
            search_calls: AtomicUsize::new(0),
            on_search: Box::new(|_query| Ok(search_page(&[], 0, None))),
            on_details: Box::new(|_id| Err(CatalogError::NotFound)),
        });
        let (store, _temp) = store_with(provider);

        let err = store.fetch_video("missing").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound));
        assert_eq!(
            store.snapshot().error.as_deref(),
            Some("video not found")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn superseded_fetch_is_discarded() {
        let release = Arc::new((Mutex::new(false), Condvar::new()));
        let provider = {
            let release = release.clone();
            StubProvider::new(move |query| {
                if query.text == "slow" {
                    let (lock, cvar) = &*release;
                    let mut ready = lock.lock().unwrap();
                    while !*ready {
                        ready = cvar.wait(ready).unwrap();
                    }
                    Ok(search_page(&["slow1"], 10, None))
                } else {
                    Ok(search_page(&["fast1"], 10, None))
                }
            })
        };
        let (store, _temp) = store_with(provider.clone());
        let store = Arc::new(store);

        let slow = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .fetch_videos(FetchRequest::first_page("slow", SortKey::Date))
                    .await
            })
        };

        // Wait until the slow fetch has reached the provider so its sequence
        // number is definitely older than the one issued next.
        while provider.search_calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let fast_state = store
            .fetch_videos(FetchRequest::first_page("fast", SortKey::Date))
            .await;
        assert_eq!(fast_state.videos[0].id, "fast1");

        {
            let (lock, cvar) = &*release;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
        slow.await.unwrap();

        let final_state = store.snapshot();
        let ids: Vec<&str> = final_state
            .videos
            .iter()
            .map(|video| video.id.as_str())
            .collect();
        assert_eq!(ids, vec!["fast1"]);
        assert!(!final_state.is_loading);
    }
}
