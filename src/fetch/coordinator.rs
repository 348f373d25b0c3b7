//! Request coordinator
//!
//! Entry point for page fetches. For every request the coordinator:
//!
//! 1. serves fresh pages straight from the response cache
//! 2. cancels whatever request is still in flight and registers the new one
//! 3. runs the transport through the retry policy
//! 4. caches successes and classifies failures
//!
//! A request that was superseded resolves to [`Failure::Cancelled`], which
//! callers are expected to drop silently.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Connectivity, Failure, RetryPolicy};
use crate::cache::{CacheEntry, CacheKey, ResponseCache};
use crate::data::{Item, RequestDescriptor, ResourceType};
use crate::transport::{TransportAdapter, TransportKind};

/// A page ready to be rendered
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Items of the page
    pub items: Vec<Item>,
    /// Total matching items on the server
    pub total_count: u64,
    /// Collection the items belong to, as it was when fetched
    pub resource_type: ResourceType,
    /// Whether the page was served from the cache
    pub from_cache: bool,
}

impl FetchedPage {
    fn from_entry(entry: CacheEntry) -> Self {
        Self {
            items: entry.payload,
            total_count: entry.total_count,
            resource_type: entry.resource_type,
            from_cache: true,
        }
    }
}

/// The single request eligible for cancellation
#[derive(Debug)]
struct PendingRequest {
    id: u64,
    token: CancellationToken,
}

/// Mutable state shared by all fetches of one coordinator
#[derive(Debug, Default)]
struct RequestState {
    cache: ResponseCache,
    pending: Option<PendingRequest>,
    /// Highest request id seen so far
    newest_id: u64,
}

impl RequestState {
    /// Clears the pending handle if it still belongs to request `id`
    fn release(&mut self, id: u64) {
        if self.pending.as_ref().is_some_and(|pending| pending.id == id) {
            self.pending = None;
        }
    }
}

/// Owns the response cache and the in-flight request
pub struct Coordinator {
    state: Mutex<RequestState>,
    policy: RetryPolicy,
    connectivity: Arc<dyn Connectivity>,
    next_request_id: AtomicU64,
}

impl Coordinator {
    /// Creates a coordinator with the standard retry policy
    pub fn new(connectivity: Arc<dyn Connectivity>) -> Self {
        Self::with_policy(connectivity, RetryPolicy::default())
    }

    /// Creates a coordinator with a custom retry policy
    pub fn with_policy(connectivity: Arc<dyn Connectivity>, policy: RetryPolicy) -> Self {
        Self::with_cache(connectivity, policy, ResponseCache::new())
    }

    /// Creates a coordinator around an existing cache
    pub fn with_cache(
        connectivity: Arc<dyn Connectivity>,
        policy: RetryPolicy,
        cache: ResponseCache,
    ) -> Self {
        Self {
            state: Mutex::new(RequestState {
                cache,
                pending: None,
                newest_id: 0,
            }),
            policy,
            connectivity,
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Fetches one page through `transport`.
    ///
    /// # Returns
    /// * `Ok(FetchedPage)` - From the cache or from the network
    /// * `Err(Failure::Cancelled)` - A newer request superseded this one
    /// * `Err(Failure)` - Any other classified failure
    pub async fn fetch_page<T>(
        &self,
        descriptor: &RequestDescriptor,
        transport: &T,
    ) -> Result<FetchedPage, Failure>
    where
        T: TransportAdapter,
    {
        self.fetch_page_as(self.reserve_request_id(), descriptor, transport)
            .await
    }

    /// Reserves the id for a request that will be fetched later.
    ///
    /// Ids grow in reservation order, and that order decides supersession:
    /// a request only ever cancels requests with smaller ids.
    pub fn reserve_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Fetches one page under an id from [`Coordinator::reserve_request_id`].
    ///
    /// A request reaching the coordinator after a newer one has already
    /// started resolves to [`Failure::Cancelled`] without touching the
    /// network.
    pub async fn fetch_page_as<T>(
        &self,
        id: u64,
        descriptor: &RequestDescriptor,
        transport: &T,
    ) -> Result<FetchedPage, Failure>
    where
        T: TransportAdapter,
    {
        let key = CacheKey::new(transport.kind(), descriptor);

        let token = {
            let mut state = self.state.lock();
            if id < state.newest_id {
                debug!(%key, request = id, newest = state.newest_id, "Request arrived after a newer one");
                return Err(Failure::Cancelled);
            }
            state.newest_id = id;

            if let Some(entry) = state.cache.get(&key) {
                debug!(%key, "Cache hit");
                return Ok(FetchedPage::from_entry(entry));
            }
            debug!(%key, "Cache miss");

            let token = CancellationToken::new();
            let superseded = state.pending.replace(PendingRequest {
                id,
                token: token.clone(),
            });
            if let Some(previous) = superseded {
                debug!(request = previous.id, by = id, "Cancelling superseded request");
                previous.token.cancel();
            }
            token
        };

        let token_ref = &token;
        let outcome = self
            .policy
            .run(&token, move || async move {
                transport
                    .get_once(descriptor, token_ref)
                    .await
                    .map_err(|failure| self.classify(failure))
            })
            .await;

        // A response that lands after supersession is still stale
        let outcome = match outcome {
            Ok(_) if token.is_cancelled() => Err(Failure::Cancelled),
            other => other,
        };

        let mut state = self.state.lock();
        match outcome {
            Ok(raw) => {
                state.release(id);
                state.cache.put(
                    key.clone(),
                    CacheEntry::new(raw.items.clone(), raw.total_count, descriptor.resource_type),
                );
                info!(%key, items = raw.items.len(), total = raw.total_count, "Fetched page");
                Ok(FetchedPage {
                    items: raw.items,
                    total_count: raw.total_count,
                    resource_type: descriptor.resource_type,
                    from_cache: false,
                })
            }
            Err(Failure::Cancelled) => {
                debug!(%key, request = id, "Request superseded");
                Err(Failure::Cancelled)
            }
            Err(failure) => {
                state.release(id);
                debug!(%key, error = %failure, "Fetch failed");
                Err(failure)
            }
        }
    }

    /// Drops the cached page for a request, forcing the next fetch to the network
    pub fn invalidate(&self, kind: TransportKind, descriptor: &RequestDescriptor) {
        let key = CacheKey::new(kind, descriptor);
        debug!(%key, "Invalidating cached page");
        self.state.lock().cache.invalidate(&key);
    }

    /// Cancels the in-flight request, if any
    pub fn cancel_pending(&self) {
        if let Some(pending) = self.state.lock().pending.take() {
            pending.token.cancel();
        }
    }

    /// Whether a network request is currently registered
    pub fn has_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Reads the cached page for a request without touching the network
    pub fn cached(&self, kind: TransportKind, descriptor: &RequestDescriptor) -> Option<CacheEntry> {
        self.state.lock().cache.get(&CacheKey::new(kind, descriptor))
    }

    /// Applies offline precedence to a failure
    fn classify(&self, failure: Failure) -> Failure {
        match failure {
            Failure::Cancelled => Failure::Cancelled,
            other if !self.connectivity.is_online() => {
                debug!(error = %other, "Host offline, reporting as network offline");
                Failure::NetworkOffline
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{build_request, Post};
    use crate::fetch::FixedConnectivity;
    use crate::transport::RawResponse;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::Instant;

    const BASE_URL: &str = "https://jsonplaceholder.typicode.com";

    fn sample_response() -> RawResponse {
        RawResponse {
            items: vec![Item::Post(Post {
                id: 2,
                title: "qui est esse".to_string(),
                body: "est rerum tempore vitae".to_string(),
            })],
            total_count: 1,
        }
    }

    fn descriptor(page: u32) -> RequestDescriptor {
        build_request(ResourceType::Posts, "qui", page, 10, BASE_URL)
    }

    fn online() -> Arc<FixedConnectivity> {
        Arc::new(FixedConnectivity::online())
    }

    /// Replays scripted outcomes, then repeats the fallback forever
    struct ScriptedTransport {
        calls: AtomicU32,
        script: Mutex<VecDeque<Result<RawResponse, Failure>>>,
        fallback: Result<RawResponse, Failure>,
    }

    impl ScriptedTransport {
        fn always(outcome: Result<RawResponse, Failure>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                script: Mutex::new(VecDeque::new()),
                fallback: outcome,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TransportAdapter for ScriptedTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Primary
        }

        async fn get_once(
            &self,
            _descriptor: &RequestDescriptor,
            _token: &CancellationToken,
        ) -> Result<RawResponse, Failure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    /// Blocks until released; optionally gives up when cancelled
    struct GatedTransport {
        started: Notify,
        release: Notify,
        honors_token: bool,
    }

    impl GatedTransport {
        fn new(honors_token: bool) -> Self {
            Self {
                started: Notify::new(),
                release: Notify::new(),
                honors_token,
            }
        }
    }

    impl TransportAdapter for GatedTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Primary
        }

        async fn get_once(
            &self,
            _descriptor: &RequestDescriptor,
            token: &CancellationToken,
        ) -> Result<RawResponse, Failure> {
            self.started.notify_one();
            if self.honors_token {
                tokio::select! {
                    _ = token.cancelled() => Err(Failure::Cancelled),
                    _ = self.release.notified() => Ok(sample_response()),
                }
            } else {
                self.release.notified().await;
                Ok(sample_response())
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_then_cache_hit_skips_transport() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Ok(sample_response()));

        let first = coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();
        let second = coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();

        assert_eq!(first.items, sample_response().items);
        assert_eq!(first.total_count, 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.items, first.items);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_success_clears_pending_handle() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Ok(sample_response()));

        coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();

        assert!(!coordinator.has_pending());
    }

    #[tokio::test]
    async fn test_cache_hit_reports_stored_resource_type() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Ok(sample_response()));
        coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();

        let hit = coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();

        let stored = coordinator.cached(TransportKind::Primary, &descriptor(1)).unwrap();
        assert_eq!(hit.resource_type, stored.resource_type);
    }

    #[tokio::test]
    async fn test_different_pages_are_cached_separately() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Ok(sample_response()));

        coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();
        coordinator.fetch_page(&descriptor(2), &transport).await.unwrap();

        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_network() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Ok(sample_response()));

        coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();
        coordinator.invalidate(TransportKind::Primary, &descriptor(1));
        coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();

        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_retried_four_times_then_surfaced() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Err(Failure::from_status(503)));

        let failure = coordinator
            .fetch_page(&descriptor(1), &transport)
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 4);
        assert_eq!(failure, Failure::Http { status: 503 });
        assert!(failure.user_message().unwrap().contains("Server error"));
        assert!(!coordinator.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_attempted_once_without_delay() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Err(Failure::from_status(404)));
        let started = Instant::now();

        let failure = coordinator
            .fetch_page(&descriptor(1), &transport)
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(
            failure.user_message(),
            Failure::from_status(404).user_message()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_server_error() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Ok(sample_response()));
        transport
            .script
            .lock()
            .push_back(Err(Failure::from_status(500)));

        let page = coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(page.total_count, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Err(Failure::from_status(400)));

        let _ = coordinator.fetch_page(&descriptor(1), &transport).await;
        let _ = coordinator.fetch_page(&descriptor(1), &transport).await;

        assert_eq!(transport.calls(), 2);
        assert!(coordinator.cached(TransportKind::Primary, &descriptor(1)).is_none());
    }

    #[tokio::test]
    async fn test_offline_takes_precedence_over_http_failure() {
        let connectivity = online();
        let coordinator = Coordinator::new(connectivity.clone());
        let transport = ScriptedTransport::always(Err(Failure::from_status(404)));
        connectivity.set_online(false);

        let failure = coordinator
            .fetch_page(&descriptor(1), &transport)
            .await
            .unwrap_err();

        assert_eq!(failure, Failure::NetworkOffline);
        assert!(failure
            .user_message()
            .unwrap()
            .contains("No internet connection"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_server_error_is_not_retried() {
        let connectivity = Arc::new(FixedConnectivity::offline());
        let coordinator = Coordinator::new(connectivity);
        let transport = ScriptedTransport::always(Err(Failure::from_status(503)));

        let failure = coordinator
            .fetch_page(&descriptor(1), &transport)
            .await
            .unwrap_err();

        assert_eq!(failure, Failure::NetworkOffline);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_served_while_offline() {
        let connectivity = online();
        let coordinator = Coordinator::new(connectivity.clone());
        let transport = ScriptedTransport::always(Ok(sample_response()));
        coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();

        connectivity.set_online(false);
        let page = coordinator.fetch_page(&descriptor(1), &transport).await.unwrap();

        assert!(page.from_cache);
    }

    #[tokio::test]
    async fn test_newer_request_supersedes_in_flight_one() {
        let coordinator = Arc::new(Coordinator::new(online()));
        let slow = Arc::new(GatedTransport::new(true));
        let fast = ScriptedTransport::always(Ok(sample_response()));

        let first = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            let slow = Arc::clone(&slow);
            async move { coordinator.fetch_page(&descriptor(1), slow.as_ref()).await }
        });
        slow.started.notified().await;

        let second = coordinator.fetch_page(&descriptor(2), &fast).await;

        assert!(second.is_ok());
        assert_eq!(first.await.unwrap(), Err(Failure::Cancelled));
        assert!(coordinator.cached(TransportKind::Primary, &descriptor(1)).is_none());
        assert!(coordinator.cached(TransportKind::Primary, &descriptor(2)).is_some());
    }

    #[tokio::test]
    async fn test_late_success_of_superseded_request_is_discarded() {
        let coordinator = Arc::new(Coordinator::new(online()));
        let stubborn = Arc::new(GatedTransport::new(false));
        let fast = ScriptedTransport::always(Ok(sample_response()));

        let first = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            let stubborn = Arc::clone(&stubborn);
            async move { coordinator.fetch_page(&descriptor(1), stubborn.as_ref()).await }
        });
        stubborn.started.notified().await;

        coordinator.fetch_page(&descriptor(2), &fast).await.unwrap();
        stubborn.release.notify_one();

        assert_eq!(first.await.unwrap(), Err(Failure::Cancelled));
        assert!(coordinator.cached(TransportKind::Primary, &descriptor(1)).is_none());
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_cancel_in_flight_request() {
        let coordinator = Arc::new(Coordinator::new(online()));
        let fast = ScriptedTransport::always(Ok(sample_response()));
        coordinator.fetch_page(&descriptor(2), &fast).await.unwrap();

        let slow = Arc::new(GatedTransport::new(true));
        let first = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            let slow = Arc::clone(&slow);
            async move { coordinator.fetch_page(&descriptor(1), slow.as_ref()).await }
        });
        slow.started.notified().await;

        let hit = coordinator.fetch_page(&descriptor(2), &fast).await.unwrap();
        assert!(hit.from_cache);
        assert!(coordinator.has_pending());

        slow.release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert!(!coordinator.has_pending());
    }

    #[tokio::test]
    async fn test_cancel_pending_cancels_in_flight_request() {
        let coordinator = Arc::new(Coordinator::new(online()));
        let slow = Arc::new(GatedTransport::new(true));

        let first = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            let slow = Arc::clone(&slow);
            async move { coordinator.fetch_page(&descriptor(1), slow.as_ref()).await }
        });
        slow.started.notified().await;

        coordinator.cancel_pending();

        assert_eq!(first.await.unwrap(), Err(Failure::Cancelled));
        assert!(!coordinator.has_pending());
    }

    #[tokio::test]
    async fn test_request_reaching_coordinator_late_is_cancelled() {
        let coordinator = Coordinator::new(online());
        let transport = ScriptedTransport::always(Ok(sample_response()));
        let older = coordinator.reserve_request_id();
        let newer = coordinator.reserve_request_id();

        coordinator
            .fetch_page_as(newer, &descriptor(2), &transport)
            .await
            .unwrap();
        let late = coordinator
            .fetch_page_as(older, &descriptor(1), &transport)
            .await;

        assert_eq!(late, Err(Failure::Cancelled));
        assert_eq!(transport.calls(), 1);
        assert!(coordinator.cached(TransportKind::Primary, &descriptor(1)).is_none());
    }

    #[tokio::test]
    async fn test_older_request_never_cancels_newer_in_flight_one() {
        let coordinator = Arc::new(Coordinator::new(online()));
        let slow = Arc::new(GatedTransport::new(true));
        let fast = ScriptedTransport::always(Ok(sample_response()));
        let older = coordinator.reserve_request_id();
        let newer = coordinator.reserve_request_id();

        let in_flight = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            let slow = Arc::clone(&slow);
            async move {
                coordinator
                    .fetch_page_as(newer, &descriptor(2), slow.as_ref())
                    .await
            }
        });
        slow.started.notified().await;

        let late = coordinator.fetch_page_as(older, &descriptor(1), &fast).await;
        assert_eq!(late, Err(Failure::Cancelled));
        assert_eq!(fast.calls(), 0);
        assert!(coordinator.has_pending());

        slow.release.notify_one();
        assert!(in_flight.await.unwrap().is_ok());
    }
}
