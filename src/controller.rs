//! Intent dispatch between the user interface and the coordinator
//!
//! The controller owns the browsing state (page, search term, resource type,
//! transport), turns user intents into request descriptors, runs fetches in
//! the background and hands their outcomes to a [`Renderer`].

use futures::FutureExt;
use reqwest::Client;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::data::{build_request, total_pages, Item, RequestDescriptor, ResourceType};
use crate::fetch::{Connectivity, Coordinator, Failure, FetchedPage};
use crate::transport::{AnyTransport, TransportAdapter, TransportKind};

/// Receives what the controller wants shown
pub trait Renderer {
    /// Shows a page of items
    fn render(&mut self, items: &[Item], total_count: u64, resource_type: ResourceType);

    /// Shows the pagination controls
    fn render_pagination(&mut self, current_page: u32, total_pages: u32);

    /// Shows or hides the loading indicator
    fn set_loading(&mut self, loading: bool);

    /// Shows a failure message
    fn show_error(&mut self, message: &str);
}

/// Something the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Search for a term, starting over at page 1
    Search(String),
    /// Jump to a page
    SelectPage(u32),
    /// Go one page forward
    NextPage,
    /// Go one page back
    PreviousPage,
    /// Switch transport and reload
    SelectTransport(TransportKind),
    /// Switch collection, starting over at page 1
    SelectResourceType(ResourceType),
    /// Reload the current page from the network
    Refresh,
}

/// Browsing state shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// 1-based current page
    pub current_page: u32,
    /// Current search term
    pub search_term: String,
    /// Collection being browsed
    pub resource_type: ResourceType,
    /// Transport used for new requests
    pub transport_kind: TransportKind,
    /// Page count from the last delivered page; 0 until known
    pub total_pages: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_page: 1,
            search_term: String::new(),
            resource_type: ResourceType::Posts,
            transport_kind: TransportKind::Primary,
            total_pages: 0,
        }
    }
}

/// Static settings of a browsing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// API root URL
    pub base_url: String,
    /// Items per page
    pub page_size: u32,
}

/// Outcome of one dispatched fetch
///
/// Superseded fetches produce no event at all.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// The page arrived
    Loaded { seq: u64, page: FetchedPage },
    /// The fetch failed
    Failed { seq: u64, failure: Failure },
}

impl FetchEvent {
    /// Sequence number of the dispatch this event answers
    pub fn seq(&self) -> u64 {
        match self {
            FetchEvent::Loaded { seq, .. } | FetchEvent::Failed { seq, .. } => *seq,
        }
    }
}

/// Both transports, built once and shared by every fetch
#[derive(Clone)]
pub struct Transports {
    primary: Arc<AnyTransport>,
    alternate: Arc<AnyTransport>,
}

impl Transports {
    /// Builds both transports over one HTTP client
    pub fn new(client: Client, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            primary: Arc::new(AnyTransport::for_kind(
                TransportKind::Primary,
                client.clone(),
                Arc::clone(&connectivity),
            )),
            alternate: Arc::new(AnyTransport::for_kind(
                TransportKind::Alternate,
                client,
                connectivity,
            )),
        }
    }

    /// Returns the transport for `kind`
    pub fn get(&self, kind: TransportKind) -> Arc<AnyTransport> {
        match kind {
            TransportKind::Primary => Arc::clone(&self.primary),
            TransportKind::Alternate => Arc::clone(&self.alternate),
        }
    }
}

/// Sequences intents into fetches
pub struct Controller {
    coordinator: Arc<Coordinator>,
    transports: Transports,
    settings: FetchSettings,
    session: SessionState,
    issued_seq: u64,
}

impl Controller {
    /// Creates a controller starting from `session`
    pub fn new(
        coordinator: Arc<Coordinator>,
        transports: Transports,
        settings: FetchSettings,
        session: SessionState,
    ) -> Self {
        Self {
            coordinator,
            transports,
            settings,
            session,
            issued_seq: 0,
        }
    }

    /// Current browsing state
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Session settings
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Descriptor for the page the session currently points at
    pub fn current_request(&self) -> RequestDescriptor {
        build_request(
            self.session.resource_type,
            &self.session.search_term,
            self.session.current_page,
            self.settings.page_size,
            &self.settings.base_url,
        )
    }

    /// Applies an intent to the session.
    ///
    /// # Returns
    /// * `Some(RequestDescriptor)` - The page that should now be fetched
    /// * `None` - Nothing changed, no fetch needed
    pub fn apply(&mut self, intent: Intent) -> Option<RequestDescriptor> {
        match intent {
            Intent::Search(term) => {
                self.session.search_term = term.trim().to_string();
                self.session.current_page = 1;
            }
            Intent::SelectPage(page) => {
                let page = self.clamp_page(page);
                if page == self.session.current_page {
                    return None;
                }
                self.session.current_page = page;
            }
            Intent::NextPage => {
                return self.apply(Intent::SelectPage(self.session.current_page.saturating_add(1)));
            }
            Intent::PreviousPage => {
                return self.apply(Intent::SelectPage(self.session.current_page.saturating_sub(1)));
            }
            Intent::SelectTransport(kind) => {
                self.session.transport_kind = kind;
            }
            Intent::SelectResourceType(resource_type) => {
                self.session.resource_type = resource_type;
                self.session.current_page = 1;
                self.session.total_pages = 0;
            }
            Intent::Refresh => {
                let descriptor = self.current_request();
                self.coordinator
                    .invalidate(self.session.transport_kind, &descriptor);
                return Some(descriptor);
            }
        }
        Some(self.current_request())
    }

    /// Keeps page numbers within the known page range
    fn clamp_page(&self, page: u32) -> u32 {
        let page = page.max(1);
        if self.session.total_pages == 0 {
            page
        } else {
            page.min(self.session.total_pages)
        }
    }

    /// Reserves the sequence number for a new fetch.
    ///
    /// The number doubles as the coordinator request id, so supersession
    /// follows dispatch order however the fetch tasks get scheduled.
    fn next_seq(&mut self) -> u64 {
        self.issued_seq = self.coordinator.reserve_request_id();
        self.issued_seq
    }

    /// Starts fetching `descriptor` in the background.
    ///
    /// The outcome is sent on `events` unless the fetch is superseded. A
    /// panicking fetch is reported as [`Failure::Unexpected`].
    pub fn spawn_fetch(
        &mut self,
        descriptor: RequestDescriptor,
        events: mpsc::UnboundedSender<FetchEvent>,
    ) -> JoinHandle<()> {
        let seq = self.next_seq();
        let coordinator = Arc::clone(&self.coordinator);
        let transport = self.transports.get(self.session.transport_kind);

        tokio::spawn(async move {
            let fetch = coordinator.fetch_page_as(seq, &descriptor, transport.as_ref());
            let outcome = AssertUnwindSafe(fetch)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(seq, "Fetch panicked");
                    Err(Failure::unexpected("fetch task panicked"))
                });
            if let Some(event) = Self::event_for(seq, outcome) {
                let _ = events.send(event);
            }
        })
    }

    /// Applies an intent and, if it calls for one, starts the fetch.
    ///
    /// # Returns
    /// `true` when a fetch was started
    pub fn dispatch<R: Renderer>(
        &mut self,
        intent: Intent,
        renderer: &mut R,
        events: &mpsc::UnboundedSender<FetchEvent>,
    ) -> bool {
        debug!(?intent, "Dispatching intent");
        let Some(descriptor) = self.apply(intent) else {
            return false;
        };
        renderer.set_loading(true);
        self.spawn_fetch(descriptor, events.clone());
        true
    }

    /// Fetches `descriptor` on the current task
    ///
    /// # Returns
    /// * `Some(FetchEvent)` - The outcome
    /// * `None` - The fetch was superseded
    pub async fn fetch(&mut self, descriptor: &RequestDescriptor) -> Option<FetchEvent> {
        let seq = self.next_seq();
        let transport = self.transports.get(self.session.transport_kind);
        let outcome = self
            .coordinator
            .fetch_page_as(seq, descriptor, transport.as_ref())
            .await;
        Self::event_for(seq, outcome)
    }

    fn event_for(seq: u64, outcome: Result<FetchedPage, Failure>) -> Option<FetchEvent> {
        match outcome {
            Ok(page) => Some(FetchEvent::Loaded { seq, page }),
            Err(Failure::Cancelled) => None,
            Err(failure) => Some(FetchEvent::Failed { seq, failure }),
        }
    }

    /// Cancels the in-flight fetch, if any
    pub fn cancel_pending(&self) {
        self.coordinator.cancel_pending();
    }

    /// Whether `event` answers the most recent dispatch
    pub fn is_current(&self, event: &FetchEvent) -> bool {
        event.seq() == self.issued_seq
    }

    /// Shows a fetch outcome, ignoring outcomes of older dispatches
    pub fn deliver<R: Renderer>(&mut self, event: FetchEvent, renderer: &mut R) {
        if !self.is_current(&event) {
            debug!(seq = event.seq(), latest = self.issued_seq, "Dropping stale fetch outcome");
            return;
        }
        renderer.set_loading(false);

        match event {
            FetchEvent::Loaded { page, .. } => {
                self.session.total_pages = total_pages(page.total_count, self.settings.page_size);
                renderer.render(&page.items, page.total_count, page.resource_type);
                renderer.render_pagination(self.session.current_page, self.session.total_pages);
            }
            FetchEvent::Failed { failure, .. } => {
                if let Some(message) = failure.user_message() {
                    renderer.show_error(&message);
                }
            }
        }
    }
}
