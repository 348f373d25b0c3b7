//! HTTP transports for page fetches
//!
//! A transport performs exactly one GET for a [`RequestDescriptor`] and
//! reports either the decoded page or a classified [`Failure`]. Two
//! implementations exist and differ only in how they react to cancellation
//! and how they read response metadata:
//!
//! - [`DirectTransport`] races the request against the cancellation token
//! - [`AbortableTransport`] wraps the request in an abort handle fired by a
//!   token watcher task

mod abortable;
mod direct;

pub use abortable::AbortableTransport;
pub use direct::DirectTransport;

use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::data::{Item, RequestDescriptor};
use crate::fetch::{Connectivity, Failure};

/// Response header carrying the server-side match count
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Which transport implementation serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Primary,
    Alternate,
}

impl TransportKind {
    /// Stable lowercase name, used in cache keys and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Primary => "primary",
            TransportKind::Alternate => "alternate",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            TransportKind::Primary => "Primary (select)",
            TransportKind::Alternate => "Alternate (abort handle)",
        }
    }

    /// The other transport
    pub fn toggled(&self) -> TransportKind {
        match self {
            TransportKind::Primary => TransportKind::Alternate,
            TransportKind::Alternate => TransportKind::Primary,
        }
    }

    /// Parses a transport name, case-insensitively
    pub fn from_str(s: &str) -> Option<TransportKind> {
        match s.to_lowercase().trim() {
            "primary" | "direct" => Some(TransportKind::Primary),
            "alternate" | "abortable" => Some(TransportKind::Alternate),
            _ => None,
        }
    }
}

/// A decoded page as it came off the wire
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// Items of the requested page
    pub items: Vec<Item>,
    /// Value of the total-count header, or 0 when missing or malformed
    pub total_count: u64,
}

/// Performs a single page GET
///
/// Implementations must:
/// - map non-2xx statuses to [`Failure::Http`]
/// - map token cancellation to [`Failure::Cancelled`]
/// - map send errors to [`Failure::NetworkOffline`] while the host is offline
/// - never retry on their own
pub trait TransportAdapter: Send + Sync {
    /// Which implementation this is
    fn kind(&self) -> TransportKind;

    /// Sends one request, stopping early if `token` is cancelled
    fn get_once(
        &self,
        descriptor: &RequestDescriptor,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<RawResponse, Failure>> + Send;
}

/// Either transport, chosen at construction time
#[derive(Clone)]
pub enum AnyTransport {
    Direct(DirectTransport),
    Abortable(AbortableTransport),
}

impl AnyTransport {
    /// Builds the transport for `kind` on top of a shared HTTP client
    pub fn for_kind(kind: TransportKind, client: Client, connectivity: Arc<dyn Connectivity>) -> Self {
        match kind {
            TransportKind::Primary => {
                AnyTransport::Direct(DirectTransport::with_client(client, connectivity))
            }
            TransportKind::Alternate => {
                AnyTransport::Abortable(AbortableTransport::with_client(client, connectivity))
            }
        }
    }
}

impl TransportAdapter for AnyTransport {
    fn kind(&self) -> TransportKind {
        match self {
            AnyTransport::Direct(transport) => transport.kind(),
            AnyTransport::Abortable(transport) => transport.kind(),
        }
    }

    async fn get_once(
        &self,
        descriptor: &RequestDescriptor,
        token: &CancellationToken,
    ) -> Result<RawResponse, Failure> {
        match self {
            AnyTransport::Direct(transport) => transport.get_once(descriptor, token).await,
            AnyTransport::Abortable(transport) => transport.get_once(descriptor, token).await,
        }
    }
}

/// Parses the total-count header value
///
/// Missing, empty or non-numeric values count as zero.
pub fn parse_total_count(value: Option<&str>) -> u64 {
    value
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Classifies an error raised while sending a request or reading its body
fn send_failure(connectivity: &dyn Connectivity, error: &reqwest::Error) -> Failure {
    if !connectivity.is_online() {
        return Failure::NetworkOffline;
    }
    if error.is_builder() || error.is_decode() {
        Failure::unexpected(format!("invalid request or response: {}", error))
    } else {
        Failure::transient(format!("request failed: {}", error))
    }
}
