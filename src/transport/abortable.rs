//! Alternate transport: aborts the request through an abort handle

use futures::future::{abortable, Aborted};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{parse_total_count, send_failure, RawResponse, TransportAdapter, TransportKind, TOTAL_COUNT_HEADER};
use crate::data::RequestDescriptor;
use crate::fetch::{Connectivity, Failure};

/// Runs each request as an abortable future
///
/// A watcher task waits on the cancellation token and fires the request's
/// abort handle, so the request itself never polls the token.
#[derive(Clone)]
pub struct AbortableTransport {
    client: Client,
    connectivity: Arc<dyn Connectivity>,
}

impl AbortableTransport {
    /// Creates a transport with a custom HTTP client and connectivity signal
    pub fn with_client(client: Client, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            client,
            connectivity,
        }
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, Failure> {
        trace!(endpoint = %descriptor.endpoint, page = descriptor.page, "GET");

        let response = self
            .client
            .get(&descriptor.endpoint)
            .query(&descriptor.query_pairs())
            .send()
            .await
            .map_err(|e| send_failure(self.connectivity.as_ref(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::from_status(status.as_u16()));
        }

        let total_count = parse_total_count(find_header(response.headers(), TOTAL_COUNT_HEADER));

        let body = response
            .bytes()
            .await
            .map_err(|e| send_failure(self.connectivity.as_ref(), &e))?;
        let items = descriptor
            .resource_type
            .items_from_slice(&body)
            .map_err(|e| Failure::unexpected(format!("unexpected response shape: {}", e)))?;

        Ok(RawResponse { items, total_count })
    }
}

/// Looks a header up by name, ignoring ASCII case
fn find_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.as_str().eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.to_str().ok())
}

impl TransportAdapter for AbortableTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Alternate
    }

    async fn get_once(
        &self,
        descriptor: &RequestDescriptor,
        token: &CancellationToken,
    ) -> Result<RawResponse, Failure> {
        if token.is_cancelled() {
            return Err(Failure::Cancelled);
        }

        let (request, abort_handle) = abortable(self.send(descriptor));
        let watched = token.clone();
        let watcher = tokio::spawn(async move {
            watched.cancelled().await;
            abort_handle.abort();
        });

        let outcome = request.await;
        watcher.abort();

        match outcome {
            Ok(result) => result,
            Err(Aborted) => Err(Failure::Cancelled),
        }
    }
}
