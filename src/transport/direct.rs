//! Primary transport: races the request against the cancellation token

use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

use super::{parse_total_count, send_failure, RawResponse, TransportAdapter, TransportKind, TOTAL_COUNT_HEADER};
use crate::data::RequestDescriptor;
use crate::fetch::{Connectivity, Failure};

/// Sends requests directly and drops the in-flight future on cancellation
#[derive(Clone)]
pub struct DirectTransport {
    client: Client,
    connectivity: Arc<dyn Connectivity>,
}

impl DirectTransport {
    /// Creates a transport with a custom HTTP client and connectivity signal
    pub fn with_client(client: Client, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            client,
            connectivity,
        }
    }

    /// Builds the full request URL including query parameters
    fn request_url(descriptor: &RequestDescriptor) -> Result<Url, Failure> {
        let mut url = Url::parse(&descriptor.endpoint).map_err(|e| {
            Failure::unexpected(format!("invalid endpoint '{}': {}", descriptor.endpoint, e))
        })?;
        url.query_pairs_mut().extend_pairs(descriptor.query_pairs());
        Ok(url)
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, Failure> {
        let url = Self::request_url(descriptor)?;
        trace!(%url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| send_failure(self.connectivity.as_ref(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::from_status(status.as_u16()));
        }

        let total_count = parse_total_count(
            response
                .headers()
                .get(TOTAL_COUNT_HEADER)
                .and_then(|value| value.to_str().ok()),
        );

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| send_failure(self.connectivity.as_ref(), &e))?;
        let items = descriptor
            .resource_type
            .items_from_value(body)
            .map_err(|e| Failure::unexpected(format!("unexpected response shape: {}", e)))?;

        Ok(RawResponse { items, total_count })
    }
}

impl TransportAdapter for DirectTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Primary
    }

    async fn get_once(
        &self,
        descriptor: &RequestDescriptor,
        token: &CancellationToken,
    ) -> Result<RawResponse, Failure> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Failure::Cancelled),
            result = self.send(descriptor) => result,
        }
    }
}
