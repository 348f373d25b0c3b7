//! Cache keys for page responses

use std::fmt;

use crate::data::RequestDescriptor;
use crate::transport::TransportKind;

/// Identity of a cached page
///
/// Two requests share a key exactly when they used the same transport, the
/// same endpoint, the same search term and the same page. The page size is a
/// per-session constant and does not take part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    transport: TransportKind,
    endpoint: String,
    search_term: String,
    page: u32,
}

impl CacheKey {
    /// Derives the key for a request sent through the given transport
    pub fn new(transport: TransportKind, descriptor: &RequestDescriptor) -> Self {
        Self {
            transport,
            endpoint: descriptor.endpoint.clone(),
            search_term: descriptor.search_term.clone(),
            page: descriptor.page,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}?q={:?}&page={}",
            self.transport.name(),
            self.endpoint,
            self.search_term,
            self.page
        )
    }
}
