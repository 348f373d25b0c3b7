//! Derives request descriptors from the current browsing state

use super::{RequestDescriptor, ResourceType};

/// Builds the descriptor for one page fetch.
///
/// # Arguments
/// * `resource_type` - Collection to fetch
/// * `search_term` - Free-text filter; surrounding whitespace is ignored
/// * `page` - 1-based page number
/// * `page_size` - Items per page
/// * `base_url` - API root, with or without a trailing slash
pub fn build_request(
    resource_type: ResourceType,
    search_term: &str,
    page: u32,
    page_size: u32,
    base_url: &str,
) -> RequestDescriptor {
    RequestDescriptor {
        endpoint: format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            resource_type.path()
        ),
        resource_type,
        search_term: search_term.trim().to_string(),
        page,
        page_size,
    }
}

/// Number of pages needed to show `total_count` items
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_count.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}
