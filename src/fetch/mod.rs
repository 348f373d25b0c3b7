//! Request orchestration
//!
//! This module holds the pieces between the controller and the transports:
//! the failure taxonomy, the backoff retrier, the connectivity signal and the
//! coordinator that ties them to the response cache.

pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod retry;

pub use connectivity::{Connectivity, FixedConnectivity, RouteProbe};
pub use coordinator::{Coordinator, FetchedPage};
pub use error::Failure;
pub use retry::{RetryPolicy, BASE_DELAY_MS, MAX_RETRIES};
