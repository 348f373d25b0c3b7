//! Command-line interface parsing for restpager
//!
//! This module handles parsing of CLI arguments using clap and validating
//! them into the settings and initial session the application starts with.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::controller::{FetchSettings, SessionState};
use crate::data::ResourceType;
use crate::transport::TransportKind;

/// API root used when `--base-url` is not given
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Items per page used when `--page-size` is not given
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The resource type name is not recognized
    #[error("Invalid resource type: '{0}'. Valid types: posts, users, comments")]
    InvalidResourceType(String),

    /// The transport name is not recognized
    #[error("Invalid transport: '{0}'. Valid transports: primary, alternate")]
    InvalidTransport(String),

    #[error("Invalid page size: must be greater than 0")]
    InvalidPageSize,

    #[error("Invalid page: pages start at 1")]
    InvalidPage,

    /// The base URL is not an absolute http(s) URL
    #[error("Invalid base URL: '{0}'")]
    InvalidBaseUrl(String),
}

/// restpager - Browse paginated REST collections from the terminal
#[derive(Parser, Debug)]
#[command(name = "restpager")]
#[command(about = "Browse paginated REST collections from the terminal")]
#[command(version)]
pub struct Cli {
    /// API root the collections live under
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Items per page
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Collection to browse
    ///
    /// Valid types: posts, users, comments
    #[arg(long = "type", value_name = "TYPE", default_value = "posts")]
    pub resource_type: String,

    /// Transport used for requests
    ///
    /// Valid transports: primary, alternate
    #[arg(long, value_name = "TRANSPORT", default_value = "primary")]
    pub transport: String,

    /// Initial search term
    #[arg(long, short = 's', value_name = "TERM", default_value = "")]
    pub search: String,

    /// Initial page
    #[arg(long, value_name = "PAGE", default_value_t = 1)]
    pub page: u32,

    /// Print one page as plain text and exit
    ///
    /// Examples:
    ///   restpager --once                      # First page of posts
    ///   restpager --once --type users --page 2
    ///   restpager --once --search qui         # Posts matching "qui"
    #[arg(long)]
    pub once: bool,

    /// Treat the network as unreachable
    #[arg(long)]
    pub offline: bool,

    /// Directory for log files (defaults to the user cache directory)
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Static fetch settings
    pub settings: FetchSettings,
    /// Session the application opens on
    pub session: SessionState,
    /// Print one page and exit instead of running the TUI
    pub once: bool,
    /// Force the offline connectivity signal
    pub offline: bool,
    /// Log directory override
    pub log_dir: Option<PathBuf>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            settings: FetchSettings {
                base_url: DEFAULT_BASE_URL.to_string(),
                page_size: DEFAULT_PAGE_SIZE,
            },
            session: SessionState::default(),
            once: false,
            offline: false,
            log_dir: None,
        }
    }
}

/// Parses a resource type argument.
///
/// # Returns
/// * `Ok(ResourceType)` if the string names a collection
/// * `Err(CliError::InvalidResourceType)` if it doesn't
pub fn parse_resource_type_arg(s: &str) -> Result<ResourceType, CliError> {
    ResourceType::from_str(s).ok_or_else(|| CliError::InvalidResourceType(s.to_string()))
}

/// Parses a transport argument.
pub fn parse_transport_arg(s: &str) -> Result<TransportKind, CliError> {
    TransportKind::from_str(s).ok_or_else(|| CliError::InvalidTransport(s.to_string()))
}

/// Checks that `s` is an absolute http(s) URL
pub fn parse_base_url_arg(s: &str) -> Result<String, CliError> {
    match url::Url::parse(s) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(s.trim_end_matches('/').to_string())
        }
        _ => Err(CliError::InvalidBaseUrl(s.to_string())),
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` for the first invalid argument
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.page_size == 0 {
            return Err(CliError::InvalidPageSize);
        }
        if cli.page == 0 {
            return Err(CliError::InvalidPage);
        }

        Ok(StartupConfig {
            settings: FetchSettings {
                base_url: parse_base_url_arg(&cli.base_url)?,
                page_size: cli.page_size,
            },
            session: SessionState {
                current_page: cli.page,
                search_term: cli.search.trim().to_string(),
                resource_type: parse_resource_type_arg(&cli.resource_type)?,
                transport_kind: parse_transport_arg(&cli.transport)?,
                total_pages: 0,
            },
            once: cli.once,
            offline: cli.offline,
            log_dir: cli.log_dir.clone(),
        })
    }
}
