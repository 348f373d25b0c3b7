//! UI rendering module for restpager
//!
//! This module contains the rendering logic for the terminal user interface,
//! using the ratatui library, plus the plain-text renderer used by `--once`.

pub mod help_overlay;
pub mod plain;
pub mod results;

pub use help_overlay::render as render_help_overlay;
pub use plain::PlainRenderer;
pub use results::render as render_results;
