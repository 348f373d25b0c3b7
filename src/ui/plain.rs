//! Plain-text output for `--once`
//!
//! Prints a single page to a writer instead of drawing the TUI. Failures are
//! remembered so the caller can pick an exit code.

use std::fmt;
use std::io::{self, Write};

use crate::controller::Renderer;
use crate::data::{Item, ResourceType};

/// Renderer that writes lines of text
///
/// The first write error is kept and later writes are skipped.
pub struct PlainRenderer<W: Write> {
    out: W,
    error: Option<String>,
    write_error: Option<io::Error>,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            error: None,
            write_error: None,
        }
    }

    /// Message of the failure shown, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Flushes the output and reports the first write error
    pub fn finish(mut self) -> Result<W, io::Error> {
        if let Some(e) = self.write_error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.write_error.is_some() {
            return;
        }
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.write_all(b"\n")) {
            self.write_error = Some(e);
        }
    }
}

impl<W: Write> Renderer for PlainRenderer<W> {
    fn render(&mut self, items: &[Item], total_count: u64, resource_type: ResourceType) {
        self.line(format_args!("{} ({} total)", resource_type.label(), total_count));
        if items.is_empty() {
            self.line(format_args!("  No results"));
        }
        for item in items {
            self.line(format_args!("{:>5}  {}", item.id(), item.headline()));
            self.line(format_args!("       {}", item.detail()));
        }
    }

    fn render_pagination(&mut self, current_page: u32, total_pages: u32) {
        if total_pages == 0 {
            self.line(format_args!("Page {}", current_page));
        } else {
            self.line(format_args!("Page {} of {}", current_page, total_pages));
        }
    }

    fn set_loading(&mut self, _loading: bool) {}

    fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}
