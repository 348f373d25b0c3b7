//! Application state management for restpager
//!
//! This module contains the interactive application state: keyboard input
//! handling, the results view fed by the controller, and the channel that
//! carries background fetch outcomes back to the event loop.

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;

use crate::controller::{Controller, FetchEvent, Intent, Renderer};
use crate::data::{Item, ResourceType};

/// Where keyboard input currently goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Keys navigate results and pages
    Browsing,
    /// Keys edit the search term
    Searching,
}

/// Everything the results screen shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsView {
    /// Items of the displayed page
    pub items: Vec<Item>,
    /// Total matching items on the server
    pub total_count: u64,
    /// Collection the displayed items came from
    pub resource_type: Option<ResourceType>,
    /// Page shown in the pagination bar
    pub current_page: u32,
    /// Page count shown in the pagination bar
    pub total_pages: u32,
    /// Whether a fetch is in progress
    pub loading: bool,
    /// Message of the last failure, cleared by the next successful render
    pub error: Option<String>,
}

impl Renderer for ResultsView {
    fn render(&mut self, items: &[Item], total_count: u64, resource_type: ResourceType) {
        self.items = items.to_vec();
        self.total_count = total_count;
        self.resource_type = Some(resource_type);
        self.error = None;
    }

    fn render_pagination(&mut self, current_page: u32, total_pages: u32) {
        self.current_page = current_page;
        self.total_pages = total_pages;
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}

/// Main application struct managing state and data
pub struct App {
    /// Intent dispatcher and session owner
    pub controller: Controller,
    /// What the results screen shows
    pub results: ResultsView,
    /// Where keys go
    pub input_mode: InputMode,
    /// Search term being typed
    pub search_input: String,
    /// Index of the highlighted item
    pub selected_index: usize,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    events_tx: mpsc::UnboundedSender<FetchEvent>,
    events_rx: mpsc::UnboundedReceiver<FetchEvent>,
}

impl App {
    /// Creates a new App around a controller
    pub fn new(controller: Controller) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let search_input = controller.session().search_term.clone();
        Self {
            controller,
            results: ResultsView::default(),
            input_mode: InputMode::Browsing,
            search_input,
            selected_index: 0,
            show_help: false,
            should_quit: false,
            events_tx,
            events_rx,
        }
    }

    /// Starts fetching the page the session points at
    pub fn start(&mut self) {
        self.results.set_loading(true);
        let descriptor = self.controller.current_request();
        self.controller.spawn_fetch(descriptor, self.events_tx.clone());
    }

    fn dispatch(&mut self, intent: Intent) {
        if self
            .controller
            .dispatch(intent, &mut self.results, &self.events_tx)
        {
            self.selected_index = 0;
        }
    }

    /// Applies every fetch outcome that has arrived so far
    ///
    /// # Returns
    /// The number of outcomes processed
    pub fn drain_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
            processed += 1;
        }
        processed
    }

    /// Waits for the next fetch outcome and applies it
    pub async fn wait_for_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply_event(event);
                true
            }
            None => false,
        }
    }

    fn apply_event(&mut self, event: FetchEvent) {
        self.controller.deliver(event, &mut self.results);
        if self.selected_index >= self.results.items.len() {
            self.selected_index = self.results.items.len().saturating_sub(1);
        }
    }

    /// Returns the highlighted item, if any
    pub fn selected_item(&self) -> Option<&Item> {
        self.results.items.get(self.selected_index)
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - `q` or `Esc`: Quit the application
    /// - `/`: Start typing a search term (`Enter` runs it, `Esc` cancels)
    /// - `Up`/`k`, `Down`/`j`: Move the highlight
    /// - `Left`/`h`, `Right`/`l`: Previous / next page
    /// - `g`, `G`: First / last page
    /// - `1`-`3`: Posts, users, comments
    /// - `t`: Toggle transport
    /// - `r`: Refresh the current page
    /// - `?`: Toggle help
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Handle help overlay - intercepts all keys when shown
        if self.show_help {
            if matches!(
                key_event.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return;
        }

        match self.input_mode {
            InputMode::Searching => self.handle_search_key(key_event),
            InputMode::Browsing => self.handle_browse_key(key_event),
        }
    }

    fn handle_search_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Enter => {
                self.input_mode = InputMode::Browsing;
                self.dispatch(Intent::Search(self.search_input.clone()));
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Browsing;
                self.search_input = self.controller.session().search_term.clone();
            }
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Char(c) => {
                self.search_input.push(c);
            }
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.controller.cancel_pending();
                self.should_quit = true;
            }
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Searching;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_index = self.selected_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_index + 1 < self.results.items.len() {
                    self.selected_index += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.dispatch(Intent::PreviousPage);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.dispatch(Intent::NextPage);
            }
            KeyCode::Char('g') => {
                self.dispatch(Intent::SelectPage(1));
            }
            KeyCode::Char('G') => {
                let last = self.controller.session().total_pages;
                if last > 0 {
                    self.dispatch(Intent::SelectPage(last));
                }
            }
            KeyCode::Char('1') => {
                self.dispatch(Intent::SelectResourceType(ResourceType::Posts));
            }
            KeyCode::Char('2') => {
                self.dispatch(Intent::SelectResourceType(ResourceType::Users));
            }
            KeyCode::Char('3') => {
                self.dispatch(Intent::SelectResourceType(ResourceType::Comments));
            }
            KeyCode::Char('t') => {
                let kind = self.controller.session().transport_kind.toggled();
                self.dispatch(Intent::SelectTransport(kind));
            }
            KeyCode::Char('r') => {
                self.dispatch(Intent::Refresh);
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            _ => {}
        }
    }
}
