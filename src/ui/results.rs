//! Results screen rendering
//!
//! Renders the session header, the page of items with the highlighted entry,
//! the pagination bar and the key hints.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::data::Item;

/// Formats the pagination bar text
///
/// Arrows are only shown where a move is possible. An unknown page count
/// (0) shows just the current page.
fn pagination_label(current_page: u32, total_pages: u32) -> String {
    if total_pages == 0 {
        return format!("Page {}", current_page);
    }
    let back = if current_page > 1 { "\u{25C0} " } else { "  " }; // ◀
    let forward = if current_page < total_pages { " \u{25B6}" } else { "  " }; // ▶
    format!("{}Page {} of {}{}", back, current_page, total_pages, forward)
}

/// Renders the results screen
///
/// # Arguments
/// * `frame` - The ratatui Frame to render to
/// * `app` - The application state holding the results view and session
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(3),    // Items
            Constraint::Length(1), // Pagination and status
            Constraint::Length(1), // Key hints
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    render_items(frame, app, chunks[1]);
    render_status(frame, app, chunks[2]);
    render_hints(frame, app, chunks[3]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.controller.session();

    let title = Line::from(vec![
        Span::styled(
            "RESTPAGER",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            session.resource_type.label(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  via "),
        Span::styled(session.transport_kind.label(), Style::default().fg(Color::Yellow)),
    ]);

    let search = match app.input_mode {
        InputMode::Searching => Line::from(vec![
            Span::styled("Search: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.search_input.clone()),
            Span::styled("\u{2588}", Style::default().fg(Color::Yellow)), // █
        ]),
        InputMode::Browsing if session.search_term.is_empty() => Line::from(Span::styled(
            "No search filter. Press / to search",
            Style::default().fg(Color::DarkGray),
        )),
        InputMode::Browsing => Line::from(vec![
            Span::styled("Search: ", Style::default().fg(Color::DarkGray)),
            Span::styled(session.search_term.clone(), Style::default().fg(Color::White)),
        ]),
    };

    let separator = Line::from(Span::styled(
        "\u{2500}".repeat((area.width as usize).saturating_sub(2)),
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(vec![title, search, separator]), area);
}

fn item_line(item: &Item, is_selected: bool) -> Line<'static> {
    let cursor = if is_selected { "\u{25B8} " } else { "  " }; // ▸
    let headline_style = if is_selected {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    Line::from(vec![
        Span::styled(cursor, Style::default().fg(Color::Cyan)),
        Span::styled(format!("{:>4} ", item.id()), Style::default().fg(Color::DarkGray)),
        Span::styled(item.headline().to_string(), headline_style),
    ])
}

fn render_items(frame: &mut Frame, app: &App, area: Rect) {
    let results = &app.results;
    let block = Block::default()
        .title(format!(" {} ", app.controller.session().resource_type.label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines: Vec<Line> = Vec::with_capacity(results.items.len() + 2);

    if results.items.is_empty() {
        let message = if results.loading {
            "Loading..."
        } else if results.error.is_some() {
            "Nothing to show"
        } else {
            "No results"
        };
        lines.push(Line::from(Span::styled(
            message,
            Style::default().fg(Color::DarkGray),
        )));
    }

    for (index, item) in results.items.iter().enumerate() {
        lines.push(item_line(item, index == app.selected_index));
    }

    if let Some(item) = app.selected_item() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            item.detail(),
            Style::default().fg(Color::Gray),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let results = &app.results;
    let mut spans = vec![Span::styled(
        pagination_label(results.current_page.max(1), results.total_pages),
        Style::default().fg(Color::White),
    )];

    if results.total_count > 0 {
        spans.push(Span::styled(
            format!("  ({} total)", results.total_count),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if results.loading {
        spans.push(Span::styled("  Loading...", Style::default().fg(Color::Cyan)));
    }

    if let Some(ref error) = results.error {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(error.clone(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_hints(frame: &mut Frame, app: &App, area: Rect) {
    let spans = match app.input_mode {
        InputMode::Searching => vec![
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(" Search  "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" Cancel"),
        ],
        InputMode::Browsing => vec![
            Span::styled("\u{2190}/\u{2192}", Style::default().fg(Color::Yellow)),
            Span::raw(" Page  "),
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(" Search  "),
            Span::styled("1-3", Style::default().fg(Color::Yellow)),
            Span::raw(" Type  "),
            Span::styled("t", Style::default().fg(Color::Yellow)),
            Span::raw(" Transport  "),
            Span::styled("r", Style::default().fg(Color::Yellow)),
            Span::raw(" Refresh  "),
            Span::styled("?", Style::default().fg(Color::Yellow)),
            Span::raw(" Help  "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(" Quit"),
        ],
    };

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
