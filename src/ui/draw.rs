use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};

use crate::config::{Keys, RgbColor};

use super::app::{App, HelpSection};
use super::panes::Focus;

const TITLE: &str = "SUPER CONTACT LIST!";
const SUBMIT_LABEL: &str = " ADD CONTACT ";
const HELP_MODAL_FOOTER: &str = "j/k: scroll  Esc/q: close";
const FAVORITE_MARK: &str = "★";
const NOT_FAVORITE_MARK: &str = "☆";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(4),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_table(frame, layout[1], app);
    draw_form(frame, layout[2], app);
    draw_joke(frame, layout[3], app);
    draw_footer(frame, layout[4], app);
    draw_help_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let title = format!(" {} ", TITLE);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(title.chars().count() as u16),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(title).style(selection_style(app).add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let active = app.focus == Focus::Search;
    let (line, cursor) = input_line(
        app,
        "SEARCH: ",
        app.view().search(),
        app.search_input.visual_cursor(),
        active,
    );
    frame.render_widget(Paragraph::new(line), chunks[2]);
    if let Some(column) = cursor {
        let x = chunks[2].x.saturating_add(column as u16);
        frame.set_cursor_position((x, chunks[2].y));
    }
}

fn draw_table(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let active = app.focus == Focus::Table;
    let view = app.view();
    let visible = view.visible_contacts();
    let title = format!(
        " {} {}/{} ",
        Focus::Table.title(),
        visible.len(),
        view.contacts().len()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, active))
        .title(Span::styled(title, header_text_style(app)));

    if visible.is_empty() {
        let message = if view.contacts().is_empty() {
            "No contacts"
        } else {
            "No matches"
        };
        frame.render_widget(Paragraph::new(message).block(block), area);
        return;
    }

    let favorite_style = Style::default().fg(color(app.ui_colors().favorite));
    let rows: Vec<Row> = visible
        .iter()
        .map(|contact| {
            let mark = if contact.is_favorite {
                FAVORITE_MARK
            } else {
                NOT_FAVORITE_MARK
            };
            let row = Row::new(vec![
                Cell::from(contact.name.clone()),
                Cell::from(contact.phone.clone()),
                Cell::from(mark),
            ]);
            if contact.is_favorite {
                row.style(favorite_style)
            } else {
                row
            }
        })
        .collect();

    let header = Row::new(vec!["NAME", "PHONE", "FAV"]).style(header_text_style(app));
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(55),
            Constraint::Length(16),
            Constraint::Length(4),
        ],
    )
    .header(header)
    .block(block)
    .highlight_style(if active {
        selection_style(app)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    });

    let mut state = TableState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_form(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let active = app.focus.is_form();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, active))
        .title(Span::styled(" NEW CONTACT ", header_text_style(app)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let button_width = SUBMIT_LABEL.chars().count() as u16 + 2;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(button_width)])
        .split(inner);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(columns[0]);

    let fields = [
        (Focus::Name, "NAME:  ", app.name_input.value(), app.name_input.visual_cursor()),
        (
            Focus::Phone,
            "PHONE: ",
            app.view().phone(),
            app.phone_input.visual_cursor(),
        ),
    ];
    for ((focus, label, value, column), row) in fields.into_iter().zip(rows.iter()) {
        let focused = app.focus == focus;
        let (line, cursor) = input_line(app, label, value, column, focused);
        frame.render_widget(Paragraph::new(line), *row);
        if let Some(column) = cursor {
            frame.set_cursor_position((row.x.saturating_add(column as u16), row.y));
        }
    }

    // Rendered disabled unless the phone input passes validation
    let button_style = if app.view().can_submit() {
        selection_style(app).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(color(app.ui_colors().disabled))
            .add_modifier(Modifier::DIM)
    };
    let button_area = Rect {
        height: 1,
        ..columns[1]
    };
    frame.render_widget(
        Paragraph::new(SUBMIT_LABEL)
            .style(button_style)
            .alignment(Alignment::Center),
        button_area,
    );
}

fn draw_joke(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let title = format!(" JOKE ({}) ", app.joke_keys());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, false))
        .title(Span::styled(title, header_text_style(app)));

    let joke = app.view().joke();
    let paragraph = if joke.is_empty() && !app.joke_in_flight() {
        Paragraph::new(Span::styled(
            format!("Press {} for a joke", app.joke_keys()),
            Style::default().fg(color(app.ui_colors().disabled)),
        ))
    } else {
        Paragraph::new(joke.to_string())
    };
    frame.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message = match (&app.status, app.focus) {
        (Some(status), _) => status.clone(),
        (None, focus) => footer_help(app.keys(), focus),
    };
    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if app.help_modal.is_none() {
        return;
    }

    let modal_area = centered(area, 66, 80);
    let header_style = header_text_style(app);
    let block_style = border_style(app, true);
    let lines = help_lines(
        &app.help_entries(),
        modal_area.width.saturating_sub(4) as usize,
        header_style,
    );

    let Some(modal) = app.help_modal.as_mut() else {
        return;
    };
    // borders (2) + bottom title (1)
    modal.fit(lines.len(), modal_area.height.saturating_sub(3) as usize);

    let title = Line::from(vec![
        Span::styled(" HELP ", header_style),
        Span::styled(modal.scroll_indicator(), header_style),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(block_style)
        .title(title)
        .title_bottom(Span::styled(format!(" {} ", HELP_MODAL_FOOTER), header_style))
        .title_alignment(Alignment::Center);

    let visible: Vec<Line> = lines
        .into_iter()
        .skip(modal.scroll)
        .take(modal.viewport_height)
        .collect();
    let inner = block.inner(modal_area);
    frame.render_widget(Clear, modal_area);
    frame.render_widget(block, modal_area);
    frame.render_widget(Paragraph::new(visible), inner);
}

/// Rect of the given percentage size centered in `area`, never smaller
/// than 40x10 unless `area` is.
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let scale = |len: u16, percent: u16| (u32::from(len) * u32::from(percent) / 100) as u16;
    let width = scale(area.width, percent_x).max(40).min(area.width);
    let height = scale(area.height, percent_y).max(10).min(area.height);
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

/// One ruled header per section, then `action  keys` rows, sections
/// separated by a blank line.
fn help_lines(sections: &[HelpSection], width: usize, accent: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (idx, section) in sections.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::default());
        }
        lines.push(Line::styled(section_rule(section.title, width), accent));
        lines.extend(section.entries.iter().map(|entry| {
            Line::from(vec![
                Span::raw(format!("{:<20}", entry.action)),
                Span::styled(entry.keys.clone(), accent),
            ])
        }));
    }
    lines
}

fn section_rule(title: &str, width: usize) -> String {
    let label = format!(" {} ", title);
    let fill = width.saturating_sub(label.chars().count());
    let left = fill / 2;
    format!(
        "{}{}{}",
        LINE.horizontal.repeat(left),
        label,
        LINE.horizontal.repeat(fill - left)
    )
}

/// Context help built from the configured bindings, first binding of each action.
fn footer_help(keys: &Keys, focus: Focus) -> String {
    match focus {
        Focus::Search => format!(
            "Type to filter  {}/{}: back to contacts",
            first_key(&keys.search.confirm),
            first_key(&keys.search.cancel)
        ),
        Focus::Table => format!(
            "{}/{}: move  {}: favorite  {}: search  {}: add  {}: joke  {}: help  {}: quit",
            first_key(&keys.table.next),
            first_key(&keys.table.prev),
            first_key(&keys.table.favorite),
            first_key(&keys.table.search),
            first_key(&keys.table.add),
            first_key(&keys.global.joke),
            first_key(&keys.global.help),
            first_key(&keys.table.quit)
        ),
        Focus::Name | Focus::Phone => format!(
            "{}: next field  {}: add contact  {}: back to contacts",
            first_key(&keys.global.focus_next),
            first_key(&keys.form.submit),
            first_key(&keys.form.cancel)
        ),
    }
}

fn first_key(bindings: &[String]) -> &str {
    bindings.first().map(String::as_str).unwrap_or("-")
}

/// Label plus input value, with the cursor column when the field has focus.
fn input_line(
    app: &App,
    label: &'static str,
    value: &str,
    cursor_column: usize,
    active: bool,
) -> (Line<'static>, Option<usize>) {
    let value_style = if active {
        selection_style(app)
    } else {
        Style::default()
    };
    let line = Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::styled(value.to_string(), value_style),
    ]);
    let cursor = active.then(|| Span::raw(label).width() + cursor_column);
    (line, cursor)
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App, active: bool) -> Style {
    let colors = app.ui_colors();
    let style = Style::default().fg(color(colors.border));
    if active {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, JokeConfig};
    use crate::model::Contact;
    use crate::store::MemoryStore;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn test_config() -> Config {
        Config {
            joke: JokeConfig {
                endpoint: "http://127.0.0.1:9/".to_string(),
                timeout_secs: 1,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_renders_title_rows_and_form() {
        let config = test_config();
        let mut store = MemoryStore::from_contacts(vec![
            Contact::new("123456789", "Ana"),
            Contact::new("987654321", "Bob"),
        ]);
        let mut app = App::new(&mut store, &config).unwrap();
        app.handle_key(KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE))
            .unwrap();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        render(&mut terminal, &mut app).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains(TITLE));
        assert!(text.contains("Ana"));
        assert!(text.contains("987654321"));
        assert!(text.contains(FAVORITE_MARK));
        assert!(text.contains("NEW CONTACT"));
        assert!(text.contains("ADD CONTACT"));
        assert!(text.contains("Starred Ana"));
    }

    #[test]
    fn test_footer_follows_rebound_keys() {
        let mut config = test_config();
        config.keys.table.favorite = vec!["s".to_string()];
        config.keys.global.joke = vec!["F5".to_string()];
        let mut store = MemoryStore::from_contacts(vec![Contact::new("123456789", "Ana")]);
        let mut app = App::new(&mut store, &config).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        render(&mut terminal, &mut app).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("s: favorite"));
        assert!(text.contains("F5: joke"));
        assert!(!text.contains("f: favorite"));
        assert!(!text.contains("F2: joke"));

        app.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE))
            .unwrap();
        render(&mut terminal, &mut app).unwrap();
        assert!(screen_text(&terminal).contains("Tab: next field  Enter: add contact"));
    }

    #[test]
    fn test_joke_text_keeps_leading_whitespace() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf);
                let body = r#"{"value":"   indented punchline"}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        let config = Config {
            joke: JokeConfig {
                endpoint: format!("http://{}/", addr),
                timeout_secs: 5,
            },
            ..Config::default()
        };
        let mut store = MemoryStore::new();
        let mut app = App::new(&mut store, &config).unwrap();
        app.handle_key(KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE))
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.view().joke().is_empty() && Instant::now() < deadline {
            app.tick();
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(app.view().joke(), "   indented punchline");

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        render(&mut terminal, &mut app).unwrap();
        assert!(screen_text(&terminal).contains("│   indented punchline"));
    }

    #[test]
    fn test_header_and_form_show_view_text() {
        let config = test_config();
        let mut store = MemoryStore::from_contacts(vec![Contact::new("123456789", "Ana")]);
        let mut app = App::new(&mut store, &config).unwrap();
        for code in [KeyCode::Char('/'), KeyCode::Char('A'), KeyCode::Enter, KeyCode::Char('a')] {
            app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
        }
        app.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE))
            .unwrap();
        for c in "555".chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
                .unwrap();
        }

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        render(&mut terminal, &mut app).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("SEARCH: A"));
        assert!(text.contains("PHONE: 555"));
    }

    #[test]
    fn test_help_lines_layout() {
        let config = test_config();
        let mut store = MemoryStore::new();
        let app = App::new(&mut store, &config).unwrap();
        let sections = app.help_entries();
        let lines = help_lines(&sections, 30, Style::default());

        let entries: usize = sections.iter().map(|s| s.entries.len()).sum();
        assert_eq!(lines.len(), entries + sections.len() * 2 - 1);
        assert_eq!(lines[0].width(), 30);
        assert!(lines[0].to_string().contains(" Global "));
        assert!(lines[1].to_string().starts_with("Help"));
        assert_eq!(section_rule("Add form", 4), " Add form ");
    }

    #[test]
    fn test_centered_keeps_minimum_size() {
        let area = Rect::new(0, 0, 90, 30);
        let modal = centered(area, 66, 80);
        assert_eq!((modal.width, modal.height, modal.y), (59, 24, 3));
        assert!((15..=16).contains(&modal.x));
        let small = Rect::new(0, 0, 30, 8);
        assert_eq!(centered(small, 66, 80), small);
    }

    #[test]
    fn test_renders_empty_state_and_help() {
        let config = test_config();
        let mut store = MemoryStore::new();
        let mut app = App::new(&mut store, &config).unwrap();
        app.show_help();

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        render(&mut terminal, &mut app).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("No contacts"));
        assert!(text.contains("HELP"));
        assert!(text.contains("Toggle favorite"));
        let modal = app.help_modal.as_ref().unwrap();
        assert!(modal.total_lines > 0);
    }
}
