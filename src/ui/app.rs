use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::info;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::config::{Config, Keys, UiColors};
use crate::joke::JokeFetcher;
use crate::model::Contact;
use crate::store::ContactStore;
use crate::view::ContactListView;

use super::draw;
use super::edit::TextField;
use super::panes::Focus;

const TICK: Duration = Duration::from_millis(100);
const PAGE_SIZE: isize = 5;
const FETCHING_STATUS: &str = "Fetching joke...";

/// Scroll position of the help popup. Sizes are filled in by the renderer.
#[derive(Debug, Clone, Default)]
pub struct HelpModal {
    /// First visible line
    pub scroll: usize,
    pub total_lines: usize,
    pub viewport_height: usize,
}

impl HelpModal {
    /// Record content and viewport sizes, pulling `scroll` back in range.
    pub fn fit(&mut self, total_lines: usize, viewport_height: usize) {
        self.total_lines = total_lines;
        self.viewport_height = viewport_height;
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll.saturating_add_signed(delta);
        self.scroll = target.min(self.max_scroll());
    }

    pub fn page(&self) -> isize {
        self.viewport_height.saturating_sub(1).max(1) as isize
    }

    pub fn scroll_indicator(&self) -> &'static str {
        let up = self.scroll > 0;
        let down = self.scroll < self.max_scroll();
        match (up, down) {
            (true, true) => "▲▼",
            (true, false) => "▲ ",
            (false, true) => " ▼",
            (false, false) => "  ",
        }
    }
}

/// A section in the help modal (e.g., "Global", "Contacts")
pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

/// A single help entry (action name + key bindings)
pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

pub struct App<'a> {
    config: &'a Config,
    view: ContactListView<'a>,
    jokes: JokeFetcher,
    pub focus: Focus,
    pub search_input: TextField,
    pub name_input: TextField,
    pub phone_input: TextField,
    /// Index into the visible rows
    pub selected: usize,
    /// Shown in the footer until the next key press
    pub status: Option<String>,
    /// A joke request was issued and has not been settled by `tick` yet
    joke_pending: bool,
    pub help_modal: Option<HelpModal>,
}

impl<'a> App<'a> {
    pub fn new(store: &'a mut dyn ContactStore, config: &'a Config) -> Result<Self> {
        let jokes = JokeFetcher::new(&config.joke)?;
        Ok(Self {
            config,
            view: ContactListView::new(store),
            jokes,
            focus: Focus::Table,
            search_input: TextField::default(),
            name_input: TextField::default(),
            phone_input: TextField::default(),
            selected: 0,
            status: None,
            joke_pending: false,
            help_modal: None,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            self.tick();
            draw::render(terminal, self)?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        info!("event=app_exit contacts={}", self.view.contacts().len());
        Ok(())
    }

    /// Pick up a finished joke fetch, if any. A failed fetch just drops the
    /// fetching status and leaves the previous joke in place.
    pub fn tick(&mut self) {
        if let Some(text) = self.jokes.poll() {
            self.view.set_joke(text);
            self.settle_joke();
        } else if self.joke_pending && !self.jokes.in_flight() {
            self.settle_joke();
        }
    }

    fn settle_joke(&mut self) {
        if self.joke_pending {
            self.joke_pending = false;
            if self.status.as_deref() == Some(FETCHING_STATUS) {
                self.status = None;
            }
        }
    }

    /// Handle a key press. Returns true when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if !self.joke_pending {
            self.status = None;
        }

        if self.help_modal.is_some() {
            self.handle_help_modal_key(key);
            return Ok(false);
        }

        let config = self.config;
        let global = &config.keys.global;
        if key_matches_any(&key, &global.help) {
            self.show_help();
            return Ok(false);
        }
        if key_matches_any(&key, &global.joke) {
            self.jokes.request();
            self.joke_pending = true;
            self.set_status(FETCHING_STATUS);
            return Ok(false);
        }
        if key_matches_any(&key, &global.focus_next) {
            self.focus = self.focus.next();
            return Ok(false);
        }
        if key_matches_any(&key, &global.focus_prev) {
            self.focus = self.focus.prev();
            return Ok(false);
        }

        match self.focus {
            Focus::Search => self.handle_search_key(key),
            Focus::Table => self.handle_table_key(key),
            Focus::Name | Focus::Phone => self.handle_form_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<bool> {
        let config = self.config;
        let keys = &config.keys.search;
        if key_matches_any(&key, &keys.confirm) || key_matches_any(&key, &keys.cancel) {
            self.focus = Focus::Table;
            return Ok(false);
        }

        if self.search_input.handle_key_event(key) {
            self.view.set_search(self.search_input.value());
            self.clamp_selection();
        }
        Ok(false)
    }

    fn handle_table_key(&mut self, key: KeyEvent) -> Result<bool> {
        let config = self.config;
        let keys = &config.keys.table;

        if key_matches_any(&key, &keys.quit) {
            return Ok(true);
        }
        if key_matches_any(&key, &keys.search) {
            self.focus = Focus::Search;
        } else if key_matches_any(&key, &keys.add) {
            self.focus = Focus::Name;
        } else if key_matches_any(&key, &keys.next) {
            self.move_selection(1);
        } else if key_matches_any(&key, &keys.prev) {
            self.move_selection(-1);
        } else if key_matches_any(&key, &keys.page_down) {
            self.move_selection(PAGE_SIZE);
        } else if key_matches_any(&key, &keys.page_up) {
            self.move_selection(-PAGE_SIZE);
        } else if key_matches_any(&key, &keys.favorite) {
            self.toggle_selected_favorite();
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let config = self.config;
        let keys = &config.keys.form;

        if key_matches_any(&key, &keys.submit) {
            self.submit_form();
            return Ok(false);
        }
        if key_matches_any(&key, &keys.cancel) {
            self.focus = Focus::Table;
            return Ok(false);
        }

        match self.focus {
            Focus::Name => {
                if self.name_input.handle_key_event(key) {
                    self.view.set_name(self.name_input.value());
                }
            }
            Focus::Phone => {
                if self.phone_input.handle_key_event(key) {
                    self.view.set_phone(self.phone_input.value());
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn toggle_selected_favorite(&mut self) {
        let Some(contact) = self.selected_contact().cloned() else {
            return;
        };
        let updated = self.view.toggle_favorite(&contact);
        let verb = if updated.is_favorite {
            "Starred"
        } else {
            "Unstarred"
        };
        self.set_status(format!("{} {}", verb, display_name(&updated)));
        // The row may drop out of or move within a filtered view
        self.clamp_selection();
    }

    fn submit_form(&mut self) {
        let Some(added) = self.view.submit() else {
            return;
        };
        self.set_status(format!("Added {}", display_name(&added)));
        if self.config.form.clear_on_submit {
            self.name_input.reset();
            self.phone_input.reset();
            self.view.clear_form();
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.view.visible_contacts().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let max = (len - 1) as isize;
        let next = (self.selected as isize + delta).clamp(0, max);
        self.selected = next as usize;
    }

    fn clamp_selection(&mut self) {
        let len = self.view.visible_contacts().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    pub fn view(&self) -> &ContactListView<'a> {
        &self.view
    }

    pub fn selected_contact(&self) -> Option<&Contact> {
        self.view.visible_contacts().get(self.selected).copied()
    }

    pub fn joke_in_flight(&self) -> bool {
        self.jokes.in_flight()
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn keys(&self) -> &Keys {
        &self.config.keys
    }

    pub fn joke_keys(&self) -> String {
        self.config.keys.global.joke.join("/")
    }

    // =========================================================================
    // Help Modal
    // =========================================================================

    /// Generate help content from current keybindings configuration
    pub fn help_entries(&self) -> Vec<HelpSection> {
        let keys = &self.config.keys;

        vec![
            HelpSection {
                title: "Global",
                entries: vec![
                    HelpEntry {
                        action: "Help",
                        keys: keys.global.help.join(", "),
                    },
                    HelpEntry {
                        action: "Fetch a joke",
                        keys: keys.global.joke.join(", "),
                    },
                    HelpEntry {
                        action: "Next area",
                        keys: keys.global.focus_next.join(", "),
                    },
                    HelpEntry {
                        action: "Previous area",
                        keys: keys.global.focus_prev.join(", "),
                    },
                    HelpEntry {
                        action: "Quit anywhere",
                        keys: "Ctrl+C".to_string(),
                    },
                ],
            },
            HelpSection {
                title: "Search",
                entries: vec![
                    HelpEntry {
                        action: "Back to contacts",
                        keys: keys
                            .search
                            .confirm
                            .iter()
                            .chain(keys.search.cancel.iter())
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", "),
                    },
                ],
            },
            HelpSection {
                title: "Contacts",
                entries: vec![
                    HelpEntry {
                        action: "Quit",
                        keys: keys.table.quit.join(", "),
                    },
                    HelpEntry {
                        action: "Search",
                        keys: keys.table.search.join(", "),
                    },
                    HelpEntry {
                        action: "Add contact",
                        keys: keys.table.add.join(", "),
                    },
                    HelpEntry {
                        action: "Next",
                        keys: keys.table.next.join(", "),
                    },
                    HelpEntry {
                        action: "Previous",
                        keys: keys.table.prev.join(", "),
                    },
                    HelpEntry {
                        action: "Page down",
                        keys: keys.table.page_down.join(", "),
                    },
                    HelpEntry {
                        action: "Page up",
                        keys: keys.table.page_up.join(", "),
                    },
                    HelpEntry {
                        action: "Toggle favorite",
                        keys: keys.table.favorite.join(", "),
                    },
                ],
            },
            HelpSection {
                title: "Add form",
                entries: vec![
                    HelpEntry {
                        action: "Submit",
                        keys: keys.form.submit.join(", "),
                    },
                    HelpEntry {
                        action: "Back to contacts",
                        keys: keys.form.cancel.join(", "),
                    },
                ],
            },
        ]
    }

    pub fn show_help(&mut self) {
        self.help_modal = Some(HelpModal::default());
    }

    fn handle_help_modal_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q'))
            || key_matches_any(&key, &self.config.keys.global.help)
        {
            self.help_modal = None;
            return;
        }

        let Some(modal) = self.help_modal.as_mut() else {
            return;
        };
        let delta = match key.code {
            KeyCode::Char('j') | KeyCode::Down => 1,
            KeyCode::Char('k') | KeyCode::Up => -1,
            KeyCode::PageDown => modal.page(),
            KeyCode::PageUp => -modal.page(),
            _ => return,
        };
        modal.scroll_by(delta);
    }
}

fn display_name(contact: &Contact) -> &str {
    if contact.name.is_empty() {
        &contact.phone
    } else {
        &contact.name
    }
}

/// Whether `event` triggers any of `bindings`.
pub fn key_matches_any(event: &KeyEvent, bindings: &[String]) -> bool {
    // Ctrl/Alt/Super chords are never bound
    let chorded = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(chorded) {
        return false;
    }
    bindings
        .iter()
        .filter_map(|binding| parse_binding(binding))
        .any(|code| code == event.code)
}

/// Key named by a binding string. Names are case-insensitive; a single
/// character is taken literally, so `M` means shift+m.
fn parse_binding(binding: &str) -> Option<KeyCode> {
    let binding = binding.trim();
    let mut chars = binding.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }

    let code = match binding.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backtab" | "shift+tab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "esc" | "escape" => KeyCode::Esc,
        "space" => KeyCode::Char(' '),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "pageup" | "page_up" => KeyCode::PageUp,
        "pagedown" | "page_down" => KeyCode::PageDown,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        name => {
            let n: u8 = name.strip_prefix('f')?.parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            KeyCode::F(n)
        }
    };
    Some(code)
}
