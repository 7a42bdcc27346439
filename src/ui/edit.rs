use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// Single-line text input backing the search box and the add form.
#[derive(Debug, Default, Clone)]
pub struct TextField {
    input: Input,
}

impl TextField {
    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    pub fn reset(&mut self) {
        self.input.reset();
    }

    /// Feed a key to the input. Returns true when the text changed.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.input
            .handle_event(&Event::Key(key))
            .map(|change| change.value)
            .unwrap_or(false)
    }
}
