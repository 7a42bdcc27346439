/// Focusable regions of the screen, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    /// Search box in the header bar
    Search,
    /// Contact table
    Table,
    /// Name input of the add form
    Name,
    /// Phone input of the add form
    Phone,
}

impl Focus {
    pub const ALL: [Focus; 4] = [Focus::Search, Focus::Table, Focus::Name, Focus::Phone];

    pub fn title(self) -> &'static str {
        match self {
            Focus::Search => "SEARCH",
            Focus::Table => "CONTACTS",
            Focus::Name => "NAME",
            Focus::Phone => "PHONE",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Focus::Search => 0,
            Focus::Table => 1,
            Focus::Name => 2,
            Focus::Phone => 3,
        }
    }

    /// Next region, wrapping around
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous region, wrapping around
    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn is_form(self) -> bool {
        matches!(self, Focus::Name | Focus::Phone)
    }
}
