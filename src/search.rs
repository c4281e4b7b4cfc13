/// The in-progress filter pattern while the session is in Search mode.
///
/// Every mutation hands back the full pattern; the backend decides which
/// entries match it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSession {
    pattern: String,
}

/// What the controller must tell the backend when a search ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Keep whatever filter the backend currently applies.
    Keep(String),
    /// Clear the backend filter.
    Reset,
}

impl SearchSession {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn append_char(&mut self, c: char) -> &str {
        self.pattern.push(c);
        &self.pattern
    }

    /// Removes the last char. Returns `None` when there was nothing to remove.
    pub fn backspace(&mut self) -> Option<&str> {
        self.pattern.pop()?;
        Some(&self.pattern)
    }

    pub fn cancel(&mut self) -> SearchOutcome {
        self.pattern.clear();
        SearchOutcome::Reset
    }

    pub fn commit(self) -> SearchOutcome {
        SearchOutcome::Keep(self.pattern)
    }
}
