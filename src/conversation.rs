/// The transcript accumulated over a session.
///
/// Invariant: there is always at least one element, the currently open
/// line (possibly empty). Only the last element is ever mutated in place;
/// earlier lines are frozen.
#[derive(Debug, Clone)]
pub struct Conversation {
    lines: Vec<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
        }
    }

    /// Overwrite the open line with a fresh transcription of it.
    pub fn update_open_line(&mut self, text: impl Into<String>) {
        // Safe: the invariant guarantees a last element.
        if let Some(last) = self.lines.last_mut() {
            *last = text.into();
        }
    }

    /// Freeze the open line and append `text` as the new open line.
    pub fn start_new_line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn open_line(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or("")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.clone()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    /// Reset to the initial single-empty-line state.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.lines.push(String::new());
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_empty_open_line() {
        let convo = Conversation::new();
        assert_eq!(convo.lines(), &[String::new()]);
        assert!(convo.is_empty());
    }

    #[test]
    fn update_overwrites_only_the_open_line() {
        let mut convo = Conversation::new();
        convo.update_open_line("hel");
        convo.update_open_line("hello");
        convo.start_new_line("world");
        convo.update_open_line("world!");

        assert_eq!(convo.lines(), &["hello".to_string(), "world!".to_string()]);
        assert_eq!(convo.open_line(), "world!");
    }

    #[test]
    fn clear_restores_the_invariant() {
        let mut convo = Conversation::new();
        convo.update_open_line("hello");
        convo.start_new_line("world");
        convo.clear();

        assert_eq!(convo.len(), 1);
        assert!(convo.is_empty());
    }
}
