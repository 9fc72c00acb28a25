use chrono::Local;

pub const CONSOLE_WELCOME: &str = "Prompts will appear here when you send messages...";

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleEntry {
    pub time: String,
    pub prompt: String,
}

/// Shows the exact prompt the server built for each request.
#[derive(Debug, Clone, Default)]
pub struct PromptConsole {
    entries: Vec<ConsoleEntry>,
    visible: bool,
    scroll: usize,
}

impl PromptConsole {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            ..Default::default()
        }
    }

    /// Record a prompt and reveal the panel. Auto-reveal is not persisted.
    pub fn show(&mut self, prompt: &str) {
        self.entries.push(ConsoleEntry {
            time: Local::now().format("%H:%M:%S").to_string(),
            prompt: prompt.to_string(),
        });
        self.scroll = 0;
        self.visible = true;
    }

    /// Flip visibility and return the new state for persisting.
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.scroll = 0;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn entries(&self) -> &[ConsoleEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&ConsoleEntry> {
        self.entries.last()
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn scroll_up(&mut self, amount: usize) {
        self.scroll = self.scroll.saturating_add(amount);
    }

    pub fn scroll_down(&mut self, amount: usize) {
        self.scroll = self.scroll.saturating_sub(amount);
    }
}
