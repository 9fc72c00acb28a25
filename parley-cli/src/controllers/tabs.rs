#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Chat,
    Summarize,
    Parse,
    Work,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Chat, Tab::Summarize, Tab::Parse, Tab::Work, Tab::Settings];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Chat => "Chat",
            Tab::Summarize => "Summarize",
            Tab::Parse => "Parse",
            Tab::Work => "Work",
            Tab::Settings => "Settings",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }
}

/// Which tab is in front.
#[derive(Debug, Clone, Default)]
pub struct Tabs {
    active: Tab,
}

impl Tabs {
    pub fn active(&self) -> Tab {
        self.active
    }

    /// Returns true if the active tab changed.
    pub fn select(&mut self, tab: Tab) -> bool {
        let changed = self.active != tab;
        self.active = tab;
        changed
    }

    pub fn next(&mut self) {
        let i = (self.active.index() + 1) % Tab::ALL.len();
        self.active = Tab::ALL[i];
    }

    pub fn prev(&mut self) {
        let i = (self.active.index() + Tab::ALL.len() - 1) % Tab::ALL.len();
        self.active = Tab::ALL[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycling_wraps() {
        let mut tabs = Tabs::default();
        tabs.prev();
        assert_eq!(tabs.active(), Tab::Settings);
        tabs.next();
        assert_eq!(tabs.active(), Tab::Chat);
        assert!(tabs.select(Tab::Work));
        assert!(!tabs.select(Tab::Work));
        assert_eq!(Tab::Work.index(), 3);
    }
}
