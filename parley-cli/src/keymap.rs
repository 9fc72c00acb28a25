//! Registered key bindings. The app looks actions up here instead of wiring
//! handlers into individual widgets.

use crate::controllers::tabs::Tab;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextTab,
    PrevTab,
    SelectTab(Tab),
    Submit,
    NewLine,
    Stop,
    Clear,
    ToggleConsole,
    ClearConsole,
    SavePrompt,
    FocusNext,
    FocusPrev,
    CursorLeft,
    CursorRight,
    Home,
    End,
    Backspace,
    ScrollUp(usize),
    ScrollDown(usize),
    AddProject,
    ProcessEmail,
    AddStatus,
    AddDeliverable,
    NextProject,
    PrevProject,
    Cancel,
}

/// Where a binding applies. Dialog bindings shadow everything else while a
/// dialog is open; tab bindings shadow global ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Tab(Tab),
    Dialog,
}

#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub scope: Scope,
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: Action,
}

impl Binding {
    fn matches(&self, key: &KeyEvent) -> bool {
        if self.code != key.code {
            return false;
        }
        // Shift is part of the character itself for printable keys.
        let relevant = match key.code {
            KeyCode::Char(_) => key.modifiers - KeyModifiers::SHIFT,
            _ => key.modifiers,
        };
        relevant == self.modifiers
    }

    /// Short human form such as `Ctrl-S` or `Alt-Enter`.
    pub fn describe(&self) -> String {
        let key = match self.code {
            KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
            KeyCode::F(n) => format!("F{n}"),
            KeyCode::Enter => "Enter".into(),
            KeyCode::Esc => "Esc".into(),
            KeyCode::Tab => "Tab".into(),
            KeyCode::BackTab => "Shift-Tab".into(),
            KeyCode::PageUp => "PgUp".into(),
            KeyCode::PageDown => "PgDn".into(),
            KeyCode::Left => "←".into(),
            KeyCode::Right => "→".into(),
            KeyCode::Up => "↑".into(),
            KeyCode::Down => "↓".into(),
            other => format!("{other:?}"),
        };
        let mut out = String::new();
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            out.push_str("Ctrl-");
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            out.push_str("Alt-");
        }
        out.push_str(&key);
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: Vec<Binding>,
}

impl Keymap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        scope: Scope,
        code: KeyCode,
        modifiers: KeyModifiers,
        action: Action,
    ) -> &mut Self {
        self.bindings.push(Binding {
            scope,
            code,
            modifiers,
            action,
        });
        self
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Find the action bound to `key` given what is on screen. Later
    /// registrations win within a scope.
    pub fn resolve(&self, key: &KeyEvent, tab: Tab, dialog_open: bool) -> Option<Action> {
        let scopes: &[Scope] = if dialog_open {
            &[Scope::Dialog]
        } else {
            &[Scope::Tab(tab), Scope::Global]
        };

        scopes.iter().find_map(|scope| {
            self.bindings
                .iter()
                .rev()
                .find(|b| b.scope == *scope && b.matches(key))
                .map(|b| b.action)
        })
    }

    /// Key that triggers `action` in `scope`, for help text.
    pub fn key_for(&self, scope: Scope, action: Action) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.scope == scope && b.action == action)
    }
}

impl Keymap {
    pub fn standard() -> Self {
        use Action::*;
        const NONE: KeyModifiers = KeyModifiers::NONE;
        const CTRL: KeyModifiers = KeyModifiers::CONTROL;
        const ALT: KeyModifiers = KeyModifiers::ALT;

        let mut map = Keymap::empty();
        let global = Scope::Global;
        map.register(global, KeyCode::Char('q'), CTRL, Quit)
            .register(global, KeyCode::Char('c'), CTRL, Quit)
            .register(global, KeyCode::Right, ALT, NextTab)
            .register(global, KeyCode::Left, ALT, PrevTab)
            .register(global, KeyCode::Char('p'), CTRL, ToggleConsole)
            .register(global, KeyCode::Char('k'), CTRL, ClearConsole)
            .register(global, KeyCode::Char('l'), CTRL, Clear)
            .register(global, KeyCode::Esc, NONE, Stop)
            .register(global, KeyCode::Enter, NONE, Submit)
            .register(global, KeyCode::Enter, ALT, NewLine)
            .register(global, KeyCode::Left, NONE, CursorLeft)
            .register(global, KeyCode::Right, NONE, CursorRight)
            .register(global, KeyCode::Home, NONE, Home)
            .register(global, KeyCode::End, NONE, End)
            .register(global, KeyCode::Backspace, NONE, Backspace)
            .register(global, KeyCode::Up, NONE, ScrollUp(1))
            .register(global, KeyCode::Down, NONE, ScrollDown(1))
            .register(global, KeyCode::PageUp, NONE, ScrollUp(10))
            .register(global, KeyCode::PageDown, NONE, ScrollDown(10));

        for (n, tab) in Tab::ALL.iter().enumerate() {
            map.register(global, KeyCode::F(n as u8 + 1), NONE, SelectTab(*tab));
        }

        let settings = Scope::Tab(Tab::Settings);
        map.register(settings, KeyCode::Char('s'), CTRL, SavePrompt)
            .register(settings, KeyCode::Enter, NONE, NewLine)
            .register(settings, KeyCode::Tab, NONE, FocusNext)
            .register(settings, KeyCode::BackTab, NONE, FocusPrev)
            .register(settings, KeyCode::BackTab, KeyModifiers::SHIFT, FocusPrev);

        let work = Scope::Tab(Tab::Work);
        map.register(work, KeyCode::Char('n'), CTRL, AddProject)
            .register(work, KeyCode::Char('e'), CTRL, ProcessEmail)
            .register(work, KeyCode::Char('u'), CTRL, AddStatus)
            .register(work, KeyCode::Char('d'), CTRL, AddDeliverable)
            .register(work, KeyCode::Tab, NONE, NextProject)
            .register(work, KeyCode::BackTab, NONE, PrevProject)
            .register(work, KeyCode::BackTab, KeyModifiers::SHIFT, PrevProject);

        let dialog = Scope::Dialog;
        map.register(dialog, KeyCode::Char('q'), CTRL, Quit)
            .register(dialog, KeyCode::Esc, NONE, Cancel)
            .register(dialog, KeyCode::Enter, NONE, Submit)
            .register(dialog, KeyCode::Enter, ALT, NewLine)
            .register(dialog, KeyCode::Tab, NONE, FocusNext)
            .register(dialog, KeyCode::BackTab, NONE, FocusPrev)
            .register(dialog, KeyCode::BackTab, KeyModifiers::SHIFT, FocusPrev)
            .register(dialog, KeyCode::Left, NONE, CursorLeft)
            .register(dialog, KeyCode::Right, NONE, CursorRight)
            .register(dialog, KeyCode::Home, NONE, Home)
            .register(dialog, KeyCode::End, NONE, End)
            .register(dialog, KeyCode::Backspace, NONE, Backspace);

        map
    }
}
