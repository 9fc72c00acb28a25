use crate::client::PromptKind;
use crate::error::ConsoleError;
use crate::input::TextInput;
use parley_shared::{SaveOutcome, SystemPrompt};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// How long "Saved!" or "Error!" stays on the save button.
pub const FLASH_FOR: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Unsaved,
    Clean,
    Saving,
    Succeeded,
    Failed,
}

impl SaveState {
    pub fn label(self) -> &'static str {
        match self {
            SaveState::Unsaved => "Save*",
            SaveState::Clean => "Saved",
            SaveState::Saving => "Saving...",
            SaveState::Succeeded => "Saved!",
            SaveState::Failed => "Error!",
        }
    }
}

/// Editor for one server-side system prompt.
#[derive(Debug, Clone)]
pub struct PromptEditor {
    kind: PromptKind,
    pub input: TextInput,
    saved: String,
    loaded: bool,
    saving: bool,
    flash: Option<(SaveState, Instant)>,
}

impl PromptEditor {
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            input: TextInput::new(),
            saved: String::new(),
            loaded: false,
            saving: false,
            flash: None,
        }
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn loaded(&mut self, result: Result<SystemPrompt, ConsoleError>) {
        match result {
            Ok(prompt) => {
                self.input.set(prompt.system_prompt.clone());
                self.saved = prompt.system_prompt;
                self.loaded = true;
            }
            Err(e) => error!("Failed to load {}: {}", self.kind.label(), e),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.input.trimmed() != self.saved.trim()
    }

    /// The prompt to send, if saving is allowed right now.
    pub fn begin_save(&mut self) -> Option<String> {
        if self.saving || !self.is_dirty() {
            return None;
        }
        self.saving = true;
        self.flash = None;
        Some(self.input.trimmed().to_string())
    }

    pub fn saved(&mut self, sent: String, result: Result<SaveOutcome, ConsoleError>, now: Instant) {
        self.saving = false;
        let succeeded = match result {
            Ok(outcome) if outcome.success => {
                info!("{} saved", self.kind.label());
                self.saved = outcome.system_prompt.unwrap_or(sent);
                true
            }
            Ok(outcome) => {
                error!(
                    "Failed to save {}: {}",
                    self.kind.label(),
                    outcome.message.unwrap_or_default()
                );
                false
            }
            Err(e) => {
                error!("Failed to save {}: {}", self.kind.label(), e);
                false
            }
        };
        let state = if succeeded {
            SaveState::Succeeded
        } else {
            SaveState::Failed
        };
        self.flash = Some((state, now));
    }

    /// Drop an expired flash. Returns true if the label changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.flash {
            Some((_, at)) if now.duration_since(at) >= FLASH_FOR => {
                self.flash = None;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> SaveState {
        if self.saving {
            return SaveState::Saving;
        }
        if let Some((state, _)) = self.flash {
            return state;
        }
        if self.is_dirty() {
            SaveState::Unsaved
        } else {
            SaveState::Clean
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_editor(text: &str) -> PromptEditor {
        let mut editor = PromptEditor::new(PromptKind::Chat);
        editor.loaded(Ok(SystemPrompt {
            system_prompt: text.into(),
        }));
        editor
    }

    #[test]
    fn saving_requires_a_trimmed_change() {
        let mut editor = loaded_editor("Be brief.");
        assert_eq!(editor.state(), SaveState::Clean);
        editor.input.insert_str("  ");
        assert_eq!(editor.state().label(), "Saved");
        assert!(editor.begin_save().is_none());

        editor.input.insert_str("Really.");
        assert_eq!(editor.state().label(), "Save*");
        assert_eq!(editor.begin_save().as_deref(), Some("Be brief.  Really."));
        assert_eq!(editor.state().label(), "Saving...");
        assert!(editor.begin_save().is_none());
    }

    #[test]
    fn flash_reverts_after_two_seconds() {
        let mut editor = loaded_editor("a");
        editor.input.insert_char('b');
        let sent = editor.begin_save().unwrap();
        let now = Instant::now();
        editor.saved(
            sent,
            Ok(SaveOutcome {
                success: true,
                ..Default::default()
            }),
            now,
        );
        assert_eq!(editor.state().label(), "Saved!");
        assert!(!editor.tick(now + Duration::from_secs(1)));
        assert!(editor.tick(now + FLASH_FOR));
        assert_eq!(editor.state(), SaveState::Clean);
    }

    #[test]
    fn failed_save_keeps_changes() {
        let mut editor = loaded_editor("a");
        editor.input.insert_char('b');
        let sent = editor.begin_save().unwrap();
        let now = Instant::now();
        editor.saved(sent, Err(ConsoleError::Network("down".into())), now);
        assert_eq!(editor.state().label(), "Error!");
        editor.tick(now + FLASH_FOR);
        assert_eq!(editor.state(), SaveState::Unsaved);
    }
}
