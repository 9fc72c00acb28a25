//! View-model owners. Each controller is the only writer of its own state;
//! the app routes events to them and the UI reads them.

pub mod chat;
pub mod console;
pub mod parse;
pub mod status;
pub mod summarize;
pub mod system_prompt;
pub mod tabs;
pub mod timer;
pub mod tokens;
pub mod work;

use crate::stream::{Completion, StreamHandler};
use console::PromptConsole;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// The three streaming surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Chat,
    Summarize,
    Parse,
}

/// Text appended to an answer that was cut short by the user.
pub const STOPPED_MARKER: &str = "[Response stopped by user]";

/// What a controller hands the app when the user starts a request.
#[derive(Debug)]
pub struct StreamStart<R> {
    pub id: u64,
    pub cancel: CancellationToken,
    pub request: R,
}

/// Tracks the live stream of one surface. Each `begin` hands out a fresh id;
/// events tagged with an older id are stale.
#[derive(Debug, Default)]
pub struct StreamSlot {
    next_id: u64,
    active: Option<(u64, CancellationToken)>,
}

impl StreamSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new stream, cancelling any previous one.
    pub fn begin(&mut self) -> (u64, CancellationToken) {
        if let Some((_, cancel)) = self.active.take() {
            cancel.cancel();
        }
        self.next_id += 1;
        let cancel = CancellationToken::new();
        self.active = Some((self.next_id, cancel.clone()));
        (self.next_id, cancel)
    }

    pub fn is_current(&self, id: u64) -> bool {
        matches!(&self.active, Some((current, _)) if *current == id)
    }

    /// Whether events from `id` may still be shown. A stopped stream stays
    /// current until it settles, but its late events are dropped.
    pub fn accepts(&self, id: u64) -> bool {
        matches!(&self.active, Some((current, cancel)) if *current == id && !cancel.is_cancelled())
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Ask the live stream to stop. Returns false when nothing was running.
    pub fn stop(&self) -> bool {
        match &self.active {
            Some((_, cancel)) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Mark `id` finished. Returns false if it was already superseded.
    pub fn end(&mut self, id: u64) -> bool {
        if self.is_current(id) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

/// How a block of pane text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Welcome,
    User,
    Assistant,
    Pending,
    Meta,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub tone: Tone,
    pub text: String,
}

/// Scrollable output area. `scroll` counts lines up from the bottom.
#[derive(Debug, Clone, Default)]
pub struct Pane {
    entries: Vec<Entry>,
    scroll: usize,
}

impl Pane {
    pub fn with_welcome(text: &str) -> Self {
        let mut pane = Self::default();
        pane.reset(text);
        pane
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.scroll = 0;
    }

    /// Clear and show `welcome` in place of content.
    pub fn reset(&mut self, welcome: &str) {
        self.clear();
        self.push(Tone::Welcome, welcome);
    }

    pub fn push(&mut self, tone: Tone, text: impl Into<String>) {
        self.entries.retain(|e| e.tone != Tone::Welcome);
        self.entries.push(Entry {
            tone,
            text: text.into(),
        });
        self.scroll = 0;
    }

    /// Append to the last entry if it has `tone`, otherwise start one.
    pub fn append(&mut self, tone: Tone, text: &str) {
        match self.entries.last_mut() {
            Some(last) if last.tone == tone => last.text.push_str(text),
            _ => self.push(tone, text),
        }
        self.scroll = 0;
    }

    /// Drop every entry with `tone`.
    pub fn remove(&mut self, tone: Tone) {
        self.entries.retain(|e| e.tone != tone);
    }

    pub fn last_text(&self, tone: Tone) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.tone == tone)
            .map(|e| e.text.as_str())
    }

    pub fn scroll_up(&mut self, amount: usize) {
        self.scroll = self.scroll.saturating_add(amount);
    }

    pub fn scroll_down(&mut self, amount: usize) {
        self.scroll = self.scroll.saturating_sub(amount);
    }
}

/// Pairs a surface controller with the prompt console so one handler value
/// can receive every event of a stream.
pub struct Routed<'a, C: ?Sized> {
    pub surface: &'a mut C,
    pub console: &'a mut PromptConsole,
}

impl<C: StreamHandler + ?Sized> StreamHandler for Routed<'_, C> {
    fn on_token(&mut self, token: &str) {
        self.surface.on_token(token);
    }

    fn on_error(&mut self, message: &str) {
        self.surface.on_error(message);
    }

    fn on_done(&mut self, completion: &Completion) {
        self.surface.on_done(completion);
    }

    fn on_prompt(&mut self, prompt: &str) {
        self.console.show(prompt);
    }

    fn on_session(&mut self, session_id: &str) {
        self.surface.on_session(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stream_supersedes_old() {
        let mut slot = StreamSlot::new();
        let (first, first_cancel) = slot.begin();
        let (second, _) = slot.begin();
        assert!(first_cancel.is_cancelled());
        assert!(!slot.is_current(first));
        assert!(slot.is_current(second));
        assert!(!slot.end(first));
        assert!(slot.is_streaming());
        assert!(slot.end(second));
        assert!(!slot.is_streaming());
        assert!(!slot.stop());
    }

    #[test]
    fn stopped_stream_settles_but_shows_nothing_more() {
        let mut slot = StreamSlot::new();
        let (id, cancel) = slot.begin();
        assert!(slot.accepts(id));
        assert!(slot.stop());
        assert!(cancel.is_cancelled());
        assert!(!slot.accepts(id));
        assert!(slot.is_current(id));
        assert!(slot.is_streaming());
        assert!(slot.end(id));
        assert!(!slot.is_streaming());
    }

    #[test]
    fn pane_welcome_is_replaced_by_content() {
        let mut pane = Pane::with_welcome("hello there");
        assert_eq!(pane.entries().len(), 1);
        pane.append(Tone::Assistant, "a");
        pane.append(Tone::Assistant, "b");
        assert_eq!(pane.entries().len(), 1);
        assert_eq!(pane.last_text(Tone::Assistant), Some("ab"));
    }

    #[test]
    fn surface_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Surface::Summarize).unwrap(), "\"summarize\"");
    }
}
