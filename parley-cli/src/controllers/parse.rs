use super::{Pane, StreamSlot, StreamStart, Surface, Tone, STOPPED_MARKER};
use crate::error::ConsoleError;
use crate::input::TextInput;
use crate::stream::{Completion, StreamHandler, StreamOutcome};
use crate::transcript::EntryType;
use tracing::{debug, info, warn};

pub const PARSE_WELCOME: &str = "Welcome to Parse! Paste your text to parse...";

/// The parse surface. Unlike chat, earlier exchanges stay in the pane.
#[derive(Debug)]
pub struct ParseController {
    pub input: TextInput,
    pane: Pane,
    slot: StreamSlot,
    result: String,
}

impl Default for ParseController {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseController {
    pub fn new() -> Self {
        Self {
            input: TextInput::new(),
            pane: Pane::with_welcome(PARSE_WELCOME),
            slot: StreamSlot::new(),
            result: String::new(),
        }
    }

    pub fn pane(&self) -> &Pane {
        &self.pane
    }

    pub fn pane_mut(&mut self) -> &mut Pane {
        &mut self.pane
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn is_streaming(&self) -> bool {
        self.slot.is_streaming()
    }

    pub fn accepts(&self, id: u64) -> bool {
        self.slot.accepts(id)
    }

    pub fn send(&mut self) -> Option<StreamStart<String>> {
        if self.is_streaming() || self.input.is_blank() {
            return None;
        }
        let text = self.input.take().trim().to_string();

        self.pane.push(Tone::User, format!("Input:\n{text}"));
        self.pane.push(Tone::Meta, "Parsed Result:");
        self.result.clear();

        let (id, cancel) = self.slot.begin();
        Some(StreamStart {
            id,
            cancel,
            request: text,
        })
    }

    pub fn stop(&self) -> bool {
        self.slot.stop()
    }

    pub fn finish(
        &mut self,
        id: u64,
        result: Result<StreamOutcome, ConsoleError>,
    ) -> Option<EntryType> {
        if !self.slot.end(id) {
            debug!("Ignoring end of superseded parse stream {}", id);
            return None;
        }

        let surface = Surface::Parse;
        Some(match result {
            Ok(StreamOutcome::Finished) => EntryType::Response {
                surface,
                content: self.result.clone(),
                total_time: None,
            },
            Ok(StreamOutcome::Failed(message)) => EntryType::Error { surface, message },
            Ok(StreamOutcome::Stopped) => {
                self.pane
                    .append(Tone::Assistant, &format!("\n\n{STOPPED_MARKER}"));
                EntryType::Stopped {
                    surface,
                    content: self.result.clone(),
                }
            }
            Err(e) => {
                warn!("Parse stream failed: {}", e);
                self.pane
                    .push(Tone::Error, format!("Error: {}", e.user_message()));
                EntryType::Error {
                    surface,
                    message: e.to_string(),
                }
            }
        })
    }

    pub fn clear(&mut self) {
        self.pane.reset(PARSE_WELCOME);
        self.result.clear();
    }
}

impl StreamHandler for ParseController {
    fn on_token(&mut self, token: &str) {
        self.pane.append(Tone::Assistant, token);
        self.result.push_str(token);
    }

    fn on_error(&mut self, message: &str) {
        self.pane.push(Tone::Error, format!("Error: {message}"));
    }

    fn on_done(&mut self, completion: &Completion) {
        info!("Parse time: {:.2}s", completion.total_time);
    }
}
