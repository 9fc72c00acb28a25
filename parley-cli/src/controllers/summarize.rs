use super::timer::Timer;
use super::tokens::{Debounce, TokenMeter};
use super::{Pane, StreamSlot, StreamStart, Surface, Tone, STOPPED_MARKER};
use crate::error::ConsoleError;
use crate::input::TextInput;
use crate::stream::{Completion, StreamHandler, StreamOutcome};
use crate::transcript::EntryType;
use parley_shared::TokenCount;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const SUMMARIZE_WELCOME: &str = "Your summary will appear here...";

const TOKEN_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct SummarizeController {
    pub input: TextInput,
    pane: Pane,
    slot: StreamSlot,
    timer: Timer,
    tokens: TokenMeter,
    recount: Debounce,
    summary: String,
    last_completion: Option<Completion>,
}

impl Default for SummarizeController {
    fn default() -> Self {
        Self::new()
    }
}

impl SummarizeController {
    pub fn new() -> Self {
        Self {
            input: TextInput::new(),
            pane: Pane::with_welcome(SUMMARIZE_WELCOME),
            slot: StreamSlot::new(),
            timer: Timer::new(),
            tokens: TokenMeter::new(),
            recount: Debounce::new(TOKEN_DEBOUNCE),
            summary: String::new(),
            last_completion: None,
        }
    }

    pub fn pane(&self) -> &Pane {
        &self.pane
    }

    pub fn pane_mut(&mut self) -> &mut Pane {
        &mut self.pane
    }

    pub fn tokens(&self) -> &TokenMeter {
        &self.tokens
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn last_completion(&self) -> Option<&Completion> {
        self.last_completion.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.slot.is_streaming()
    }

    pub fn accepts(&self, id: u64) -> bool {
        self.slot.accepts(id)
    }

    /// Start summarizing the input. The text stays in the input box.
    pub fn send(&mut self, model_name: &str) -> Option<StreamStart<String>> {
        if self.is_streaming() || self.input.is_blank() {
            return None;
        }
        let text = self.input.trimmed().to_string();

        self.pane.clear();
        self.pane
            .push(Tone::Pending, format!("Summarizing with {model_name}..."));
        self.summary.clear();
        self.last_completion = None;
        self.timer.start();

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
            debug!("Ignoring end of superseded summary stream {}", id);
            return None;
        }
        self.pane.remove(Tone::Pending);
        self.timer.stop();

        let surface = Surface::Summarize;
        Some(match result {
            Ok(StreamOutcome::Finished) => EntryType::Response {
                surface,
                content: self.summary.clone(),
                total_time: self.last_completion.as_ref().map(|c| c.total_time),
            },
            Ok(StreamOutcome::Failed(message)) => EntryType::Error { surface, message },
            Ok(StreamOutcome::Stopped) => {
                self.pane
                    .append(Tone::Assistant, &format!(" {STOPPED_MARKER}"));
                EntryType::Stopped {
                    surface,
                    content: self.summary.clone(),
                }
            }
            Err(e) => {
                warn!("Summary stream failed: {}", e);
                self.show_error(&e.user_message());
                EntryType::Error {
                    surface,
                    message: e.to_string(),
                }
            }
        })
    }

    fn show_error(&mut self, message: &str) {
        self.pane.clear();
        self.pane.push(Tone::Error, format!("Error: {message}"));
    }

    pub fn clear(&mut self, now: Instant) {
        self.input.clear();
        self.pane.reset(SUMMARIZE_WELCOME);
        self.summary.clear();
        self.timer.reset();
        self.recount.touch(now);
    }

    pub fn input_changed(&mut self, now: Instant) {
        self.recount.touch(now);
    }

    pub fn token_count_due(&mut self, now: Instant) -> Option<String> {
        self.recount
            .fire(now)
            .then(|| self.input.value().to_string())
    }

    pub fn apply_tokens(&mut self, result: Result<TokenCount, ConsoleError>) {
        match result {
            Ok(reading) => {
                self.tokens.update(&reading);
            }
            Err(e) => debug!("Failed to update summarize token count: {}", e),
        }
    }
}

impl StreamHandler for SummarizeController {
    fn on_token(&mut self, token: &str) {
        self.pane.remove(Tone::Pending);
        self.pane.append(Tone::Assistant, token);
        self.summary.push_str(token);
    }

    fn on_error(&mut self, message: &str) {
        self.show_error(message);
    }

    fn on_done(&mut self, completion: &Completion) {
        info!(
            "Summarization time: {:.2}s using {}",
            completion.total_time,
            completion.model.as_deref().unwrap_or("unknown model")
        );
        self.timer.stop();
        self.last_completion = Some(completion.clone());
    }
}
