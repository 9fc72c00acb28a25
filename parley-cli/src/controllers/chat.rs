use super::timer::Timer;
use super::tokens::{Debounce, TokenMeter};
use super::{Pane, StreamSlot, StreamStart, Surface, Tone, STOPPED_MARKER};
use crate::error::ConsoleError;
use crate::input::TextInput;
use crate::stream::{Completion, StreamHandler, StreamOutcome};
use crate::transcript::EntryType;
use parley_shared::{ChatRequest, ClearOutcome, TokenCount};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const CHAT_WELCOME: &str = "Ask me anything...";
pub const CHAT_CLEARED: &str = "Output cleared. Ask me anything...";

const THINKING: &str = "Thinking...";
const TOKEN_DEBOUNCE: Duration = Duration::from_millis(300);

/// The chat surface: one exchange on screen at a time, history on the server.
#[derive(Debug)]
pub struct ChatController {
    pub input: TextInput,
    pane: Pane,
    slot: StreamSlot,
    session_id: Option<String>,
    timer: Timer,
    tokens: TokenMeter,
    recount: Debounce,
    response: String,
    token_events: usize,
    last_completion: Option<Completion>,
}

impl Default for ChatController {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatController {
    pub fn new() -> Self {
        Self {
            input: TextInput::new(),
            pane: Pane::with_welcome(CHAT_WELCOME),
            slot: StreamSlot::new(),
            session_id: None,
            timer: Timer::new(),
            tokens: TokenMeter::new(),
            recount: Debounce::new(TOKEN_DEBOUNCE),
            response: String::new(),
            token_events: 0,
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

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn response(&self) -> &str {
        &self.response
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

    /// Start a request from the input box. Nothing happens while a response
    /// is streaming or when the input is blank.
    pub fn send(&mut self) -> Option<StreamStart<ChatRequest>> {
        if self.is_streaming() || self.input.is_blank() {
            return None;
        }
        let message = self.input.take().trim().to_string();

        self.pane.clear();
        self.pane.push(Tone::User, format!("You: {message}"));
        self.pane.push(Tone::Pending, THINKING);
        self.response.clear();
        self.token_events = 0;
        self.last_completion = None;
        self.timer.start();

        let (id, cancel) = self.slot.begin();
        Some(StreamStart {
            id,
            cancel,
            request: ChatRequest {
                message,
                session_id: self.session_id.clone(),
            },
        })
    }

    pub fn stop(&self) -> bool {
        self.slot.stop()
    }

    /// Settle stream `id`. Returns the transcript entry for the exchange, or
    /// `None` if the stream had already been superseded.
    pub fn finish(
        &mut self,
        id: u64,
        result: Result<StreamOutcome, ConsoleError>,
    ) -> Option<EntryType> {
        if !self.slot.end(id) {
            debug!("Ignoring end of superseded chat stream {}", id);
            return None;
        }
        self.pane.remove(Tone::Pending);
        self.timer.stop();
        // The next token count should reflect the new history.
        self.recount.touch(Instant::now());

        let surface = Surface::Chat;
        Some(match result {
            Ok(StreamOutcome::Finished) => EntryType::Response {
                surface,
                content: self.response.clone(),
                total_time: self.last_completion.as_ref().map(|c| c.total_time),
            },
            Ok(StreamOutcome::Failed(message)) => EntryType::Error { surface, message },
            Ok(StreamOutcome::Stopped) => {
                info!("Response generation stopped by user");
                self.pane
                    .append(Tone::Assistant, &format!(" {STOPPED_MARKER}"));
                EntryType::Stopped {
                    surface,
                    content: self.response.clone(),
                }
            }
            Err(e) => {
                warn!("Chat stream failed: {}", e);
                self.pane
                    .push(Tone::Error, format!("Error: {}", e.user_message()));
                EntryType::Error {
                    surface,
                    message: e.to_string(),
                }
            }
        })
    }

    /// Reset the pane. Returns the session to clear on the server, if any.
    pub fn clear(&mut self) -> Option<String> {
        self.pane.reset(CHAT_CLEARED);
        self.timer.reset();
        self.recount.touch(Instant::now());
        self.session_id.clone()
    }

    pub fn cleared(&mut self, result: Result<ClearOutcome, ConsoleError>) {
        match result {
            Ok(outcome) if outcome.success => info!("Conversation cleared"),
            Ok(outcome) => warn!(
                "Server did not clear conversation: {}",
                outcome.message.unwrap_or_default()
            ),
            Err(e) => warn!("Failed to clear conversation: {}", e),
        }
    }

    pub fn input_changed(&mut self, now: Instant) {
        self.recount.touch(now);
    }

    /// Text and session to count, once typing has paused.
    pub fn token_count_due(&mut self, now: Instant) -> Option<(String, Option<String>)> {
        self.recount
            .fire(now)
            .then(|| (self.input.value().to_string(), self.session_id.clone()))
    }

    pub fn apply_tokens(&mut self, result: Result<TokenCount, ConsoleError>) {
        match result {
            Ok(reading) => {
                self.tokens.update(&reading);
            }
            Err(e) => debug!("Failed to update token count: {}", e),
        }
    }
}

impl StreamHandler for ChatController {
    fn on_token(&mut self, token: &str) {
        if self.token_events == 0 {
            self.pane.remove(Tone::Pending);
        }
        self.pane.append(Tone::Assistant, token);
        self.response.push_str(token);
        self.token_events += 1;
    }

    fn on_error(&mut self, message: &str) {
        self.pane.remove(Tone::Pending);
        self.pane.push(Tone::Error, format!("Error: {message}"));
    }

    fn on_done(&mut self, completion: &Completion) {
        info!("Response time: {:.2}s", completion.total_time);
        info!(
            "Total response length: {} characters, {} tokens",
            self.response.chars().count(),
            self.token_events
        );
        if let Some(count) = completion.eval_count {
            info!("Model reported {} tokens generated", count);
        }
        self.timer.stop();
        self.pane.push(
            Tone::Meta,
            format!("Response time: {}", self.timer.display()),
        );
        self.last_completion = Some(completion.clone());
    }

    fn on_session(&mut self, session_id: &str) {
        if self.session_id.as_deref() != Some(session_id) {
            debug!("Chat session {}", session_id);
            self.session_id = Some(session_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::console::PromptConsole;
    use crate::controllers::Routed;
    use crate::stream::StreamEvent;

    fn started(chat: &mut ChatController, text: &str) -> u64 {
        chat.input.set(text);
        chat.send().unwrap().id
    }

    fn feed(chat: &mut ChatController, console: &mut PromptConsole, events: &[StreamEvent]) {
        let mut handler = Routed {
            surface: chat,
            console,
        };
        for event in events {
            event.dispatch(&mut handler);
        }
    }

    #[test]
    fn tokens_accumulate_and_completion_is_recorded() {
        let mut chat = ChatController::new();
        let mut console = PromptConsole::new(false);
        let id = started(&mut chat, "hi");
        assert_eq!(chat.pane().last_text(Tone::Pending), Some("Thinking..."));

        feed(
            &mut chat,
            &mut console,
            &[
                StreamEvent::Token("Hel".into()),
                StreamEvent::Token("lo".into()),
                StreamEvent::Done(Completion {
                    total_time: 1.2,
                    eval_count: None,
                    model: None,
                }),
            ],
        );

        assert_eq!(chat.response(), "Hello");
        assert_eq!(chat.pane().last_text(Tone::Assistant), Some("Hello"));
        assert_eq!(chat.pane().last_text(Tone::Pending), None);
        assert_eq!(chat.last_completion().unwrap().total_time, 1.2);

        let entry = chat.finish(id, Ok(StreamOutcome::Finished)).unwrap();
        assert!(matches!(
            entry,
            EntryType::Response { total_time: Some(t), ref content, .. } if t == 1.2 && content == "Hello"
        ));
        assert!(!chat.is_streaming());
    }

    #[test]
    fn request_carries_session_once_known() {
        let mut chat = ChatController::new();
        let mut console = PromptConsole::new(false);
        let id = started(&mut chat, "  first  ");
        feed(
            &mut chat,
            &mut console,
            &[
                StreamEvent::Prompt("System: x\n\nUser: first".into()),
                StreamEvent::Session("s-1".into()),
            ],
        );
        chat.finish(id, Ok(StreamOutcome::Finished));
        assert_eq!(console.entries().len(), 1);
        assert!(console.is_visible());

        chat.input.set("second");
        let start = chat.send().unwrap();
        assert_eq!(start.request.message, "second");
        assert_eq!(start.request.session_id.as_deref(), Some("s-1"));
        assert_eq!(chat.pane().entries()[0].text, "You: second");
    }

    #[test]
    fn blank_input_or_live_stream_blocks_sending() {
        let mut chat = ChatController::new();
        chat.input.set("   ");
        assert!(chat.send().is_none());
        started(&mut chat, "one");
        chat.input.set("two");
        assert!(chat.send().is_none());
        assert_eq!(chat.input.value(), "two");
    }

    #[test]
    fn stopping_appends_one_marker() {
        let mut chat = ChatController::new();
        let mut console = PromptConsole::new(false);
        let id = started(&mut chat, "long answer please");
        feed(&mut chat, &mut console, &[StreamEvent::Token("Once".into())]);
        assert!(chat.stop());

        let entry = chat.finish(id, Ok(StreamOutcome::Stopped)).unwrap();
        assert!(matches!(entry, EntryType::Stopped { .. }));
        assert_eq!(
            chat.pane().last_text(Tone::Assistant),
            Some("Once [Response stopped by user]")
        );
        assert!(chat.finish(id, Ok(StreamOutcome::Stopped)).is_none());
        assert!(!chat.accepts(id));
    }

    #[test]
    fn error_line_is_shown() {
        let mut chat = ChatController::new();
        let mut console = PromptConsole::new(false);
        let id = started(&mut chat, "hi");
        feed(&mut chat, &mut console, &[StreamEvent::Error("model missing".into())]);
        chat.finish(id, Ok(StreamOutcome::Failed("model missing".into())));
        assert_eq!(chat.pane().last_text(Tone::Error), Some("Error: model missing"));
        assert_eq!(chat.pane().last_text(Tone::Pending), None);
    }

    #[test]
    fn transport_failure_reads_as_connection_error() {
        let mut chat = ChatController::new();
        let id = started(&mut chat, "hi");
        chat.finish(id, Err(ConsoleError::Network("refused".into())));
        assert_eq!(
            chat.pane().last_text(Tone::Error),
            Some("Error: Failed to connect to server")
        );
    }

    #[test]
    fn clear_returns_session_and_resets_pane() {
        let mut chat = ChatController::new();
        assert_eq!(chat.clear(), None);
        chat.on_session("abc");
        assert_eq!(chat.clear().as_deref(), Some("abc"));
        assert_eq!(chat.pane().entries()[0].text, CHAT_CLEARED);
    }

    #[test]
    fn token_count_waits_for_pause() {
        let mut chat = ChatController::new();
        let now = Instant::now();
        chat.input.set("count me");
        chat.input_changed(now);
        assert!(chat.token_count_due(now).is_none());
        let due = chat.token_count_due(now + TOKEN_DEBOUNCE).unwrap();
        assert_eq!(due.0, "count me");
        chat.apply_tokens(Ok(TokenCount {
            count: Some(12),
            limit: Some(4096),
        }));
        assert_eq!(chat.tokens().count(), Some(12));
    }
}
