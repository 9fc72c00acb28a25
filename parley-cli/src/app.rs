//! Composition root. `App` owns every controller plus the collaborators they
//! need, turns key presses into actions through the keymap, and runs network
//! work on spawned tasks that report back over one channel.

use crate::client::{ApiClient, PromptKind};
use crate::controllers::chat::ChatController;
use crate::controllers::console::PromptConsole;
use crate::controllers::parse::ParseController;
use crate::controllers::status::StatusController;
use crate::controllers::summarize::SummarizeController;
use crate::controllers::system_prompt::PromptEditor;
use crate::controllers::tabs::{Tab, Tabs};
use crate::controllers::work::{self, WorkController, WorkEvent, WorkRequest};
use crate::controllers::{Pane, Routed, Surface};
use crate::error::{report_background_error, ConsoleError};
use crate::input::TextInput;
use crate::keymap::{Action, Keymap};
use crate::storage::FlagStore;
use crate::stream::{ChannelSink, StreamEvent, StreamHandler, StreamOutcome};
use crate::transcript::{EntryType, Transcript};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parley_shared::{ChatRequest, ClearOutcome, Health, SaveOutcome, SystemPrompt, TokenCount};
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Results of background work, delivered to the UI task.
#[derive(Debug)]
pub enum AppEvent {
    Stream {
        surface: Surface,
        id: u64,
        event: StreamEvent,
    },
    StreamEnded {
        surface: Surface,
        id: u64,
        result: Result<StreamOutcome, ConsoleError>,
    },
    Health(Result<Health, ConsoleError>),
    Tokens {
        surface: Surface,
        result: Result<TokenCount, ConsoleError>,
    },
    PromptLoaded {
        kind: PromptKind,
        result: Result<SystemPrompt, ConsoleError>,
    },
    PromptSaved {
        kind: PromptKind,
        sent: String,
        result: Result<SaveOutcome, ConsoleError>,
    },
    Cleared(Result<ClearOutcome, ConsoleError>),
    Work(WorkEvent),
}

enum StreamRequest {
    Chat(ChatRequest),
    Summary(String),
    Parse(String),
}

pub struct App {
    client: ApiClient,
    flags: FlagStore,
    transcript: Transcript,
    keymap: Keymap,
    tx: mpsc::UnboundedSender<AppEvent>,
    should_quit: bool,
    pub tabs: Tabs,
    pub status: StatusController,
    pub chat: ChatController,
    pub summarize: SummarizeController,
    pub parse: ParseController,
    pub console: PromptConsole,
    pub work: WorkController,
    pub chat_prompt: PromptEditor,
    pub summarize_prompt: PromptEditor,
    pub settings_focus: PromptKind,
}

impl App {
    pub fn new(
        client: ApiClient,
        flags: FlagStore,
        transcript: Transcript,
        keymap: Keymap,
        tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        if let Some(path) = transcript.path() {
            info!("Logging exchanges to: {:?}", path);
        }
        let console = PromptConsole::new(flags.show_prompts());

        Self {
            client,
            flags,
            transcript,
            keymap,
            tx,
            should_quit: false,
            tabs: Tabs::default(),
            status: StatusController::new(),
            chat: ChatController::new(),
            summarize: SummarizeController::new(),
            parse: ParseController::new(),
            console,
            work: WorkController::new(),
            chat_prompt: PromptEditor::new(PromptKind::Chat),
            summarize_prompt: PromptEditor::new(PromptKind::Summarize),
            settings_focus: PromptKind::Chat,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn server(&self) -> &str {
        self.client.base_url().as_str()
    }

    /// Kick off the loads a fresh session needs.
    pub fn start(&mut self) {
        for kind in [PromptKind::Chat, PromptKind::Summarize] {
            let client = self.client.clone();
            self.spawn("Loading system prompt", async move {
                AppEvent::PromptLoaded {
                    kind,
                    result: client.system_prompt(kind).await,
                }
            });
        }
        for request in WorkController::startup() {
            self.run_work(request);
        }
        let now = Instant::now();
        self.chat.input_changed(now);
        self.summarize.input_changed(now);
    }

    pub fn check_health(&self) {
        let client = self.client.clone();
        self.spawn("Health check", async move { AppEvent::Health(client.health().await) });
    }

    fn spawn<F>(&self, context: &'static str, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = task.await;
            if let Err(e) = tx.send(event) {
                report_background_error(context, &e.to_string());
            }
        });
    }

    fn run_work(&self, request: WorkRequest) {
        debug!("Work request: {:?}", request);
        let client = self.client.clone();
        self.spawn("Work assistant request", async move {
            AppEvent::Work(work::perform(&client, request).await)
        });
    }

    fn spawn_stream(
        &self,
        surface: Surface,
        id: u64,
        cancel: CancellationToken,
        request: StreamRequest,
    ) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut sink = ChannelSink::new(tx.clone(), move |event| AppEvent::Stream {
                surface,
                id,
                event,
            });
            let result = match &request {
                StreamRequest::Chat(body) => client.stream_chat(body, &mut sink, &cancel).await,
                StreamRequest::Summary(text) => {
                    client.stream_summary(text, &mut sink, &cancel).await
                }
                StreamRequest::Parse(text) => client.stream_parse(text, &mut sink, &cancel).await,
            };
            if let Err(e) = tx.send(AppEvent::StreamEnded { surface, id, result }) {
                report_background_error("Stream finished", &e.to_string());
            }
        });
    }

    pub fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::Stream { surface, id, event } => self.route(surface, id, event),
            AppEvent::StreamEnded {
                surface,
                id,
                result,
            } => {
                let entry = match surface {
                    Surface::Chat => self.chat.finish(id, result),
                    Surface::Summarize => self.summarize.finish(id, result),
                    Surface::Parse => self.parse.finish(id, result),
                };
                if let Some(entry) = entry {
                    self.transcript.record(entry);
                }
            }
            AppEvent::Health(result) => self.status.apply(result),
            AppEvent::Tokens { surface, result } => match surface {
                Surface::Chat => self.chat.apply_tokens(result),
                Surface::Summarize => self.summarize.apply_tokens(result),
                Surface::Parse => {}
            },
            AppEvent::PromptLoaded { kind, result } => self.editor(kind).loaded(result),
            AppEvent::PromptSaved { kind, sent, result } => {
                self.editor(kind).saved(sent, result, Instant::now())
            }
            AppEvent::Cleared(result) => self.chat.cleared(result),
            AppEvent::Work(event) => {
                for request in self.work.apply(event, Instant::now()) {
                    self.run_work(request);
                }
            }
        }
    }

    fn route(&mut self, surface: Surface, id: u64, event: StreamEvent) {
        let console = &mut self.console;
        let accepted = match surface {
            Surface::Chat if self.chat.accepts(id) => deliver(&mut self.chat, console, &event),
            Surface::Summarize if self.summarize.accepts(id) => {
                deliver(&mut self.summarize, console, &event)
            }
            Surface::Parse if self.parse.accepts(id) => deliver(&mut self.parse, console, &event),
            _ => false,
        };
        if !accepted {
            debug!("Dropping event from stale {:?} stream {}", surface, id);
            return;
        }
        if let StreamEvent::Prompt(content) = event {
            self.transcript.record(EntryType::Prompt { content });
        }
    }

    fn editor(&mut self, kind: PromptKind) -> &mut PromptEditor {
        match kind {
            PromptKind::Chat => &mut self.chat_prompt,
            PromptKind::Summarize => &mut self.summarize_prompt,
        }
    }

    /// Periodic housekeeping: debounced token counts and expiring labels.
    pub fn tick(&mut self, now: Instant) {
        if let Some((text, session)) = self.chat.token_count_due(now) {
            let client = self.client.clone();
            self.spawn("Chat token count", async move {
                AppEvent::Tokens {
                    surface: Surface::Chat,
                    result: client.chat_tokens(&text, session.as_deref()).await,
                }
            });
        }
        if let Some(text) = self.summarize.token_count_due(now) {
            let client = self.client.clone();
            self.spawn("Summarize token count", async move {
                AppEvent::Tokens {
                    surface: Surface::Summarize,
                    result: client.summarize_tokens(&text).await,
                }
            });
        }
        self.chat_prompt.tick(now);
        self.summarize_prompt.tick(now);
        self.work.tick(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let dialog_open = self.work.has_dialog();
        match self.keymap.resolve(&key, self.tabs.active(), dialog_open) {
            Some(action) => self.apply(action),
            None => {
                let now = Instant::now();
                if let KeyCode::Char(c) = key.code {
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    {
                        self.edit(now, true, |input| input.insert_char(c));
                    }
                }
            }
        }
    }

    /// Run an action as if its key had been pressed.
    pub fn apply(&mut self, action: Action) {
        let now = Instant::now();
        if self.work.has_dialog() {
            self.dialog_action(action, now);
        } else {
            self.perform(action, now);
        }
    }

    pub fn paste(&mut self, text: &str) {
        self.edit(Instant::now(), true, |input| input.insert_str(text));
    }

    fn perform(&mut self, action: Action, now: Instant) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::NextTab => self.tabs.next(),
            Action::PrevTab => self.tabs.prev(),
            Action::SelectTab(tab) => {
                self.tabs.select(tab);
            }
            Action::Submit => self.submit(),
            Action::NewLine => self.edit(now, true, |input| input.insert_char('\n')),
            Action::Stop => self.stop(),
            Action::Clear => self.clear(now),
            Action::ToggleConsole => {
                let visible = self.console.toggle();
                if let Err(e) = self.flags.set_show_prompts(visible) {
                    warn!("Failed to persist console visibility: {}", e);
                }
            }
            Action::ClearConsole => self.console.clear(),
            Action::SavePrompt => self.save_prompt(),
            Action::FocusNext | Action::FocusPrev => {
                if self.tabs.active() == Tab::Settings {
                    self.settings_focus = match self.settings_focus {
                        PromptKind::Chat => PromptKind::Summarize,
                        PromptKind::Summarize => PromptKind::Chat,
                    };
                }
            }
            Action::CursorLeft => self.edit(now, false, TextInput::move_cursor_left),
            Action::CursorRight => self.edit(now, false, TextInput::move_cursor_right),
            Action::Home => self.edit(now, false, TextInput::move_home),
            Action::End => self.edit(now, false, TextInput::move_end),
            Action::Backspace => self.edit(now, true, TextInput::delete_char),
            Action::ScrollUp(amount) => {
                if let Some(pane) = self.active_pane() {
                    pane.scroll_up(amount);
                }
            }
            Action::ScrollDown(amount) => {
                if let Some(pane) = self.active_pane() {
                    pane.scroll_down(amount);
                }
            }
            Action::AddProject => self.work.open_project_dialog(),
            Action::ProcessEmail => self.work.open_email_dialog(),
            Action::AddStatus => self.work.open_status_dialog(now),
            Action::AddDeliverable => self.work.open_deliverable_dialog(now),
            Action::NextProject => {
                if let Some(request) = self.work.select_next() {
                    self.run_work(request);
                }
            }
            Action::PrevProject => {
                if let Some(request) = self.work.select_prev() {
                    self.run_work(request);
                }
            }
            Action::Cancel => {}
        }
    }

    fn dialog_action(&mut self, action: Action, now: Instant) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Cancel => self.work.cancel_dialog(),
            Action::Submit => {
                if let Some(request) = self.work.submit_dialog() {
                    self.run_work(request);
                }
            }
            Action::NewLine => {
                if let Some(dialog) = self.work.dialog_mut() {
                    if dialog.focused_is_multiline() {
                        dialog.input_mut().insert_char('\n');
                    }
                }
            }
            Action::FocusNext => {
                if let Some(dialog) = self.work.dialog_mut() {
                    dialog.focus_next();
                }
            }
            Action::FocusPrev => {
                if let Some(dialog) = self.work.dialog_mut() {
                    dialog.focus_prev();
                }
            }
            Action::CursorLeft => self.edit(now, false, TextInput::move_cursor_left),
            Action::CursorRight => self.edit(now, false, TextInput::move_cursor_right),
            Action::Home => self.edit(now, false, TextInput::move_home),
            Action::End => self.edit(now, false, TextInput::move_end),
            Action::Backspace => self.edit(now, true, TextInput::delete_char),
            _ => {}
        }
    }

    /// Apply `f` to whichever input has focus. Inputs of streaming surfaces
    /// are read-only until the response settles.
    fn edit(&mut self, now: Instant, changes: bool, f: impl FnOnce(&mut TextInput)) {
        if let Some(dialog) = self.work.dialog_mut() {
            f(dialog.input_mut());
            return;
        }
        match self.tabs.active() {
            Tab::Chat if !self.chat.is_streaming() => {
                f(&mut self.chat.input);
                if changes {
                    self.chat.input_changed(now);
                }
            }
            Tab::Summarize if !self.summarize.is_streaming() => {
                f(&mut self.summarize.input);
                if changes {
                    self.summarize.input_changed(now);
                }
            }
            Tab::Parse if !self.parse.is_streaming() => f(&mut self.parse.input),
            Tab::Work => f(&mut self.work.query),
            Tab::Settings => f(&mut self.editor(self.settings_focus).input),
            _ => {}
        }
    }

    fn active_pane(&mut self) -> Option<&mut Pane> {
        match self.tabs.active() {
            Tab::Chat => Some(self.chat.pane_mut()),
            Tab::Summarize => Some(self.summarize.pane_mut()),
            Tab::Parse => Some(self.parse.pane_mut()),
            Tab::Work | Tab::Settings => None,
        }
    }

    fn submit(&mut self) {
        match self.tabs.active() {
            Tab::Chat => {
                if let Some(start) = self.chat.send() {
                    self.record_input(Surface::Chat, &start.request.message);
                    self.spawn_stream(
                        Surface::Chat,
                        start.id,
                        start.cancel,
                        StreamRequest::Chat(start.request),
                    );
                }
            }
            Tab::Summarize => {
                let model = self.status.model_name();
                if let Some(start) = self.summarize.send(&model) {
                    self.record_input(Surface::Summarize, &start.request);
                    self.spawn_stream(
                        Surface::Summarize,
                        start.id,
                        start.cancel,
                        StreamRequest::Summary(start.request),
                    );
                }
            }
            Tab::Parse => {
                if let Some(start) = self.parse.send() {
                    self.record_input(Surface::Parse, &start.request);
                    self.spawn_stream(
                        Surface::Parse,
                        start.id,
                        start.cancel,
                        StreamRequest::Parse(start.request),
                    );
                }
            }
            Tab::Work => {
                if let Some(request) = self.work.submit_query() {
                    self.run_work(request);
                }
            }
            Tab::Settings => {}
        }
    }

    fn record_input(&self, surface: Surface, content: &str) {
        self.transcript.record(EntryType::Input {
            surface,
            content: content.to_string(),
        });
    }

    fn stop(&mut self) {
        let stopped = match self.tabs.active() {
            Tab::Chat => self.chat.stop(),
            Tab::Summarize => self.summarize.stop(),
            Tab::Parse => self.parse.stop(),
            Tab::Work | Tab::Settings => false,
        };
        if stopped {
            info!("Stop requested on {:?}", self.tabs.active());
        }
    }

    fn clear(&mut self, now: Instant) {
        match self.tabs.active() {
            Tab::Chat => {
                if let Some(session) = self.chat.clear() {
                    let client = self.client.clone();
                    self.spawn("Clearing conversation", async move {
                        AppEvent::Cleared(client.clear_conversation(Some(&session)).await)
                    });
                }
            }
            Tab::Summarize => self.summarize.clear(now),
            Tab::Parse => self.parse.clear(),
            Tab::Work | Tab::Settings => {}
        }
    }

    fn save_prompt(&mut self) {
        let kind = self.settings_focus;
        if let Some(sent) = self.editor(kind).begin_save() {
            let client = self.client.clone();
            self.spawn("Saving system prompt", async move {
                let result = client.save_system_prompt(kind, &sent).await;
                AppEvent::PromptSaved { kind, sent, result }
            });
        }
    }
}

fn deliver<C: StreamHandler>(
    surface: &mut C,
    console: &mut PromptConsole,
    event: &StreamEvent,
) -> bool {
    event.dispatch(&mut Routed { surface, console });
    true
}
