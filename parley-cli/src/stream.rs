//! Consumption of newline-delimited JSON response bodies.
//!
//! The server streams one JSON object per line:
//! ```text
//! {"full_prompt":"System: ...\n\nUser: hi"}
//! {"token":"Hel","done":false}
//! {"token":"lo","done":false}
//! {"done":true,"total_time":1.2,"model":"phi3:mini","eval_count":2}
//! ```
//! Bytes are framed on `\n` before decoding, so chunk boundaries (including
//! ones that fall inside a multi-byte character) never change what is parsed.

use crate::error::ConsoleError;
use futures_util::{Stream, StreamExt};
use parley_shared::StreamLine;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Telemetry carried by the final `done` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub total_time: f64,
    pub eval_count: Option<u64>,
    pub model: Option<String>,
}

/// How a stream ended when it did not fail at the transport level.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The body ended normally.
    Finished,
    /// A line carried an `error` field; nothing after it was dispatched.
    Failed(String),
    /// The cancellation token fired.
    Stopped,
}

/// Handler record the consumer dispatches into.
pub trait StreamHandler {
    fn on_token(&mut self, token: &str);

    fn on_error(&mut self, message: &str);

    fn on_done(&mut self, completion: &Completion);

    fn on_prompt(&mut self, _prompt: &str) {}

    fn on_session(&mut self, _session_id: &str) {}
}

/// Owned form of a dispatched event, for handing across tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(String),
    Error(String),
    Done(Completion),
    Prompt(String),
    Session(String),
}

impl StreamEvent {
    pub fn dispatch<H: StreamHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            StreamEvent::Token(token) => handler.on_token(token),
            StreamEvent::Error(message) => handler.on_error(message),
            StreamEvent::Done(completion) => handler.on_done(completion),
            StreamEvent::Prompt(prompt) => handler.on_prompt(prompt),
            StreamEvent::Session(id) => handler.on_session(id),
        }
    }
}

/// Incremental newline framer.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    // Prefix of `pending` already known to hold no newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed. Blank lines are
    /// dropped; the trailing partial line stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(pos) = self.pending[from..].iter().position(|&b| b == b'\n') {
            let end = from + pos;
            if let Some(line) = decode_line(&self.pending[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            from = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();
        lines
    }

    /// Bytes received since the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches('\r');
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse one framed line. Malformed lines are logged and skipped.
pub fn parse_line(line: &str) -> Option<StreamLine> {
    match serde_json::from_str::<StreamLine>(line) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Failed to parse line: {} ({})", line, e);
            None
        }
    }
}

/// Turn one parsed line into events, in dispatch order. An `error` field
/// produces a single `Error` event and nothing else.
pub fn events_for(line: StreamLine) -> Vec<StreamEvent> {
    if let Some(message) = line.error {
        return vec![StreamEvent::Error(message)];
    }

    let mut events = Vec::new();
    if let Some(token) = line.token.filter(|t| !t.is_empty()) {
        events.push(StreamEvent::Token(token));
    }
    if line.done {
        if let Some(total_time) = line.total_time {
            events.push(StreamEvent::Done(Completion {
                total_time,
                eval_count: line.eval_count,
                model: line.model,
            }));
        }
    }
    if let Some(prompt) = line.full_prompt {
        events.push(StreamEvent::Prompt(prompt));
    }
    if let Some(id) = line.session_id {
        events.push(StreamEvent::Session(id));
    }
    events
}

/// Dispatch a line; returns the error message if the line ends the stream.
fn dispatch_line<H: StreamHandler + ?Sized>(line: &str, handler: &mut H) -> Option<String> {
    let parsed = parse_line(line)?;
    for event in events_for(parsed) {
        event.dispatch(handler);
        if let StreamEvent::Error(message) = event {
            return Some(message);
        }
    }
    None
}

/// Drive a byte stream to completion, dispatching every recognised field to
/// `handler`.
pub async fn consume<S, B, E, H>(
    body: S,
    handler: &mut H,
    cancel: &CancellationToken,
) -> Result<StreamOutcome, ConsoleError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    H: StreamHandler + ?Sized,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = LineDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Stream cancelled with {} bytes pending", decoder.pending().len());
                return Ok(StreamOutcome::Stopped);
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for line in decoder.push(chunk.as_ref()) {
                    if let Some(message) = dispatch_line(&line, handler) {
                        return Ok(StreamOutcome::Failed(message));
                    }
                }
            }
            Some(Err(e)) => return Err(ConsoleError::Read(e.to_string())),
            None => break,
        }
    }

    if let Some(line) = decoder.finish() {
        if let Some(message) = dispatch_line(&line, handler) {
            return Ok(StreamOutcome::Failed(message));
        }
    }

    Ok(StreamOutcome::Finished)
}

/// Handler that forwards events over a channel, tagged with the stream they
/// belong to.
pub struct ChannelSink<T> {
    tx: mpsc::UnboundedSender<T>,
    wrap: Box<dyn Fn(StreamEvent) -> T + Send>,
}

impl<T> ChannelSink<T> {
    pub fn new(
        tx: mpsc::UnboundedSender<T>,
        wrap: impl Fn(StreamEvent) -> T + Send + 'static,
    ) -> Self {
        Self {
            tx,
            wrap: Box::new(wrap),
        }
    }

    fn send(&self, event: StreamEvent) {
        if self.tx.send((self.wrap)(event)).is_err() {
            debug!("Stream receiver dropped");
        }
    }
}

impl<T> StreamHandler for ChannelSink<T> {
    fn on_token(&mut self, token: &str) {
        self.send(StreamEvent::Token(token.to_string()));
    }

    fn on_error(&mut self, message: &str) {
        self.send(StreamEvent::Error(message.to_string()));
    }

    fn on_done(&mut self, completion: &Completion) {
        self.send(StreamEvent::Done(completion.clone()));
    }

    fn on_prompt(&mut self, prompt: &str) {
        self.send(StreamEvent::Prompt(prompt.to_string()));
    }

    fn on_session(&mut self, session_id: &str) {
        self.send(StreamEvent::Session(session_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::convert::Infallible;

    #[derive(Default)]
    struct Recorder {
        events: Vec<StreamEvent>,
    }

    impl StreamHandler for Recorder {
        fn on_token(&mut self, token: &str) {
            self.events.push(StreamEvent::Token(token.into()));
        }
        fn on_error(&mut self, message: &str) {
            self.events.push(StreamEvent::Error(message.into()));
        }
        fn on_done(&mut self, completion: &Completion) {
            self.events.push(StreamEvent::Done(completion.clone()));
        }
        fn on_prompt(&mut self, prompt: &str) {
            self.events.push(StreamEvent::Prompt(prompt.into()));
        }
        fn on_session(&mut self, session_id: &str) {
            self.events.push(StreamEvent::Session(session_id.into()));
        }
    }

    fn body() -> String {
        [
            StreamLine::prompt("System: be brief\n\nUser: héllo").to_line(),
            StreamLine::token("Hé").to_line(),
            StreamLine::token("llo ✓").to_line(),
            "\n".to_string(),
            StreamLine::done(1.2).to_line(),
        ]
        .concat()
    }

    fn chunks_of(bytes: &[u8], size: usize) -> Vec<Result<Vec<u8>, Infallible>> {
        bytes.chunks(size).map(|c| Ok(c.to_vec())).collect()
    }

    async fn run(chunks: Vec<Result<Vec<u8>, Infallible>>) -> (Vec<StreamEvent>, StreamOutcome) {
        let mut recorder = Recorder::default();
        let outcome = consume(stream::iter(chunks), &mut recorder, &CancellationToken::new())
            .await
            .unwrap();
        (recorder.events, outcome)
    }

    #[tokio::test]
    async fn chunk_boundaries_do_not_change_events() {
        let bytes = body().into_bytes();
        let (whole, _) = run(vec![Ok(bytes.clone())]).await;
        assert_eq!(whole.len(), 4);

        for size in 1..bytes.len() {
            let (split, outcome) = run(chunks_of(&bytes, size)).await;
            assert_eq!(split, whole, "chunk size {size}");
            assert_eq!(outcome, StreamOutcome::Finished);
        }
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(br#"{"token":"#).is_empty());
        assert_eq!(decoder.pending(), br#"{"token":"#);
        let lines = decoder.push(b"\"x\"}\n{\"tok");
        assert_eq!(lines, vec![r#"{"token":"x"}"#.to_string()]);
        assert_eq!(decoder.pending(), b"{\"tok");
    }

    #[test]
    fn split_multibyte_character_is_reassembled() {
        let line = "{\"token\":\"✓\"}\n".as_bytes();
        let mut decoder = LineDecoder::new();
        let cut = line.iter().position(|&b| b >= 0x80).unwrap() + 1;
        assert!(decoder.push(&line[..cut]).is_empty());
        assert_eq!(decoder.push(&line[cut..]), vec!["{\"token\":\"✓\"}".to_string()]);
    }

    #[test]
    fn long_line_in_tiny_chunks() {
        let token = "x".repeat(20_000);
        let line = format!("{{\"token\":\"{token}\"}}\n{{\"token\":\"y\"}}\n");
        let mut decoder = LineDecoder::new();
        let mut lines = Vec::new();
        for chunk in line.as_bytes().chunks(3) {
            lines.extend(decoder.push(chunk));
        }
        assert_eq!(
            lines,
            vec![
                format!("{{\"token\":\"{token}\"}}"),
                "{\"token\":\"y\"}".to_string()
            ]
        );
        assert!(decoder.pending().is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn crlf_and_blank_lines_are_tolerated() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"{\"token\":\"a\"}\r\n\r\n   \n");
        assert_eq!(lines, vec!["{\"token\":\"a\"}".to_string()]);
    }

    #[tokio::test]
    async fn error_line_halts_the_stream() {
        let text = [
            StreamLine::token("partial").to_line(),
            StreamLine::error("model crashed").to_line(),
            StreamLine::token("never shown").to_line(),
        ]
        .concat();
        let (events, outcome) = run(vec![Ok(text.into_bytes())]).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Token("partial".into()),
                StreamEvent::Error("model crashed".into()),
            ]
        );
        assert_eq!(outcome, StreamOutcome::Failed("model crashed".into()));
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let text = "not json\n{\"token\":\"ok\"}\n{\"token\":\n";
        let (events, outcome) = run(vec![Ok(text.as_bytes().to_vec())]).await;
        assert_eq!(events, vec![StreamEvent::Token("ok".into())]);
        assert_eq!(outcome, StreamOutcome::Finished);
    }

    #[tokio::test]
    async fn unterminated_final_line_is_flushed() {
        let (events, _) = run(vec![Ok(br#"{"token":"tail"}"#.to_vec())]).await;
        assert_eq!(events, vec![StreamEvent::Token("tail".into())]);
    }

    #[test]
    fn done_without_total_time_is_not_a_completion() {
        let line: StreamLine = serde_json::from_str(r#"{"token":"","done":true}"#).unwrap();
        assert!(events_for(line).is_empty());
    }

    #[test]
    fn session_line_is_reported() {
        let line: StreamLine = serde_json::from_str(r#"{"session_id":"abc"}"#).unwrap();
        assert_eq!(events_for(line), vec![StreamEvent::Session("abc".into())]);
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_chunk() {
        let cancel = CancellationToken::new();
        let mut recorder = Recorder::default();
        let (tx, rx) = mpsc::unbounded_channel::<Result<Vec<u8>, Infallible>>();
        tx.send(Ok(StreamLine::token("one").to_line().into_bytes()))
            .unwrap();

        let body = tokio_stream_from(rx);
        let task_cancel = cancel.clone();
        let consumer = async {
            consume(body, &mut recorder, &task_cancel).await.unwrap()
        };
        let stopper = async {
            tokio::task::yield_now().await;
            cancel.cancel();
            let _ = tx.send(Ok(StreamLine::token("two").to_line().into_bytes()));
        };
        let (outcome, _) = tokio::join!(consumer, stopper);

        assert_eq!(outcome, StreamOutcome::Stopped);
        assert_eq!(recorder.events, vec![StreamEvent::Token("one".into())]);
    }

    fn tokio_stream_from<T>(mut rx: mpsc::UnboundedReceiver<T>) -> impl Stream<Item = T> {
        futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx))
    }

    #[tokio::test]
    async fn read_errors_are_transport_failures() {
        let chunks: Vec<Result<Vec<u8>, &str>> = vec![Ok(b"{\"token\":\"a\"}\n".to_vec()), Err("reset")];
        let mut recorder = Recorder::default();
        let err = consume(stream::iter(chunks), &mut recorder, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Read(ref m) if m == "reset"));
        assert_eq!(recorder.events.len(), 1);
    }

    #[tokio::test]
    async fn channel_sink_tags_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx, |event| (7u64, event));
        sink.on_token("x");
        sink.on_prompt("p");
        assert_eq!(rx.recv().await, Some((7, StreamEvent::Token("x".into()))));
        assert_eq!(rx.recv().await, Some((7, StreamEvent::Prompt("p".into()))));
    }
}
