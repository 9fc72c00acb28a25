#![allow(dead_code)]

use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use futures_util::stream;
use parley_cli::stream::{Completion, StreamHandler};
use std::convert::Infallible;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Body that sends `chunks` as separate writes.
pub fn chunked(chunks: Vec<String>) -> Body {
    Body::from_stream(stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk))),
    ))
}

/// Body that sends `first` and then stalls for `pause` before closing.
pub fn stalling(first: String, pause: Duration) -> Body {
    let steps = stream::unfold(0u8, move |step| {
        let first = first.clone();
        async move {
            match step {
                0 => Some((Ok::<_, Infallible>(Bytes::from(first)), 1)),
                1 => {
                    tokio::time::sleep(pause).await;
                    Some((Ok(Bytes::from_static(b"{\"token\":\"late\"}\n")), 2))
                }
                _ => None,
            }
        }
    });
    Body::from_stream(steps)
}

/// Handler that keeps everything it is given.
#[derive(Debug, Default)]
pub struct Recorder {
    pub tokens: Vec<String>,
    pub errors: Vec<String>,
    pub done: Vec<Completion>,
    pub prompts: Vec<String>,
    pub sessions: Vec<String>,
    /// Cancelled on the first token when set.
    pub cancel_on_token: Option<CancellationToken>,
}

impl Recorder {
    pub fn text(&self) -> String {
        self.tokens.concat()
    }
}

impl StreamHandler for Recorder {
    fn on_token(&mut self, token: &str) {
        self.tokens.push(token.to_string());
        if let Some(cancel) = &self.cancel_on_token {
            cancel.cancel();
        }
    }

    fn on_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn on_done(&mut self, completion: &Completion) {
        self.done.push(completion.clone());
    }

    fn on_prompt(&mut self, prompt: &str) {
        self.prompts.push(prompt.to_string());
    }

    fn on_session(&mut self, session_id: &str) {
        self.sessions.push(session_id.to_string());
    }
}
