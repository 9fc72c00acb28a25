use serde::{Deserialize, Serialize};

pub mod work;

/// Body of `POST /api/chat/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Body of the summarize and parse endpoints, streaming and token counting alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCountRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Token usage as reported by the server. Either field may be missing, in
/// which case the display is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenCount {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub model_available: bool,
    #[serde(default)]
    pub context_limit: Option<u64>,
    #[serde(default)]
    pub context_limit_k: Option<String>,
    #[serde(default)]
    pub current_model: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Health {
    pub fn is_connected(&self) -> bool {
        self.status == "connected"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemPrompt {
    pub system_prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// One line of a streamed NDJSON body.
///
/// Every field is optional; which ones are present decides what the line
/// means. The parse endpoint sends its text as `content`, which is read into
/// `token` as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamLine {
    #[serde(default, alias = "content", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl StreamLine {
    pub fn token(text: impl Into<String>) -> Self {
        Self {
            token: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            done: true,
            ..Default::default()
        }
    }

    pub fn done(total_time: f64) -> Self {
        Self {
            done: true,
            total_time: Some(total_time),
            ..Default::default()
        }
    }

    pub fn prompt(full_prompt: impl Into<String>) -> Self {
        Self {
            full_prompt: Some(full_prompt.into()),
            ..Default::default()
        }
    }

    /// Serialize as one NDJSON line, newline included.
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        line.push('\n');
        line
    }
}

/// Error body returned by the server alongside non-2xx statuses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_content_is_read_as_token() {
        let line: StreamLine = serde_json::from_str(r#"{"content":"abc","done":false}"#).unwrap();
        assert_eq!(line.token.as_deref(), Some("abc"));
        assert!(!line.done);
    }

    #[test]
    fn done_line_carries_telemetry() {
        let line: StreamLine = serde_json::from_str(
            r#"{"done":true,"total_time":2.5,"model":"phi3:mini","eval_count":42,"eval_duration":100}"#,
        )
        .unwrap();
        assert!(line.done);
        assert_eq!(line.total_time, Some(2.5));
        assert_eq!(line.eval_count, Some(42));
        assert_eq!(line.model.as_deref(), Some("phi3:mini"));
    }

    #[test]
    fn to_line_is_newline_terminated_and_sparse() {
        let line = StreamLine::token("hi").to_line();
        assert_eq!(line, "{\"token\":\"hi\",\"done\":false}\n");
    }

    #[test]
    fn health_tolerates_disconnected_shape() {
        let health: Health =
            serde_json::from_str(r#"{"status":"disconnected","message":"refused"}"#).unwrap();
        assert!(!health.is_connected());
        assert!(!health.model_available);
        assert!(health.models.is_empty());
    }

    #[test]
    fn chat_request_omits_missing_session() {
        let body = serde_json::to_value(ChatRequest {
            message: "hi".into(),
            session_id: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"message": "hi"}));
    }
}
