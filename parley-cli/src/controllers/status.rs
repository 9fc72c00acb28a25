use crate::error::ConsoleError;
use chrono::{DateTime, Local};
use parley_shared::Health;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Checking,
    Connected,
    ModelMissing,
    Disconnected,
    Error,
}

impl Connection {
    pub fn label(self) -> &'static str {
        match self {
            Connection::Checking => "Checking...",
            Connection::Connected => "Connected",
            Connection::ModelMissing => "Model not found",
            Connection::Disconnected => "Disconnected",
            Connection::Error => "Connection error",
        }
    }
}

/// Server health as last reported.
#[derive(Debug, Clone)]
pub struct StatusController {
    connection: Connection,
    context_limit: Option<u64>,
    current_model: Option<String>,
    models: Vec<String>,
    checked_at: Option<DateTime<Local>>,
}

impl Default for StatusController {
    fn default() -> Self {
        Self {
            connection: Connection::Checking,
            context_limit: None,
            current_model: None,
            models: Vec::new(),
            checked_at: None,
        }
    }
}

impl StatusController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, result: Result<Health, ConsoleError>) {
        self.checked_at = Some(Local::now());
        match result {
            Ok(health) => self.update(&health),
            Err(e) => {
                debug!("Health check failed: {}", e);
                self.connection = Connection::Error;
            }
        }
    }

    fn update(&mut self, health: &Health) {
        let connection = match (health.is_connected(), health.model_available) {
            (true, true) => Connection::Connected,
            (true, false) => Connection::ModelMissing,
            (false, _) => Connection::Disconnected,
        };
        if connection != self.connection {
            info!("Server status: {}", connection.label());
        }
        self.connection = connection;

        if let Some(limit) = health.context_limit.filter(|l| *l > 0) {
            self.context_limit = Some(limit);
        }
        if let Some(model) = health.current_model.as_ref().filter(|m| !m.is_empty()) {
            self.current_model = Some(model.clone());
        }
        if !health.models.is_empty() {
            self.models = health.models.clone();
        }
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn context_limit(&self) -> Option<u64> {
        self.context_limit
    }

    pub fn current_model(&self) -> Option<&str> {
        self.current_model.as_deref()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn checked_at(&self) -> Option<DateTime<Local>> {
        self.checked_at
    }

    /// Display name of the current model.
    pub fn model_name(&self) -> String {
        format_model_name(self.current_model.as_deref())
    }
}

/// `phi3:mini` → `Phi3`. Missing or empty names read as `LLM`.
pub fn format_model_name(model: Option<&str>) -> String {
    let base = model.and_then(|m| m.split(':').next()).unwrap_or_default();
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "LLM".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health(status: &str, model_available: bool) -> Health {
        Health {
            status: status.into(),
            model_available,
            context_limit: Some(4096),
            current_model: Some("phi3:mini".into()),
            ..Default::default()
        }
    }

    #[test]
    fn classifies_health() {
        let mut status = StatusController::new();
        assert_eq!(status.connection().label(), "Checking...");

        status.apply(Ok(health("connected", true)));
        assert_eq!(status.connection(), Connection::Connected);
        assert_eq!(status.context_limit(), Some(4096));

        status.apply(Ok(health("connected", false)));
        assert_eq!(status.connection().label(), "Model not found");

        status.apply(Ok(health("disconnected", true)));
        assert_eq!(status.connection().label(), "Disconnected");

        status.apply(Err(ConsoleError::Network("refused".into())));
        assert_eq!(status.connection().label(), "Connection error");
        assert_eq!(status.current_model(), Some("phi3:mini"));
    }

    #[test]
    fn model_names_are_shortened() {
        assert_eq!(format_model_name(Some("phi3:mini")), "Phi3");
        assert_eq!(format_model_name(Some("mixtral")), "Mixtral");
        assert_eq!(format_model_name(Some("")), "LLM");
        assert_eq!(format_model_name(None), "LLM");
    }
}
