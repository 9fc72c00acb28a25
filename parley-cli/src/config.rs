use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Terminal console for a local LLM chat, summarize and parse server.
#[derive(Debug, Clone, Parser)]
#[command(name = "parley", version, about)]
pub struct Cli {
    /// Base URL of the console server.
    #[arg(long, env = "PARLEY_SERVER", default_value = "http://127.0.0.1:5000")]
    pub server: String,

    /// Seconds a streamed response may take before it is abandoned.
    #[arg(long, env = "PARLEY_TIMEOUT_SECS", default_value_t = 300)]
    pub timeout_secs: u64,

    /// Seconds between health checks.
    #[arg(long, env = "PARLEY_HEALTH_SECS", default_value_t = 30)]
    pub health_secs: u64,

    /// File receiving diagnostic logs (the terminal is owned by the UI).
    #[arg(long, env = "PARLEY_LOG_FILE", default_value = "parley.log")]
    pub log_file: PathBuf,

    /// Directory for persisted flags. Defaults to the platform config dir.
    #[arg(long, env = "PARLEY_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Directory for exchange transcripts.
    #[arg(long, env = "PARLEY_TRANSCRIPT_DIR", default_value = "conversation_logs")]
    pub transcript_dir: PathBuf,

    /// Do not write transcripts.
    #[arg(long)]
    pub no_transcript: bool,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: String,
    pub stream_timeout: Duration,
    pub health_interval: Duration,
    pub log_file: PathBuf,
    pub state_dir: PathBuf,
    pub transcript_dir: Option<PathBuf>,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        let state_dir = cli.state_dir.unwrap_or_else(default_state_dir);
        Self {
            server: cli.server,
            stream_timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            health_interval: Duration::from_secs(cli.health_secs.max(1)),
            log_file: cli.log_file,
            state_dir,
            transcript_dir: (!cli.no_transcript).then_some(cli.transcript_dir),
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("parley"))
        .unwrap_or_else(|| PathBuf::from(".parley"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let cli = Cli::try_parse_from(["parley", "--state-dir", "/tmp/parley-test"]).unwrap();
        let settings = Settings::from(cli);
        assert_eq!(settings.stream_timeout, Duration::from_secs(300));
        assert_eq!(settings.health_interval, Duration::from_secs(30));
        assert_eq!(settings.state_dir, PathBuf::from("/tmp/parley-test"));
        assert_eq!(
            settings.transcript_dir,
            Some(PathBuf::from("conversation_logs"))
        );
    }

    #[test]
    fn transcript_can_be_disabled() {
        let cli = Cli::try_parse_from([
            "parley",
            "--server",
            "http://10.0.0.2:8080",
            "--no-transcript",
            "--timeout-secs",
            "0",
        ])
        .unwrap();
        let settings = Settings::from(cli);
        assert_eq!(settings.server, "http://10.0.0.2:8080");
        assert!(settings.transcript_dir.is_none());
        assert_eq!(settings.stream_timeout, Duration::from_secs(1));
    }
}
