use crate::controllers::Surface;
use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: DateTime<Local>,
    pub entry_type: EntryType,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EntryType {
    Input {
        surface: Surface,
        content: String,
    },
    Response {
        surface: Surface,
        content: String,
        total_time: Option<f64>,
    },
    Stopped {
        surface: Surface,
        content: String,
    },
    Error {
        surface: Surface,
        message: String,
    },
    Prompt {
        content: String,
    },
}

/// Append-only JSONL record of every exchange in this session.
pub struct Transcript {
    current_log_file: Option<PathBuf>,
}

impl Transcript {
    pub fn new(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir)?;
        }

        let session_start = Local::now();
        let filename = format!("conversation_{}.jsonl", session_start.format("%Y%m%d_%H%M%S"));
        let log_file = log_dir.join(filename);

        debug!("Starting transcript: {:?}", log_file);

        Ok(Self {
            current_log_file: Some(log_file),
        })
    }

    /// A transcript that records nothing.
    pub fn disabled() -> Self {
        Self {
            current_log_file: None,
        }
    }

    pub fn log_entry(&self, entry_type: EntryType) -> Result<()> {
        if let Some(ref log_file) = self.current_log_file {
            let entry = TranscriptEntry {
                timestamp: Local::now(),
                entry_type,
            };

            let json = serde_json::to_string(&entry)?;

            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;

            writeln!(file, "{}", json)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Like [`log_entry`](Self::log_entry), but failures only reach the log.
    pub fn record(&self, entry_type: EntryType) {
        if let Err(e) = self.log_entry(entry_type) {
            error!("Failed to write transcript entry: {}", e);
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.current_log_file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = Transcript::new(dir.path()).unwrap();
        transcript.record(EntryType::Input {
            surface: Surface::Chat,
            content: "hi".into(),
        });
        transcript.record(EntryType::Response {
            surface: Surface::Chat,
            content: "hello".into(),
            total_time: Some(0.5),
        });

        let text = fs::read_to_string(transcript.path().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["entry_type"]["type"], "Response");
        assert_eq!(second["entry_type"]["surface"], "chat");
    }

    #[test]
    fn disabled_transcript_writes_nothing() {
        let transcript = Transcript::disabled();
        assert!(transcript.path().is_none());
        assert!(transcript
            .log_entry(EntryType::Prompt {
                content: "p".into()
            })
            .is_ok());
    }
}
