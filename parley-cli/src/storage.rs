use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Flag controlling whether the prompt console starts visible.
pub const SHOW_PROMPTS: &str = "show-prompts";

const FLAGS_FILE: &str = "flags.json";

/// Boolean flags that survive restarts, kept as a small JSON map.
#[derive(Debug)]
pub struct FlagStore {
    path: Option<PathBuf>,
    flags: BTreeMap<String, bool>,
}

impl FlagStore {
    /// Open (or lazily create) the store inside `dir`. An unreadable or
    /// corrupt file starts the store empty rather than failing.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(FLAGS_FILE);
        let flags = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Ignoring unreadable flag file {:?}: {}", path, e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        debug!("Loaded {} flag(s) from {:?}", flags.len(), path);
        Self {
            path: Some(path),
            flags,
        }
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            flags: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }

    pub fn set(&mut self, key: &str, value: bool) -> Result<()> {
        self.flags.insert(key.to_string(), value);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.flags)?)?;
        Ok(())
    }

    pub fn show_prompts(&self) -> bool {
        self.get(SHOW_PROMPTS)
    }

    pub fn set_show_prompts(&mut self, show: bool) -> Result<()> {
        self.set(SHOW_PROMPTS, show)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_to_false() {
        let store = FlagStore::in_memory();
        assert!(!store.show_prompts());
    }

    #[test]
    fn flags_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FlagStore::open(dir.path());
        store.set_show_prompts(true).unwrap();

        let reopened = FlagStore::open(dir.path());
        assert!(reopened.show_prompts());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FLAGS_FILE), "{not json").unwrap();
        let store = FlagStore::open(dir.path());
        assert!(!store.show_prompts());
    }
}
