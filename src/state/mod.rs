//! Persistent editor state: last code, language and theme.

use std::{fs, path::PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{config::Config, execution::Language};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl SavedState {
    /// Saved code, only when there is something to restore.
    pub fn restorable_code(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.is_empty())
    }

    /// Saved language; unknown ids are ignored.
    pub fn language(&self) -> Option<Language> {
        self.language.as_deref().and_then(|l| l.parse().ok())
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    last_code_digest: Option<String>,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, last_code_digest: None }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.state_path())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Missing or unreadable state yields the default.
    pub fn load(&self) -> SavedState {
        if !self.path.exists() {
            return SavedState::default();
        }
        match fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from))
        {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable editor state");
                SavedState::default()
            }
        }
    }

    fn update(&self, apply: impl FnOnce(&mut SavedState)) -> Result<()> {
        let mut state = self.load();
        apply(&mut state);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }

    pub fn save_code(&mut self, code: &str) -> Result<()> {
        self.update(|s| s.code = Some(code.to_string()))?;
        self.last_code_digest = Some(digest(code));
        Ok(())
    }

    /// Writes the code only when it changed since the last save.
    pub fn autosave(&mut self, code: &str) -> Result<bool> {
        if self.last_code_digest.as_deref() == Some(digest(code).as_str()) {
            return Ok(false);
        }
        self.save_code(code)?;
        Ok(true)
    }

    pub fn save_language(&self, language: Language) -> Result<()> {
        self.update(|s| s.language = Some(language.id().to_string()))
    }

    pub fn save_theme(&self, theme_id: &str) -> Result<()> {
        self.update(|s| s.theme = Some(theme_id.to_string()))
    }

    pub fn reset(&mut self) -> Result<()> {
        self.last_code_digest = None;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

fn digest(code: &str) -> String {
    format!("{:x}", md5::compute(code.as_bytes()))
}
