use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::app_dir;

/// Non-secret access token cache, one entry per mailbox.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TokensFile {
    pub mailbox: Option<String>,
    pub access_token: Option<String>,
    pub expires_at_epoch: Option<i64>, // epoch seconds
}

impl TokensFile {
    /// The cached token, if it belongs to `mailbox` and is still valid at `now`.
    pub fn usable_token(&self, mailbox: &str, now: i64) -> Option<&str> {
        if self.mailbox.as_deref() != Some(mailbox) {
            return None;
        }
        match (&self.access_token, self.expires_at_epoch) {
            (Some(at), Some(exp)) if now < exp => Some(at),
            _ => None,
        }
    }
}

pub fn tokens_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("tokens.json"))
}

pub fn save_tokens_to(path: &Path, tokens: &TokensFile) -> Result<()> {
    let s = serde_json::to_string_pretty(tokens)?;
    fs::write(path, s)?;
    Ok(())
}

pub fn load_tokens_from(path: &Path) -> Result<Option<TokensFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path)?;
    let tf: TokensFile = serde_json::from_str(&s)?;
    Ok(Some(tf))
}
