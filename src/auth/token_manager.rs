use anyhow::Result;
use log::{info, warn};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::oauth::{self, OAuthApp, Tokens};
use crate::auth::token_store;
use crate::auth::tokens_file::{self, TokensFile};
use crate::config::Config;

/// Overrides every other source when set.
pub const ACCESS_TOKEN_ENV: &str = "MAIL_ACCESS_TOKEN";
pub const CLIENT_SECRET_ENV: &str = "OAUTH_CLIENT_SECRET";

/// Assumed lifetime when the identity platform omits `expires_in`.
const FALLBACK_LIFETIME_SECS: i64 = 3500;

pub struct TokenManager {
    pub tenant: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub mailbox: String,
    cache_path: PathBuf,
}

impl TokenManager {
    pub fn from_config(cfg: &Config, mailbox: &str) -> Result<Self> {
        let client_secret = token_store::load_client_secret(&cfg.client_id)?
            .or_else(|| std::env::var(CLIENT_SECRET_ENV).ok());

        Ok(Self {
            tenant: cfg.tenant().to_string(),
            client_id: cfg.client_id.clone(),
            client_secret,
            redirect_uri: cfg.redirect_uri().to_string(),
            mailbox: mailbox.to_string(),
            cache_path: tokens_file::tokens_path()?,
        })
    }

    fn app(&self) -> OAuthApp<'_> {
        OAuthApp {
            tenant: &self.tenant,
            client_id: &self.client_id,
            client_secret: self.client_secret.as_deref(),
        }
    }

    /// Returns a valid access token: env override, cache, refresh, then PKCE.
    pub fn get_access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            info!("using access token from {ACCESS_TOKEN_ENV}");
            return Ok(token.trim().to_string());
        }

        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

        if let Some(tf) = tokens_file::load_tokens_from(&self.cache_path)?
            && let Some(at) = tf.usable_token(&self.mailbox, now)
        {
            return Ok(at.to_string());
        }

        let tokens = match token_store::load_refresh_token(&self.mailbox)? {
            Some(rt) => match oauth::refresh_access_token(&self.app(), &rt) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Refresh failed: {e}, falling back to interactive auth");
                    self.interactive()?
                }
            },
            None => self.interactive()?,
        };

        self.persist(&tokens, now)?;
        Ok(tokens.access_token)
    }

    fn interactive(&self) -> Result<Tokens> {
        info!("no usable token for {}; running interactive PKCE auth flow", self.mailbox);
        oauth::perform_pkce_flow(&self.app(), &self.redirect_uri, &self.mailbox)
    }

    fn persist(&self, tokens: &Tokens, now: i64) -> Result<()> {
        // a keyring failure shouldn't cost the user this run
        if let Some(rt) = &tokens.refresh_token
            && let Err(e) = token_store::save_refresh_token(&self.mailbox, rt)
        {
            warn!("couldn't save refresh token to keyring: {e}");
        }

        let lifetime = tokens
            .expires_in
            .map(|s| s as i64)
            .unwrap_or(FALLBACK_LIFETIME_SECS);
        tokens_file::save_tokens_to(
            &self.cache_path,
            &TokensFile {
                mailbox: Some(self.mailbox.clone()),
                access_token: Some(tokens.access_token.clone()),
                expires_at_epoch: Some(now + lifetime),
            },
        )
    }
}
