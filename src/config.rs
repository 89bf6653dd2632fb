use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
pub const DEFAULT_AUTODISCOVER_URL: &str = "https://outlook.office365.com";
pub const DEFAULT_API_URL: &str = "https://graph.microsoft.com";
pub const DEFAULT_API_VERSION: &str = "v1.0";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub client_id: String,
    pub tenant: Option<String>,
    pub redirect_uri: Option<String>,
    /// Host answering the autodiscover JSON endpoint.
    pub autodiscover_url: Option<String>,
    /// Mail API root. When set, autodiscover is skipped; otherwise a mailbox
    /// that autodiscovers is served from `DEFAULT_API_URL`.
    pub api_url: Option<String>,
    pub api_version: Option<String>,
}

impl Config {
    pub fn tenant(&self) -> &str {
        self.tenant.as_deref().unwrap_or(DEFAULT_TENANT)
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI)
    }

    pub fn autodiscover_url(&self) -> &str {
        self.autodiscover_url
            .as_deref()
            .unwrap_or(DEFAULT_AUTODISCOVER_URL)
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION)
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("todays_mail"))
}

pub fn app_dir() -> Result<PathBuf> {
    let p = config_dir()?;
    fs::create_dir_all(&p)?;
    Ok(p)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            client_id: "YOUR_APPLICATION_CLIENT_ID".to_string(),
            tenant: Some(DEFAULT_TENANT.to_string()),
            redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
            autodiscover_url: Some(DEFAULT_AUTODISCOVER_URL.to_string()),
            api_url: None,
            api_version: Some(DEFAULT_API_VERSION.to_string()),
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {}, edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}
