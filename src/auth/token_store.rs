use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "todays_mail";

fn load(key: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, key)?;
    match entry.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Save a refresh token into the OS keyring for the given mailbox address
pub fn save_refresh_token(username: &str, refresh_token: &str) -> Result<()> {
    Entry::new(SERVICE, username)?
        .set_password(refresh_token)
        .map_err(|e| anyhow!(e.to_string()))
}

pub fn load_refresh_token(username: &str) -> Result<Option<String>> {
    load(username)
}

/// Client secret for confidential app registrations, keyed by client_id
pub fn load_client_secret(client_id: &str) -> Result<Option<String>> {
    load(client_id)
}
