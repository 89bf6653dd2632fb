use anyhow::{Result, anyhow};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

/// Where the mail API for a mailbox lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct AutodiscoverResponse {
    #[serde(rename = "Protocol")]
    protocol: Option<String>,
    #[serde(rename = "Url")]
    url: Option<String>,
}

pub struct Autodiscover {
    http: Client,
    base: String,
}

impl Autodiscover {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base: base.into(),
        }
    }

    fn request_url(&self, address: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base)
            .map_err(|e| anyhow!("Invalid autodiscover url '{}': {e}", self.base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("autodiscover url cannot be a base: {}", self.base))?
            .pop_if_empty()
            .extend(["autodiscover", "autodiscover.json", "v1.0", address]);
        url.query_pairs_mut().append_pair("Protocol", "Rest");
        Ok(url)
    }

    /// Resolve `address` to its REST endpoint. Every failure mode (network,
    /// status, body) collapses to `None`; the cause is logged.
    pub fn resolve(&self, address: &str) -> Option<ServiceEndpoint> {
        match self.try_resolve(address) {
            Ok(endpoint) => {
                debug!("autodiscover for {address}: {}", endpoint.url);
                Some(endpoint)
            }
            Err(e) => {
                warn!("autodiscover for {address} failed: {e:#}");
                None
            }
        }
    }

    fn try_resolve(&self, address: &str) -> Result<ServiceEndpoint> {
        let url = self.request_url(address)?;
        let response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("autodiscover returned {status}"));
        }
        let body = response.text()?;
        endpoint_from_body(&body)
    }
}

fn endpoint_from_body(body: &str) -> Result<ServiceEndpoint> {
    let parsed: AutodiscoverResponse = serde_json::from_str(body)?;
    if let Some(protocol) = parsed.protocol.as_deref()
        && !protocol.eq_ignore_ascii_case("rest")
    {
        return Err(anyhow!("autodiscover answered for protocol {protocol}"));
    }
    let url = parsed
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| anyhow!("autodiscover response has no Url"))?;
    Ok(ServiceEndpoint { url })
}
