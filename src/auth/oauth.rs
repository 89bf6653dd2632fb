use anyhow::{Result, anyhow};
use log::{info, warn};
use oauth2::TokenResponse;
use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenUrl,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};
use url::Url;

/// Delegated permissions needed to list mail and manage search folders.
pub const MAIL_SCOPES: [&str; 2] = [
    "https://graph.microsoft.com/Mail.ReadWrite",
    "offline_access",
];

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Tokens returned by the oauth flow (in-memory)
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Identity-platform application registration.
pub struct OAuthApp<'a> {
    pub tenant: &'a str,
    pub client_id: &'a str,
    pub client_secret: Option<&'a str>,
}

impl OAuthApp<'_> {
    fn authority(&self) -> String {
        format!("https://login.microsoftonline.com/{}/oauth2/v2.0", self.tenant)
    }

    fn client(&self) -> Result<BasicClient> {
        let authority = self.authority();
        let auth_url = AuthUrl::new(format!("{authority}/authorize"))?;
        let token_url = TokenUrl::new(format!("{authority}/token"))?;
        Ok(BasicClient::new(
            ClientId::new(self.client_id.to_string()),
            self.client_secret.map(|s| ClientSecret::new(s.to_string())),
            auth_url,
            Some(token_url),
        ))
    }
}

fn into_tokens(token: &oauth2::basic::BasicTokenResponse) -> Tokens {
    Tokens {
        access_token: token.access_token().secret().to_string(),
        refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
        expires_in: token.expires_in().map(|d| d.as_secs()),
    }
}

/// Exchange a refresh token for a new access token.
pub fn refresh_access_token(app: &OAuthApp, refresh_token: &str) -> Result<Tokens> {
    let rt = RefreshToken::new(refresh_token.to_string());
    let token = app
        .client()?
        .exchange_refresh_token(&rt)
        .add_scopes(MAIL_SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .request(http_client)?;
    Ok(into_tokens(&token))
}

/// Where the loopback listener must bind for `redirect_uri`.
fn callback_addr(redirect: &Url) -> Result<SocketAddr> {
    let host = redirect
        .host_str()
        .ok_or_else(|| anyhow!("redirect_uri missing host: {redirect}"))?;
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| anyhow!("redirect_uri missing/unknown port: {redirect}"))?;

    let ip: IpAddr = match host {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            anyhow!("redirect_uri host must be localhost/127.0.0.1 or an IP: {other}")
        })?,
    };
    Ok(SocketAddr::new(ip, port))
}

/// Pull `code` out of a callback path, provided `state` matches.
fn code_from_callback(
    redirect: &Url,
    path_and_query: &str,
    state: &str,
) -> Result<Option<String>> {
    let full = redirect.join(path_and_query)?;
    let mut code = None;
    let mut returned_state = None;
    for (k, v) in full.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "state" => returned_state = Some(v.into_owned()),
            "error" => return Err(anyhow!("authorization denied: {v}")),
            _ => {}
        }
    }
    if code.is_some() && returned_state.as_deref() != Some(state) {
        return Err(anyhow!("authorization callback state mismatch"));
    }
    Ok(code)
}

/// Authorization Code + PKCE. Opens the system browser and captures the code
/// on a loopback listener.
pub fn perform_pkce_flow(app: &OAuthApp, redirect_uri: &str, login_hint: &str) -> Result<Tokens> {
    let redirect = Url::parse(redirect_uri)
        .map_err(|e| anyhow!("Invalid redirect_uri '{redirect_uri}': {e}"))?;
    let bind_addr = callback_addr(&redirect)?;

    // listen before the browser can redirect
    let server = Server::http(bind_addr)
        .map_err(|e| anyhow!("Failed to bind OAuth callback server on {bind_addr}: {e:?}"))?;

    let client = app
        .client()?
        .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string())?);
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(MAIL_SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .add_extra_param("login_hint", login_hint)
        .set_pkce_challenge(pkce_challenge)
        .url();

    println!("Open this URL in your browser:\n{auth_url}");
    if let Err(e) = open::that(auth_url.as_str()) {
        warn!("could not open browser automatically: {e}");
    }

    let mut code = None;
    let deadline = Instant::now() + CALLBACK_TIMEOUT;
    while code.is_none() && Instant::now() < deadline {
        let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };

        match code_from_callback(&redirect, request.url(), csrf.secret()) {
            Ok(Some(c)) => {
                let _ = request.respond(Response::from_string(
                    "Authorization received. You can close this tab.",
                ));
                code = Some(c);
            }
            Ok(None) => {
                let _ = request.respond(Response::from_string(
                    "No code found in redirect. You can close this tab.",
                ));
            }
            Err(e) => {
                let _ = request.respond(Response::from_string(format!("Bad redirect: {e}")));
                return Err(e);
            }
        }
    }

    let code = code.ok_or_else(|| anyhow!("No code received within timeout"))?;
    info!("authorization code received; exchanging for tokens");

    let token = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request(http_client)
        .map_err(|e| anyhow!("Token exchange failed: {e}"))?;
    Ok(into_tokens(&token))
}
