//! OAuth 2.0 authorization-code flow with PKCE against the Microsoft
//! identity platform.
//!
//! The browser is sent to the tenant's `/authorize` endpoint and redirected
//! back to a one-shot HTTP listener on `localhost`. The code it delivers is
//! exchanged, together with the PKCE verifier, for an access token and a
//! refresh token at the `/token` endpoint.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::GraphConfig;
use super::tokens::TokenInfo;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the browser to come back.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client for the Microsoft identity platform.
#[derive(Debug)]
pub struct OAuthClient {
    config: GraphConfig,
    http_client: reqwest::Client,
}

/// Tokens returned by a refresh.
///
/// Microsoft may rotate the refresh token; `refresh_token` is `Some` when it
/// did.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    pub fn new(config: GraphConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Runs the interactive flow and returns the obtained tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if no loopback port is free, the user denies
    /// consent, the callback times out or the code exchange fails.
    pub async fn authorize(&self) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(self.config.loopback_port_range)?;
        let redirect_uri = format!("http://localhost:{}", port);

        let auth_url = pkce.build_auth_url(&self.config, &redirect_uri)?;

        info!("starting OAuth flow, opening browser...");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = Self::wait_for_callback(listener)?;
        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, discarding the authorization code",
            ));
        }

        info!("received authorization code, exchanging for tokens...");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri)
            .await
    }

    /// Gets a new access token using the refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let scope = self.config.scopes.join(" ");
        let mut params = vec![
            ("client_id", self.config.credentials.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("scope", scope.as_str()),
        ];
        if let Some(secret) = self.config.credentials.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let token = self.post_token(&params, "token refresh").await?;
        info!("successfully refreshed access token");
        Ok(RefreshedToken {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> ProviderResult<TokenInfo> {
        let scope = self.config.scopes.join(" ");
        let mut params = vec![
            ("client_id", self.config.credentials.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
        ];
        if let Some(secret) = self.config.credentials.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let token = self.post_token(&params, "token exchange").await?;
        info!("successfully obtained tokens");

        // The endpoint echoes the granted scopes; fall back to what was asked.
        let scopes = token
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| self.config.scopes.clone());
        Ok(TokenInfo::new(
            token.access_token,
            token.refresh_token,
            token.expires_in,
            scopes,
        ))
    }

    async fn post_token(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(self.config.token_url())
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.to_string())
                .unwrap_or(body);
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, detail
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }

    fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                debug!("bound loopback server on port {}", port);
                return Ok((listener, port));
            }
        }
        Err(ProviderError::configuration(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    fn wait_for_callback(listener: TcpListener) -> ProviderResult<Callback> {
        let (tx, rx) = mpsc::channel();

        // The accept loop runs on its own thread so the wait can time out.
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(result) = handle_callback(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) => error!("failed to accept connection: {}", e),
                }
            }
        });

        match rx.recv_timeout(CALLBACK_TIMEOUT) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(ProviderError::authentication("OAuth callback timeout"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ProviderError::internal("callback channel disconnected"))
            }
        }
    }
}

/// What the browser brought back to the loopback listener.
#[derive(Debug, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

/// Answers one request on the loopback listener.
///
/// Returns `None` for requests that are not the redirect (favicon probes
/// and the like) so the listener keeps waiting.
fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let result = parse_callback(&request_line)?;

    let response = match result {
        Ok(_) => {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Signed in</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        }
        Err(_) => {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Sign-in failed</h1>\
            <p>You can close this window.</p></body></html>"
        }
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Parses `GET /?code=...&state=... HTTP/1.1`.
fn parse_callback(request_line: &str) -> Option<ProviderResult<Callback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let url = Url::parse("http://localhost").ok()?.join(target).ok()?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        let message = match description {
            Some(description) => format!("authorization denied: {}: {}", error, description),
            None => format!("authorization denied: {}", error),
        };
        return Some(Err(ProviderError::authentication(message)));
    }

    match (code, state) {
        (Some(code), Some(state)) => Some(Ok(Callback { code, state })),
        (Some(_), None) => Some(Err(ProviderError::authentication(
            "missing state in callback",
        ))),
        // Not the redirect.
        (None, _) => None,
    }
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state echoed back by the redirect.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the authorization URL for the configured tenant.
    pub fn build_auth_url(&self, config: &GraphConfig, redirect_uri: &str) -> ProviderResult<Url> {
        let scope = config.scopes.join(" ");
        Url::parse_with_params(
            &config.authorize_url(),
            &[
                ("client_id", config.credentials.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("response_mode", "query"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| ProviderError::configuration(format!("invalid authorization URL: {}", e)))
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Successful answer of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Error answer of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl std::fmt::Display for TokenErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            // Descriptions come with trace ids on extra lines.
            Some(d) => write!(f, "{}: {}", self.error, d.lines().next().unwrap_or_default()),
            None => write!(f, "{}", self.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::config::OAuthCredentials;

    fn config() -> GraphConfig {
        GraphConfig::new(OAuthCredentials::public(
            "0a1b2c3d-4e5f-6789-abcd-ef0123456789",
        ))
    }

    #[test]
    fn pkce_verifier_length() {
        let flow = PkceFlow::new();
        // 32 bytes in unpadded base64
        assert_eq!(flow.verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_matches_rfc_example() {
        // RFC 7636, appendix B.
        let challenge = PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn pkce_values_are_random() {
        let flow1 = PkceFlow::new();
        let flow2 = PkceFlow::new();
        assert_ne!(flow1.challenge, flow2.challenge);
        assert_ne!(flow1.state, flow2.state);
    }

    #[test]
    fn auth_url_format() {
        let flow = PkceFlow::new();
        let url = flow
            .build_auth_url(&config(), "http://localhost:8400")
            .unwrap();

        assert_eq!(url.host_str(), Some("login.microsoftonline.com"));
        assert_eq!(url.path(), "/common/oauth2/v2.0/authorize");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("client_id"), Some("0a1b2c3d-4e5f-6789-abcd-ef0123456789"));
        assert_eq!(get("redirect_uri"), Some("http://localhost:8400"));
        assert_eq!(get("scope"), Some("offline_access User.Read Calendars.Read"));
        assert_eq!(get("code_challenge_method"), Some("S256"));
        assert_eq!(get("code_challenge"), Some(flow.challenge.as_str()));
        assert_eq!(get("state"), Some(flow.state.as_str()));
    }

    #[test]
    fn callback_with_code() {
        let result = parse_callback("GET /?code=M.C507_abc%2Bdef&state=xyz HTTP/1.1\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            result,
            Callback {
                code: "M.C507_abc+def".to_string(),
                state: "xyz".to_string()
            }
        );
    }

    #[test]
    fn callback_with_error() {
        let err = parse_callback(
            "GET /?error=access_denied&error_description=The+user+declined HTTP/1.1\r\n",
        )
        .unwrap()
        .unwrap_err();
        assert!(err.is_authentication());
        assert!(err.message().contains("access_denied: The user declined"));
    }

    #[test]
    fn callback_without_state_is_rejected() {
        let result = parse_callback("GET /?code=abc HTTP/1.1\r\n").unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn unrelated_requests_are_ignored() {
        assert!(parse_callback("GET /favicon.ico HTTP/1.1\r\n").is_none());
        assert!(parse_callback("POST /?code=abc&state=x HTTP/1.1\r\n").is_none());
        assert!(parse_callback("").is_none());
    }

    #[test]
    fn token_error_display() {
        let err: TokenErrorResponse = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"AADSTS70008: expired.\r\nTrace ID: 1"}"#,
        )
        .unwrap();
        assert_eq!(err.to_string(), "invalid_grant: AADSTS70008: expired.");
    }
}
