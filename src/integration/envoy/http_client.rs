//! Envoy HTTP client.
//! This is the lower level client for the gateway. It owns the session
//! (bearer token and session cookie) and the cloud authentication protocol.
use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Client, Response, StatusCode, Url};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use super::schemas::{LoginResponse, TokenRequest};
use super::{Error, Result};

static DEFAULT_ENLIGHTEN_URL: &str = "https://enlighten.enphaseenergy.com";
static DEFAULT_ENTREZ_URL: &str = "https://entrez.enphaseenergy.com";

static SESSION_COOKIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sessionId=([^;]+);").expect("invalid session cookie pattern"));

/// Cloud account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Secrets of an established gateway session.
/// Both are replaced together, never one without the other.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub cookie: String,
}

/// Cloud endpoints used to mint a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudEndpoints {
    pub login_url: Url,
    pub token_url: Url,
}

impl CloudEndpoints {
    /// Build the endpoints from the login (Enlighten) and token (Entrez) hosts.
    pub fn new(enlighten_url: &Url, entrez_url: &Url) -> Self {
        CloudEndpoints {
            login_url: enlighten_url
                .join("/login/login.json")
                .expect("cannot build login URL"),
            token_url: entrez_url.join("/tokens").expect("cannot build token URL"),
        }
    }
}

impl Default for CloudEndpoints {
    fn default() -> Self {
        let enlighten = Url::parse(DEFAULT_ENLIGHTEN_URL).expect("invalid default login URL");
        let entrez = Url::parse(DEFAULT_ENTREZ_URL).expect("invalid default token URL");
        CloudEndpoints::new(&enlighten, &entrez)
    }
}

pub struct HttpClient {
    gateway: Client,
    cloud: Client,
    base_url: Url,
    serial: String,
    endpoints: CloudEndpoints,
    credentials: RwLock<Credentials>,
    session: RwLock<Option<Session>>,
}

impl HttpClient {
    /// Creates a new instance of `HttpClient`.
    pub fn new(
        address: &str,
        serial: &str,
        credentials: Credentials,
        endpoints: CloudEndpoints,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = gateway_url(address)?;
        // The gateway serves a self-signed certificate on the local network.
        let gateway = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()?;
        Ok(HttpClient {
            gateway,
            cloud: cloud_client(timeout)?,
            base_url,
            serial: serial.to_string(),
            endpoints,
            credentials: RwLock::new(credentials),
            session: RwLock::new(None),
        })
    }

    /// Check a username and password against the cloud login endpoint only.
    pub async fn verify_credentials(
        endpoints: &CloudEndpoints,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<()> {
        let client = cloud_client(timeout)?;
        request_login(&client, &endpoints.login_url, credentials).await?;
        Ok(())
    }

    /// Replace the stored credentials. The current session stays in place.
    pub async fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().await = credentials;
    }

    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Run the full login, token exchange and JWT check sequence.
    /// The session is only replaced once every step succeeded.
    pub async fn authenticate(&self) -> Result<()> {
        let credentials = self.credentials().await;

        let response = request_login(&self.cloud, &self.endpoints.login_url, &credentials).await?;
        let login: LoginResponse = serde_json::from_str(&response.text().await?)?;
        let session_id = login.session_id.ok_or(Error::SessionIdMissing)?;

        let token = self.request_token(&session_id, &credentials).await?;
        let cookie = self.request_check_jwt(&token).await?;

        *self.session.write().await = Some(Session { token, cookie });
        log::debug!("Gateway session established");
        Ok(())
    }

    /// Read a gateway endpoint.
    /// A client error on the first attempt triggers one re-authentication and one retry.
    pub async fn fetch(&self, path: &str) -> Result<String> {
        let retried = AtomicBool::new(false);
        RetryIf::spawn(
            retry_strategy(),
            || async {
                if retried.swap(true, Ordering::Relaxed) {
                    log::debug!("Gateway rejected the request to {path}, re-authenticating");
                    self.authenticate().await?;
                    log::info!("Re-authenticated with the gateway");
                }
                self.request_get(path).await
            },
            is_retryable_error,
        )
        .await
    }

    /// Private methods --------------------------------------------------------

    /// Internal method to read an endpoint with the current session cookie.
    async fn request_get(&self, path: &str) -> Result<String> {
        let url = self.gateway_endpoint(path)?;
        log::debug!("Sending gateway request: {url}");
        let cookie = self.session.read().await.as_ref().map(|s| s.cookie.clone());
        let mut request = self.gateway.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, format!("sessionId={cookie}"));
        }
        let text = request.send().await?.error_for_status()?.text().await?;
        log::debug!("Gateway response for {path}: {text}");
        Ok(text)
    }

    /// Internal method to exchange the cloud session for a bearer token.
    async fn request_token(&self, session_id: &str, credentials: &Credentials) -> Result<String> {
        log::debug!("Sending token request for gateway {}", self.serial);
        let body = serde_json::to_string(&TokenRequest {
            session_id,
            serial_num: &self.serial,
            username: &credentials.username,
        })?;
        let response = self
            .cloud
            .post(self.endpoints.token_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::TokenRejected(status));
        }
        let token = response.text().await?.trim().to_string();
        if token.is_empty() {
            return Err(Error::ParseError("empty token in exchange response".into()));
        }
        Ok(token)
    }

    /// Internal method to trade the bearer token for the gateway session cookie.
    async fn request_check_jwt(&self, token: &str) -> Result<String> {
        log::debug!("Sending gateway token check request");
        let url = self.gateway_endpoint("/auth/check_jwt")?;
        let response = self
            .gateway
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::JwtRejected(status));
        }
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(parse_session_cookie)
            .ok_or(Error::SessionCookieMissing)
    }

    fn gateway_endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("cannot build gateway URL for {path}: {e}")))
    }
}

/// Post the credentials to the cloud login endpoint and check the status.
async fn request_login(client: &Client, url: &Url, credentials: &Credentials) -> Result<Response> {
    log::debug!("Sending cloud login request for {}", credentials.username);
    let params = [
        ("user[email]", credentials.username.as_str()),
        ("user[password]", credentials.password.as_str()),
    ];
    let response = client.post(url.clone()).form(&params).send().await?;
    let status = response.status();
    if !status.is_success() {
        log::debug!("Cloud login rejected: {status}");
        return Err(Error::LoginRejected(status));
    }
    Ok(response)
}

fn cloud_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Build the gateway base URL. A bare host is reached over HTTPS.
fn gateway_url(address: &str) -> Result<Url> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::Config("gateway address is not set".into()));
    }
    let url = if address.starts_with("http://") || address.starts_with("https://") {
        Url::parse(address)
    } else {
        Url::parse(&format!("https://{address}"))
    };
    url.map_err(|e| Error::Config(format!("invalid gateway address {address}: {e}")))
}

/// Extract the session cookie value from a `Set-Cookie` header.
fn parse_session_cookie(header: &str) -> Option<String> {
    SESSION_COOKIE
        .captures(header)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().to_string())
}

/// A single retry, right after re-authentication.
fn retry_strategy() -> impl Iterator<Item = Duration> {
    FixedInterval::from_millis(0).take(1)
}

/// Check if the error is a HTTP 4xx client error.
fn is_client_error(error: &reqwest::Error) -> bool {
    error
        .status()
        .map(|status_code| StatusCode::is_client_error(&status_code))
        .unwrap_or(false)
}

// Predicate function for the retry strategy to determine if an error is retryable.
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::RequestFailed(err) => is_client_error(err), // Session expired or missing
        _ => false,
    }
}
