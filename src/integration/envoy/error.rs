//! Error handling for the Envoy gateway client.
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: cloud login rejected ({0})")]
    LoginRejected(StatusCode),
    #[error("Authentication failed: no session id in login response")]
    SessionIdMissing,
    #[error("Authentication failed: token exchange rejected ({0})")]
    TokenRejected(StatusCode),
    #[error("Authentication failed: gateway rejected token ({0})")]
    JwtRejected(StatusCode),
    #[error("Authentication failed: no session cookie in gateway response")]
    SessionCookieMissing,

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Response JSON error: {0}")]
    ResponseJsonError(#[from] serde_json::Error),
    #[error("Response parse error: {0}")]
    ParseError(String),
    #[error("Meter join failed: {0}")]
    DataJoin(String),
}

impl Error {
    /// Returns `true` for failures of the authentication protocol.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::LoginRejected(_)
                | Error::SessionIdMissing
                | Error::TokenRejected(_)
                | Error::JwtRejected(_)
                | Error::SessionCookieMissing
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
