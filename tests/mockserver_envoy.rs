//! Mock server for the Envoy gateway and the Enlighten cloud
#![allow(dead_code)]
use envoybridge::integration::envoy::{Client, CloudEndpoints, Credentials};
use httpmock::{
    Method::{GET, POST},
    Mock, MockServer,
};
use reqwest::Url;
use serde_json::{Value, json};
use std::time::Duration;

pub const SERIAL: &str = "122233445566";
pub const USERNAME: &str = "owner@example.com";
pub const PASSWORD: &str = "secret";
pub const SESSION_ID: &str = "a1b2c3d4e5";
pub const TOKEN: &str = "eyJraWQiOiI3ZDEwMDA1ZC03ODk5LTRkMGQtYmNiNC0yNDRmOThlZTE1NmIiLCJ0eXAiOiJKV1QifQ";
pub const COOKIE: &str = "Kx8fPq2LmWz7";

pub const PRODUCTION_EID: u64 = 704643328;
pub const NET_CONSUMPTION_EID: u64 = 704643584;

/// One mock server plays both the cloud and the gateway.
pub struct EnvoyMockServer {
    pub server: MockServer,
}

impl EnvoyMockServer {
    /// Create and start a new mock server
    pub async fn start() -> Self {
        let server = MockServer::start_async().await;
        Self { server }
    }

    /// Gateway address, with scheme since the mock server speaks plain HTTP
    pub fn address(&self) -> String {
        self.server.base_url()
    }

    pub fn cloud_endpoints(&self) -> CloudEndpoints {
        let url = Url::parse(&self.server.base_url()).expect("cannot parse url");
        CloudEndpoints::new(&url, &url)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(USERNAME, PASSWORD)
    }

    /// Client without a session
    pub fn client(&self) -> Client {
        self.client_with_timeout(Duration::from_secs(2))
    }

    pub fn client_with_timeout(&self, timeout: Duration) -> Client {
        Client::new(
            &self.address(),
            SERIAL,
            self.credentials(),
            self.cloud_endpoints(),
            timeout,
        )
        .expect("cannot create client")
    }

    /// Mock cloud login success for the given credentials
    pub async fn mock_login_ok<'a>(&'a self, username: &str, password: &str) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/login/login.json")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .x_www_form_urlencoded_tuple("user[email]", username)
                    .x_www_form_urlencoded_tuple("user[password]", password);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "message": "success",
                        "session_id": SESSION_ID,
                        "manager_token": "unused",
                        "is_consumer": true
                    }));
            })
            .await
    }

    /// Mock cloud login rejecting any credentials
    pub async fn mock_login_rejected<'a>(&'a self) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(POST).path("/login/login.json");
                then.status(401)
                    .header("content-type", "application/json")
                    .json_body(json!({"message": "Invalid email or password"}));
            })
            .await
    }

    /// Mock token exchange success for the given username
    pub async fn mock_token_ok<'a>(&'a self, username: &str) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/tokens")
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "session_id": SESSION_ID,
                        "serial_num": SERIAL,
                        "username": username
                    }));
                then.status(200).body(TOKEN);
            })
            .await
    }

    /// Mock token exchange rejection
    pub async fn mock_token_rejected<'a>(&'a self) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(POST).path("/tokens");
                then.status(403).body("Forbidden");
            })
            .await
    }

    /// Mock gateway token check returning the session cookie
    pub async fn mock_check_jwt_ok<'a>(&'a self, cookie: &str) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/check_jwt")
                    .header("authorization", format!("Bearer {TOKEN}"));
                then.status(200)
                    .header("set-cookie", format!("sessionId={cookie}; Path=/; HttpOnly"))
                    .header("content-type", "text/html")
                    .body("<!DOCTYPE html><h2>Valid token.</h2>");
            })
            .await
    }

    /// Mock gateway token check rejecting the token
    pub async fn mock_check_jwt_rejected<'a>(&'a self) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/check_jwt");
                then.status(401).body("<h2>Invalid token.</h2>");
            })
            .await
    }

    /// Mock gateway token check accepting the token but setting no session cookie
    pub async fn mock_check_jwt_without_cookie<'a>(&'a self) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/check_jwt");
                then.status(200)
                    .header("set-cookie", "lang=en; Path=/")
                    .body("<!DOCTYPE html><h2>Valid token.</h2>");
            })
            .await
    }

    /// Mock the three authentication steps with the default credentials
    pub async fn mock_authentication_ok<'a>(&'a self) -> (Mock<'a>, Mock<'a>, Mock<'a>) {
        (
            self.mock_login_ok(USERNAME, PASSWORD).await,
            self.mock_token_ok(USERNAME).await,
            self.mock_check_jwt_ok(COOKIE).await,
        )
    }

    /// Mock a gateway endpoint answering `body` to any request
    pub async fn mock_endpoint<'a>(&'a self, path: &str, body: Value) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(body);
            })
            .await
    }

    /// Mock a gateway endpoint answering `body` only with the session cookie
    pub async fn mock_endpoint_with_session<'a>(&'a self, path: &str, body: Value) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(path)
                    .header("cookie", format!("sessionId={COOKIE}"));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(body);
            })
            .await
    }

    /// Mock a gateway endpoint rejecting requests without a session cookie
    pub async fn mock_endpoint_without_session<'a>(&'a self, path: &str) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path).matches(|req| {
                    !req.headers
                        .as_ref()
                        .is_some_and(|h| h.iter().any(|(k, _)| k.eq_ignore_ascii_case("cookie")))
                });
                then.status(401).body("Unauthorized");
            })
            .await
    }

    /// Mock a gateway endpoint always answering `status`
    pub async fn mock_endpoint_status<'a>(&'a self, path: &str, status: u16) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(status).body("error");
            })
            .await
    }

    /// Mock a gateway endpoint answering after `delay`
    pub async fn mock_endpoint_slow<'a>(&'a self, path: &str, delay: Duration) -> Mock<'a> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200).delay(delay).json_body(json!([]));
            })
            .await
    }

    /// Mock the production report with the given instantaneous power
    pub async fn mock_production<'a>(&'a self, w_now: f64) -> Mock<'a> {
        self.mock_endpoint("/production.json", production_report(w_now))
            .await
    }

    /// Mock the meter list with a production and a net-consumption meter
    pub async fn mock_meters<'a>(&'a self) -> Mock<'a> {
        self.mock_endpoint("/ivp/meters", meters()).await
    }

    /// Mock the meter readings
    pub async fn mock_meter_readings<'a>(&'a self, readings: Value) -> Mock<'a> {
        self.mock_endpoint("/ivp/meters/readings", readings).await
    }
}

/// Production report as returned by the gateway
pub fn production_report(w_now: f64) -> Value {
    json!({
        "production": [
            {
                "type": "inverters",
                "activeCount": 12,
                "readingTime": 1719300000,
                "wNow": w_now,
                "whLifetime": 4821000
            }
        ],
        "consumption": [],
        "storage": []
    })
}

/// Meter list with a production and a net-consumption meter
pub fn meters() -> Value {
    json!([
        {
            "eid": PRODUCTION_EID,
            "state": "enabled",
            "measurementType": "production",
            "phaseMode": "three",
            "phaseCount": 3
        },
        {
            "eid": NET_CONSUMPTION_EID,
            "state": "enabled",
            "measurementType": "net-consumption",
            "phaseMode": "three",
            "phaseCount": 3
        }
    ])
}

/// Meter readings for the production and net-consumption meters
pub fn meter_readings(production_w: f64, grid_w: f64) -> Value {
    json!([
        {"eid": PRODUCTION_EID, "timestamp": 1719300000, "activePower": production_w, "voltage": 231.2},
        {"eid": NET_CONSUMPTION_EID, "timestamp": 1719300000, "activePower": grid_w, "voltage": 231.2}
    ])
}
