//! Envoy Client.
//! This client is the higher level API client for the Envoy gateway.
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::Result;
use super::http_client::{CloudEndpoints, Credentials, HttpClient, Session};
use super::schemas::{MeterDescriptor, MeterReading, ProductionReport};

static PRODUCTION: &str = "/production.json";
static METERS: &str = "/ivp/meters";
static METER_READINGS: &str = "/ivp/meters/readings";

pub struct Client {
    http: HttpClient,
}

impl Client {
    /// Creates a new instance of `Client` for the gateway at `address`.
    pub fn new(
        address: &str,
        serial: &str,
        credentials: Credentials,
        endpoints: CloudEndpoints,
        timeout: Duration,
    ) -> Result<Self> {
        let http = HttpClient::new(address, serial, credentials, endpoints, timeout)?;
        Ok(Client { http })
    }

    /// Validate a username and password against the cloud, without a gateway.
    pub async fn verify_credentials(
        endpoints: &CloudEndpoints,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<()> {
        HttpClient::verify_credentials(endpoints, credentials, timeout).await
    }

    /// Replace the credentials used by the next authentication.
    pub async fn set_credentials(&self, username: &str, password: &str) {
        self.http
            .set_credentials(Credentials::new(username, password))
            .await;
    }

    pub async fn credentials(&self) -> Credentials {
        self.http.credentials().await
    }

    /// Current session secrets, if authenticated.
    pub async fn session(&self) -> Option<Session> {
        self.http.session().await
    }

    /// Establish a new gateway session.
    pub async fn authenticate(&self) -> Result<()> {
        self.http.authenticate().await
    }

    /// Get the raw body of a gateway endpoint.
    pub async fn fetch_endpoint(&self, path: &str) -> Result<String> {
        self.http.fetch(path).await
    }

    /// Get the production report.
    pub async fn get_production_report(&self) -> Result<ProductionReport> {
        self.get_json(PRODUCTION).await
    }

    /// Get the list of meters installed on the gateway.
    pub async fn get_meters(&self) -> Result<Vec<MeterDescriptor>> {
        self.get_json(METERS).await
    }

    /// Get the latest reading of every meter.
    pub async fn get_meter_readings(&self) -> Result<Vec<MeterReading>> {
        self.get_json(METER_READINGS).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let text = self.http.fetch(path).await?;
        Ok(serde_json::from_str(&text)?)
    }
}
