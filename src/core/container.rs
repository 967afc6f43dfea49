//! Dependency injection container for envoybridge.
use std::sync::Arc;

use super::config::Config;
use crate::integration::envoy::{self, CloudEndpoints, Credentials};
use crate::integration::homeassistant;
use crate::services;

/// Container for application dependencies.
pub struct Container {
    config: Arc<Config>,
    cloud_endpoints: CloudEndpoints,
    envoy: Arc<envoy::Client>,
    homeassistant: Arc<homeassistant::Client>,
    telemetry_service: Arc<services::TelemetryBridgeBackgroundService>,
}

impl Container {
    /// Creates a new instance of the dependency injection container.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let credentials = Credentials::new(
            config.enlighten_username.clone(),
            config.enlighten_password.clone(),
        );
        let cloud_endpoints = CloudEndpoints::new(&config.enlighten_url, &config.entrez_url);

        let envoy = Arc::new(envoy::Client::new(
            &config.envoy_address,
            &config.envoy_serial,
            credentials.clone(),
            cloud_endpoints.clone(),
            config.request_timeout.into(),
        )?);

        let homeassistant = Arc::new(homeassistant::Client::new(
            config.homeassistant_url.clone(),
            config.homeassistant_token.clone(),
            config.request_timeout.into(),
        )?);

        let platform = Arc::new(services::HomeAssistantPlatform::new(
            Arc::clone(&homeassistant),
            credentials,
        ));

        let reconciler = services::TelemetryReconciler::new(Arc::clone(&envoy), config.metering_mode);

        let telemetry_service = Arc::new(services::TelemetryBridgeBackgroundService::new(
            Arc::clone(&envoy),
            platform,
            reconciler,
            config.poll_interval.into(),
        ));

        Ok(Self {
            config,
            cloud_endpoints,
            envoy,
            homeassistant,
            telemetry_service,
        })
    }

    /// Returns a reference to the application config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the cloud endpoints used for authentication.
    pub fn cloud_endpoints(&self) -> &CloudEndpoints {
        &self.cloud_endpoints
    }

    /// Returns a reference to the telemetry service.
    pub fn telemetry_service(&self) -> Arc<services::TelemetryBridgeBackgroundService> {
        Arc::clone(&self.telemetry_service)
    }

    /// Returns a reference to the Envoy client.
    pub fn envoy_client(&self) -> Arc<envoy::Client> {
        Arc::clone(&self.envoy)
    }

    /// Returns a reference to the HomeAssistant client.
    pub fn homeassistant_client(&self) -> Arc<homeassistant::Client> {
        Arc::clone(&self.homeassistant)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::services::MeteringMode;
    use humantime::Duration;

    fn config(envoy_address: &str) -> Config {
        Config {
            app_log: "info".into(),
            app_log_style: "auto".into(),
            envoy_address: envoy_address.into(),
            envoy_serial: "122233445566".into(),
            enlighten_username: "owner@example.com".into(),
            enlighten_password: "secret".into(),
            enlighten_url: reqwest::Url::parse("http://localhost:9001").unwrap(),
            entrez_url: reqwest::Url::parse("http://localhost:9002").unwrap(),
            metering_mode: MeteringMode::ForceUnmetered,
            request_timeout: Duration::from(std::time::Duration::from_secs(1)),
            poll_interval: Duration::from(std::time::Duration::from_secs(10)),
            homeassistant_url: reqwest::Url::parse("http://localhost:2222").unwrap(),
            homeassistant_token: "token2".into(),
        }
    }

    #[tokio::test]
    async fn test_container_init() {
        let container = Container::new(config("192.168.1.20")).expect("cannot build container");

        assert_eq!(container.config().app_log, "info");
        assert_eq!(
            container.cloud_endpoints().login_url.as_str(),
            "http://localhost:9001/login/login.json"
        );
        assert!(Arc::ptr_eq(
            &container.envoy_client(),
            &container.envoy_client()
        ));
        assert!(Arc::ptr_eq(
            &container.homeassistant_client(),
            &container.homeassistant_client()
        ));
        assert!(Arc::ptr_eq(
            &container.telemetry_service(),
            &container.telemetry_service()
        ));
        assert_eq!(
            container.envoy_client().credentials().await,
            Credentials::new("owner@example.com", "secret")
        );
    }

    #[tokio::test]
    async fn test_container_without_envoy_address() {
        assert!(Container::new(config("")).is_err());
    }
}
