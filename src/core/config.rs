//! Application configuration loaded from environment variables.
use envconfig::Envconfig;
use humantime::Duration;
use reqwest::Url;

use crate::services::MeteringMode;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Envconfig)]
pub struct Config {
    #[allow(dead_code)]
    #[envconfig(from = "APP_LOG", default = "error")]
    pub app_log: String,
    #[allow(dead_code)]
    #[envconfig(from = "APP_LOG_STYLE", default = "always")]
    pub app_log_style: String,
    #[envconfig(from = "ENVOY_ADDRESS")]
    pub envoy_address: String,
    #[envconfig(from = "ENVOY_SERIAL")]
    pub envoy_serial: String,
    #[envconfig(from = "ENLIGHTEN_USERNAME")]
    pub enlighten_username: String,
    #[envconfig(from = "ENLIGHTEN_PASSWORD")]
    pub enlighten_password: String,
    #[envconfig(from = "ENLIGHTEN_URL", default = "https://enlighten.enphaseenergy.com")]
    pub enlighten_url: Url,
    #[envconfig(from = "ENTREZ_URL", default = "https://entrez.enphaseenergy.com")]
    pub entrez_url: Url,
    #[envconfig(from = "METERING_MODE", default = "force-unmetered")]
    pub metering_mode: MeteringMode,
    #[envconfig(from = "REQUEST_TIMEOUT", default = "10s")]
    pub request_timeout: Duration,
    #[envconfig(from = "POLL_INTERVAL", default = "10s")]
    pub poll_interval: Duration,
    #[envconfig(from = "HOMEASSISTANT_URL")]
    pub homeassistant_url: Url,
    #[envconfig(from = "HOMEASSISTANT_TOKEN")]
    pub homeassistant_token: String,
}

pub fn configure_logger() {
    logger_builder().init();
}

/// Logger settings from `APP_LOG` and `APP_LOG_STYLE`, with the same defaults as `Config`.
fn logger_builder() -> env_logger::Builder {
    let env = env_logger::Env::default()
        .filter_or("APP_LOG", "error")
        .write_style_or("APP_LOG_STYLE", "always");
    env_logger::Builder::from_env(env)
}
