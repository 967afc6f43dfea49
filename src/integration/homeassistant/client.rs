//! Home Assistant Client.
//! This client is the higher level API client for Home Assistant.
use chrono::{DateTime, TimeZone};
use reqwest::Url;
use std::time::Duration;
use strum_macros::Display;

use super::Result;
use super::http_client::HttpClient;
use super::schemas::StateCreateOrUpdate;

static ENERGY_ENTITY: &str = "sensor.solar_energy";
static STATUS_ENTITY: &str = "sensor.envoy_status";

/// Power sensors published to Home Assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PowerSensor {
    #[strum(serialize = "sensor.solar_power")]
    Production,
    #[strum(serialize = "sensor.solar_consumption_power")]
    Consumption,
    #[strum(serialize = "sensor.solar_grid_power")]
    Grid,
}

impl PowerSensor {
    fn friendly_name(self) -> &'static str {
        match self {
            PowerSensor::Production => "Solar Power",
            PowerSensor::Consumption => "Solar Consumption Power",
            PowerSensor::Grid => "Solar Grid Power",
        }
    }
}

pub struct Client {
    http: HttpClient,
}

impl Client {
    /// Creates a new instance of `Client`.
    pub fn new(url: Url, token: String, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(url, token, timeout)?;
        Ok(Client { http })
    }

    /// Set the solar energy produced since `last_reset`, in kilowatt-hours (kWh).
    pub async fn set_solar_energy<Tz: TimeZone>(
        &self,
        energy_kwh: f64,
        last_reset: &DateTime<Tz>,
    ) -> Result<()> {
        let state = Self::create_solar_energy_state(energy_kwh, last_reset);
        self.http.set_state(ENERGY_ENTITY, &state).await
    }

    /// Set a power sensor, in watts (W).
    pub async fn set_power(&self, sensor: PowerSensor, power: f64) -> Result<()> {
        let state = Self::create_power_state(sensor, power);
        self.http.set_state(&sensor.to_string(), &state).await
    }

    /// Set the gateway availability, with the failure message when unavailable.
    pub async fn set_gateway_status(&self, error: Option<&str>) -> Result<()> {
        let state = Self::create_gateway_status_state(error);
        self.http.set_state(STATUS_ENTITY, &state).await
    }

    fn create_power_state(sensor: PowerSensor, power: f64) -> StateCreateOrUpdate {
        StateCreateOrUpdate {
            state: power.to_string(),
            attributes: Some(
                [
                    ("unit_of_measurement".to_string(), "W".to_string()),
                    ("friendly_name".to_string(), sensor.friendly_name().to_string()),
                    ("device_class".to_string(), "power".to_string()),
                    ("state_class".to_string(), "measurement".to_string()),
                ]
                .into_iter()
                .collect(),
            ),
        }
    }

    fn create_solar_energy_state<Tz: TimeZone>(
        energy_kwh: f64,
        last_reset: &DateTime<Tz>,
    ) -> StateCreateOrUpdate {
        StateCreateOrUpdate {
            state: energy_kwh.to_string(),
            attributes: Some(
                [
                    ("unit_of_measurement".to_string(), "kWh".to_string()),
                    ("friendly_name".to_string(), "Solar Energy".to_string()),
                    ("device_class".to_string(), "energy".to_string()),
                    ("state_class".to_string(), "total_increasing".to_string()),
                    ("last_reset".to_string(), last_reset.to_rfc3339()),
                ]
                .into_iter()
                .collect(),
            ),
        }
    }

    fn create_gateway_status_state(error: Option<&str>) -> StateCreateOrUpdate {
        let mut attributes: std::collections::HashMap<String, String> =
            [("friendly_name".to_string(), "Envoy Status".to_string())]
                .into_iter()
                .collect();
        if let Some(error) = error {
            attributes.insert("error".to_string(), error.to_string());
        }
        StateCreateOrUpdate {
            state: if error.is_some() { "unavailable" } else { "available" }.to_string(),
            attributes: Some(attributes),
        }
    }
}
