//! Host platform.
//! The reconciler never touches platform state directly: settings, readings
//! and availability all go through the `Platform` trait.
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use strum_macros::Display;

use crate::integration::envoy::Credentials;
use crate::integration::homeassistant::{self, PowerSensor};

/// Readings surfaced to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Capability {
    /// Energy produced today (kWh).
    #[strum(serialize = "meter_power")]
    MeterPower,
    /// Instantaneous production (W).
    #[strum(serialize = "measure_power")]
    MeasurePower,
    /// Self-consumption (W).
    #[strum(serialize = "measure_power.consumption")]
    ConsumptionPower,
    /// Net grid exchange (W), negative when exporting.
    #[strum(serialize = "measure_power.grid")]
    GridPower,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Credentials currently configured for the device.
    async fn settings(&self) -> Credentials;
    async fn set_capability_value(&self, capability: Capability, value: f64) -> anyhow::Result<()>;
    async fn set_available(&self) -> anyhow::Result<()>;
    async fn set_unavailable(&self, message: &str) -> anyhow::Result<()>;
}

/// Home Assistant as the host platform.
pub struct HomeAssistantPlatform {
    homeassistant: Arc<homeassistant::Client>,
    settings: Credentials,
}

impl HomeAssistantPlatform {
    pub fn new(homeassistant: Arc<homeassistant::Client>, settings: Credentials) -> Self {
        HomeAssistantPlatform {
            homeassistant,
            settings,
        }
    }

    fn today_midnight() -> DateTime<Local> {
        Local::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
            .unwrap_or_else(Local::now)
    }
}

#[async_trait]
impl Platform for HomeAssistantPlatform {
    async fn settings(&self) -> Credentials {
        self.settings.clone()
    }

    async fn set_capability_value(&self, capability: Capability, value: f64) -> anyhow::Result<()> {
        match capability {
            Capability::MeterPower => {
                self.homeassistant
                    .set_solar_energy(value, &Self::today_midnight())
                    .await?
            }
            Capability::MeasurePower => {
                self.homeassistant
                    .set_power(PowerSensor::Production, value)
                    .await?
            }
            Capability::ConsumptionPower => {
                self.homeassistant
                    .set_power(PowerSensor::Consumption, value)
                    .await?
            }
            Capability::GridPower => self.homeassistant.set_power(PowerSensor::Grid, value).await?,
        }
        Ok(())
    }

    async fn set_available(&self) -> anyhow::Result<()> {
        self.homeassistant.set_gateway_status(None).await?;
        Ok(())
    }

    async fn set_unavailable(&self, message: &str) -> anyhow::Result<()> {
        self.homeassistant.set_gateway_status(Some(message)).await?;
        Ok(())
    }
}
