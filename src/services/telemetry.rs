//! Telemetry Reconciler.
//! Turns the gateway endpoints into the four readings published to the platform.
//! The inverter report and the metered readings are two disjoint sources;
//! the metering mode decides which one is authoritative on every poll.
use std::sync::Arc;
use strum_macros::{Display, EnumString};

use super::platform::Capability;
use crate::integration::envoy::{
    self, MeasurementType, MeterDescriptor, MeterReading, ProductionReport,
};

/// Which data source is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum MeteringMode {
    /// Metered when the gateway reports production and net-consumption meters only.
    Auto,
    /// Always use the inverter report.
    #[default]
    ForceUnmetered,
    /// Always use the meter readings.
    ForceMetered,
}

impl MeteringMode {
    /// Resolve the mode against what the gateway reports.
    pub fn is_metered(self, meters: &[MeterDescriptor]) -> bool {
        match self {
            MeteringMode::Auto => has_only_power_meters(meters),
            MeteringMode::ForceUnmetered => false,
            MeteringMode::ForceMetered => true,
        }
    }
}

/// True when at least one meter exists and every meter measures production or net consumption.
pub fn has_only_power_meters(meters: &[MeterDescriptor]) -> bool {
    !meters.is_empty()
        && meters.iter().all(|meter| {
            matches!(
                meter.measurement_type,
                MeasurementType::Production | MeasurementType::NetConsumption
            )
        })
}

/// Values published to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Readings {
    pub meter_power_kwh: f64,
    pub measure_power_w: f64,
    pub consumption_power_w: f64,
    pub grid_power_w: f64,
}

impl Readings {
    pub fn capabilities(&self) -> [(Capability, f64); 4] {
        [
            (Capability::MeterPower, self.meter_power_kwh),
            (Capability::MeasurePower, self.measure_power_w),
            (Capability::ConsumptionPower, self.consumption_power_w),
            (Capability::GridPower, self.grid_power_w),
        ]
    }
}

/// Outcome of one poll.
/// When `available` is false the readings are the last known ones and must not be trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    pub readings: Readings,
    pub available: bool,
    pub error_message: Option<String>,
}

/// Power measured by the production and net-consumption meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteredPower {
    pub production_w: f64,
    pub grid_w: f64,
}

impl MeteredPower {
    /// Power produced and consumed on site.
    /// Grid power is negative when exporting, so it is added.
    pub fn self_consumption_w(&self) -> f64 {
        self.production_w + self.grid_w
    }

    /// Look up the production and net-consumption meters in the readings by `eid`.
    pub fn join(meters: &[MeterDescriptor], readings: &[MeterReading]) -> envoy::Result<Self> {
        Ok(MeteredPower {
            production_w: active_power(meters, readings, MeasurementType::Production)?,
            grid_w: active_power(meters, readings, MeasurementType::NetConsumption)?,
        })
    }
}

fn active_power(
    meters: &[MeterDescriptor],
    readings: &[MeterReading],
    measurement_type: MeasurementType,
) -> envoy::Result<f64> {
    let eid = meters
        .iter()
        .find(|meter| meter.measurement_type == measurement_type)
        .map(|meter| meter.eid)
        .ok_or_else(|| envoy::Error::DataJoin(format!("no {measurement_type:?} meter")))?;
    readings
        .iter()
        .find(|reading| reading.eid == eid)
        .map(|reading| reading.active_power)
        .ok_or_else(|| envoy::Error::DataJoin(format!("no reading for meter {eid}")))
}

pub struct TelemetryReconciler {
    envoy: Arc<envoy::Client>,
    metering_mode: MeteringMode,
    readings: Readings,
}

impl TelemetryReconciler {
    /// Creates a new instance of `TelemetryReconciler`.
    pub fn new(envoy: Arc<envoy::Client>, metering_mode: MeteringMode) -> Self {
        TelemetryReconciler {
            envoy,
            metering_mode,
            readings: Readings::default(),
        }
    }

    /// Last successfully reconciled readings.
    pub fn readings(&self) -> Readings {
        self.readings
    }

    /// Poll the gateway once.
    /// Any gateway failure makes the result unavailable with the failure message.
    pub async fn poll(&mut self) -> PollResult {
        match self.reconcile().await {
            Ok(()) => PollResult {
                readings: self.readings,
                available: true,
                error_message: None,
            },
            Err(e) => {
                if e.is_auth_error() {
                    log::error!("Gateway authentication failed, check the cloud credentials: {e}");
                } else {
                    log::error!("Error polling the gateway: {e}");
                }
                PollResult {
                    readings: self.readings,
                    available: false,
                    error_message: Some(e.to_string()),
                }
            }
        }
    }

    async fn reconcile(&mut self) -> envoy::Result<()> {
        let meters = self.envoy.get_meters().await?;
        let metered = self.metering_mode.is_metered(&meters);
        log::debug!(
            "Metering mode {}: {} meter(s), metered: {metered}",
            self.metering_mode,
            meters.len()
        );

        let report = self.envoy.get_production_report().await?;
        let energy_kwh = Self::energy_today_kwh(&report)?;

        if !metered {
            self.readings = Self::unmetered_readings(&report, energy_kwh)?;
            return Ok(());
        }

        let meter_readings = self.envoy.get_meter_readings().await?;
        match MeteredPower::join(&meters, &meter_readings) {
            Ok(power) => self.readings = Self::metered_readings(power, energy_kwh),
            Err(e) => log::warn!("Keeping previous readings: {e}"),
        }
        Ok(())
    }

    fn energy_today_kwh(report: &ProductionReport) -> envoy::Result<f64> {
        let wh_today = report.first_production()?.wh_today.unwrap_or(0.0);
        Ok(wh_today / 1000.0)
    }

    fn unmetered_readings(report: &ProductionReport, energy_kwh: f64) -> envoy::Result<Readings> {
        Ok(Readings {
            meter_power_kwh: energy_kwh,
            measure_power_w: report.first_production()?.w_now,
            consumption_power_w: 0.0,
            grid_power_w: 0.0,
        })
    }

    fn metered_readings(power: MeteredPower, energy_kwh: f64) -> Readings {
        Readings {
            meter_power_kwh: energy_kwh,
            measure_power_w: power.production_w,
            consumption_power_w: power.self_consumption_w(),
            grid_power_w: power.grid_w,
        }
    }
}
