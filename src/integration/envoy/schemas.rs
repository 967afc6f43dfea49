//! Envoy API Schemas
//! Payloads returned by the gateway endpoints. Required fields fail the parse
//! instead of flowing into the arithmetic as missing values.
use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Response of the cloud login endpoint. Only the session id is used.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub session_id: Option<String>,
}

/// Body of the cloud token-exchange request.
#[derive(Debug, Serialize, PartialEq)]
pub struct TokenRequest<'a> {
    pub session_id: &'a str,
    pub serial_num: &'a str,
    pub username: &'a str,
}

/// Response of `/production.json`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ProductionReport {
    pub production: Vec<ProductionEntry>,
}

/// One production source of the report (inverters, eim, ...).
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProductionEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Instantaneous power in watts (W).
    pub w_now: f64,
    /// Energy produced since midnight in watt-hours (Wh).
    #[serde(default)]
    pub wh_today: Option<f64>,
}

impl ProductionReport {
    /// The first production entry, which is the one the gateway reports for its inverters.
    pub fn first_production(&self) -> Result<&ProductionEntry> {
        self.production
            .first()
            .ok_or_else(|| Error::ParseError("production report has no production entry".into()))
    }
}

/// Element of `/ivp/meters`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MeterDescriptor {
    pub eid: u64,
    pub measurement_type: MeasurementType,
}

/// What a meter measures.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementType {
    Production,
    NetConsumption,
    #[serde(other)]
    Other,
}

/// Element of `/ivp/meters/readings`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MeterReading {
    pub eid: u64,
    /// Active power in watts (W), negative when exporting.
    pub active_power: f64,
}
