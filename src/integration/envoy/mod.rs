//! Enphase Envoy Integration Module
//! The integration is done via the gateway HTTP JSON API, authenticated
//! through the Enlighten cloud.
mod client;
mod error;
mod http_client;
mod schemas;

pub use client::Client;
pub use error::{Error, Result};
pub use http_client::{CloudEndpoints, Credentials, Session};
pub use schemas::{
    MeasurementType, MeterDescriptor, MeterReading, ProductionEntry, ProductionReport,
};
