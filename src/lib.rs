//! envoybridge - Enphase Envoy telemetry for Home Assistant
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod core;
pub mod integration;
pub mod server;
pub mod services;
