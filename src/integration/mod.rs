//! Integrations with external systems.
pub mod envoy;
pub mod homeassistant;
