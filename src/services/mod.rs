//! Services
mod platform;
mod telemetry;
mod telemetry_bridge;

pub use platform::{Capability, HomeAssistantPlatform, Platform};
pub use telemetry::{
    MeteredPower, MeteringMode, PollResult, Readings, TelemetryReconciler, has_only_power_meters,
};
pub use telemetry_bridge::TelemetryBridgeBackgroundService;
