//! Telemetry Bridge Background Service.
//! Polls the gateway on a fixed period and forwards every result to the host platform.
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use super::platform::Platform;
use super::telemetry::{PollResult, TelemetryReconciler};
use crate::integration::envoy;

pub struct TelemetryBridgeBackgroundService {
    envoy: Arc<envoy::Client>,
    platform: Arc<dyn Platform>,
    reconciler: Mutex<TelemetryReconciler>,
    period: Duration,
}

impl TelemetryBridgeBackgroundService {
    /// Creates a new instance of `TelemetryBridgeBackgroundService`.
    pub fn new(
        envoy: Arc<envoy::Client>,
        platform: Arc<dyn Platform>,
        reconciler: TelemetryReconciler,
        period: Duration,
    ) -> Self {
        TelemetryBridgeBackgroundService {
            envoy,
            platform,
            reconciler: Mutex::new(reconciler),
            period,
        }
    }

    /// Run until the shutdown token is cancelled.
    /// Polls never overlap: the next tick waits for the current poll.
    pub async fn run(&self, shutdown_token: CancellationToken) {
        let mut interval = interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                _ = async {
                    interval.tick().await;
                    self.sync().await;
                } => {}
            }
        }
        log::info!("Telemetry bridge stopped");
    }

    /// Poll once and publish the result.
    pub async fn sync(&self) -> PollResult {
        self.refresh_credentials().await;
        let result = self.reconciler.lock().await.poll().await;
        self.publish(&result).await;
        result
    }

    async fn refresh_credentials(&self) {
        let settings = self.platform.settings().await;
        if settings != self.envoy.credentials().await {
            log::info!("Credentials changed, they will be used on the next authentication");
            self.envoy
                .set_credentials(&settings.username, &settings.password)
                .await;
        }
    }

    async fn publish(&self, result: &PollResult) {
        if !result.available {
            let message = result.error_message.as_deref().unwrap_or("unknown error");
            if let Err(e) = self.platform.set_unavailable(message).await {
                log::error!("Failed to mark the gateway unavailable: {e}");
            }
            return;
        }
        for (capability, value) in result.readings.capabilities() {
            match self.platform.set_capability_value(capability, value).await {
                Ok(()) => log::debug!("Updated {capability}: {value}"),
                Err(e) => log::error!("Failed to update {capability}: {e}"),
            }
        }
        if let Err(e) = self.platform.set_available().await {
            log::error!("Failed to mark the gateway available: {e}");
        }
    }
}
