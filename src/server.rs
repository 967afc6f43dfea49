//! Server
use crate::core::config::{APP_NAME, APP_VERSION, Config};
use crate::core::container::Container;
use crate::integration::envoy;
use tokio_util::sync::CancellationToken;

/// Run the server with the given configuration and shutdown token
pub async fn server(config: Config, shutdown_token: CancellationToken) -> anyhow::Result<()> {
    let container = Container::new(config)?;
    log::info!("{APP_NAME} v{APP_VERSION} started");

    let credentials = container.envoy_client().credentials().await;
    if let Err(e) = envoy::Client::verify_credentials(
        container.cloud_endpoints(),
        &credentials,
        container.config().request_timeout.into(),
    )
    .await
    {
        log::warn!("Cloud credentials check failed, the gateway stays unavailable until fixed: {e}");
    }

    container.telemetry_service().run(shutdown_token).await;
    Ok(())
}
