use std::future;

use anyhow::Context;
use log::{info, warn};
use tokio::{net::TcpListener, signal};

use recon_server::{
    config::ServerConfig,
    service::{self, ServiceBuilder},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    let addr = config.addr();

    let state = ServiceBuilder::new(config)
        .build()
        .await
        .context("failed to build the service")?;

    info!("models ready: {:?}", state.models.ids());

    let list = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening at {addr}");

    axum::serve(list, service::create_router(state))
        .with_graceful_shutdown(async {
            match signal::ctrl_c().await {
                Ok(()) => info!("received SIGINT, wrapping up..."),
                Err(e) => {
                    warn!("can't listen for SIGINT: {e}");
                    future::pending::<()>().await;
                }
            }
        })
        .await?;

    Ok(())
}
