use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{Instrument, info};

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionSettings};

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let settings = ConnectionSettings::from_config(cfg)?;

    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.listen_addr))?;
    info!(
        "Listening on {}, serving {}",
        listener.local_addr()?,
        settings.document_root.path().display()
    );

    serve(listener, Arc::new(settings)).await
}

/// Accepts connections on an already-bound listener, one task each.
pub async fn serve(listener: TcpListener, settings: Arc<ConnectionSettings>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let settings = settings.clone();
        let span = tracing::info_span!("connection", %peer);
        tokio::spawn(
            async move {
                let mut conn = Connection::new(socket, settings);
                if let Err(e) = conn.run().await {
                    tracing::error!("Connection error from {}: {:#}", peer, e);
                }
            }
            .instrument(span),
        );
    }
}
