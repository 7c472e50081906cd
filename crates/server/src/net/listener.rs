use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpListener;

use super::ServerCtx;

/// Accept connections and spawn one handler task per client.
pub async fn run(ctx: ServerCtx, bind_addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);

    let next_conn_id = AtomicU64::new(1);
    loop {
        let (stream, addr) = listener.accept().await?;
        let conn_id = next_conn_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(conn_id, "Connection from {}", addr);

        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = super::connection::handle(stream, ctx, conn_id).await {
                tracing::warn!(conn_id, "Connection from {} closed: {}", addr, e);
            }
        });
    }
}
