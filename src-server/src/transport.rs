//! TCP transport: one JSON message per line in each direction

use std::sync::Arc;

use lane_sync::{ClientMessage, ServerMessage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::unbounded_channel;

use crate::service::LaneService;

/// Accept connections until the listener fails
pub async fn serve(listener: TcpListener, service: Arc<LaneService>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("connection from {}", peer);
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, service).await {
                log::warn!("connection {} ended: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, service: Arc<LaneService>) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let (tx, mut rx) = unbounded_channel::<ServerMessage>();
    let mut session = service.open_session(tx);

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let mut line = match serde_json::to_string(&msg) {
                Ok(line) => line,
                Err(e) => {
                    log::error!("failed to encode {:?}: {}", msg, e);
                    continue;
                }
            };
            line.push('\n');
            if write.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ClientMessage>(&line) {
            Ok(msg) => session.handle(msg).await,
            Err(e) => {
                log::debug!("session {} sent bad line: {}", session.id(), e);
                session.protocol_error(format!("bad message: {}", e));
            }
        }
    }

    // the session holds the last sender once it has left every room
    drop(session);
    let _ = writer.await;
    Ok(())
}
