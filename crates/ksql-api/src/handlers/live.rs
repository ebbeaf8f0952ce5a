use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::StreamExt;
use ksql_core::{ChannelAddress, DataQueryResponse, PublishStreamStatus};
use tracing::{debug, info, warn};

use crate::handlers::AppState;

/// Live channel over a websocket.
///
/// The client sends one `ChannelAddress` as a text message; every event of
/// the channel comes back as a `DataQueryResponse` text message. The socket
/// closes when the channel ends or the client goes away.
pub async fn live_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_channel(socket, state))
}

async fn serve_channel(mut socket: WebSocket, state: AppState) {
    let addr = match receive_address(&mut socket).await {
        Some(Ok(addr)) => addr,
        Some(Err(e)) => {
            warn!("Rejecting live socket: {}", e);
            let response = DataQueryResponse::error("", format!("Invalid channel address: {}", e));
            send(&mut socket, &response).await.ok();
            return;
        }
        None => return,
    };

    let path = addr.path.clone();
    info!("Live socket subscribed to {}", addr);
    let mut responses = state.hub.open(addr);

    loop {
        tokio::select! {
            next = responses.next() => match next {
                Some(response) => {
                    if let Err(e) = send(&mut socket, &response).await {
                        debug!("[{}] Client went away: {}", path, e);
                        break;
                    }
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                    let response = match state.hub.publish(&path).await {
                        status @ (PublishStreamStatus::PermissionDenied
                        | PublishStreamStatus::NotFound) => DataQueryResponse::error(
                            path.clone(),
                            format!("Publishing refused: {:?}", status),
                        ),
                        PublishStreamStatus::Ok => {
                            // Channels carry query results only; accepted messages are dropped.
                            debug!("[{}] Publish accepted, nothing to forward", path);
                            continue;
                        }
                    };
                    if send(&mut socket, &response).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {}
            },
        }
    }

    socket.send(Message::Close(None)).await.ok();
    info!("Live socket for {} closed", path);
}

async fn receive_address(socket: &mut WebSocket) -> Option<serde_json::Result<ChannelAddress>> {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => return Some(serde_json::from_str(text.as_str())),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

async fn send(socket: &mut WebSocket, response: &DataQueryResponse) -> anyhow::Result<()> {
    let text = serde_json::to_string(response)?;
    socket.send(Message::Text(text.into())).await?;
    Ok(())
}
