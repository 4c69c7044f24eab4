use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::accept_async;
use tungstenite::Message;
use tracing::{info, warn};
use uuid::Uuid;

use crate::control::{AxisInput, PolicyAction};
use crate::error::{Result, ServerError};
use crate::physics::PhysicsWorld;
use crate::state::{ClientMessage, ServerMessage, SharedState};

pub async fn start_websocket_server(
    bind: String,
    state: Arc<Mutex<SharedState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
) -> Result<()> {
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|source| ServerError::Bind { addr: bind.clone(), source })?;

    info!("websocket listening on ws://{bind}");

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };

        tokio::spawn(handle_client(
            raw,
            Arc::clone(&state),
            Arc::clone(&physics),
            peer.to_string(),
        ));
    }
}

async fn handle_client(
    raw: TcpStream,
    state: Arc<Mutex<SharedState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
    peer: String,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%peer, error = %err, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing message channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Car + session
    // -------------------------------
    let car_id = Uuid::new_v4().to_string();
    {
        let mut phys = physics.lock().await;
        phys.spawn_car(&car_id);
        let mut game = state.lock().await;
        game.register_session(car_id.clone(), tx.clone());
    }

    info!(car = %car_id, %peer, "client connected");
    let welcome = ServerMessage::Welcome {
        car_id: car_id.clone(),
    };
    if let Some(json) = welcome.to_json() {
        let _ = tx.send(json);
    }

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else { continue };
        let Some(parsed) = ClientMessage::from_json(text) else { continue };

        match parsed {
            ClientMessage::Input { horizontal, vertical } => {
                state
                    .lock()
                    .await
                    .update_input(&car_id, AxisInput::new(horizontal, vertical));
            }
            ClientMessage::Action { action } => {
                state
                    .lock()
                    .await
                    .update_action(&car_id, PolicyAction::new(action));
            }
            ClientMessage::Reset => {
                physics.lock().await.reset_car(&car_id);
            }
            ClientMessage::Ping => {
                if let Some(json) = ServerMessage::Pong.to_json() {
                    let _ = tx.send(json);
                }
            }
        }
    }

    info!(car = %car_id, %peer, "client disconnected");
    let mut phys = physics.lock().await;
    let mut game = state.lock().await;
    game.remove_session(&car_id);
    phys.remove_car(&car_id);
}
