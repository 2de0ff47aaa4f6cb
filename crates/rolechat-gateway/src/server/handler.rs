//! WebSocket handler
//!
//! Handles WebSocket connections and frame processing.

use crate::connection::Connection;
use crate::handlers::{HandlerError, MessageDispatcher};
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use rolechat_service::PresenceService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

/// Channel buffer size for outgoing frames
const MESSAGE_BUFFER_SIZE: usize = 100;

/// How long the send task gets to flush and close after the session ends
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let session_id = Connection::new_session_id();
    let (tx, mut rx) = mpsc::channel::<GatewayMessage>(MESSAGE_BUFFER_SIZE);
    let (close_tx, mut close_rx) = oneshot::channel::<Option<CloseCode>>();

    let connection = state
        .connection_manager()
        .add_connection(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let hello = GatewayMessage::hello(HelloPayload::with_interval(
        state.realtime().heartbeat_interval(),
    ));
    if let Ok(json) = hello.to_json() {
        if ws_sink.send(Message::Text(json)).await.is_err() {
            tracing::warn!(session_id = %session_id, "Failed to send hello");
            cleanup_connection(&state, &session_id, &connection).await;
            return;
        }
    }

    // Reads frames until the client leaves or a frame forces a close
    let state_recv = state.clone();
    let session_id_recv = session_id.clone();
    let connection_recv = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) =
                        handle_text_message(&state_recv, &connection_recv, &text).await
                    {
                        if close_code.is_protocol_violation() {
                            tracing::info!(
                                session_id = %session_id_recv,
                                close_code = %close_code,
                                "Closing connection after protocol violation"
                            );
                        } else {
                            tracing::debug!(
                                session_id = %session_id_recv,
                                close_code = %close_code,
                                "Closing connection"
                            );
                        }
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(session_id = %session_id_recv, "Binary frames not supported");
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id_recv, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id_recv, error = %e, "WebSocket error");
                    return None;
                }
            }
        }
        None
    });

    // Writes queued frames until the session ends, then flushes what is
    // queued and sends the close frame. The outbox can run dry before the
    // close signal arrives, so the signal is always awaited.
    let session_id_send = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        let close = loop {
            tokio::select! {
                biased;
                close = &mut close_rx => break close.ok().flatten(),
                msg = rx.recv() => match msg {
                    Some(msg) => {
                        if write_frame(&mut ws_sink, &msg).await.is_err() {
                            tracing::warn!(session_id = %session_id_send, "Failed to write frame");
                            return;
                        }
                    }
                    None => break (&mut close_rx).await.ok().flatten(),
                },
            }
        };

        while let Ok(msg) = rx.try_recv() {
            if write_frame(&mut ws_sink, &msg).await.is_err() {
                return;
            }
        }
        let frame = close.map(|code| {
            let (code, reason) = GatewayMessage::close_frame(code);
            CloseFrame { code, reason: reason.into() }
        });
        let _ = ws_sink.send(Message::Close(frame)).await;
        let _ = ws_sink.close().await;
    });

    // Closes sessions whose heartbeats stop
    let session_id_hb = session_id.clone();
    let connection_hb = connection.clone();
    let check_every = state.realtime().heartbeat_interval() / 2;
    let timeout = state.realtime().heartbeat_timeout();
    let mut heartbeat_task = tokio::spawn(async move {
        let mut check_interval = interval(check_every);
        loop {
            check_interval.tick().await;
            let silent_for = connection_hb.silent_for();
            if silent_for > timeout {
                tracing::warn!(
                    session_id = %session_id_hb,
                    silent_ms = silent_for.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                return Some(CloseCode::SessionTimeout);
            }
        }
    });

    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        result = &mut heartbeat_task => result.ok().flatten(),
        _ = &mut send_task => None,
    };
    recv_task.abort();
    heartbeat_task.abort();

    cleanup_connection(&state, &session_id, &connection).await;

    let _ = close_tx.send(close_code);
    drop(connection);
    if !send_task.is_finished() && tokio::time::timeout(CLOSE_GRACE, send_task).await.is_err() {
        tracing::debug!(session_id = %session_id, "Send task did not finish in time");
    }
}

async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &GatewayMessage,
) -> Result<(), axum::Error> {
    match msg.to_json() {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode frame");
            Ok(())
        }
    }
}

/// Handle a text frame from the client. `Err` carries the code to close with.
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), CloseCode> {
    let message = match GatewayMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(
                session_id = %connection.session_id(),
                error = %e,
                "Failed to parse frame"
            );
            return Err(CloseCode::DecodeError);
        }
    };

    tracing::trace!(
        session_id = %connection.session_id(),
        op = %message.op,
        "Received frame"
    );

    let op = message.op;
    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(close_code),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::debug!(
                session_id = %connection.session_id(),
                op = %op,
                error = %e,
                "Handler error"
            );
            match e.to_close_code() {
                Some(close_code) => {
                    if matches!(e, HandlerError::AuthenticationFailed(_)) {
                        let _ = connection
                            .send(GatewayMessage::invalid_session(e.into_response()))
                            .await;
                    }
                    Err(close_code)
                }
                None => {
                    connection
                        .send(GatewayMessage::error(op, e.into_response()))
                        .await
                        .map_err(|_| CloseCode::UnknownError)
                }
            }
        }
    }
}

/// Drop the connection and, if it was the user's last one, mark them offline
async fn cleanup_connection(state: &GatewayState, session_id: &str, connection: &Arc<Connection>) {
    tracing::info!(session_id = %session_id, "Cleaning up connection");

    connection.mark_closed();

    let Some(departure) = state.connection_manager().remove_connection(session_id) else {
        return;
    };
    let user_id = departure.identity.id;

    let last_connection = match state.registry() {
        Some(registry) => match registry.unregister(user_id, session_id).await {
            Ok(remaining) => remaining == 0,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to unregister connection");
                departure.remaining_local == 0
            }
        },
        None => departure.remaining_local == 0,
    };

    if last_connection {
        match PresenceService::new(state.service_context())
            .set_offline(user_id)
            .await
        {
            Ok(_) => tracing::debug!(user_id = %user_id, "User presence set to offline"),
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Failed to set user offline"),
        }
    }
}
