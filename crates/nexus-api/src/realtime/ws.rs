//! WebSocket sessions
//!
//! Clients connect to `/ws`, optionally with `?token=<jwt>`. A bad or
//! expired token downgrades the session to guest instead of failing the
//! handshake; only a token whose subject is missing or deactivated is
//! rejected. Guests can track products and hear broadcasts, while
//! user and role addressed frames need an authenticated session.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nexus_core::domain::UserRole;
use nexus_core::events::Address;
use nexus_core::DomainError;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default)]
struct Session {
    user_id: Option<Uuid>,
    role: Option<UserRole>,
    tracked: HashSet<Uuid>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let session = authenticate(&state, query.token.as_deref()).await?;
    Ok(ws.on_upgrade(move |socket| run_session(socket, state, session)))
}

/// Resolves the optional handshake token into a session identity.
///
/// Verification failures fall back to guest so stale clients keep their
/// product feeds. The one hard rejection is a token that verifies but
/// whose user is gone or deactivated.
async fn authenticate(state: &AppState, token: Option<&str>) -> Result<Session, ApiError> {
    let Some(token) = token else {
        return Ok(Session::default());
    };

    let claims = match state.jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!("Realtime client downgraded to guest: {}", err);
            return Ok(Session::default());
        }
    };
    let Ok(user_id) = claims.sub.parse::<Uuid>() else {
        return Ok(Session::default());
    };

    match state.user_repository.find_by_id(&user_id).await {
        Ok(Some(user)) if user.is_active => Ok(Session {
            user_id: Some(user.id),
            role: Some(user.role),
            tracked: HashSet::new(),
        }),
        Ok(_) => Err(DomainError::Forbidden("Authentication failed".into()).into()),
        Err(err) => {
            debug!("Realtime auth lookup failed, downgrading to guest: {}", err);
            Ok(Session::default())
        }
    }
}

async fn run_session(mut socket: WebSocket, state: AppState, mut session: Session) {
    let mut events = state.hub.subscribe();

    match session.user_id {
        Some(user_id) => info!("Realtime client connected as user {}", user_id),
        None => info!("Realtime client connected as guest"),
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_command(&mut session, &text) {
                            if socket.send(Message::Text(reply.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!("WebSocket error: {}", err);
                        break;
                    }
                }
            }
            frame = events.recv() => {
                match frame {
                    Ok(frame) => {
                        if !should_deliver(&session, &frame.address) {
                            continue;
                        }
                        match serde_json::to_string(&frame.event) {
                            Ok(body) => {
                                if socket.send(Message::Text(body.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => warn!("Failed to encode realtime event: {}", err),
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Realtime session lagged, {} frames dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    debug!("Realtime client disconnected");
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
enum ClientCommand {
    #[serde(rename = "track:product", rename_all = "camelCase")]
    TrackProduct { product_id: Uuid },
    #[serde(rename = "untrack:product", rename_all = "camelCase")]
    UntrackProduct { product_id: Uuid },
}

#[derive(Debug, Serialize)]
struct CommandReply {
    event: &'static str,
    payload: ProductRef,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductRef {
    product_id: Uuid,
}

/// Applies one client command. Unknown or malformed frames are ignored
/// so a misbehaving client cannot tear down its own session.
fn handle_command(session: &mut Session, text: &str) -> Option<String> {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(err) => {
            debug!("Ignoring malformed realtime command: {}", err);
            return None;
        }
    };

    let reply = match command {
        ClientCommand::TrackProduct { product_id } => {
            session.tracked.insert(product_id);
            CommandReply {
                event: "track:product:success",
                payload: ProductRef { product_id },
            }
        }
        ClientCommand::UntrackProduct { product_id } => {
            session.tracked.remove(&product_id);
            CommandReply {
                event: "untrack:product:success",
                payload: ProductRef { product_id },
            }
        }
    };

    serde_json::to_string(&reply).ok()
}

fn should_deliver(session: &Session, address: &Address) -> bool {
    match address {
        Address::Broadcast => true,
        Address::Product(id) => session.tracked.contains(id),
        Address::User(id) => session.user_id == Some(*id),
        Address::Role(role) => session.role == Some(*role),
    }
}
