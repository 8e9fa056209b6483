use crate::interface_adapters::protocol::{ClientMessage, GameDataDto, JoinedDto, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::types::{GameEvent, SessionMessage};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    SessionClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // The connection id doubles as the player id once the client joins.
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id);
    let _enter = span.enter();

    let mut ctx = ConnCtx::new(conn_id, state.input_tx.clone(), state.session_capacity);
    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    player_id: u64,
    input_tx: mpsc::Sender<GameEvent>,
    /// World loop -> this session. The sender half rides along on Join.
    session_tx: mpsc::Sender<SessionMessage>,
    session_rx: mpsc::Receiver<SessionMessage>,
    /// True between an accepted Join and elimination/disconnect.
    in_game: bool,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_input_full_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new(player_id: u64, input_tx: mpsc::Sender<GameEvent>, session_capacity: usize) -> Self {
        let (session_tx, session_rx) = mpsc::channel(session_capacity);
        let now = Instant::now() - LOG_THROTTLE;
        Self {
            player_id,
            input_tx,
            session_tx,
            session_rx,
            in_game: false,

            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,

            invalid_json: 0,

            last_input_full_log: now,
            last_invalid_input_log: now,

            close_frame: None,
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_NAME_LEN: usize = 32;
const DEFAULT_NAME: &str = "Blob";

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Trims, defaults and truncates a join name so a client can never inject an
/// empty or oversized display name.
fn sanitize_name(raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() {
        return DEFAULT_NAME.to_string();
    }
    name.chars().take(MAX_NAME_LEN).collect()
}

fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

// Shared fast-path send for per-frame events. Fatal only when the world loop
// is gone; a momentarily full channel just drops the event.
fn forward_event(
    event: GameEvent,
    input_tx: &mpsc::Sender<GameEvent>,
    last_input_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!("input channel full; dropping event");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        input_tx,
        session_tx,
        session_rx,
        in_game,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    input_tx,
                    session_tx,
                    in_game,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            session_msg = session_rx.recv() => {
                match session_msg {
                    Some(msg) => {
                        match forward_session_message(msg, socket, in_game, msgs_out, bytes_out).await {
                            Ok(LoopControl::Continue) => false,
                            Ok(LoopControl::Disconnect) => true,
                            Err(e) => {
                                fatal = Some(e);
                                true
                            }
                        }
                    }
                    // We hold a sender half ourselves, so this only happens
                    // when the world loop dropped its clone, i.e. shutdown.
                    None => {
                        warn!(player_id, "session channel closed; disconnecting");
                        fatal = Some(NetError::SessionClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            // Sending a Close message also closes the underlying socket; a
            // taken frame carries the policy close code to the client.
            if let Err(err) = socket
                .send(Message::Close(close_frame.take()))
                .await
                .map_err(NetError::Ws)
            {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(
        player_id,
        input_tx,
        *msgs_in,
        *msgs_out,
        *bytes_in,
        *bytes_out,
        *invalid_json,
    )
    .await
    {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    session_tx: &mpsc::Sender<SessionMessage>,
    in_game: &mut bool,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => {
                        if *in_game {
                            if should_log(last_invalid_input_log) {
                                warn!(player_id, "join while already in game; ignoring");
                            }
                            return Ok(LoopControl::Continue);
                        }
                        if !all_finite(&[payload.canvas_w, payload.canvas_h]) {
                            if should_log(last_invalid_input_log) {
                                warn!(player_id, "invalid canvas size on join; dropping");
                            }
                            return Ok(LoopControl::Continue);
                        }

                        // Join goes through the ordered event channel like
                        // everything else; the Joined reply arrives on the
                        // session channel once the world processes it.
                        input_tx
                            .send(GameEvent::Join {
                                player_id,
                                name: sanitize_name(&payload.name),
                                viewport_w: payload.canvas_w.max(0.0),
                                viewport_h: payload.canvas_h.max(0.0),
                                session: session_tx.clone(),
                            })
                            .await
                            .map_err(|_| NetError::InputClosed)?;
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::CanvasSize(size)) => {
                        if !*in_game || !all_finite(&[size.w, size.h]) {
                            if should_log(last_invalid_input_log) {
                                warn!(player_id, "invalid canvas size message; dropping");
                            }
                            return Ok(LoopControl::Continue);
                        }
                        forward_event(
                            GameEvent::Viewport {
                                player_id,
                                w: size.w.max(0.0),
                                h: size.h.max(0.0),
                            },
                            input_tx,
                            last_input_full_log,
                        )
                    }
                    Ok(ClientMessage::Position(pos)) => {
                        if !*in_game {
                            if should_log(last_invalid_input_log) {
                                warn!(player_id, "position before join; dropping");
                            }
                            return Ok(LoopControl::Continue);
                        }
                        if !all_finite(&[pos.x, pos.y, pos.vel_x, pos.vel_y]) {
                            if should_log(last_invalid_input_log) {
                                warn!(player_id, "non-finite position values; dropping");
                            }
                            return Ok(LoopControl::Continue);
                        }
                        forward_event(
                            GameEvent::Pose {
                                player_id,
                                x: pos.x,
                                y: pos.y,
                                vel_x: pos.vel_x,
                                vel_y: pos.vel_y,
                            },
                            input_tx,
                            last_input_full_log,
                        )
                    }
                    Ok(ClientMessage::Shoot { dir }) => {
                        if !*in_game || !dir.is_finite() {
                            if should_log(last_invalid_input_log) {
                                warn!(player_id, "invalid shoot message; dropping");
                            }
                            return Ok(LoopControl::Continue);
                        }
                        forward_event(
                            GameEvent::Shoot { player_id, dir },
                            input_tx,
                            last_input_full_log,
                        )
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_session_message(
    msg: SessionMessage,
    socket: &mut WebSocket,
    in_game: &mut bool,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> Result<LoopControl, NetError> {
    let wire = match msg {
        SessionMessage::Joined(info) => {
            *in_game = true;
            ServerMessage::Joined(JoinedDto::from(&info))
        }
        SessionMessage::Snapshot(snapshot) => ServerMessage::GameData(GameDataDto::from(&snapshot)),
        SessionMessage::Lost => {
            // Back to the lobby state; the client may send a fresh Join.
            *in_game = false;
            ServerMessage::Lost
        }
    };

    match send_message(socket, &wire).await {
        Ok(bytes) => {
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            Ok(LoopControl::Continue)
        }
        Err(err) => {
            warn!(error = ?err, "failed to send session message");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn disconnect_cleanup(
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
) -> Result<(), NetError> {
    // Leave goes out unconditionally: the world may have accepted a Join
    // whose reply this session never got to read, and removing an unknown
    // id is a no-op.
    input_tx
        .send(GameEvent::Leave { player_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        player_id,
        msgs_in, msgs_out, bytes_in, bytes_out, invalid_json, "connection stats"
    );
    info!(player_id, "client disconnected");
    Ok(())
}
