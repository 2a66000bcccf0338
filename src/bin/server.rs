use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use fruit_arena_server::config::ArenaSettings;
use fruit_arena_server::constants::CLIENT_QUEUE_CAPACITY;
use fruit_arena_server::engine::ArenaEngine;
use fruit_arena_server::rng::ArenaRng;
use fruit_arena_server::server_protocol::{parse_client_message, ParsedClientMessage};
use fruit_arena_server::server_utils::{normalize_drop_interval_ms, parse_port, parse_seed};
use fruit_arena_server::types::{ArenaEvent, ArenaState, MoveCommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;
type ClientRegistry = Arc<std::sync::Mutex<HashMap<String, ClientContext>>>;

struct ClientContext {
    tx: mpsc::Sender<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    engine: ArenaEngine,
    clients: ClientRegistry,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = parse_port(std::env::var("PORT").ok().as_deref());
    let settings = match ArenaSettings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "failed to load arena settings");
            std::process::exit(2);
        }
    };
    let rng = match parse_seed(std::env::var("ARENA_SEED").ok().as_deref()) {
        Some(seed) => ArenaRng::new(seed),
        None => ArenaRng::from_entropy(),
    };

    let clients: ClientRegistry = Arc::new(std::sync::Mutex::new(HashMap::new()));
    let mut engine = ArenaEngine::new(settings, rng);
    engine.subscribe(broadcast_sink(Arc::clone(&clients)));
    info!(
        width = settings.screen.width,
        height = settings.screen.height,
        "arena created"
    );

    let state = Arc::new(Mutex::new(ServerState { engine, clients }));
    if let Some(interval_ms) =
        normalize_drop_interval_ms(std::env::var("FRUIT_DROP_INTERVAL_MS").ok().as_deref())
    {
        start_fruit_drop_loop(Arc::clone(&state), interval_ms);
    } else {
        info!("fruit auto-drop disabled");
    }

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/state", get(state_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; set STATIC_DIR to serve a client");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %bind_addr, "failed to bind server socket");
            std::process::exit(1);
        }
    };

    info!(port, "listening");
    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "server runtime failed");
        std::process::exit(1);
    }
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }
    let candidates = [PathBuf::from("public"), PathBuf::from("../public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn state_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.engine.state())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let player_id = make_id("player");
    let (tx, mut rx) = mpsc::channel::<String>(CLIENT_QUEUE_CAPACITY);

    let clients = {
        let mut guard = state.lock().await;
        register_client(&guard.clients, &player_id, tx);
        guard.engine.add_player(&player_id, None, None);
        let setup = setup_message(&player_id, &guard.engine.state());
        send_to_client(
            &guard.clients,
            &player_id,
            &setup,
            QueuePolicy::DisconnectOnFull,
        );
        Arc::clone(&guard.clients)
    };
    info!(player_id = %player_id, "client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &player_id, raw.as_str()).await;
            }
            Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                Ok(text) => handle_client_message(&state, &player_id, &text).await,
                Err(_) => send_error(&clients, &player_id, "invalid utf8 message"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    unregister_client(&clients, &player_id);
    {
        let mut guard = state.lock().await;
        guard.engine.remove_player(&player_id);
    }
    info!(player_id = %player_id, "client disconnected");
    writer.abort();
}

async fn handle_client_message(state: &SharedState, player_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        let guard = state.lock().await;
        send_error(&guard.clients, player_id, "invalid message");
        return;
    };

    let mut guard = state.lock().await;
    match message {
        ParsedClientMessage::MovePlayer { key_pressed } => {
            let command = MoveCommand {
                player_id: player_id.to_string(),
                key_pressed,
            };
            if let Err(err) = guard.engine.move_player(command) {
                debug!(player_id, error = %err, "move ignored");
            }
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                &guard.clients,
                player_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
    }
}

fn start_fruit_drop_loop(state: SharedState, interval_ms: u64) {
    info!(interval_ms, "fruit auto-drop enabled");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            if let Some(fruit) = guard.engine.add_random_fruit() {
                debug!(fruit_id = %fruit.id, quantity = fruit.quantity, "fruit auto-dropped");
            }
        }
    });
}

fn broadcast_sink(clients: ClientRegistry) -> impl FnMut(&ArenaEvent) + Send + 'static {
    move |event: &ArenaEvent| match serde_json::to_string(event) {
        Ok(payload) => broadcast(&clients, &payload, QueuePolicy::DropOnFull),
        Err(err) => error!(error = %err, "failed to serialize arena event"),
    }
}

fn setup_message(player_id: &str, state: &ArenaState) -> Value {
    json!({
        "type": "setup",
        "playerId": player_id,
        "state": state,
    })
}

fn register_client(clients: &ClientRegistry, client_id: &str, tx: mpsc::Sender<String>) {
    if let Ok(mut guard) = clients.lock() {
        guard.insert(client_id.to_string(), ClientContext { tx });
    }
}

fn unregister_client(clients: &ClientRegistry, client_id: &str) {
    if let Ok(mut guard) = clients.lock() {
        guard.remove(client_id);
    }
}

fn send_error(clients: &ClientRegistry, client_id: &str, message: &str) {
    send_to_client(
        clients,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn send_to_client(clients: &ClientRegistry, client_id: &str, message: &Value, policy: QueuePolicy) {
    let Ok(mut guard) = clients.lock() else {
        return;
    };
    let send_failed = guard
        .get(client_id)
        .map(|client| client.tx.try_send(message.to_string()).is_err())
        .unwrap_or(false);
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        warn!(client_id, "client queue full; dropping connection");
        guard.remove(client_id);
    }
}

fn broadcast(clients: &ClientRegistry, payload: &str, policy: QueuePolicy) {
    let Ok(mut guard) = clients.lock() else {
        return;
    };
    let failed: Vec<String> = guard
        .iter()
        .filter(|(_, client)| client.tx.try_send(payload.to_string()).is_err())
        .map(|(client_id, _)| client_id.clone())
        .collect();
    if policy == QueuePolicy::DisconnectOnFull {
        for client_id in failed {
            warn!(client_id = %client_id, "client queue full; dropping connection");
            guard.remove(&client_id);
        }
    } else if !failed.is_empty() {
        debug!(dropped = failed.len(), "event dropped for slow clients");
    }
}

fn make_id(prefix: &str) -> String {
    format!("{prefix}_{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}
