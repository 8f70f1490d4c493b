//! Shared helpers for the integration tests
//!
//! Tests receive their pool from `#[sqlx::test]`, which creates a fresh
//! database, applies `migrations/` and loads the listed `fixtures/` scripts.
//! Fixture users all log in with [`PASSWORD`].

#![allow(dead_code)]

use axum_test::TestServer;
use futures_util::StreamExt;
use orbit_server::core::{AppState, Config, encode_jwt};
use orbit_server::mailer::{MailError, Mailer, OutgoingEmail};
use serde_json::Value;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub const JWT_SECRET: &str = "orbit-integration-test-secret";
pub const ADMIN_INVITE_TOKEN: &str = "orbit-admin-invite";
pub const PASSWORD: &str = "Password123";

pub const ALICE: i64 = 1; // admin
pub const BOB: i64 = 2;
pub const CHARLIE: i64 = 3;
pub const DANA: i64 = 4;

/// Mailer that keeps every email in memory, optionally failing every send
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("smtp down".to_string()));
        }
        self.sent.lock().expect("mailer lock").push(email);
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        max_connections: 1,
        admin_invite_token: Some(ADMIN_INVITE_TOKEN.to_string()),
        frontend_url: "http://orbit.test".to_string(),
        mail_from: "Orbit <no-reply@orbit.test>".to_string(),
        app_env: "test".to_string(),
        ws_idle_timeout_secs: 300,
    }
}

/// State wired to the given pool and mailer
pub fn create_test_state(pool: SqlitePool, mailer: Arc<RecordingMailer>) -> Arc<AppState> {
    Arc::new(AppState::new(pool, &test_config()).with_mailer(mailer))
}

pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = orbit_server::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Everything a test usually needs: server, state and the recording mailer
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
}

pub async fn spawn_app(pool: SqlitePool) -> TestApp {
    spawn_app_with_mailer(pool, RecordingMailer::default()).await
}

pub async fn spawn_app_with_mailer(pool: SqlitePool, mailer: RecordingMailer) -> TestApp {
    let mailer = Arc::new(mailer);
    let state = create_test_state(pool, mailer.clone());
    TestApp {
        server: create_test_server(state.clone()),
        state,
        mailer,
    }
}

/// Bearer header value for a fixture user
pub fn bearer(user_id: i64) -> String {
    let email = match user_id {
        ALICE => "alice@orbit.test",
        BOB => "bob@orbit.test",
        CHARLIE => "charlie@orbit.test",
        _ => "dana@orbit.test",
    };
    let token = encode_jwt(user_id, email, JWT_SECRET).expect("Failed to create JWT token");
    format!("Bearer {token}")
}

pub type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Router served on a real local port, needed by WebSocket clients
pub struct SocketApp {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
}

pub async fn spawn_socket_app(pool: SqlitePool, config: &Config) -> SocketApp {
    let mailer: Arc<RecordingMailer> = Arc::new(RecordingMailer::default());
    let state = Arc::new(AppState::new(pool, config).with_mailer(mailer));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    let app = orbit_server::create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    SocketApp { addr, state }
}

impl SocketApp {
    /// Open `/api/ws` as `user_id` and wait until the server registered the connection
    pub async fn connect(&self, user_id: i64) -> ClientSocket {
        let mut request = format!("ws://{}/api/ws", self.addr)
            .into_client_request()
            .expect("valid ws url");
        request.headers_mut().insert(
            AUTHORIZATION,
            bearer(user_id).parse().expect("valid header value"),
        );
        let (socket, _) = connect_async(request).await.expect("WebSocket handshake");
        self.wait_online(user_id, true).await;
        socket
    }

    /// Poll the user map until `user_id` is (or is no longer) online
    pub async fn wait_online(&self, user_id: i64, online: bool) {
        for _ in 0..200 {
            if self.state.users_online.is_user_online(&user_id) == online {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("user {user_id} online state never became {online}");
    }
}

/// Next JSON event pushed by the server, skipping control frames
pub async fn next_event(socket: &mut ClientSocket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("no event within 5s")
            .expect("socket closed")
            .expect("socket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).expect("JSON event"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

/// True once the server closes the socket within `within`
pub async fn closed_within(socket: &mut ClientSocket, within: Duration) -> bool {
    let closing = async {
        loop {
            match socket.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => continue,
            }
        }
    };
    tokio::time::timeout(within, closing).await.is_ok()
}
