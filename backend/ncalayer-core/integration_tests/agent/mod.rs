//! Test helpers: a scripted stand-in for the signing agent.
//!
//! This module provides:
//! - A WebSocket server on an ephemeral loopback port that greets every
//!   connection and answers requests through a responder closure
//! - Canned frames in both response shapes
//! - Responders for plain NCALayer and for KAZTOKEN mobile/desktop

use ncalayer_core::ClientConfig;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub const GREETING: &str = r#"{"result":{"version":"1.3.2"}}"#;

pub const PROBE_METHOD: &str = "kz.digiflow.mobile.extensions.getVersion";
pub const SIGN_METHOD: &str = "kz.gov.pki.knca.basics.sign";

/// First thing the agent does after the WebSocket upgrade.
#[derive(Clone)]
pub enum Greeting {
    Frame(String),
    Close,
}

/// What the agent does with one request.
pub enum Reply {
    Frame(String),
    Frames(Vec<String>),
    /// Send the frame after a pause, as a user typing a PIN would.
    Delayed(Duration, String),
    Silent,
    Close,
}

type Responder = Box<dyn FnMut(&Value) -> Reply + Send>;

pub struct MockAgent {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
    connections: Arc<AtomicUsize>,
    _server: JoinHandle<()>,
}

impl MockAgent {
    pub async fn start(
        greeting: Greeting,
        responder: impl FnMut(&Value) -> Reply + Send + 'static,
    ) -> MockAgent {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock agent");
        let port = listener
            .local_addr()
            .expect("Failed to read mock agent address")
            .port();

        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let responder: Arc<Mutex<Responder>> = Arc::new(Mutex::new(Box::new(responder)));

        let server = {
            let received = Arc::clone(&received);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(
                        stream,
                        greeting.clone(),
                        Arc::clone(&responder),
                        Arc::clone(&received),
                    ));
                }
            })
        };

        MockAgent {
            url: format!("ws://127.0.0.1:{port}"),
            received,
            connections,
            _server: server,
        }
    }

    /// Plain NCALayer: rejects the extension probe, echoes `sign` requests.
    pub async fn plain() -> MockAgent {
        Self::start(Greeting::Frame(GREETING.to_string()), plain_ncalayer).await
    }

    /// KAZTOKEN mobile/desktop: answers the extension probe, echoes `sign` requests.
    pub async fn kaztoken() -> MockAgent {
        Self::start(Greeting::Frame(GREETING.to_string()), kaztoken_agent).await
    }

    /// Every request received so far, parsed.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().expect("received lock").clone()
    }

    /// `module.method` of every request received so far.
    pub fn methods(&self) -> Vec<String> {
        self.received().iter().map(method_of).collect()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Config pointing at this agent with the HTTP API switched off.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            ncalayer_url: self.url.clone(),
            allow_kmd_http_api: false,
            ..ClientConfig::default()
        }
    }

    /// Config pointing at this agent and at an HTTP API mock.
    pub fn config_with_sidecar(&self, sidecar_uri: &str) -> ClientConfig {
        ClientConfig {
            ncalayer_url: self.url.clone(),
            kmd_http_api_url: format!("{sidecar_uri}/"),
            allow_kmd_http_api: true,
            sidecar_probe_timeout_ms: 1000,
            ..ClientConfig::default()
        }
    }
}

async fn serve(
    stream: TcpStream,
    greeting: Greeting,
    responder: Arc<Mutex<Responder>>,
    received: Arc<Mutex<Vec<Value>>>,
) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    match greeting {
        Greeting::Frame(text) => {
            if ws.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        Greeting::Close => {
            let _ = ws.close(None).await;
            return;
        }
    }

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let request: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
        received.lock().expect("received lock").push(request.clone());

        let reply = {
            let mut responder = responder.lock().expect("responder lock");
            (*responder)(&request)
        };

        match reply {
            Reply::Frame(frame) => {
                if ws.send(Message::Text(frame.into())).await.is_err() {
                    return;
                }
            }
            Reply::Frames(frames) => {
                for frame in frames {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
            }
            Reply::Delayed(pause, frame) => {
                tokio::time::sleep(pause).await;
                if ws.send(Message::Text(frame.into())).await.is_err() {
                    return;
                }
            }
            Reply::Silent => {}
            Reply::Close => {
                let _ = ws.close(None).await;
                return;
            }
        }
    }
}

pub fn method_of(request: &Value) -> String {
    format!(
        "{}.{}",
        request["module"].as_str().unwrap_or_default(),
        request["method"].as_str().unwrap_or_default()
    )
}

// ============================================
// FRAMES
// ============================================

pub fn wrapped_result(result: Value) -> String {
    json!({"status": true, "code": "200", "body": {"result": result}}).to_string()
}

pub fn wrapped_cancelled() -> String {
    json!({"status": true, "code": "200", "body": {}}).to_string()
}

pub fn wrapped_error(code: &str, message: &str, details: Option<&str>) -> String {
    json!({"status": false, "code": code, "message": message, "details": details}).to_string()
}

pub fn flat_error(code: &str, message: &str) -> String {
    json!({"code": code, "message": message}).to_string()
}

pub fn flat_result(response_object: Value) -> String {
    json!({"code": "200", "responseObject": response_object}).to_string()
}

/// Fake signature per document: `sig:<data>`, keeping the request's shape.
pub fn echo_signatures(data: &Value) -> Value {
    match data {
        Value::String(document) => json!(format!("sig:{document}")),
        Value::Array(documents) => Value::Array(documents.iter().map(echo_signatures).collect()),
        other => other.clone(),
    }
}

// ============================================
// RESPONDERS
// ============================================

pub fn plain_ncalayer(request: &Value) -> Reply {
    match method_of(request).as_str() {
        PROBE_METHOD => Reply::Frame(flat_error("500", "Module not found")),
        SIGN_METHOD => Reply::Frame(wrapped_result(echo_signatures(&request["args"]["data"]))),
        _ => Reply::Frame(flat_error("404", "Unknown method")),
    }
}

pub fn kaztoken_agent(request: &Value) -> Reply {
    match method_of(request).as_str() {
        PROBE_METHOD => Reply::Frame(flat_result(json!({"version": "2.1.0"}))),
        _ => plain_ncalayer(request),
    }
}
