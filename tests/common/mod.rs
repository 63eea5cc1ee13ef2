//! In-process mock pods speaking the delimiter protocol

#![allow(dead_code)]

use discover::protocol::{Connection, DelimiterCodec};
use discover::Config;
use serde_json::Value;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const DELIM: &str = "<???DONE???---";
pub const SECRET: &str = "my_secure_password";

#[derive(Clone, Debug)]
pub enum Behavior {
    /// Answers every request with the given bodies
    Respond {
        cubes_reply: String,
        planets_reply: String,
    },
    /// Accepts the connection and reads, but never answers
    Silent,
    /// Accepts the secret, then never answers a request
    StallAfterAuth,
    /// Answers the cube request, then never answers the planet request
    StallAfterCubes { cubes_reply: String },
}

impl Behavior {
    pub fn respond(cubes_reply: &str, planets_reply: &str) -> Self {
        Behavior::Respond {
            cubes_reply: cubes_reply.to_string(),
            planets_reply: planets_reply.to_string(),
        }
    }
}

pub struct MockPod {
    pub port: u16,
    handle: JoinHandle<()>,
}

impl Drop for MockPod {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_pod(behavior: Behavior) -> MockPod {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    serve(listener, behavior)
}

/// Two pods on adjacent ports, for configs with `port_step = 1`
pub async fn spawn_pod_pair(first: Behavior, second: Behavior) -> (MockPod, MockPod) {
    for _ in 0..50 {
        let a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = a.local_addr().unwrap().port();
        let Some(next) = port.checked_add(1) else {
            continue;
        };
        if let Ok(b) = TcpListener::bind(("127.0.0.1", next)).await {
            return (serve(a, first), serve(b, second));
        }
    }
    panic!("could not bind two adjacent ports");
}

/// A port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn config(hosts: &[&str], start_port: u16, port_step: u16, num_pods: usize) -> Config {
    Config {
        hosts: hosts.iter().map(|h| h.to_string()).collect(),
        start_port,
        port_step,
        num_pods,
        auth_secret: SECRET.to_string(),
        delimiter: DELIM.to_string(),
        timeout_secs: 2,
        max_concurrency: None,
    }
}

fn serve(listener: TcpListener, behavior: Behavior) -> MockPod {
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle_connection(stream, behavior.clone()));
        }
    });
    MockPod { port, handle }
}

async fn handle_connection(stream: TcpStream, behavior: Behavior) {
    let codec = DelimiterCodec::new(DELIM).unwrap();
    let mut conn = Connection::new(stream, codec, Duration::from_secs(30));

    let (cubes_reply, planets_reply) = match behavior {
        Behavior::Respond {
            cubes_reply,
            planets_reply,
        } => (Some(cubes_reply), Some(planets_reply)),
        Behavior::StallAfterAuth => (None, None),
        Behavior::StallAfterCubes { cubes_reply } => (Some(cubes_reply), None),
        Behavior::Silent => {
            while let Ok(message) = conn.receive().await {
                if message.is_empty() {
                    break;
                }
            }
            return;
        }
    };

    let Ok(secret) = conn.receive().await else {
        return;
    };
    if secret != SECRET {
        let _ = conn.send("auth_failed").await;
        return;
    }
    if conn.send("auth_success").await.is_err() {
        return;
    }

    while let Ok(message) = conn.receive().await {
        if message.is_empty() {
            break;
        }
        let request: Value = serde_json::from_str(&message).unwrap_or(Value::Null);
        let reply = match request["type"].as_str() {
            Some("get_cube_list") => cubes_reply.as_deref(),
            Some("get_planets") => planets_reply.as_deref(),
            _ => Some("{\"error\":\"unknown request\"}"),
        };
        // No reply: hold the connection open until the client gives up
        let Some(reply) = reply else {
            continue;
        };
        if conn.send(reply).await.is_err() {
            break;
        }
    }
}
