//! Single pod handshake
//!
//! One invocation drives one TCP connection through
//! connect -> authenticate -> cube list -> planet list and always produces a
//! `PodResult`. The first failing step ends the attempt; nothing is retried.

use crate::config::Config;
use crate::error::PodError;
use crate::protocol::{
    decode_cube_list, decode_planets, is_auth_success, Connection, DelimiterCodec, FrameCodec,
    Request,
};
use crate::{DiscoverError, Result};
use async_trait::async_trait;
use discover_common::{PlanetRecord, PodResult, PodTarget};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, instrument, warn};

/// Something that can scan one pod
#[async_trait]
pub trait PodScanner: Send + Sync {
    async fn scan(&self, target: PodTarget) -> PodResult;
}

#[derive(Debug, Clone)]
pub struct PodClient<C = DelimiterCodec> {
    auth_secret: String,
    codec: C,
    timeout: Duration,
}

impl PodClient<DelimiterCodec> {
    pub fn new(auth_secret: impl Into<String>, delimiter: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::with_codec(
            auth_secret,
            DelimiterCodec::new(delimiter)?,
            timeout,
        ))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.auth_secret.clone(),
            &config.delimiter,
            config.timeout(),
        )
    }
}

impl<C: FrameCodec> PodClient<C> {
    pub fn with_codec(auth_secret: impl Into<String>, codec: C, timeout: Duration) -> Self {
        Self {
            auth_secret: auth_secret.into(),
            codec,
            timeout,
        }
    }

    #[instrument(skip(self, target), fields(pod = %target))]
    pub async fn scan_pod(&self, target: &PodTarget) -> PodResult {
        match self.handshake(target).await {
            Ok((cubes, planets)) => {
                debug!(
                    cubes = cubes.len(),
                    planets = planets.len(),
                    "pod scan complete"
                );
                PodResult::success(target, cubes, planets)
            }
            Err(e) => {
                warn!(kind = ?e.kind(), "pod scan failed: {}", e);
                PodResult::failure(target, e.to_string())
            }
        }
    }

    async fn handshake(
        &self,
        target: &PodTarget,
    ) -> std::result::Result<(Vec<String>, Vec<PlanetRecord>), PodError> {
        let stream = self.connect(target).await?;
        let mut conn = Connection::new(stream, self.codec.clone(), self.timeout);

        conn.send(&self.auth_secret)
            .await
            .map_err(|e| step_failed(e, PodError::AuthSend))?;
        let reply = conn
            .receive()
            .await
            .map_err(|e| step_failed(e, PodError::BadPassword))?;
        if !is_auth_success(&reply) {
            return Err(PodError::BadPassword);
        }
        debug!("authenticated");

        let cubes = {
            let request = Request::GetCubeList
                .to_json()
                .map_err(|e| step_failed(e, PodError::CubeRequest))?;
            conn.send(&request)
                .await
                .map_err(|e| step_failed(e, PodError::CubeRequest))?;
            let raw = conn
                .receive()
                .await
                .map_err(|e| step_failed(e, PodError::CubeParse))?;
            decode_cube_list(&raw).map_err(|e| step_failed(e, PodError::CubeParse))?
        };

        let planets = {
            let request = Request::GetPlanets
                .to_json()
                .map_err(|e| step_failed(e, PodError::PlanetRequest))?;
            conn.send(&request)
                .await
                .map_err(|e| step_failed(e, PodError::PlanetRequest))?;
            let raw = conn
                .receive()
                .await
                .map_err(|e| step_failed(e, PodError::PlanetParse))?;
            decode_planets(&raw, target).map_err(|e| step_failed(e, PodError::PlanetParse))?
        };

        Ok((cubes, planets))
    }

    async fn connect(&self, target: &PodTarget) -> std::result::Result<TcpStream, PodError> {
        let addr = target.addr();
        match time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(PodError::Connect(format!("dial tcp {}: {}", addr, e))),
            Err(_) => Err(PodError::Connect(format!("dial tcp {}: i/o timeout", addr))),
        }
    }
}

#[async_trait]
impl<C: FrameCodec + Sync> PodScanner for PodClient<C> {
    async fn scan(&self, target: PodTarget) -> PodResult {
        self.scan_pod(&target).await
    }
}

/// Scan one pod with a delimiter-framed connection
pub async fn scan_pod(
    host: &str,
    port: u16,
    auth_secret: &str,
    delimiter: &str,
    timeout_secs: u64,
) -> PodResult {
    let target = PodTarget::new(host, port);
    match PodClient::new(auth_secret, delimiter, Duration::from_secs(timeout_secs)) {
        Ok(client) => client.scan_pod(&target).await,
        Err(e) => PodResult::failure(&target, e.to_string()),
    }
}

fn step_failed(cause: DiscoverError, step: PodError) -> PodError {
    debug!("{}: {}", step, cause);
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[tokio::test]
    async fn test_refused_connection_reports_transport_message() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = scan_pod("127.0.0.1", port, "pw", "\n", 1).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.starts_with(&format!("dial tcp 127.0.0.1:{}", port)));
    }

    #[tokio::test]
    async fn test_empty_delimiter_fails_without_connecting() {
        let result = scan_pod("127.0.0.1", 1, "pw", "", 1).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("delimiter"));
    }

    #[test]
    fn test_failure_labels() {
        assert_eq!(PodError::AuthSend.to_string(), "Auth failed");
        assert_eq!(PodError::BadPassword.to_string(), "Bad password");
        assert_eq!(PodError::CubeParse.to_string(), "Cube parse fail");
        assert_eq!(PodError::PlanetParse.to_string(), "Planet parse fail");
        assert_eq!(PodError::BadPassword.kind(), FailureKind::Auth);
        assert_eq!(PodError::PlanetParse.kind(), FailureKind::Decode);
        assert_eq!(
            PodError::Connect("dial tcp x:1: refused".into()).kind(),
            FailureKind::Transport
        );
    }
}
