// client.rs - UDP client loop (component H)
//
// The teacher repo is server-only; there is no client counterpart to adapt, so this
// module is built in the teacher's idiom (tokio UDP, tracing spans, a Mutex-guarded
// socket) rather than grounded directly on a teacher file. A single in-flight request
// at a time, guarded by `tokio::sync::Mutex`, keeps retry/timeout bookkeeping simple and
// matches how the teacher already guards other shared sockets.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::codec;
use crate::dictionary::Dictionary;
use crate::error::{RadiusError, Result};
use crate::packet::Packet;

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT_MS: u64 = 3000;
const RECV_BUF_LEN: usize = codec::MAX_PACKET_LEN;

/// A RADIUS client bound to a single server address and shared secret.
pub struct RadiusClient {
    socket: Mutex<UdpSocket>,
    server_addr: SocketAddr,
    secret: Vec<u8>,
    retries: u32,
    timeout: Duration,
}

impl RadiusClient {
    /// Bind an ephemeral local UDP socket and connect it to `server_addr` so
    /// `send`/`recv` can be used directly instead of `send_to`/`recv_from`.
    pub async fn connect(server_addr: SocketAddr, secret: impl Into<Vec<u8>>) -> Result<Self> {
        let local_addr: SocketAddr = if server_addr.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(local_addr).await?;
        socket.connect(server_addr).await?;
        Ok(Self {
            socket: Mutex::new(socket),
            server_addr,
            secret: secret.into(),
            retries: DEFAULT_RETRIES,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `request` and wait for its matching response, retrying on timeout up to
    /// `self.retries` times. A response carrying a mismatched identifier (a stale reply
    /// to an earlier, already-abandoned attempt) is discarded and the wait continues
    /// rather than being treated as a failure.
    pub async fn communicate(&self, dict: &Dictionary, mut request: Packet) -> Result<Packet> {
        let wire = codec::encode_request(&mut request, &self.secret)?;
        let identifier = request.identifier();
        let request_authenticator = *request.authenticator();

        let guard = self.socket.lock().await;
        for attempt in 1..=self.retries {
            guard.send(&wire).await?;
            debug!(attempt, identifier, "sent RADIUS request");

            match tokio::time::timeout(
                self.timeout,
                Self::recv_matching(&guard, dict, identifier, &request_authenticator, &self.secret),
            )
            .await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(err)) => return Err(err),
                Err(_elapsed) => {
                    warn!(attempt, identifier, "RADIUS request timed out, retrying");
                    continue;
                }
            }
        }

        Err(RadiusError::CommunicationFailure {
            attempts: self.retries,
            target: self.server_addr.to_string(),
        })
    }

    async fn recv_matching(
        socket: &UdpSocket,
        dict: &Dictionary,
        identifier: u8,
        request_authenticator: &[u8; 16],
        secret: &[u8],
    ) -> Result<Packet> {
        let mut buf = vec![0u8; RECV_BUF_LEN];
        loop {
            let n = socket.recv(&mut buf).await?;
            match codec::decode_response(dict, &buf[..n], identifier, request_authenticator, secret) {
                Ok(packet) => return Ok(packet),
                Err(RadiusError::IdentifierMismatch { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::packet::PacketCode;
    use tokio::net::UdpSocket as ServerSocket;

    #[tokio::test]
    async fn communicate_returns_the_matching_response() {
        let dict = Dictionary::with_defaults();
        let secret = b"testsecret";
        let server = ServerSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let client = RadiusClient::connect(server_addr, secret.to_vec())
            .await
            .unwrap()
            .with_retries(2)
            .with_timeout(Duration::from_millis(500));

        let request = Packet::access_request(&dict, "alice", "hunter2").unwrap();
        let request_for_client = request.clone();

        let server_task = tokio::spawn(async move {
            let mut buf = vec![0u8; codec::MAX_PACKET_LEN];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            let decoded = codec::decode_request(&dict, &buf[..n], secret).unwrap();
            let mut response = decoded.create_response(PacketCode::AccessAccept);
            let wire = codec::encode_response(&mut response, decoded.authenticator(), secret).unwrap();
            server.send_to(&wire, peer).await.unwrap();
        });

        let dict_for_client = Dictionary::with_defaults();
        let response = client.communicate(&dict_for_client, request_for_client).await.unwrap();
        assert_eq!(response.code(), PacketCode::AccessAccept);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn communicate_fails_after_exhausting_retries() {
        let dict = Dictionary::with_defaults();
        let secret = b"testsecret";
        // Bind a socket nobody replies on.
        let silent = ServerSocket::bind("127.0.0.1:0").await.unwrap();
        let silent_addr = silent.local_addr().unwrap();

        let client = RadiusClient::connect(silent_addr, secret.to_vec())
            .await
            .unwrap()
            .with_retries(2)
            .with_timeout(Duration::from_millis(50));

        let request = Packet::access_request(&dict, "bob", "letmein").unwrap();
        let err = client.communicate(&dict, request).await.unwrap_err();
        assert!(matches!(err, RadiusError::CommunicationFailure { attempts: 2, .. }));
    }
}
