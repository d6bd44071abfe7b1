// client.rs - RADIUS client: request construction, retransmission, reply validation
//
// Mirrors the teacher's `server.rs` socket-handling shape (tokio UDP,
// `Duration`-based timeouts, structured logging around each packet) for
// the other side of the wire: sending a request and waiting for a
// matching reply instead of accepting one.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::dictionary::Dictionary;
use crate::error::{AuthError, RadiusError, TimeoutError};
use crate::host::Host;
use crate::packet::{Packet, PacketCode};

/// Retransmission policy for a single client request (spec's retry model).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

/// A RADIUS client bound to one local UDP socket, capable of exchanging
/// requests with any `Host` whose address it's given.
pub struct Client {
    socket: UdpSocket,
    retry: RetryPolicy,
}

impl Client {
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, RadiusError> {
        let socket = UdpSocket::bind(local_addr).await?;
        Ok(Self {
            socket,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build an empty Access-Request addressed to `host`, identifier
    /// freshly allocated from the host's counter, authenticator left
    /// unset (random authenticator is filled in during `encode`).
    pub fn create_auth_packet(&self, host: &Host) -> Packet {
        self.create_packet(host, PacketCode::AccessRequest)
    }

    pub fn create_acct_packet(&self, host: &Host) -> Packet {
        self.create_packet(host, PacketCode::AccountingRequest)
    }

    pub fn create_coa_packet(&self, host: &Host) -> Packet {
        self.create_packet(host, PacketCode::CoaRequest)
    }

    fn create_packet(&self, host: &Host, code: PacketCode) -> Packet {
        Packet::new(
            code,
            host.next_identifier(),
            host.secret.clone(),
            host.dictionary.clone(),
        )
    }

    /// Send `request` to `host` on the port matching its packet code,
    /// retransmitting on timeout up to the retry policy, and return the
    /// first reply that validates (matching identifier, source address,
    /// and Response Authenticator).
    pub async fn send(&mut self, request: &mut Packet, host: &Host) -> Result<Packet, RadiusError> {
        let port = match request.code {
            PacketCode::AccessRequest | PacketCode::StatusServer => host.ports.auth,
            PacketCode::AccountingRequest => host.ports.acct,
            PacketCode::CoaRequest | PacketCode::DisconnectRequest => host.ports.coa,
            other => {
                return Err(RadiusError::Decode(crate::error::DecodeError::UnknownCode(
                    other.as_u8(),
                )))
            }
        };
        let dest = SocketAddr::new(host.address, port);
        let encoded = request.encode()?;
        let request_authenticator = request.authenticator;

        for attempt in 0..self.retry.max_retries {
            self.socket.send_to(&encoded, dest).await?;
            debug!(?dest, attempt, code = ?request.code, "sent RADIUS request");

            let mut buf = [0u8; crate::packet::MAX_PACKET_LEN];
            let recv = tokio::time::timeout(self.retry.timeout, self.socket.recv_from(&mut buf)).await;
            let (n, src) = match recv {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(RadiusError::Io(e)),
                Err(_) => {
                    warn!(?dest, attempt, "RADIUS request timed out, retrying");
                    continue;
                }
            };
            if src != dest {
                warn!(?src, ?dest, "reply from unexpected source, ignoring");
                continue;
            }
            match validate_reply(
                &buf[..n],
                request.identifier,
                &host.secret,
                host.dictionary.clone(),
                &request_authenticator,
            ) {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    warn!(error = %e, "discarding invalid RADIUS reply, retrying");
                    continue;
                }
            }
        }
        Err(RadiusError::Timeout(TimeoutError {
            retries: self.retry.max_retries,
            timeout: self.retry.timeout,
        }))
    }

}

fn validate_reply(
    data: &[u8],
    expected_identifier: u8,
    secret: &[u8],
    dict: Arc<Dictionary>,
    request_authenticator: &[u8; 16],
) -> Result<Packet, RadiusError> {
    let reply = Packet::decode(data, secret.to_vec(), dict)?;
    if reply.identifier != expected_identifier {
        return Err(RadiusError::Auth(AuthError::WrongIdentifier));
    }
    if !reply.verify_response_authenticator(data, request_authenticator) {
        return Err(RadiusError::Auth(AuthError::AuthenticatorMismatch));
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr_type::Value;
    use crate::dictionary::Dictionary;
    use std::net::{IpAddr, Ipv4Addr};

    fn dict() -> Arc<Dictionary> {
        Arc::new(Dictionary::base())
    }

    #[tokio::test]
    async fn retry_policy_exhausts_and_reports_timeout() {
        let client = Client::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let mut client = client.with_retry_policy(RetryPolicy {
            timeout: Duration::from_millis(20),
            max_retries: 1,
        });
        let host = Host::new(
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            b"secret".to_vec(),
            dict(),
        )
        .with_ports(crate::host::HostPorts {
            auth: 1, // nothing listens here
            acct: 1,
            coa: 1,
        });
        let mut req = client.create_auth_packet(&host);
        req.push("User-Name", Value::String(b"nobody".to_vec())).unwrap();
        let result = client.send(&mut req, &host).await;
        assert!(matches!(result, Err(RadiusError::Timeout(_))));
    }

    #[tokio::test]
    async fn round_trip_against_loopback_echo_responder() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let responder_addr = responder.local_addr().unwrap();
        let secret = b"sharedsecret".to_vec();
        let d = dict();

        let server_task = {
            let secret = secret.clone();
            let d = d.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let (n, src) = responder.recv_from(&mut buf).await.unwrap();
                let request = Packet::decode(&buf[..n], secret.clone(), d.clone()).unwrap();
                let mut response = request.create_response(PacketCode::AccessAccept);
                response.push("Reply-Message", Value::Text("ok".into())).unwrap();
                let encoded = response.encode().unwrap();
                responder.send_to(&encoded, src).await.unwrap();
            })
        };

        let client = Client::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let mut client = client.with_retry_policy(RetryPolicy {
            timeout: Duration::from_secs(2),
            max_retries: 1,
        });
        let host = Host::new(responder_addr.ip(), secret, d).with_ports(crate::host::HostPorts {
            auth: responder_addr.port(),
            acct: responder_addr.port(),
            coa: responder_addr.port(),
        });
        let mut req = client.create_auth_packet(&host);
        req.push("User-Name", Value::String(b"alice".to_vec())).unwrap();

        let reply = client.send(&mut req, &host).await.unwrap();
        assert_eq!(reply.code, PacketCode::AccessAccept);
        server_task.await.unwrap();
    }
}
