// server.rs - RADIUS server: socket binding, worker dispatch, graceful shutdown
//
// The teacher's version of this module shipped with a Server::new with no
// body, fields referenced that were never declared (`active_connections`,
// a `MetricsCollector` type that didn't exist), and a handler trait with
// no default dispatch -- it could not compile. The worker-pool-over-a-
// shared-socket shape, the ctrl_c/SIGTERM shutdown handshake, and the
// per-worker tracing spans survive; packet decoding/dispatch is rebuilt to
// actually route through `Packet`/`Dictionary`/`HostMap`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::dictionary::Dictionary;
use crate::host::{Host, HostMap};
use crate::packet::{Packet, PacketCode, MAX_PACKET_LEN};

/// Why a received datagram never reached a handler. Embedders that want
/// visibility into drops (spec's dispatch-rules contract) subscribe to
/// `Server::events()`.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    UnknownHost { src: SocketAddr },
    PacketError { src: SocketAddr, error: String },
    AuthenticatorMismatch { src: SocketAddr, identifier: u8 },
}

/// Embedder-supplied business logic for each RADIUS exchange. The server
/// owns socket I/O, decode/encode, and Authenticator verification; this
/// trait owns the decision of what a valid request means (spec's external
/// interface: "user-supplied authentication logic" stays out of the
/// library, this is the seam it plugs into).
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle_auth(&self, request: &Packet) -> Packet;
    async fn handle_acct(&self, request: &Packet) -> Packet;
    async fn handle_coa(&self, request: &Packet) -> Packet;
    async fn handle_disconnect(&self, request: &Packet) -> Packet;
}

/// A bound RADIUS server: one UDP socket per packet family, a shared host
/// registry, and a worker pool fanning out over each socket. The host
/// table is read-mostly and reader-writer-locked (spec's concurrency
/// model) so `register_host` can add peers while workers are dispatching.
pub struct Server<H: RequestHandler + 'static> {
    hosts: Arc<RwLock<HostMap>>,
    dict: Arc<Dictionary>,
    handler: Arc<H>,
    auth_socket: Option<UdpSocket>,
    acct_socket: Option<UdpSocket>,
    coa_socket: Option<UdpSocket>,
    worker_count: usize,
    events_tx: mpsc::Sender<DispatchEvent>,
    events_rx: Option<mpsc::Receiver<DispatchEvent>>,
}

impl<H: RequestHandler + 'static> Server<H> {
    /// `dict` is the default dictionary used to decode datagrams from hosts
    /// registered via `register_host` (spec §6: the server constructor
    /// takes a single shared `dict`, not one per host). Hosts inserted into
    /// `hosts` directly may still carry their own per-host dictionary.
    pub fn new(hosts: HostMap, dict: Arc<Dictionary>, handler: H) -> Self {
        let (events_tx, events_rx) = mpsc::channel(1024);
        Self {
            hosts: Arc::new(RwLock::new(hosts)),
            dict,
            handler: Arc::new(handler),
            auth_socket: None,
            acct_socket: None,
            coa_socket: None,
            worker_count: num_cpus::get(),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    /// Add or replace a host at runtime (spec §4.F `register_host(ip,
    /// secret, name)`), using the server's default dictionary. Takes the
    /// write side of the host-table lock; readers (dispatch workers) only
    /// block for the duration of the insert.
    pub async fn register_host(&self, address: std::net::IpAddr, secret: Vec<u8>, name: impl Into<String>) {
        let host = Host::new(address, secret, self.dict.clone()).with_name(name);
        self.hosts.write().await.insert(host);
    }

    /// Channel of drop/error events for observability; taken once, like
    /// the teacher's shutdown receiver.
    pub fn events(&mut self) -> Option<mpsc::Receiver<DispatchEvent>> {
        self.events_rx.take()
    }

    pub async fn bind(&mut self, bind_addr: std::net::IpAddr, auth_port: u16, acct_port: u16, coa_port: u16) -> std::io::Result<()> {
        self.auth_socket = Some(tuned_socket(bind_addr, auth_port).await?);
        self.acct_socket = Some(tuned_socket(bind_addr, acct_port).await?);
        self.coa_socket = Some(tuned_socket(bind_addr, coa_port).await?);
        info!(auth_port, acct_port, coa_port, "RADIUS server bound to ports");
        Ok(())
    }

    /// Run every worker and block until a shutdown signal (Ctrl+C or
    /// SIGTERM) arrives.
    pub async fn run(mut self) -> std::io::Result<()> {
        let auth_socket = Arc::new(self.auth_socket.take().expect("call bind() before run()"));
        let acct_socket = Arc::new(self.acct_socket.take().expect("call bind() before run()"));
        let coa_socket = Arc::new(self.coa_socket.take().expect("call bind() before run()"));

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        register_shutdown_handlers(shutdown_tx);

        info!(workers = self.worker_count, "starting RADIUS server workers");
        for i in 0..self.worker_count {
            spawn_family_workers(
                i,
                "auth",
                auth_socket.clone(),
                self.hosts.clone(),
                self.handler.clone(),
                self.events_tx.clone(),
                dispatch_auth,
            );
            spawn_family_workers(
                i,
                "acct",
                acct_socket.clone(),
                self.hosts.clone(),
                self.handler.clone(),
                self.events_tx.clone(),
                dispatch_acct,
            );
            spawn_family_workers(
                i,
                "coa",
                coa_socket.clone(),
                self.hosts.clone(),
                self.handler.clone(),
                self.events_tx.clone(),
                dispatch_coa,
            );
        }

        shutdown_rx.recv().await;
        info!("shutdown signal received, stopping server");
        Ok(())
    }
}

type DispatchFn<H> = for<'a> fn(
    &'a Arc<H>,
    &'a Packet,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Packet> + Send + 'a>>;

fn dispatch_auth<'a, H: RequestHandler>(
    handler: &'a Arc<H>,
    request: &'a Packet,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Packet> + Send + 'a>> {
    Box::pin(async move { handler.handle_auth(request).await })
}

fn dispatch_acct<'a, H: RequestHandler>(
    handler: &'a Arc<H>,
    request: &'a Packet,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Packet> + Send + 'a>> {
    Box::pin(async move { handler.handle_acct(request).await })
}

fn dispatch_coa<'a, H: RequestHandler>(
    handler: &'a Arc<H>,
    request: &'a Packet,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Packet> + Send + 'a>> {
    Box::pin(async move {
        if request.code == PacketCode::DisconnectRequest {
            handler.handle_disconnect(request).await
        } else {
            handler.handle_coa(request).await
        }
    })
}

fn spawn_family_workers<H: RequestHandler + 'static>(
    worker_index: usize,
    family: &'static str,
    socket: Arc<UdpSocket>,
    hosts: Arc<RwLock<HostMap>>,
    handler: Arc<H>,
    events: mpsc::Sender<DispatchEvent>,
    dispatch: DispatchFn<H>,
) {
    tokio::spawn(async move {
        let worker_id = format!("{family}-{worker_index}");
        debug!(worker = %worker_id, "worker started");
        let mut buf = vec![0u8; MAX_PACKET_LEN];
        loop {
            let (n, src) = match socket.recv_from(&mut buf).await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(worker = %worker_id, error = %e, "recv_from failed");
                    continue;
                }
            };
            if let Err(e) = handle_datagram(&buf[..n], src, &socket, &hosts, &handler, dispatch).await {
                let _ = events.send(e).await;
            }
        }
    });
}

async fn handle_datagram<H: RequestHandler>(
    data: &[u8],
    src: SocketAddr,
    socket: &UdpSocket,
    hosts: &Arc<RwLock<HostMap>>,
    handler: &Arc<H>,
    dispatch: DispatchFn<H>,
) -> Result<(), DispatchEvent> {
    let (secret, dictionary) = {
        let hosts = hosts.read().await;
        let host = hosts.get(&src.ip()).ok_or(DispatchEvent::UnknownHost { src })?;
        (host.secret.clone(), host.dictionary.clone())
    };

    let request = Packet::decode(data, secret, dictionary)
        .map_err(|e| DispatchEvent::PacketError { src, error: e.to_string() })?;

    if !request.verify_request_authenticator(data) {
        return Err(DispatchEvent::AuthenticatorMismatch { src, identifier: request.identifier });
    }

    debug!(?src, code = ?request.code, identifier = request.identifier, "dispatching request");
    let mut response = dispatch(handler, &request).await;
    let encoded = response.encode().map_err(|e| DispatchEvent::PacketError { src, error: e.to_string() })?;

    if let Err(e) = socket.send_to(&encoded, src).await {
        warn!(?src, error = %e, "failed to send RADIUS response");
    }
    Ok(())
}

/// Bind a UDP socket with enlarged kernel buffers (socket2, matching the
/// teacher's `bind` tuning) -- RADIUS accounting bursts can arrive faster
/// than a worker drains the default OS buffer.
async fn tuned_socket(addr: std::net::IpAddr, port: u16) -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind((addr, port)).await?;
    let sock_ref = socket2::Socket::from(socket.into_std()?);
    sock_ref.set_recv_buffer_size(1024 * 1024)?;
    sock_ref.set_send_buffer_size(1024 * 1024)?;
    UdpSocket::from_std(sock_ref.into())
}

fn register_shutdown_handlers(shutdown_tx: mpsc::Sender<()>) {
    let tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, initiating shutdown");
            let _ = tx.send(()).await;
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        tokio::spawn(async move {
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(e) => {
                    error!(error = %e, "failed to install SIGTERM handler");
                    return;
                }
            };
            sigterm.recv().await;
            info!("received SIGTERM, initiating shutdown");
            let _ = shutdown_tx.send(()).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr_type::Value;
    use crate::dictionary::Dictionary;

    struct EchoHandler;

    #[async_trait]
    impl RequestHandler for EchoHandler {
        async fn handle_auth(&self, request: &Packet) -> Packet {
            let mut resp = request.create_response(PacketCode::AccessAccept);
            resp.push("Reply-Message", Value::Text("ok".into())).unwrap();
            resp
        }
        async fn handle_acct(&self, request: &Packet) -> Packet {
            request.create_response(PacketCode::AccountingResponse)
        }
        async fn handle_coa(&self, request: &Packet) -> Packet {
            request.create_response(PacketCode::CoaAck)
        }
        async fn handle_disconnect(&self, request: &Packet) -> Packet {
            request.create_response(PacketCode::DisconnectAck)
        }
    }

    #[tokio::test]
    async fn full_auth_round_trip_through_socket_dispatch() {
        let dict = Arc::new(Dictionary::base());
        let secret = b"sharedsecret".to_vec();
        let client_addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let client_sock = UdpSocket::bind(client_addr).await.unwrap();
        let client_local = client_sock.local_addr().unwrap();
        let server_sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server_sock.local_addr().unwrap();

        let host = Host::new(client_local.ip(), secret.clone(), dict.clone()).with_name("test-nas");
        let mut request = Packet::new(PacketCode::AccessRequest, 9, secret.clone(), dict.clone());
        request.push("User-Name", Value::String(b"alice".to_vec())).unwrap();
        let encoded = request.encode().unwrap();
        client_sock.send_to(&encoded, server_addr).await.unwrap();

        let mut buf = vec![0u8; MAX_PACKET_LEN];
        let (n, src) = server_sock.recv_from(&mut buf).await.unwrap();
        let handler = Arc::new(EchoHandler);
        let hosts = Arc::new(RwLock::new({
            let mut m = HostMap::new();
            m.insert(host);
            m
        }));
        handle_datagram(&buf[..n], src, &server_sock, &hosts, &handler, dispatch_auth)
            .await
            .unwrap();

        let mut reply_buf = [0u8; MAX_PACKET_LEN];
        let (rn, _) = client_sock.recv_from(&mut reply_buf).await.unwrap();
        let reply = Packet::decode(&reply_buf[..rn], secret, dict).unwrap();
        assert_eq!(reply.code, PacketCode::AccessAccept);
        assert_eq!(reply.identifier, 9);
    }

    #[tokio::test]
    async fn unknown_host_is_reported_as_dispatch_event() {
        let dict = Arc::new(Dictionary::base());
        let hosts = Arc::new(RwLock::new(HostMap::new()));
        let handler = Arc::new(EchoHandler);
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());

        let secret = b"secret".to_vec();
        let mut request = Packet::new(PacketCode::AccessRequest, 1, secret, dict);
        let encoded = request.encode().unwrap();

        let result = handle_datagram(
            &encoded,
            "203.0.113.5:1812".parse().unwrap(),
            &socket,
            &hosts,
            &handler,
            dispatch_auth,
        )
        .await;
        assert!(matches!(result, Err(DispatchEvent::UnknownHost { .. })));
    }

    #[tokio::test]
    async fn register_host_makes_a_peer_dispatchable() {
        let dict = Arc::new(Dictionary::base());
        let hosts = HostMap::new();
        let server = Server::new(hosts, dict.clone(), EchoHandler);

        let peer_ip: std::net::IpAddr = "198.51.100.7".parse().unwrap();
        server.register_host(peer_ip, b"dynamic-secret".to_vec(), "edge-nas").await;

        let table = server.hosts.read().await;
        let host = table.get(&peer_ip).expect("host registered at runtime should resolve");
        assert_eq!(host.name, "edge-nas");
        assert_eq!(host.secret, b"dynamic-secret");
    }
}
