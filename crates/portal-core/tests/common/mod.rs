//! Shared harness for portal contract tests
//!
//! Starts a real engine on 127.0.0.1 with ephemeral ports and provides raw
//! UDP and TCP clients to talk to it.

#![allow(dead_code)]

use portal_core::engine::{PortalEngine, PortalEvent};
use portal_core::http::handlers::{ListPoints, PointAccess, StaticPage};
use portal_core::registry::{DataPoint, DataPointRegistry, Value, ValueSlot};
use portal_core::{HttpRouter, Methods, PortalConfig, WebPath};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub const PORTAL_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const PORTAL_HOST: &str = "portal.test";
pub const BLOCKED_NAME: &str = "blocked.test";

/// How long a test waits for something that should happen
pub const WAIT: Duration = Duration::from_secs(5);

/// How long a test waits for something that should not happen
pub const QUIET: Duration = Duration::from_millis(300);

/// Configuration bound to loopback with ephemeral ports
pub fn local_config() -> PortalConfig {
    let mut config = PortalConfig::new().with_address(PORTAL_ADDRESS);
    config.dns.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.dns.port = 0;
    config.dns.blocked = vec![BLOCKED_NAME.to_string()];
    config.http.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.http.port = 0;
    config.http.host = PORTAL_HOST.to_string();
    config.http.accept_grace_ms = 100;
    config
}

/// Registry with one point of each access kind
pub fn test_registry() -> (Arc<DataPointRegistry>, ValueSlot) {
    let level = ValueSlot::new(Value::U8(3));
    let mut registry = DataPointRegistry::new();
    registry
        .add(DataPoint::settable("level", level.clone()))
        .unwrap();
    registry
        .add(DataPoint::read_only("uptime", ValueSlot::new(Value::Time(1_500))))
        .unwrap();
    registry
        .add(
            DataPoint::settable("stop_mm", ValueSlot::new(Value::U32(500)))
                .with_hook(|v| matches!(v, Value::U32(mm) if (100..=4000).contains(mm))),
        )
        .unwrap();
    (Arc::new(registry), level)
}

/// Router with the pages the daemon registers plus one unbound path
pub fn test_router(config: &PortalConfig, registry: Arc<DataPointRegistry>) -> HttpRouter {
    let mut router = HttpRouter::from_config(&config.http);
    router
        .add_path(WebPath::new("/", Methods::GET, Arc::new(StaticPage::html("<h1>portal</h1>"))))
        .unwrap();
    router
        .add_path(WebPath::new(
            "/points",
            Methods::GET,
            Arc::new(ListPoints::new(registry.clone())),
        ))
        .unwrap();
    router
        .add_path(WebPath::new(
            "/point",
            Methods::BOTH,
            Arc::new(PointAccess::new(registry)),
        ))
        .unwrap();
    router
        .add_path(WebPath::unimplemented("/firmware", Methods::POST))
        .unwrap();
    router
}

/// An engine running on a background task
pub struct RunningPortal {
    pub dns_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub events: mpsc::Receiver<PortalEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<portal_core::Result<()>>,
}

impl RunningPortal {
    pub async fn start(config: PortalConfig, router: HttpRouter) -> Self {
        let (engine, mut events) = PortalEngine::bind(config, router)
            .await
            .expect("engine binds");
        let dns_addr = engine.dns_addr().unwrap();
        let http_addr = engine.http_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(engine.run_with_shutdown(shutdown_rx));

        // Wait for startup
        let started = tokio::time::timeout(WAIT, events.recv()).await;
        assert!(
            matches!(started, Ok(Some(PortalEvent::Started { .. }))),
            "engine should report Started first, got {:?}",
            started
        );

        Self {
            dns_addr,
            http_addr,
            events,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Start with [`local_config`] and [`test_router`]
    pub async fn start_default() -> (Self, ValueSlot) {
        let config = local_config();
        let (registry, level) = test_registry();
        let router = test_router(&config, registry);
        (Self::start(config, router).await, level)
    }

    /// Signal shutdown and wait for the engine to return
    pub async fn stop(mut self) -> mpsc::Receiver<PortalEvent> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let result = tokio::time::timeout(WAIT, self.handle)
            .await
            .expect("engine should terminate within 5 seconds")
            .expect("engine task should not panic");
        assert!(result.is_ok(), "engine should shut down cleanly: {:?}", result);
        self.events
    }

    /// Next event, skipping nothing
    pub async fn next_event(&mut self) -> PortalEvent {
        tokio::time::timeout(WAIT, self.events.recv())
            .await
            .expect("an event should arrive")
            .expect("event channel open")
    }
}

/// Standard query with RD set and one question
pub fn dns_query(id: u16, name: &str, qtype: u16, qclass: u16) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(&id.to_be_bytes());
    packet.extend_from_slice(&0x0100u16.to_be_bytes());
    packet.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 0]);
    packet.extend_from_slice(&portal_core::codec::encode_name(name).unwrap());
    packet.extend_from_slice(&qtype.to_be_bytes());
    packet.extend_from_slice(&qclass.to_be_bytes());
    packet
}

/// Send one datagram and wait up to `wait` for the reply
pub async fn dns_exchange(server: SocketAddr, packet: &[u8], wait: Duration) -> Option<Vec<u8>> {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(packet, server).await.unwrap();

    let mut buf = [0u8; 512];
    match tokio::time::timeout(wait, socket.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(buf[..len].to_vec()),
        _ => None,
    }
}

/// Response code from a reply header
pub fn rcode(reply: &[u8]) -> u8 {
    reply[3] & 0x0f
}

/// Send raw request bytes and read until the server closes
pub async fn http_exchange(server: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(server).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(WAIT, stream.read_to_end(&mut response))
        .await
        .expect("server should close the connection")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// GET `target` with the portal's Host header
pub async fn http_get(server: SocketAddr, target: &str) -> String {
    let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\n\r\n", target, PORTAL_HOST);
    http_exchange(server, request.as_bytes()).await
}

/// Body of a raw response
pub fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map_or("", |(_, body)| body)
}
