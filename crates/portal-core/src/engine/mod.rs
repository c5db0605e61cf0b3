//! Portal engine
//!
//! The PortalEngine is responsible for:
//! - Binding the UDP (DNS) and TCP (HTTP) listeners
//! - Answering every DNS datagram through the [`DnsResponder`]
//! - Serving HTTP clients one at a time through the [`HttpRouter`]
//! - Emitting events for monitoring
//!
//! ## Architecture
//!
//! ```text
//!   UDP datagram                     TCP client
//!        │                                │
//!        ▼                                ▼
//! ┌──────────────┐                ┌──────────────┐
//! │  DNS task    │                │  HTTP task   │
//! │ DnsResponder │                │  HttpRouter  │
//! └──────────────┘                └──────────────┘
//!        │                                │
//!        └──────────── PortalEvent ───────┘
//!                          │
//!                          ▼
//!                   mpsc::Receiver
//! ```
//!
//! The two tasks share nothing but the event channel and a stop signal, so
//! a client stalled mid-request never delays DNS answers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::PortalConfig;
use crate::dns::{DnsResponder, Verdict};
use crate::error::Result;
use crate::http::HttpRouter;

/// Largest datagram read; classic DNS over UDP caps messages at 512 bytes
pub const MAX_DATAGRAM: usize = 512;

/// Events emitted by the PortalEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalEvent {
    /// Both listeners are bound and serving
    Started {
        dns_addr: SocketAddr,
        http_addr: SocketAddr,
    },

    /// A DNS query was answered
    DnsAnswered { name: String, nxdomain: bool },

    /// A datagram was dropped without a reply
    DnsDropped { peer: SocketAddr },

    /// An HTTP request was served
    ///
    /// `status` is `None` when a path handler wrote the response.
    HttpServed {
        path: String,
        status: Option<&'static str>,
    },

    /// Engine stopped
    Stopped { reason: String },
}

/// Non-blocking event sender shared by both tasks
#[derive(Debug, Clone)]
struct EventSink {
    tx: mpsc::Sender<PortalEvent>,
}

impl EventSink {
    fn emit(&self, event: PortalEvent) {
        // Send event, logging warning if channel is full (backpressure)
        if self.tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Captive-portal engine
///
/// ## Lifecycle
///
/// 1. Bind with [`PortalEngine::bind()`]
/// 2. Start with [`PortalEngine::run()`]
/// 3. Engine runs until a shutdown signal is received
pub struct PortalEngine {
    responder: Arc<DnsResponder>,
    router: Arc<HttpRouter>,
    udp: Arc<UdpSocket>,
    tcp: TcpListener,
    accept_grace: Duration,
    events: EventSink,
}

impl PortalEngine {
    /// Validate `config`, build the responder and bind both listeners
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub async fn bind(
        config: PortalConfig,
        router: HttpRouter,
    ) -> Result<(Self, mpsc::Receiver<PortalEvent>)> {
        config.validate()?;

        let responder = DnsResponder::with_blocked(
            config.dns.address,
            config.dns.blocked.iter().map(String::as_str),
        )?;
        let udp = UdpSocket::bind((config.dns.bind_addr, config.dns.port)).await?;
        let tcp = TcpListener::bind((config.http.bind_addr, config.http.port)).await?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            responder: Arc::new(responder),
            router: Arc::new(router),
            udp: Arc::new(udp),
            tcp,
            accept_grace: Duration::from_millis(config.http.accept_grace_ms),
            events: EventSink { tx },
        };

        Ok((engine, rx))
    }

    /// Bound DNS address
    pub fn dns_addr(&self) -> Result<SocketAddr> {
        Ok(self.udp.local_addr()?)
    }

    /// Bound HTTP address
    pub fn http_addr(&self) -> Result<SocketAddr> {
        Ok(self.tcp.local_addr()?)
    }

    /// Run the engine until Ctrl-C
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine until `shutdown_rx` fires (or its sender is dropped)
    pub async fn run_with_shutdown(self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(Some(shutdown_rx)).await
    }

    async fn run_internal(self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let dns_addr = self.dns_addr()?;
        let http_addr = self.http_addr()?;
        info!("DNS listening on {}, HTTP listening on {}", dns_addr, http_addr);

        let (stop_tx, stop_rx) = watch::channel(false);

        let dns_task = tokio::spawn(dns_loop(
            self.udp.clone(),
            self.responder.clone(),
            self.events.clone(),
            stop_rx.clone(),
        ));
        let http_task = tokio::spawn(http_loop(
            self.tcp,
            self.router.clone(),
            self.accept_grace,
            self.events.clone(),
            stop_rx,
        ));

        self.events.emit(PortalEvent::Started {
            dns_addr,
            http_addr,
        });

        match shutdown_rx {
            // Test mode: wait for provided shutdown signal
            Some(rx) => {
                let _ = rx.await;
            }
            // Production mode: wait for SIGINT
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to wait for Ctrl-C: {}", e);
                }
            }
        }
        info!("Shutdown signal received");

        let _ = stop_tx.send(true);
        for (name, task) in [("DNS", dns_task), ("HTTP", http_task)] {
            if let Err(e) = task.await {
                error!("{} task ended abnormally: {}", name, e);
            }
        }

        self.events.emit(PortalEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        info!("Engine stopped");

        Ok(())
    }
}

async fn dns_loop(
    socket: Arc<UdpSocket>,
    responder: Arc<DnsResponder>,
    events: EventSink,
    mut stop: watch::Receiver<bool>,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let received = tokio::select! {
            received = socket.recv_from(&mut buf) => received,
            _ = stop.changed() => break,
        };
        let (len, peer) = match received {
            Ok(received) => received,
            Err(e) => {
                // ICMP unreachable from an earlier reply surfaces here on some platforms
                debug!("DNS receive failed: {}", e);
                continue;
            }
        };

        let Some(reply) = responder.respond(&buf[..len]) else {
            debug!("Dropped {}-byte datagram from {}", len, peer);
            events.emit(PortalEvent::DnsDropped { peer });
            continue;
        };

        if let Err(e) = socket.send_to(&reply.bytes, peer).await {
            warn!("Failed to send DNS reply to {}: {}", peer, e);
            continue;
        }
        events.emit(PortalEvent::DnsAnswered {
            name: reply.name,
            nxdomain: reply.verdict == Verdict::NxDomain,
        });
    }
    debug!("DNS task stopped");
}

async fn http_loop(
    listener: TcpListener,
    router: Arc<HttpRouter>,
    grace: Duration,
    events: EventSink,
    mut stop: watch::Receiver<bool>,
) {
    let mut clients = TcpListenerStream::new(listener);
    loop {
        let stream = tokio::select! {
            next = clients.next() => match next {
                Some(Ok(stream)) => stream,
                Some(Err(e)) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
                None => break,
            },
            _ = stop.changed() => break,
        };

        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => {
                debug!("Client left before it was served: {}", e);
                continue;
            }
        };

        // One client at a time; a stop signal abandons the current client
        let served = tokio::select! {
            served = router.serve_tcp(stream, peer, grace) => served,
            _ = stop.changed() => break,
        };

        match served {
            Ok(Some(served)) => events.emit(PortalEvent::HttpServed {
                path: served.path,
                status: served.status,
            }),
            Ok(None) => {}
            Err(e) => warn!("Failed to serve {}: {}", peer, e),
        }
    }
    debug!("HTTP task stopped");
}
