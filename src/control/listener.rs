//! OSC control listener
//!
//! Every datagram is handled on its own task. Handling decodes the packet,
//! picks out messages for the utterance endpoint and makes one non-blocking
//! admission attempt per message. Nothing is ever sent back to the sender.

use crate::messages::TextItem;
use crate::utils::AdmissionQueue;
use crate::{RelayError, Result};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::SocketAddr;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// Address pattern that carries utterance text
pub const DEFAULT_ENDPOINT: &str = "/text";

/// Largest UDP payload we accept
const MAX_DATAGRAM: usize = 65_536;

/// Pause before receiving again after a transient socket error
const RECV_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Receive errors that leave the socket usable
///
/// ICMP port-unreachable replies surface as `ConnectionReset` or
/// `ConnectionRefused` on some platforms.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

/// Decode one UDP datagram as an OSC packet
pub fn decode_datagram(bytes: &[u8]) -> Result<OscPacket> {
    rosc::decoder::decode_udp(bytes)
        .map(|(_, packet)| packet)
        .map_err(|e| RelayError::ControlDecodeError(format!("{:?}", e)))
}

/// Collect utterance texts addressed to `endpoint`, walking bundles in order.
///
/// Messages whose first argument is missing, not a string, or blank are
/// skipped.
pub fn extract_texts(packet: &OscPacket, endpoint: &str) -> Vec<String> {
    let mut texts = Vec::new();
    collect_texts(packet, endpoint, &mut texts);
    texts
}

fn collect_texts(packet: &OscPacket, endpoint: &str, texts: &mut Vec<String>) {
    match packet {
        OscPacket::Message(msg) => {
            if let Some(text) = message_text(msg, endpoint) {
                texts.push(text);
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in &bundle.content {
                collect_texts(inner, endpoint, texts);
            }
        }
    }
}

fn message_text(msg: &OscMessage, endpoint: &str) -> Option<String> {
    if msg.addr != endpoint {
        return None;
    }

    match msg.args.first() {
        Some(OscType::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Turns control packets into admission attempts
#[derive(Clone, Debug)]
pub struct ControlHandler {
    queue: AdmissionQueue,
    endpoint: Arc<str>,
}

impl ControlHandler {
    pub fn new(queue: AdmissionQueue, endpoint: impl Into<String>) -> Self {
        Self {
            queue,
            endpoint: Arc::from(endpoint.into()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Handle one raw datagram. Returns how many utterances were admitted.
    pub fn handle_datagram(&self, bytes: &[u8]) -> usize {
        match decode_datagram(bytes) {
            Ok(packet) => self.handle_packet(&packet),
            Err(e) => {
                debug!("Ignoring {} byte datagram: {}", bytes.len(), e);
                0
            }
        }
    }

    /// Handle a decoded packet. Returns how many utterances were admitted.
    pub fn handle_packet(&self, packet: &OscPacket) -> usize {
        let mut admitted = 0;

        for text in extract_texts(packet, &self.endpoint) {
            let item = TextItem::new(text);
            let preview = item.preview().to_string();

            if self.queue.try_enqueue(item) {
                debug!("Queued: {}", preview);
                admitted += 1;
            } else {
                let err = RelayError::AdmissionRejected(format!(
                    "{} of {} slots occupied",
                    self.queue.len(),
                    self.queue.capacity()
                ));
                warn!("Dropped '{}': {}", preview, err);
            }
        }

        admitted
    }
}

/// UDP socket serving the control endpoint
pub struct ControlListener {
    socket: UdpSocket,
    handler: ControlHandler,
}

impl ControlListener {
    pub async fn bind(addr: SocketAddr, handler: ControlHandler) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| RelayError::IOError(format!("Failed to bind control port {}: {}", addr, e)))?;

        Ok(Self { socket, handler })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive datagrams until the socket fails, one task per datagram
    ///
    /// Transient receive errors are retried after a short pause. Any other
    /// error stops the listener.
    pub async fn run(self) {
        if let Ok(addr) = self.socket.local_addr() {
            info!("Listening for OSC on {} ({})", addr, self.handler.endpoint());
        }

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) if is_transient(&e) => {
                    warn!("Control socket receive error, retrying: {}", e);
                    tokio::time::sleep(RECV_RETRY_DELAY).await;
                    continue;
                }
                Err(e) => {
                    error!("Control socket failed, listener stopping: {}", e);
                    return;
                }
            };

            let datagram = buf[..len].to_vec();
            let handler = self.handler.clone();
            tokio::spawn(async move {
                let admitted = handler.handle_datagram(&datagram);
                debug!("Datagram from {}: {} admitted", peer, admitted);
            });
        }
    }
}
