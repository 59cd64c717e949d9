use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

use crate::chunk::{self, Chunk, Reassembler};
use crate::dedup::DedupCache;
use crate::{Error, Result};

/// Configuration for a [`P2pTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Local address to bind the UDP socket to.
    pub bind_addr: SocketAddr,
    /// Payloads larger than this are split into [`Chunk`]s.
    pub udp_buffer_size: usize,
    /// How long a delivered payload's hash is remembered for
    /// duplicate suppression.
    pub cache_ttl: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".parse().unwrap(),
            // Conservative default well under the common 1500-byte
            // Ethernet MTU once IP/UDP headers are accounted for.
            udp_buffer_size: 1200,
            cache_ttl: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
enum Frame {
    Whole(Vec<u8>),
    Part(Chunk),
}

/// One complete, de-duplicated, reassembled message received from a
/// peer.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Address the datagram arrived from.
    pub from: SocketAddr,
    /// The reassembled payload.
    pub payload: Vec<u8>,
}

/// Peer-to-peer UDP transport.
///
/// Handles chunking oversized payloads, content-hash de-duplication of
/// redelivered or re-broadcast datagrams, and exposes the socket's own
/// bound address for handshake announcements. The wire-level framing
/// (JSON envelopes) is layered on top by `tss-core`; this transport
/// only ever sees opaque bytes.
pub struct P2pTransport {
    socket: Arc<UdpSocket>,
    config: TransportConfig,
    dedup: DedupCache,
    reassembler: tokio::sync::Mutex<Reassembler>,
}

impl P2pTransport {
    /// Bind a new transport per `config`.
    pub async fn bind(config: TransportConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            dedup: DedupCache::new(config.cache_ttl),
            reassembler: tokio::sync::Mutex::new(Reassembler::new()),
            config,
        })
    }

    /// The address this transport is actually listening on, including
    /// the OS-assigned port when `bind_addr`'s port was `0`.
    ///
    /// Used to populate `peer_addr` in outgoing handshake envelopes so
    /// peers behind ephemeral ports remain reachable.
    pub fn get_real_address(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send `payload` to `to`, transparently chunking it first if it
    /// exceeds the configured buffer size.
    pub async fn send(&self, payload: &[u8], to: SocketAddr) -> Result<()> {
        if payload.len() <= self.config.udp_buffer_size {
            let frame = Frame::Whole(payload.to_vec());
            let bytes = encode_frame(&frame)?;
            self.socket.send_to(&bytes, to).await?;
            return Ok(());
        }

        for part in chunk::split(payload, self.config.udp_buffer_size) {
            let frame = Frame::Part(part);
            let bytes = encode_frame(&frame)?;
            self.socket.send_to(&bytes, to).await?;
        }
        Ok(())
    }

    /// Receive the next complete, non-duplicate message.
    ///
    /// Internally loops over raw datagrams: chunk parts are buffered
    /// until a payload is whole, and whole payloads are checked
    /// against the de-dup cache before being surfaced.
    pub async fn next_message(&self) -> Result<Inbound> {
        let mut buf = vec![0u8; 65535];
        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            let frame: Frame = decode_frame(&buf[..len])?;
            let payload = match frame {
                Frame::Whole(payload) => Some(payload),
                Frame::Part(chunk) => {
                    let mut reassembler = self.reassembler.lock().await;
                    reassembler.add(chunk)?
                }
            };
            let Some(payload) = payload else {
                continue;
            };
            let key = DedupCache::key_for(&payload);
            if self.dedup.check_and_insert(key).await {
                tracing::trace!(%from, "dropping duplicate datagram");
                continue;
            }
            return Ok(Inbound { from, payload });
        }
    }
}

fn encode_frame(frame: &Frame) -> Result<Vec<u8>> {
    serde_json::to_vec(frame)
        .map_err(|e| Error::MalformedFrame(e.to_string()))
}

fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::MalformedFrame(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_small_message_between_two_sockets() {
        let a = P2pTransport::bind(TransportConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        })
        .await
        .unwrap();
        let b = P2pTransport::bind(TransportConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        })
        .await
        .unwrap();

        let b_addr = b.get_real_address().unwrap();
        a.send(b"hello peer", b_addr).await.unwrap();

        let inbound = b.next_message().await.unwrap();
        assert_eq!(inbound.payload, b"hello peer");
    }

    #[tokio::test]
    async fn round_trips_a_chunked_message() {
        let a = P2pTransport::bind(TransportConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            udp_buffer_size: 16,
            ..Default::default()
        })
        .await
        .unwrap();
        let b = P2pTransport::bind(TransportConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            udp_buffer_size: 16,
            ..Default::default()
        })
        .await
        .unwrap();

        let b_addr = b.get_real_address().unwrap();
        let payload: Vec<u8> = (0..200u16).map(|n| n as u8).collect();
        a.send(&payload, b_addr).await.unwrap();

        let inbound = b.next_message().await.unwrap();
        assert_eq!(inbound.payload, payload);
    }
}
