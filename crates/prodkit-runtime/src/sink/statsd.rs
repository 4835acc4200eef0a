//! DogStatsD UDP sink.
//!
//! Line format: `name:value|type[|@rate][|#tag1,tag2]`.
//! Gauges use `g`, counters `c`, timings `ms` (milliseconds).
//! Rates below 1.0 are sampled client-side and forwarded so the agent can
//! scale counts back up.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::net::UdpSocket;

use prodkit_core::error::{ProdkitError, Result};
use prodkit_core::MetricsSink;

pub struct StatsdSink {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl StatsdSink {
    /// Resolve `addr` and connect a UDP socket to it.
    pub async fn connect(addr: &str) -> Result<Self> {
        let peer = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| ProdkitError::InvalidConfig(format!("statsd addr did not resolve: {addr}")))?;

        let local = if peer.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;

        tracing::info!(%peer, "statsd sink connected");
        Ok(Self { socket, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    async fn send(&self, name: &str, value: &str, ty: &str, tags: &[String], rate: f64) -> Result<()> {
        if !should_send(rate) {
            return Ok(());
        }
        let line = encode(name, value, ty, tags, rate);
        self.socket
            .send(&line)
            .await
            .map(|_| ())
            .map_err(|e| ProdkitError::Sink(format!("send {name} failed: {e}")))
    }
}

fn should_send(rate: f64) -> bool {
    rate >= 1.0 || rand::random::<f64>() < rate
}

/// Encode one DogStatsD line.
pub fn encode(name: &str, value: &str, ty: &str, tags: &[String], rate: f64) -> Bytes {
    let tags_len: usize = tags.iter().map(|t| t.len() + 1).sum();
    let mut buf = BytesMut::with_capacity(name.len() + value.len() + ty.len() + tags_len + 16);

    buf.put_slice(name.as_bytes());
    buf.put_u8(b':');
    buf.put_slice(value.as_bytes());
    buf.put_u8(b'|');
    buf.put_slice(ty.as_bytes());

    if rate < 1.0 {
        buf.put_slice(format!("|@{rate}").as_bytes());
    }

    if !tags.is_empty() {
        buf.put_slice(b"|#");
        for (i, t) in tags.iter().enumerate() {
            if i > 0 {
                buf.put_u8(b',');
            }
            buf.put_slice(t.as_bytes());
        }
    }

    buf.freeze()
}

fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

#[async_trait]
impl MetricsSink for StatsdSink {
    async fn gauge(&self, name: &str, value: f64, tags: &[String], rate: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(ProdkitError::Sink(format!("{name}: non-finite gauge value")));
        }
        self.send(name, &value.to_string(), "g", tags, rate).await
    }

    async fn count(&self, name: &str, delta: i64, tags: &[String], rate: f64) -> Result<()> {
        self.send(name, &delta.to_string(), "c", tags, rate).await
    }

    async fn timing(&self, name: &str, value: Duration, tags: &[String], rate: f64) -> Result<()> {
        self.send(name, &duration_ms(value).to_string(), "ms", tags, rate).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn encode_plain_gauge() {
        let line = encode("go.mem.alloc", "1024", "g", &[], 1.0);
        assert_eq!(&line[..], b"go.mem.alloc:1024|g");
    }

    #[test]
    fn encode_rate_and_tags() {
        let tags = vec!["env:prod".to_string(), "size:16".to_string()];
        let line = encode("go.mem.mallocs_by_size", "100", "g", &tags, 0.5);
        assert_eq!(&line[..], b"go.mem.mallocs_by_size:100|g|@0.5|#env:prod,size:16");
    }

    #[test]
    fn timing_in_milliseconds() {
        assert_eq!(duration_ms(Duration::from_micros(1500)), 1.5);
    }

    #[tokio::test]
    async fn datagrams_reach_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let sink = StatsdSink::connect(&addr).await.unwrap();
        sink.count("startup", 1, &[], 1.0).await.unwrap();
        sink.timing("go.mem.pause_ns", Duration::from_millis(2), &["env:test".into()], 1.0)
            .await
            .unwrap();

        let mut buf = [0u8; 512];
        let n = listener.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"startup:1|c");
        let n = listener.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"go.mem.pause_ns:2|ms|#env:test");
    }

    #[tokio::test]
    async fn non_finite_gauge_is_rejected() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = StatsdSink::connect(&listener.local_addr().unwrap().to_string())
            .await
            .unwrap();
        let err = sink.gauge("go.mem.gc_cpu_fraction", f64::NAN, &[], 1.0).await.expect_err("nan");
        assert_eq!(err.code().as_str(), "SINK");
    }
}
