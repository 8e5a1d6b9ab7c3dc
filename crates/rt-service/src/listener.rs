//! UDP ingress for vehicle report lines.
//!
//! One datagram carries one or more newline-separated lines.  Each line is
//! stamped with the receive time and handed to the [`IngestService`].

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use rt_core::Millis;

use crate::ingest::IngestService;
use crate::ServiceResult;

const POLL: Duration = Duration::from_millis(200);
const MAX_DATAGRAM: usize = 64 * 1024;

pub struct UdpListener {
    socket: UdpSocket,
    stop:   Arc<AtomicBool>,
}

impl UdpListener {
    pub fn bind(addr: impl ToSocketAddrs) -> ServiceResult<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL))?;
        Ok(Self { socket, stop: Arc::new(AtomicBool::new(false)) })
    }

    pub fn local_addr(&self) -> ServiceResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Setting the returned flag ends [`run`](Self::run) within one poll.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Receive until stopped; returns the number of lines submitted.
    pub fn run(&self, service: &IngestService) -> ServiceResult<u64> {
        let addr = self.local_addr()?;
        info!(%addr, "listening for vehicle reports");
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut lines = 0u64;

        while !self.stop.load(Ordering::Relaxed) {
            let (n, peer) = match self.socket.recv_from(&mut buf) {
                Ok(got) => got,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let received_at = Millis::now();
            let text = match std::str::from_utf8(&buf[..n]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%peer, error = %e, "datagram is not utf-8");
                    continue;
                }
            };
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                service.submit(line.to_owned(), received_at);
                lines += 1;
            }
            debug!(%peer, bytes = n, "datagram");
        }

        info!(lines, "listener stopped");
        Ok(lines)
    }
}
