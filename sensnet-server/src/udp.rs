//! Radio bridge over UDP
//!
//! The transceiver sits on a small gateway that forwards every received
//! frame as one datagram and transmits every datagram it gets. Frames go
//! back to the configured peer, or to whoever sent the last datagram.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use log::{debug, warn};
use sensnet_core::constants::MAX_FRAME_SIZE;
use sensnet_core::time::Timestamp;
use sensnet_core::traits::RxBuf;
use sensnet_core::Radio;

use crate::Result;

pub struct UdpRadio {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    fixed_peer: bool,
}

impl UdpRadio {
    /// Bind to `addr`; `peer` pins the destination of sent frames
    pub fn bind(addr: SocketAddr, peer: Option<SocketAddr>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        debug!("radio bridge bound to {}", socket.local_addr()?);
        Ok(Self {
            socket,
            peer,
            fixed_peer: peer.is_some(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Where the next frame goes
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Radio for UdpRadio {
    fn send(&mut self, frame: &[u8]) -> bool {
        let Some(peer) = self.peer else {
            warn!("no peer to send {} bytes to", frame.len());
            return false;
        };
        match self.socket.send_to(frame, peer) {
            Ok(sent) => sent == frame.len(),
            Err(err) => {
                warn!("send to {} failed: {}", peer, err);
                false
            }
        }
    }

    fn receive(&mut self, timeout_ms: Timestamp) -> Option<RxBuf> {
        // A zero read timeout means "block forever" to the socket
        let timeout = Duration::from_millis(timeout_ms.max(1));
        if let Err(err) = self.socket.set_read_timeout(Some(timeout)) {
            warn!("cannot set read timeout: {}", err);
            return None;
        }

        // One spare byte tells an oversized datagram from a full frame
        let mut buf = [0u8; MAX_FRAME_SIZE + 1];
        let (len, from) = match self.socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => return None,
            Err(err) => {
                warn!("receive failed: {}", err);
                return None;
            }
        };

        if !self.fixed_peer {
            self.peer = Some(from);
        }
        if len > MAX_FRAME_SIZE {
            debug!("dropping oversized datagram from {}", from);
            return None;
        }
        RxBuf::from_slice(&buf[..len]).ok()
    }
}
