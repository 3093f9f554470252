//! Simulated radio over UDP.
//!
//! Each endpoint binds a local socket and sends to one fixed peer, standing
//! in for the single shared LoRa channel. Outbound frames pass through a
//! [`FaultInjector`]: a "lost" frame is reported as sent, since loss happens
//! in the air and the local radio never learns of it.

use super::fault::FaultInjector;
use crate::arq::{RadioMode, Transceiver, TransmitFault};
use log::{debug, info, warn};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// Largest frame the simulated radio will carry (one LoRa FIFO load).
pub const UDP_RADIO_MTU: usize = 255;

/// Receive buffer size; oversized datagrams are truncated to this.
const RECV_BUFFER_LEN: usize = 4096;

/// Signal strength reported for every received datagram.
pub const SIMULATED_RSSI_DBM: i16 = -42;

/// Smallest read timeout handed to the socket (zero means "block forever").
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Half-duplex radio emulated with a UDP socket.
pub struct UdpTransceiver {
    socket: UdpSocket,
    peer: SocketAddr,
    faults: FaultInjector,
    mode: RadioMode,
    last_rssi: i16,
}

impl UdpTransceiver {
    /// Bind `local` and transmit to `peer`.
    pub fn bind(local: SocketAddr, peer: SocketAddr, faults: FaultInjector) -> io::Result<Self> {
        let socket = UdpSocket::bind(local)?;
        info!("UDP radio bound to {}, peer {}", socket.local_addr()?, peer);
        Ok(Self {
            socket,
            peer,
            faults,
            mode: RadioMode::Idle,
            last_rssi: 0,
        })
    }

    /// Local socket address (useful after binding port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Change the transmit target.
    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = peer;
    }

    pub fn mode(&self) -> RadioMode {
        self.mode
    }
}

impl Transceiver for UdpTransceiver {
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransmitFault> {
        if bytes.is_empty() {
            return Err(TransmitFault::EmptyPacket);
        }
        if bytes.len() > UDP_RADIO_MTU {
            return Err(TransmitFault::PacketTooLarge {
                size: bytes.len(),
                max: UDP_RADIO_MTU,
            });
        }

        self.mode = RadioMode::Transmitting;
        let result = if self.faults.should_drop() {
            info!("Frame seq {} DROPPED in the air ({} bytes)", bytes[0], bytes.len());
            Ok(())
        } else {
            let delay = self.faults.delay();
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            self.socket
                .send_to(bytes, self.peer)
                .map(|_| debug!("UDP TX {} bytes to {}", bytes.len(), self.peer))
                .map_err(TransmitFault::Io)
        };
        self.mode = RadioMode::Idle;
        result
    }

    fn begin_listening(&mut self) {
        self.mode = RadioMode::Listening;
    }

    fn poll_receive(&mut self, max_wait: Duration) -> Option<Vec<u8>> {
        self.mode = RadioMode::Listening;
        if let Err(e) = self.socket.set_read_timeout(Some(max_wait.max(MIN_READ_TIMEOUT))) {
            warn!("Failed to set read timeout: {}", e);
            return None;
        }

        let mut buffer = [0u8; RECV_BUFFER_LEN];
        match self.socket.recv_from(&mut buffer) {
            Ok((len, from)) => {
                debug!("UDP RX {} bytes from {}", len, from);
                self.last_rssi = SIMULATED_RSSI_DBM;
                Some(buffer[..len].to_vec())
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                None
            }
            Err(e) => {
                // e.g. ICMP port unreachable surfacing as ConnectionReset on some platforms
                debug!("UDP receive error: {}", e);
                None
            }
        }
    }

    fn last_signal_strength(&self) -> i16 {
        self.last_rssi
    }
}

impl std::fmt::Debug for UdpTransceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransceiver")
            .field(
                "local",
                &self
                    .socket
                    .local_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "unknown".to_string()),
            )
            .field("peer", &self.peer)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::FaultConfig;
    use std::net::Ipv4Addr;

    fn loopback() -> SocketAddr {
        (Ipv4Addr::LOCALHOST, 0).into()
    }

    fn pair() -> (UdpTransceiver, UdpTransceiver) {
        let mut a = UdpTransceiver::bind(loopback(), loopback(), FaultInjector::perfect()).unwrap();
        let mut b = UdpTransceiver::bind(loopback(), loopback(), FaultInjector::perfect()).unwrap();
        a.set_peer(b.local_addr().unwrap());
        b.set_peer(a.local_addr().unwrap());
        (a, b)
    }

    #[test]
    fn test_frame_crosses_link() {
        let (mut a, mut b) = pair();
        a.transmit(&[1, 2, 3]).unwrap();

        let received = b.poll_receive(Duration::from_millis(500)).unwrap();
        assert_eq!(received, vec![1, 2, 3]);
        assert_eq!(b.last_signal_strength(), SIMULATED_RSSI_DBM);
        assert_eq!(b.mode(), RadioMode::Listening);
    }

    #[test]
    fn test_poll_times_out() {
        let (_a, mut b) = pair();
        let start = std::time::Instant::now();
        assert!(b.poll_receive(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let (mut a, _b) = pair();
        assert!(matches!(a.transmit(&[]), Err(TransmitFault::EmptyPacket)));
        assert!(matches!(
            a.transmit(&[0u8; 300]),
            Err(TransmitFault::PacketTooLarge { size: 300, max: 255 })
        ));
    }

    #[test]
    fn test_dropped_frame_reports_success() {
        let (_, mut b) = pair();
        let faults = FaultInjector::new(FaultConfig::lossy(1.0, 7)).unwrap();
        let mut lossy = UdpTransceiver::bind(loopback(), b.local_addr().unwrap(), faults).unwrap();

        assert!(lossy.transmit(&[0u8; 32]).is_ok());
        assert!(b.poll_receive(Duration::from_millis(50)).is_none());
    }
}
