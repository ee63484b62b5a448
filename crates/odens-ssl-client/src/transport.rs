use std::{
    io,
    marker::PhantomData,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket},
    time::Duration,
};

use anyhow::{Context, Result};
use odens_protos::Message;
use socket2::{Domain, Protocol, Socket, Type};

/// How long a blocking receive waits before handing control back to the receive
/// loop so it can check its stop flag.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

const BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of one receive attempt.
#[derive(Debug)]
pub enum Received<I> {
    Message(I),
    /// A datagram arrived but could not be decoded.
    Malformed(odens_protos::protobuf::Error),
    /// Nothing arrived within [`READ_TIMEOUT`].
    Idle,
}

/// A blocking UDP transport for receiving protobuf messages.
pub struct Transport<I: Message> {
    socket: UdpSocket,
    buf: Vec<u8>,
    incoming_msg_type: PhantomData<I>,
}

impl<I: Message> Transport<I> {
    /// Join the multicast group `group` and receive on `0.0.0.0:port`. The address is
    /// reusable so several processes on one host can listen to the same feed.
    pub fn multicast(group: &str, port: u16) -> Result<Self> {
        let multiaddr = group
            .parse::<Ipv4Addr>()
            .with_context(|| format!("Invalid multicast address {:?}", group))?;
        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);

        let raw_socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .context("Failed to create UDP socket")?;
        raw_socket.set_reuse_address(true)?;
        raw_socket
            .bind(&addr.into())
            .with_context(|| format!("Failed to bind to {}", addr))?;
        raw_socket
            .join_multicast_v4(&multiaddr, &Ipv4Addr::UNSPECIFIED)
            .with_context(|| format!("Failed to join multicast group {}", multiaddr))?;

        let transport = Self::from_socket(raw_socket.into())?;
        log::info!("Joined multicast group {} on {}", multiaddr, addr);
        Ok(transport)
    }

    /// Receive plain unicast datagrams on `addr`.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket =
            UdpSocket::bind(addr).with_context(|| format!("Failed to bind to {}", addr))?;
        Self::from_socket(socket)
    }

    fn from_socket(socket: UdpSocket) -> Result<Self> {
        socket
            .set_read_timeout(Some(READ_TIMEOUT))
            .context("Failed to set socket read timeout")?;
        Ok(Self {
            socket,
            buf: vec![0u8; BUFFER_SIZE],
            incoming_msg_type: PhantomData,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Wait up to [`READ_TIMEOUT`] for one datagram and decode it. Only transport
    /// failures are returned as errors.
    pub fn recv(&mut self) -> io::Result<Received<I>> {
        let len = match self.socket.recv_from(&mut self.buf) {
            Ok((len, _)) => len,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock
                        | io::ErrorKind::TimedOut
                        | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(Received::Idle)
            }
            Err(err) => return Err(err),
        };
        match I::parse_from_bytes(&self.buf[..len]) {
            Ok(msg) => Ok(Received::Message(msg)),
            Err(err) => Ok(Received::Malformed(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use odens_protos::ssl_vision_wrapper::SSL_WrapperPacket;

    use super::*;

    #[test]
    fn idle_and_malformed() {
        let mut transport =
            Transport::<SSL_WrapperPacket>::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        assert!(matches!(transport.recv().unwrap(), Received::Idle));

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(&[0xff, 0xff, 0xff], transport.local_addr().unwrap())
            .unwrap();
        let mut outcome = transport.recv().unwrap();
        while matches!(outcome, Received::Idle) {
            outcome = transport.recv().unwrap();
        }
        assert!(matches!(outcome, Received::Malformed(_)));
    }

    #[test]
    fn bad_multicast_address() {
        assert!(Transport::<SSL_WrapperPacket>::multicast("not-an-address", 0).is_err());
    }
}
