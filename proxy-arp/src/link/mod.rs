use proxy_arp_packets::MacAddr;
use std::io;
use thiserror::Error;

mod channel;
mod raw;

pub use channel::{ChannelPeer, ChannelSocket};
pub use raw::RawLinkSocket;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("interface {0:?} not found")]
    InterfaceNotFound(String),
    #[error("permission denied opening raw socket: {0}")]
    PermissionDenied(#[source] io::Error),
    #[error("packet filter rejected: {0}")]
    FilterRejected(String),
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("close failed: {0}")]
    Close(#[source] io::Error),
    #[error(transparent)]
    Io(io::Error),
}

impl From<afpacket::Error> for LinkError {
    fn from(err: afpacket::Error) -> Self {
        match err {
            afpacket::Error::InterfaceNotFound(name) => LinkError::InterfaceNotFound(name),
            afpacket::Error::PermissionDenied(err) => LinkError::PermissionDenied(err),
            afpacket::Error::FilterRejected(reason) => LinkError::FilterRejected(reason),
            afpacket::Error::Io(err) => LinkError::Io(err),
        }
    }
}

/// A link-layer capture/transmit handle bound to one interface.
///
/// `RawLinkSocket` is backed by an `AF_PACKET` socket; `ChannelSocket` keeps frames in memory
/// so the proxy can be driven without privileges.
pub trait LinkSocket {
    /// Blocks until a frame passing the installed filter arrives. Returns the frame and the
    /// hardware address it came from.
    fn receive(&mut self) -> Result<(Vec<u8>, MacAddr), LinkError>;

    /// Transmits a complete Ethernet frame to `dest`.
    fn send(&mut self, dest: MacAddr, frame: &[u8]) -> Result<(), LinkError>;

    fn local_address(&self) -> MacAddr;

    fn interface_index(&self) -> u32;

    /// Releases the handle. Consumes the socket, so it cannot be closed twice.
    fn close(self) -> Result<(), LinkError>
    where
        Self: Sized;
}
