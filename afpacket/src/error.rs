use std::io;
use thiserror::Error;

/// Failures while setting up or using an `AF_PACKET` socket.
#[derive(Debug, Error)]
pub enum Error {
    #[error("interface {0:?} not found")]
    InterfaceNotFound(String),
    #[error("raw packet capture not permitted (CAP_NET_RAW required): {0}")]
    PermissionDenied(#[source] io::Error),
    #[error("kernel rejected the packet filter: {0}")]
    FilterRejected(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Classifies a failed `socket(2)` call.
    pub(crate) fn from_socket(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EPERM) | Some(libc::EACCES) => Error::PermissionDenied(err),
            _ => Error::Io(err),
        }
    }

    /// Classifies a failed interface lookup for `iface`.
    pub(crate) fn from_lookup(iface: &str, err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ENODEV) | Some(libc::ENXIO) => Error::InterfaceNotFound(iface.to_string()),
            _ => Error::Io(err),
        }
    }
}
