use super::{LinkError, LinkSocket};
use afpacket::{BoundSocket, FilterProgram, MAX_FRAME_LEN};
use proxy_arp_packets::MacAddr;
use std::io;
use tracing::{debug, trace};

/// `LinkSocket` over a Linux `AF_PACKET` socket.
pub struct RawLinkSocket {
    sock: BoundSocket,
    local: MacAddr,
    buffer: Vec<u8>,
}

impl RawLinkSocket {
    /// Opens a raw socket on `iface`, installs `filter` and binds it to `ether_type` frames.
    pub fn open(iface: &str, filter: &FilterProgram, ether_type: u16) -> Result<Self, LinkError> {
        let sock = BoundSocket::open(iface, filter, ether_type)?;
        let local = MacAddr::new(sock.hardware_addr());
        debug!(
            iface,
            ifindex = sock.ifindex(),
            %local,
            terms = filter.len(),
            "raw socket bound"
        );
        for (pos, term) in filter.terms().iter().enumerate() {
            debug!("filter[{}] = {}", pos, term);
        }
        Ok(RawLinkSocket {
            sock,
            local,
            buffer: vec![0; MAX_FRAME_LEN],
        })
    }
}

/// A socket sees every interface's traffic between `socket()` and `bind()`. Only frames that
/// arrived on the bound interface may reach the proxy.
fn on_bound_interface(bound: u32, arrived: u32) -> bool {
    bound == arrived
}

impl LinkSocket for RawLinkSocket {
    fn receive(&mut self) -> Result<(Vec<u8>, MacAddr), LinkError> {
        loop {
            match self.sock.recv(&mut self.buffer) {
                Ok((len, from)) => {
                    let mac = MacAddr::new(from.hardware_addr());
                    if !on_bound_interface(self.sock.ifindex(), from.ifindex()) {
                        // queued before bind() narrowed the socket to one interface
                        trace!(len, from = %mac, ifindex = from.ifindex(), "dropping foreign frame");
                        continue;
                    }
                    trace!(
                        len,
                        from = %mac,
                        pkttype = from.pkttype(),
                        "received frame"
                    );
                    return Ok((self.buffer[..len].to_vec(), mac));
                }
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(LinkError::Receive(err)),
            }
        }
    }

    fn send(&mut self, dest: MacAddr, frame: &[u8]) -> Result<(), LinkError> {
        let sent = self
            .sock
            .send_to(dest.bytes, frame)
            .map_err(LinkError::Send)?;
        if sent != frame.len() {
            return Err(LinkError::Send(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", sent, frame.len()),
            )));
        }
        Ok(())
    }

    fn local_address(&self) -> MacAddr {
        self.local
    }

    fn interface_index(&self) -> u32 {
        self.sock.ifindex()
    }

    fn close(self) -> Result<(), LinkError> {
        self.sock.close().map_err(LinkError::Close)
    }
}
