use super::{LinkError, LinkSocket};
use afpacket::FilterProgram;
use crossbeam::crossbeam_channel::{unbounded, Receiver, Sender};
use proxy_arp_packets::MacAddr;
use std::io;

/// In-memory `LinkSocket`. Frames pushed into the peer's `inject` channel are run through the
/// filter program like the kernel would; frames handed to `send` come out of the peer's `sent`
/// channel as `(destination, frame)`.
pub struct ChannelSocket {
    filter: FilterProgram,
    local: MacAddr,
    ifindex: u32,
    inbound: Receiver<(Vec<u8>, MacAddr)>,
    outbound: Sender<(MacAddr, Vec<u8>)>,
}

/// The far side of a `ChannelSocket`.
pub struct ChannelPeer {
    pub inject: Sender<(Vec<u8>, MacAddr)>,
    pub sent: Receiver<(MacAddr, Vec<u8>)>,
}

impl ChannelSocket {
    pub fn new(filter: FilterProgram, local: MacAddr, ifindex: u32) -> (ChannelSocket, ChannelPeer) {
        let (inject, inbound) = unbounded();
        let (outbound, sent) = unbounded();
        let socket = ChannelSocket {
            filter,
            local,
            ifindex,
            inbound,
            outbound,
        };
        (socket, ChannelPeer { inject, sent })
    }
}

impl LinkSocket for ChannelSocket {
    /// Fails with `Receive` once every `inject` sender is gone and the queue is drained.
    fn receive(&mut self) -> Result<(Vec<u8>, MacAddr), LinkError> {
        loop {
            let (mut frame, from) = self.inbound.recv().map_err(|_| {
                LinkError::Receive(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "inbound channel closed",
                ))
            })?;
            let verdict = self.filter.accepts(&frame) as usize;
            if verdict == 0 {
                continue;
            }
            frame.truncate(verdict);
            return Ok((frame, from));
        }
    }

    /// Fails with `Send` once the peer's `sent` receiver is gone.
    fn send(&mut self, dest: MacAddr, frame: &[u8]) -> Result<(), LinkError> {
        self.outbound.send((dest, frame.to_vec())).map_err(|_| {
            LinkError::Send(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "outbound channel closed",
            ))
        })
    }

    fn local_address(&self) -> MacAddr {
        self.local
    }

    fn interface_index(&self) -> u32 {
        self.ifindex
    }

    fn close(self) -> Result<(), LinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_arp_packets::{EthernetHeader, ARP_ETHER_TYPE, IPV4_ETHER_TYPE};

    fn frame(ether_type: u16) -> Vec<u8> {
        let mut frame = Vec::new();
        EthernetHeader::new(MacAddr::BROADCAST, MacAddr::new([1; 6]), ether_type)
            .encode(&mut frame);
        frame.resize(60, 0);
        frame
    }

    #[test]
    fn filter_applies_to_inbound_frames() {
        let (mut socket, peer) = ChannelSocket::new(FilterProgram::arp(), MacAddr::new([2; 6]), 3);
        peer.inject.send((frame(IPV4_ETHER_TYPE), MacAddr::new([1; 6]))).unwrap();
        peer.inject.send((frame(ARP_ETHER_TYPE), MacAddr::new([1; 6]))).unwrap();
        drop(peer.inject);

        let (received, from) = socket.receive().unwrap();
        assert_eq!(received, frame(ARP_ETHER_TYPE));
        assert_eq!(from, MacAddr::new([1; 6]));

        match socket.receive() {
            Err(LinkError::Receive(_)) => {}
            other => panic!("expected receive error, got {:?}", other.map(|(f, _)| f.len())),
        }
    }

    #[test]
    fn sent_frames_reach_peer() {
        let (mut socket, peer) = ChannelSocket::new(FilterProgram::arp(), MacAddr::new([2; 6]), 3);
        assert_eq!(socket.local_address(), MacAddr::new([2; 6]));
        assert_eq!(socket.interface_index(), 3);

        socket.send(MacAddr::new([1; 6]), &[1, 2, 3]).unwrap();
        assert_eq!(peer.sent.recv(), Ok((MacAddr::new([1; 6]), vec![1, 2, 3])));

        drop(peer.sent);
        assert!(matches!(
            socket.send(MacAddr::new([1; 6]), &[1]),
            Err(LinkError::Send(_))
        ));
        socket.close().unwrap();
    }
}
