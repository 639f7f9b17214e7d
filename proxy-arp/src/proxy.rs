use crate::link::{LinkError, LinkSocket};
use crate::route::RouteLookup;
use proxy_arp_packets::{ArpOp, ArpPdu, EthernetHeader, ARP_ETHER_TYPE};
use tracing::{debug, info, warn};

/// What the proxy did with one received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The frame was too short to hold an ARP message.
    Malformed,
    /// Address sizes other than 6 byte hardware and 4 byte protocol addresses.
    Unsupported,
    /// A reply or an unknown opcode.
    NotRequest,
    /// The route lookup failed or found nothing. Both are treated alike.
    NoRoute,
    /// The target is reachable through the receiving interface, so its owner answers itself.
    SameSegment,
    Replied,
    SendFailed,
}

/// Per-decision counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub received: u64,
    pub malformed: u64,
    pub ignored: u64,
    pub no_route: u64,
    pub same_segment: u64,
    pub replied: u64,
    pub send_failed: u64,
}

impl Stats {
    fn record(&mut self, decision: Decision) -> Decision {
        self.received += 1;
        let counter = match decision {
            Decision::Malformed => &mut self.malformed,
            Decision::Unsupported | Decision::NotRequest => &mut self.ignored,
            Decision::NoRoute => &mut self.no_route,
            Decision::SameSegment => &mut self.same_segment,
            Decision::Replied => &mut self.replied,
            Decision::SendFailed => &mut self.send_failed,
        };
        *counter += 1;
        decision
    }
}

/// Answers ARP requests on behalf of hosts that the routing table places behind another
/// interface.
pub struct ProxyArp<S, R> {
    socket: S,
    routes: R,
    stats: Stats,
}

impl<S: LinkSocket, R: RouteLookup> ProxyArp<S, R> {
    pub fn new(socket: S, routes: R) -> Self {
        ProxyArp {
            socket,
            routes,
            stats: Stats::default(),
        }
    }

    /// Receives and handles frames until the socket reports an error. Per-frame failures are
    /// logged and never end the loop.
    pub fn run(&mut self) -> Result<(), LinkError> {
        loop {
            let (frame, _from) = self.socket.receive()?;
            self.handle_frame(&frame);
        }
    }

    /// Decides on one raw frame, replying by proxy when the target lives elsewhere.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Decision {
        let decision = self.decide(frame);
        self.stats.record(decision)
    }

    fn decide(&mut self, frame: &[u8]) -> Decision {
        let request = match ArpPdu::decode(frame) {
            Ok(pdu) => pdu,
            Err(err) => {
                warn!(%err, "failed to decode ARP packet");
                return Decision::Malformed;
            }
        };

        if !request.has_supported_sizes() {
            debug!(
                hardware_addr_len = request.hardware_addr_len,
                protocol_addr_len = request.protocol_addr_len,
                "ignoring ARP packet with unsupported address sizes"
            );
            return Decision::Unsupported;
        }

        if request.operation() != Some(ArpOp::Request) {
            debug!("ignoring ARP: {}", request);
            return Decision::NotRequest;
        }

        debug!(
            "ARP: Who has {}? Tell {}!",
            request.target_protocol_addr, request.sender_protocol_addr
        );

        let target = request.target_protocol_addr;
        let route = match self.routes.route_get(target) {
            Ok(routes) => routes.into_iter().next(),
            Err(err) => {
                warn!(%target, %err, "unable to get route");
                None
            }
        };
        let route = match route {
            Some(route) => route,
            None => return Decision::NoRoute,
        };

        if route.oif == self.socket.interface_index() {
            debug!(%target, oif = route.oif, "target is on the receiving segment");
            return Decision::SameSegment;
        }

        info!(
            %target,
            oif = route.oif,
            requester = %request.sender_hardware_addr,
            "route points out another interface than where the request was received, performing proxy ARP"
        );

        let local = self.socket.local_address();
        let reply = request.proxy_reply(local);
        let mut frame = Vec::with_capacity(EthernetHeader::LEN + ArpPdu::LEN);
        EthernetHeader::new(request.sender_hardware_addr, local, ARP_ETHER_TYPE).encode(&mut frame);
        reply.encode(&mut frame);

        match self.socket.send(request.sender_hardware_addr, &frame) {
            Ok(()) => Decision::Replied,
            Err(err) => {
                warn!(%err, "failed to send ARP reply");
                Decision::SendFailed
            }
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Gives back the socket and the route lookup, e.g. to close the socket after `run`.
    pub fn into_parts(self) -> (S, R) {
        (self.socket, self.routes)
    }
}
