use afpacket::FilterProgram;
use proxy_arp::link::ChannelSocket;
use proxy_arp::route::StaticRoutes;
use proxy_arp::{LinkError, ProxyArp};
use proxy_arp_packets::{ArpOp, ArpPdu, EthernetHeader, MacAddr, ARP_ETHER_TYPE};
use std::{net::Ipv4Addr, thread, time::Duration};

const ETH0: u32 = 2;
const ETH1: u32 = 3;

fn request_frame(sender: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
    let mut frame = Vec::new();
    EthernetHeader::new(MacAddr::BROADCAST, sender, ARP_ETHER_TYPE).encode(&mut frame);
    ArpPdu::request(sender, sender_ip, target_ip).encode(&mut frame);
    // minimum Ethernet payload padding
    frame.resize(60, 0);
    frame
}

#[test]
fn proxies_only_remote_targets() {
    // If this takes more than a second to occur, something's definitely wrong.
    let timeout = Duration::from_secs(1);

    let requester: MacAddr = "aa:aa:aa:aa:aa:aa".parse().unwrap();
    let local: MacAddr = "bb:bb:bb:bb:bb:bb".parse().unwrap();
    let requester_ip = Ipv4Addr::new(10, 0, 0, 5);
    let remote = Ipv4Addr::new(10, 0, 1, 9);
    let neighbour = Ipv4Addr::new(10, 0, 0, 7);
    let unroutable = Ipv4Addr::new(192, 0, 2, 1);

    let routes = StaticRoutes::new()
        .route(remote, ETH1)
        .route(neighbour, ETH0);
    let (socket, peer) = ChannelSocket::new(FilterProgram::arp(), local, ETH0);

    let proxy_thread = thread::spawn(move || {
        let mut proxy = ProxyArp::new(socket, routes);
        let result = proxy.run();
        (result, proxy.stats())
    });

    for target in &[neighbour, unroutable, remote] {
        peer.inject
            .send((request_frame(requester, requester_ip, *target), requester))
            .unwrap();
    }

    let (dest, frame) = peer.sent.recv_timeout(timeout).unwrap();
    assert_eq!(dest, requester);
    let reply = ArpPdu::decode(&frame).unwrap();
    assert_eq!(reply.operation(), Some(ArpOp::Reply));
    assert_eq!(reply.sender_hardware_addr, local);
    assert_eq!(reply.sender_protocol_addr, remote);
    assert_eq!(reply.target_hardware_addr, requester);
    assert_eq!(reply.target_protocol_addr, requester_ip);

    drop(peer.inject);
    let (result, stats) = proxy_thread.join().unwrap();
    assert!(matches!(result, Err(LinkError::Receive(_))));
    assert_eq!(stats.received, 3);
    assert_eq!(stats.same_segment, 1);
    assert_eq!(stats.no_route, 1);
    assert_eq!(stats.replied, 1);

    // the proxy has hung up, nothing else was sent
    assert!(peer.sent.try_recv().is_err());
}
