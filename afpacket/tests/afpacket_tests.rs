#![cfg(target_os = "linux")]

use afpacket::{
    BoundSocket, Error, FilterProgram, FilterTerm, Opcode, ETH_P_ARP, MAX_FRAME_LEN,
};
use proxy_arp_packets as packets;
use rand::{self, Rng};
use std::{net, sync::mpsc, thread, time::Duration};

#[test]
fn missing_interface_is_reported() {
    // Without CAP_NET_RAW the socket call itself fails first.
    match BoundSocket::open("pxarp-nonexist", &FilterProgram::arp(), ETH_P_ARP) {
        Err(Error::InterfaceNotFound(name)) => assert_eq!(name, "pxarp-nonexist"),
        Err(Error::PermissionDenied(_)) => {}
        // some sandboxes lack AF_PACKET entirely
        Err(Error::Io(ref err)) if err.raw_os_error() == Some(libc::EAFNOSUPPORT) => {}
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("opened a socket on a nonexistent interface"),
    }
}

#[test]
fn empty_filter_is_rejected() {
    match BoundSocket::open("lo", &FilterProgram::new(), ETH_P_ARP) {
        Err(Error::FilterRejected(_)) | Err(Error::PermissionDenied(_)) => {}
        Err(Error::Io(ref err)) if err.raw_os_error() == Some(libc::EAFNOSUPPORT) => {}
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("installed an empty filter"),
    }
}

#[test]
#[ignore]
fn kernel_rejects_out_of_range_jump() {
    let mut program = FilterProgram::new();
    program
        .append(FilterTerm::new(Opcode::LoadHalf, 0, 0, 12))
        .unwrap();
    // jf points past the end of the program
    program
        .append(FilterTerm::new(Opcode::JumpEqual, 0, 9, 0x0806))
        .unwrap();
    program
        .append(FilterTerm::new(Opcode::Return, 0, 0, 0x0004_0000))
        .unwrap();

    match BoundSocket::open("lo", &program, ETH_P_ARP) {
        Err(Error::FilterRejected(_)) => {}
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("kernel accepted a jump past the end of the program"),
    }
}

#[test]
#[ignore]
fn arp_filter_on_loopback() {
    // If this takes more than a second to occur, something's definitely wrong.
    let timeout = Duration::from_secs(1);

    let mut rng = rand::thread_rng();

    let mut side_a = BoundSocket::open("lo", &FilterProgram::arp(), ETH_P_ARP).unwrap();
    let mut side_b = BoundSocket::open("lo", &FilterProgram::arp(), ETH_P_ARP).unwrap();
    assert_eq!(side_a.ifindex(), side_b.ifindex());

    let (tx, rx) = mpsc::channel();

    let thread_b = thread::spawn(move || {
        println!("b: recving packet");
        let mut in_buffer = vec![0; MAX_FRAME_LEN];
        let (len, from) = side_b.recv(&mut in_buffer).unwrap();
        in_buffer.truncate(len);
        println!("b: recved packet from {:?}", from.hardware_addr());

        tx.send(in_buffer).unwrap();
    });

    // A non-ARP frame first: the filter must hold it back.
    let mut ipv4 = packets::EthernetHeader::new(
        packets::MacAddr::BROADCAST,
        packets::MacAddr::new([2, 0, 0, 0, 0, 1]),
        packets::IPV4_ETHER_TYPE,
    )
    .to_bytes()
    .to_vec();
    let mut body = vec![0; 64];
    rng.fill(&mut body[..]);
    ipv4.extend_from_slice(&body);
    side_a.send_to([0xff; 6], &ipv4).unwrap();

    let sender = packets::MacAddr::new([2, 0, 0, 0, 0, rng.gen()]);
    let request = packets::ArpPdu::request(
        sender,
        net::Ipv4Addr::new(10, 0, 0, 1),
        net::Ipv4Addr::new(10, 0, 0, rng.gen()),
    );
    let mut frame = Vec::new();
    packets::EthernetHeader::new(packets::MacAddr::BROADCAST, sender, packets::ARP_ETHER_TYPE)
        .encode(&mut frame);
    request.encode(&mut frame);

    println!("a: sending packet");
    side_a.send_to([0xff; 6], &frame).unwrap();
    println!("a: sent packet");

    let in_buffer = rx.recv_timeout(timeout).unwrap();
    assert_eq!(in_buffer, frame);
    assert_eq!(packets::ArpPdu::decode(&in_buffer).unwrap(), request);

    thread_b.join().unwrap();
    side_a.close().unwrap();
}
