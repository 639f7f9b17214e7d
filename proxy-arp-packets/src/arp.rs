use crate::*;
use std::fmt;
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

impl ArpOp {
    pub fn from_u16(code: u16) -> Option<ArpOp> {
        match code {
            1 => Some(ArpOp::Request),
            2 => Some(ArpOp::Reply),
            _ => None,
        }
    }
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

pub const ETHERNET_ADDR_LEN: u8 = 6;
pub const IPV4_ADDR_LEN: u8 = 4;

///
/// One ARP message as described in RFC 826, restricted to the IPv4 over Ethernet
/// layout: 6 byte hardware addresses and 4 byte protocol addresses.
/// https://tools.ietf.org/html/rfc826
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpPdu {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub hardware_addr_len: u8,
    pub protocol_addr_len: u8,
    pub opcode: u16,
    pub sender_hardware_addr: MacAddr,
    pub sender_protocol_addr: Ipv4Addr,
    pub target_hardware_addr: MacAddr,
    pub target_protocol_addr: Ipv4Addr,
}

impl ArpPdu {
    // HW-type(2) | Proto-type(2) | HW-size(1) | Proto-size(1) | Opcode(2) |
    // SenderMAC(6) | SenderIP(4) | TargetMAC(6) | TargetIP(4)
    pub const LEN: usize = 28;

    /// A request for `target`, with every type and size field set for IPv4 over Ethernet.
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        ArpPdu {
            hardware_type: ArpHardwareType::Ethernet as u16,
            protocol_type: IPV4_ETHER_TYPE,
            hardware_addr_len: ETHERNET_ADDR_LEN,
            protocol_addr_len: IPV4_ADDR_LEN,
            opcode: ArpOp::Request as u16,
            sender_hardware_addr: sender_mac,
            sender_protocol_addr: sender_ip,
            target_hardware_addr: MacAddr::default(),
            target_protocol_addr: target_ip,
        }
    }

    ///
    /// Decodes a PDU from a raw frame. The leading Ethernet header is skipped without
    /// being interpreted; the kernel filter has already checked the EtherType.
    ///
    pub fn decode(frame: &[u8]) -> Result<ArpPdu, PacketError> {
        let mut reader = Reader::new(frame);
        reader.take(EthernetHeader::LEN)?;
        Ok(ArpPdu {
            hardware_type: reader.u16()?,
            protocol_type: reader.u16()?,
            hardware_addr_len: reader.u8()?,
            protocol_addr_len: reader.u8()?,
            opcode: reader.u16()?,
            sender_hardware_addr: reader.mac()?,
            sender_protocol_addr: Ipv4Addr::from(reader.u32()?),
            target_hardware_addr: reader.mac()?,
            target_protocol_addr: Ipv4Addr::from(reader.u32()?),
        })
    }

    pub fn to_bytes(&self) -> [u8; ArpPdu::LEN] {
        let mut bytes = [0u8; ArpPdu::LEN];
        bytes[0..2].copy_from_slice(&self.hardware_type.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.protocol_type.to_be_bytes());
        bytes[4] = self.hardware_addr_len;
        bytes[5] = self.protocol_addr_len;
        bytes[6..8].copy_from_slice(&self.opcode.to_be_bytes());
        bytes[8..14].copy_from_slice(&self.sender_hardware_addr.bytes);
        bytes[14..18].copy_from_slice(&self.sender_protocol_addr.octets());
        bytes[18..24].copy_from_slice(&self.target_hardware_addr.bytes);
        bytes[24..28].copy_from_slice(&self.target_protocol_addr.octets());
        bytes
    }

    /// Appends the PDU to `buf`. No Ethernet header is written.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_bytes());
    }

    pub fn operation(&self) -> Option<ArpOp> {
        ArpOp::from_u16(self.opcode)
    }

    /// True when the address sizes match the fixed layout this type decodes: 6 byte
    /// hardware addresses and 4 byte protocol addresses. The type fields are not checked.
    pub fn has_supported_sizes(&self) -> bool {
        self.hardware_addr_len == ETHERNET_ADDR_LEN && self.protocol_addr_len == IPV4_ADDR_LEN
    }

    ///
    /// Builds the reply that claims this request's target address for `local`.
    /// The reply is addressed back to the requester.
    ///
    pub fn proxy_reply(&self, local: MacAddr) -> ArpPdu {
        ArpPdu {
            hardware_type: self.hardware_type,
            protocol_type: self.protocol_type,
            hardware_addr_len: self.hardware_addr_len,
            protocol_addr_len: self.protocol_addr_len,
            opcode: ArpOp::Reply as u16,
            sender_hardware_addr: local,
            sender_protocol_addr: self.target_protocol_addr,
            target_hardware_addr: self.sender_hardware_addr,
            target_protocol_addr: self.sender_protocol_addr,
        }
    }
}

impl fmt::Display for ArpPdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operation() {
            Some(ArpOp::Request) => write!(
                f,
                "who-has {} tell {} ({})",
                self.target_protocol_addr, self.sender_protocol_addr, self.sender_hardware_addr
            ),
            Some(ArpOp::Reply) => write!(
                f,
                "{} is-at {}",
                self.sender_protocol_addr, self.sender_hardware_addr
            ),
            None => write!(
                f,
                "opcode {} from {} ({})",
                self.opcode, self.sender_protocol_addr, self.sender_hardware_addr
            ),
        }
    }
}
