use crate::*;

/// An Ethernet II header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dest: MacAddr,
    pub src: MacAddr,
    pub ether_type: u16,
}

impl EthernetHeader {
    // 0                    6                    12                      14
    // |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
    pub const LEN: usize = 14;

    pub fn new(dest: MacAddr, src: MacAddr, ether_type: u16) -> Self {
        EthernetHeader {
            dest,
            src,
            ether_type,
        }
    }

    pub fn decode(frame: &[u8]) -> Result<EthernetHeader, PacketError> {
        let mut reader = Reader::new(frame);
        Ok(EthernetHeader {
            dest: reader.mac()?,
            src: reader.mac()?,
            ether_type: reader.u16()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; EthernetHeader::LEN] {
        let mut bytes = [0u8; EthernetHeader::LEN];
        bytes[..6].copy_from_slice(&self.dest.bytes);
        bytes[6..12].copy_from_slice(&self.src.bytes);
        bytes[12..].copy_from_slice(&self.ether_type.to_be_bytes());
        bytes
    }

    /// Appends the 14 header bytes to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethernet_header() {
        let data: Vec<u8> = vec![0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 1, 2, 3, 4, 5, 6, 0, 0];
        let header = EthernetHeader::decode(&data).unwrap();
        assert_eq!(header.dest, MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0xff, 0xff]));
        assert_eq!(header.src, MacAddr::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(header.ether_type, 0);
    }

    #[test]
    fn invalid_data_length() {
        let data: Vec<u8> = vec![0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 1, 2, 3, 4, 5, 6];
        assert_eq!(
            EthernetHeader::decode(&data),
            Err(PacketError::Truncated {
                needed: 14,
                available: 12
            })
        );
    }

    #[test]
    fn ether_type_is_big_endian() {
        let header = EthernetHeader::new(
            MacAddr::BROADCAST,
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            ARP_ETHER_TYPE,
        );
        let bytes = header.to_bytes();
        assert_eq!(&bytes[..6], &[0xff; 6]);
        assert_eq!(&bytes[6..12], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&bytes[12..], &[0x08, 0x06]);
    }

    #[test]
    fn encode_appends() {
        let header = EthernetHeader::new(
            MacAddr::new([0x98, 0x88, 0x18, 0x12, 0xb4, 0xdf]),
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            0xffff,
        );
        let mut buf = vec![0xaa];
        header.encode(&mut buf);
        assert_eq!(buf.len(), 1 + EthernetHeader::LEN);
        assert_eq!(EthernetHeader::decode(&buf[1..]), Ok(header));
    }
}
