#![allow(non_camel_case_types)]

use crate::filter::FilterTerm;
use libc;

pub(crate) const SIOCGIFINDEX: libc::c_ulong = 0x8933;
pub(crate) const SIOCGIFHWADDR: libc::c_ulong = 0x8927;

/// Hardware address length of an Ethernet device.
pub(crate) const ETH_ALEN: usize = 6;

#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct ifmap {
    pub(crate) mem_start: libc::c_ulong,
    pub(crate) mem_end: libc::c_ulong,
    pub(crate) base_addr: libc::c_ushort,
    pub(crate) irq: libc::c_uchar,
    pub(crate) dma: libc::c_uchar,
    pub(crate) port: libc::c_uchar,
}

#[repr(C)]
pub(crate) union ifru {
    pub(crate) ifru_addr: libc::sockaddr,
    pub(crate) ifru_hwaddr: libc::sockaddr,
    pub(crate) ifru_flags: libc::c_short,
    pub(crate) ifru_ivalue: libc::c_int,
    pub(crate) ifru_mtu: libc::c_int,
    pub(crate) ifru_map: ifmap,
    pub(crate) ifru_newname: [libc::c_char; libc::IFNAMSIZ],
}

#[repr(C)]
pub(crate) union ifrn {
    pub(crate) ifrn_name: [libc::c_char; libc::IFNAMSIZ],
}

#[repr(C)]
pub(crate) struct ifreq {
    pub(crate) ifr_ifrn: ifrn,
    pub(crate) ifr_ifru: ifru,
}

/// `struct sock_fprog` from `linux/filter.h`.
#[repr(C)]
pub(crate) struct sock_fprog {
    pub(crate) len: libc::c_ushort,
    pub(crate) filter: *const FilterTerm,
}

/// `sll_hatype` of an Ethernet device, from `linux/if_arp.h`.
pub(crate) const ARPHRD_ETHER: libc::c_ushort = 1;
/// `sll_pkttype` for frames addressed to another host, from `linux/if_packet.h`.
pub(crate) const PACKET_OTHERHOST: libc::c_uchar = 3;
