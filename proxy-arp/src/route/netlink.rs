//! Route lookups through an rtnetlink socket, the equivalent of `ip route get <addr>`.

use super::{Route, RouteError, RouteLookup};
use libc;
use std::{
    io,
    mem::{self, MaybeUninit},
    net::Ipv4Addr,
};
use tracing::trace;

// linux/netlink.h
const NLMSG_HDRLEN: usize = 16;
const NLMSG_ERROR: u16 = 2;
const NLMSG_DONE: u16 = 3;
const NLM_F_REQUEST: u16 = 1;

// linux/rtnetlink.h
const RTM_NEWROUTE: u16 = 24;
const RTM_GETROUTE: u16 = 26;
const RTMSG_LEN: usize = 12;
const RTA_HDRLEN: usize = 4;
const RTA_DST: u16 = 1;
const RTA_OIF: u16 = 4;

const RECV_BUFFER_LEN: usize = 8192;

fn align4(len: usize) -> usize {
    (len + 3) & !3
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_ne_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_ne_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Builds an `RTM_GETROUTE` request for a single IPv4 host.
fn route_request(dest: Ipv4Addr, seq: u32) -> Vec<u8> {
    let attr_len = RTA_HDRLEN + 4;
    let len = NLMSG_HDRLEN + RTMSG_LEN + attr_len;
    let mut msg = Vec::with_capacity(len);

    // struct nlmsghdr
    msg.extend_from_slice(&(len as u32).to_ne_bytes());
    msg.extend_from_slice(&RTM_GETROUTE.to_ne_bytes());
    msg.extend_from_slice(&NLM_F_REQUEST.to_ne_bytes());
    msg.extend_from_slice(&seq.to_ne_bytes());
    msg.extend_from_slice(&0u32.to_ne_bytes());

    // struct rtmsg: family, dst_len, src_len, tos, table, protocol, scope, type, flags
    msg.extend_from_slice(&[libc::AF_INET as u8, 32, 0, 0, 0, 0, 0, 0]);
    msg.extend_from_slice(&0u32.to_ne_bytes());

    // struct rtattr + RTA_DST payload (network order, as on the wire)
    msg.extend_from_slice(&(attr_len as u16).to_ne_bytes());
    msg.extend_from_slice(&RTA_DST.to_ne_bytes());
    msg.extend_from_slice(&dest.octets());

    msg
}

/// Parses one datagram of replies to request `seq`.
///
/// Returns `Ok(None)` when the datagram holds nothing for `seq`, so the caller should keep
/// reading.
fn parse_route_reply(
    buf: &[u8],
    seq: u32,
    dest: Ipv4Addr,
) -> Result<Option<Vec<Route>>, RouteError> {
    let mut routes = Vec::new();
    let mut answered = false;
    let mut off = 0;

    while off + NLMSG_HDRLEN <= buf.len() {
        let len = read_u32(buf, off) as usize;
        if len < NLMSG_HDRLEN || off + len > buf.len() {
            return Err(RouteError::Malformed("message length out of bounds"));
        }
        let kind = read_u16(buf, off + 4);
        let msg_seq = read_u32(buf, off + 8);
        let body = &buf[off + NLMSG_HDRLEN..off + len];
        off += align4(len);

        if msg_seq != seq {
            trace!(msg_seq, seq, "skipping stale netlink message");
            continue;
        }
        answered = true;

        match kind {
            NLMSG_ERROR => {
                if body.len() < 4 {
                    return Err(RouteError::Malformed("truncated error message"));
                }
                let errno = read_u32(body, 0) as i32;
                if errno != 0 {
                    return Err(RouteError::Lookup {
                        dest,
                        source: io::Error::from_raw_os_error(-errno),
                    });
                }
            }
            NLMSG_DONE => break,
            RTM_NEWROUTE => {
                if body.len() < RTMSG_LEN {
                    return Err(RouteError::Malformed("truncated rtmsg"));
                }
                if let Some(oif) = find_oif(&body[RTMSG_LEN..])? {
                    routes.push(Route { oif });
                }
            }
            _ => {}
        }
    }

    Ok(if answered { Some(routes) } else { None })
}

/// Walks the attributes following an `rtmsg` and returns `RTA_OIF`, if present.
fn find_oif(attrs: &[u8]) -> Result<Option<u32>, RouteError> {
    let mut off = 0;
    while off + RTA_HDRLEN <= attrs.len() {
        let len = read_u16(attrs, off) as usize;
        let kind = read_u16(attrs, off + 2);
        if len < RTA_HDRLEN || off + len > attrs.len() {
            return Err(RouteError::Malformed("attribute length out of bounds"));
        }
        if kind == RTA_OIF && len >= RTA_HDRLEN + 4 {
            return Ok(Some(read_u32(attrs, off + RTA_HDRLEN)));
        }
        off += align4(len);
    }
    Ok(None)
}

/// Looks routes up in the kernel's main routing table over `NETLINK_ROUTE`.
pub struct NetlinkRoutes {
    fd: libc::c_int,
    seq: u32,
    buffer: Vec<u8>,
}

impl NetlinkRoutes {
    pub fn new() -> Result<Self, RouteError> {
        let fd = unsafe {
            libc::socket(
                libc::AF_NETLINK,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                libc::NETLINK_ROUTE,
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }
        // Owned from here on, so an early return below closes it.
        let routes = NetlinkRoutes {
            fd,
            seq: 0,
            buffer: vec![0; RECV_BUFFER_LEN],
        };

        // Let the kernel pick our port id.
        let err = unsafe {
            let mut addr: libc::sockaddr_nl = MaybeUninit::zeroed().assume_init();
            addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
            libc::bind(
                routes.fd,
                &addr as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if err < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(routes)
    }

    fn send(&self, msg: &[u8]) -> io::Result<()> {
        let err = unsafe {
            let mut kernel: libc::sockaddr_nl = MaybeUninit::zeroed().assume_init();
            kernel.nl_family = libc::AF_NETLINK as libc::sa_family_t;
            libc::sendto(
                self.fd,
                msg.as_ptr() as *const _,
                msg.len(),
                0,
                &kernel as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if err < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn recv(&mut self) -> io::Result<usize> {
        loop {
            let bytes = unsafe {
                libc::recv(
                    self.fd,
                    self.buffer.as_mut_ptr() as *mut _,
                    self.buffer.len(),
                    0,
                )
            };
            if bytes >= 0 {
                return Ok(bytes as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

impl RouteLookup for NetlinkRoutes {
    fn route_get(&mut self, dest: Ipv4Addr) -> Result<Vec<Route>, RouteError> {
        self.seq = self.seq.wrapping_add(1);
        let seq = self.seq;
        self.send(&route_request(dest, seq))?;

        loop {
            let len = self.recv()?;
            if let Some(routes) = parse_route_reply(&self.buffer[..len], seq, dest)? {
                trace!(%dest, ?routes, "route lookup");
                return Ok(routes);
            }
        }
    }
}

impl Drop for NetlinkRoutes {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
