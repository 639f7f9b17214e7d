#![deny(missing_docs)]

use crate::{filter::FilterProgram, linux, Error};
use libc;
use std::{
    ffi::CString,
    io,
    mem::{self, MaybeUninit},
};

/// EtherType of ARP, in host byte order.
pub const ETH_P_ARP: u16 = 0x0806;

/// Size of the receive buffer handed to the kernel. Large enough for a jumbo frame.
pub const MAX_FRAME_LEN: usize = 9216;

/// The link-layer address a frame was received from.
pub struct Addr {
    inner: libc::sockaddr_ll,
}

impl Addr {
    /// Hardware address of the sender, as reported by the capture layer.
    pub fn hardware_addr(&self) -> [u8; linux::ETH_ALEN] {
        let mut addr = [0u8; linux::ETH_ALEN];
        addr.copy_from_slice(&self.inner.sll_addr[..linux::ETH_ALEN]);
        addr
    }

    /// Index of the interface the frame arrived on.
    pub fn ifindex(&self) -> u32 {
        self.inner.sll_ifindex as u32
    }

    /// Packet type (`PACKET_HOST`, `PACKET_BROADCAST`, ...), see `man 7 packet`.
    pub fn pkttype(&self) -> u8 {
        self.inner.sll_pkttype
    }
}

/// Represents an unbound `AF_PACKET` socket.  At this phase of a socket's lifecycle, it can be
/// configured.
pub struct Socket {
    fd: libc::c_int,
    protocol: u16,
}

/// Represents a bound `AF_PACKET` socket. At this phase of a socket's lifecycle, it can be read
/// to/written from.
pub struct BoundSocket {
    fd: libc::c_int,
    protocol: u16,
    ifindex: libc::c_int,
    hw_addr: [u8; linux::ETH_ALEN],
}

impl Socket {
    /// Creates a new unbound socket that captures frames of the given EtherType.
    pub fn new(protocol: u16) -> Result<Self, Error> {
        // This block must be marked as unsafe because it uses FFI with C code. It does not
        // interact with any memory owned by Rust code.
        let fd = unsafe {
            // Resources:
            // man 7 packet
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                libc::c_int::from(protocol.to_be()),
            )
        };
        if fd < 0 {
            return Err(Error::from_socket(io::Error::last_os_error()));
        }
        Ok(Self { fd, protocol })
    }

    /// Installs a classic BPF program so that only matching frames reach user space.
    pub fn attach_filter(&mut self, program: &FilterProgram) -> Result<(), Error> {
        if program.is_empty() {
            return Err(Error::FilterRejected("empty program".to_string()));
        }
        let prog = linux::sock_fprog {
            len: program.len() as libc::c_ushort,
            filter: program.terms().as_ptr(),
        };
        // The kernel copies the program during the call, so borrowing `program` is enough.
        let err = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_ATTACH_FILTER,
                &prog as *const linux::sock_fprog as *const libc::c_void,
                mem::size_of::<linux::sock_fprog>() as libc::socklen_t,
            )
        };
        if err < 0 {
            return Err(Error::FilterRejected(
                io::Error::last_os_error().to_string(),
            ));
        }
        Ok(())
    }

    /// Binds the socket to a network interface. This function consumes the `Socket` instance, as
    /// no more configuration options may be safely changed. On failure the socket is dropped and
    /// its descriptor closed.
    pub fn bind(self, iface: &str) -> Result<BoundSocket, Error> {
        let ifindex = unsafe {
            let mut ifr = ifreq_for(iface)?;
            // ioctl(SIOCGIFINDEX) fills in the index field of the ifreq object
            // Resources:
            // man 7 netdevice
            if libc::ioctl(self.fd, linux::SIOCGIFINDEX, &mut ifr) < 0 {
                return Err(Error::from_lookup(iface, io::Error::last_os_error()));
            }
            ifr.ifr_ifru.ifru_ivalue // expanded from `ifr_ifindex` in kernel headers
        };

        let hw_addr = unsafe {
            let mut ifr = ifreq_for(iface)?;
            if libc::ioctl(self.fd, linux::SIOCGIFHWADDR, &mut ifr) < 0 {
                return Err(Error::from_lookup(iface, io::Error::last_os_error()));
            }
            let mut hw_addr = [0u8; linux::ETH_ALEN];
            for (dst, src) in hw_addr.iter_mut().zip(ifr.ifr_ifru.ifru_hwaddr.sa_data.iter()) {
                *dst = *src as u8;
            }
            hw_addr
        };

        // Resources:
        // man 7 packet regarding sockaddr_ll
        let err = unsafe {
            let mut ll: libc::sockaddr_ll = MaybeUninit::zeroed().assume_init();
            ll.sll_family = libc::AF_PACKET as libc::c_ushort;
            ll.sll_protocol = self.protocol.to_be();
            ll.sll_ifindex = ifindex;
            libc::bind(
                self.fd,
                &ll as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if err < 0 {
            return Err(Error::from_lookup(iface, io::Error::last_os_error()));
        }

        let fd = self.fd;
        let protocol = self.protocol;
        // The descriptor now belongs to the BoundSocket; skip Socket's Drop so it is not closed
        // twice.
        mem::forget(self);
        Ok(BoundSocket {
            fd,
            protocol,
            ifindex,
            hw_addr,
        })
    }
}

/// Builds an `ifreq` carrying `iface` as its name.
fn ifreq_for(iface: &str) -> Result<linux::ifreq, Error> {
    let name = CString::new(iface).map_err(|_| Error::InterfaceNotFound(iface.to_string()))?;
    let name = name.as_bytes_with_nul();
    if name.len() > libc::IFNAMSIZ {
        return Err(Error::InterfaceNotFound(iface.to_string()));
    }
    // An all-zero ifreq is a valid value for every member of its unions.
    let mut ifr: linux::ifreq = unsafe { MaybeUninit::zeroed().assume_init() };
    unsafe {
        for (dst, src) in ifr.ifr_ifrn.ifrn_name.iter_mut().zip(name.iter()) {
            *dst = *src as libc::c_char;
        }
    }
    Ok(ifr)
}

impl BoundSocket {
    /// Opens a socket for `protocol` frames on `iface` with `program` installed. Any descriptor
    /// opened along the way is closed again if a later step fails.
    pub fn open(iface: &str, program: &FilterProgram, protocol: u16) -> Result<Self, Error> {
        let mut sock = Socket::new(protocol)?;
        sock.attach_filter(program)?;
        sock.bind(iface)
    }

    /// Index of the bound interface.
    pub fn ifindex(&self) -> u32 {
        self.ifindex as u32
    }

    /// Hardware address of the bound interface.
    pub fn hardware_addr(&self) -> [u8; linux::ETH_ALEN] {
        self.hw_addr
    }

    /// Sends a complete frame (Ethernet header included) to `dest` on the bound interface.
    pub fn send_to(&mut self, dest: [u8; linux::ETH_ALEN], frame: &[u8]) -> io::Result<usize> {
        // This block is marked as unsafe because it uses FFI. It borrows the Rust-owned frame and
        // passes its length along, so the C side never reads past the end.
        unsafe {
            let mut ll: libc::sockaddr_ll = MaybeUninit::zeroed().assume_init();
            ll.sll_family = libc::AF_PACKET as libc::c_ushort;
            ll.sll_protocol = self.protocol.to_be();
            ll.sll_ifindex = self.ifindex;
            ll.sll_hatype = linux::ARPHRD_ETHER;
            ll.sll_pkttype = linux::PACKET_OTHERHOST;
            ll.sll_halen = linux::ETH_ALEN as libc::c_uchar;
            ll.sll_addr[..linux::ETH_ALEN].copy_from_slice(&dest);

            let bytes = libc::sendto(
                self.fd,
                frame.as_ptr() as *const _,
                frame.len(),
                0,
                &ll as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(bytes as usize)
            }
        }
    }

    /// Receives a frame from the NIC. Blocks until a frame passing the filter arrives.
    pub fn recv(&mut self, frame: &mut [u8]) -> io::Result<(usize, Addr)> {
        // Note comment in `send_to` call.
        unsafe {
            let mut from = MaybeUninit::<libc::sockaddr_ll>::zeroed();
            let mut addrlen = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;

            let bytes = libc::recvfrom(
                self.fd,
                frame.as_mut_ptr() as *mut _,
                frame.len(),
                0,
                from.as_mut_ptr() as *mut libc::sockaddr,
                &mut addrlen,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok((
                    bytes as usize,
                    Addr {
                        inner: from.assume_init(),
                    },
                ))
            }
        }
    }

    /// Closes the socket, reporting any error from `close(2)`. Consuming `self` keeps the
    /// descriptor from being released a second time by `Drop`.
    pub fn close(self) -> io::Result<()> {
        let fd = self.fd;
        mem::forget(self);
        if unsafe { libc::close(fd) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
