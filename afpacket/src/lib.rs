#![cfg(target_os = "linux")]
mod error;
pub mod filter;
mod linux;
mod sockets;

pub use error::Error;
pub use filter::{FilterError, FilterProgram, FilterTerm, Opcode};
pub use sockets::{Addr, BoundSocket, Socket, ETH_P_ARP, MAX_FRAME_LEN};
