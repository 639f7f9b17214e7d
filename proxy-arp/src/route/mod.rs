use std::io;
use std::net::Ipv4Addr;
use thiserror::Error;

mod netlink;
mod static_routes;

pub use netlink::NetlinkRoutes;
pub use static_routes::StaticRoutes;

/// One candidate route, reduced to the part the proxy needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Index of the egress interface.
    pub oif: u32,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route lookup for {dest} failed: {source}")]
    Lookup {
        dest: Ipv4Addr,
        #[source]
        source: io::Error,
    },
    #[error("malformed netlink reply: {0}")]
    Malformed(&'static str),
    #[error("netlink socket error: {0}")]
    Io(#[from] io::Error),
}

/// Asks the routing table how a destination would be reached.
pub trait RouteLookup {
    /// Returns the candidate routes for `dest`, best first. An empty list means no route.
    fn route_get(&mut self, dest: Ipv4Addr) -> Result<Vec<Route>, RouteError>;
}
