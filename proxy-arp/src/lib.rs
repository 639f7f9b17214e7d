/// Command line configuration. The interface to serve is the only required setting.
pub mod config;

/// Link-layer capture and transmit. `LinkSocket` is the seam between the proxy and the wire: a
/// raw `AF_PACKET` socket in production, an in-memory channel pair under test.
pub mod link;

/// Tracing subscriber setup.
pub mod logging;

/// The proxy itself: decode a request, look its target up in the routing table and, when the
/// route leaves through another interface, answer with our own hardware address.
pub mod proxy;

/// Routing table queries.
pub mod route;

pub use config::{Config, ConfigError};
pub use link::{LinkError, LinkSocket, RawLinkSocket};
pub use proxy::{Decision, ProxyArp, Stats};
pub use route::{NetlinkRoutes, Route, RouteError, RouteLookup};
