use super::{Route, RouteError, RouteLookup};
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::Ipv4Addr;

/// A fixed host-route table held in memory. Destinations without an entry have no route.
#[derive(Debug, Clone, Default)]
pub struct StaticRoutes {
    routes: HashMap<Ipv4Addr, u32>,
    failing: HashSet<Ipv4Addr>,
    lookups: usize,
}

impl StaticRoutes {
    pub fn new() -> Self {
        StaticRoutes::default()
    }

    /// Routes `dest` out of interface `oif`.
    pub fn route(mut self, dest: Ipv4Addr, oif: u32) -> Self {
        self.routes.insert(dest, oif);
        self
    }

    /// Makes lookups for `dest` fail as if the routing service had errored.
    pub fn fail(mut self, dest: Ipv4Addr) -> Self {
        self.failing.insert(dest);
        self
    }

    /// Number of lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}

impl RouteLookup for StaticRoutes {
    fn route_get(&mut self, dest: Ipv4Addr) -> Result<Vec<Route>, RouteError> {
        self.lookups += 1;
        if self.failing.contains(&dest) {
            return Err(RouteError::Lookup {
                dest,
                source: io::Error::new(io::ErrorKind::Other, "network is unreachable"),
            });
        }
        Ok(self
            .routes
            .get(&dest)
            .map(|&oif| vec![Route { oif }])
            .unwrap_or_default())
    }
}
