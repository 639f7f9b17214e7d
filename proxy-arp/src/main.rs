use afpacket::{FilterProgram, ETH_P_ARP};
use anyhow::Context;
use proxy_arp::{config, logging, Config, LinkSocket, NetlinkRoutes, ProxyArp, RawLinkSocket};
use tracing::{error, info, info_span};

fn main() -> anyhow::Result<()> {
    // Collect arguments from user
    let matches = config::app().get_matches();
    let config = Config::from_matches(&matches)?;
    logging::init_logging(&config.log);

    let span = info_span!("proxy_arp", iface = %config.interface);
    let _enter = span.enter();

    let socket = RawLinkSocket::open(&config.interface, &FilterProgram::arp(), ETH_P_ARP)
        .with_context(|| format!("unable to get ethernet interface handle for {}", config.interface))?;
    let routes = NetlinkRoutes::new().context("unable to open routing socket")?;

    info!(
        ifindex = socket.interface_index(),
        mac = %socket.local_address(),
        "answering ARP requests by proxy"
    );

    let mut proxy = ProxyArp::new(socket, routes);
    let result = proxy.run();
    if let Err(err) = &result {
        error!(%err, "failed to receive packet");
    }
    info!(stats = ?proxy.stats(), "stopped");

    let (socket, _routes) = proxy.into_parts();
    socket.close().context("unable to close raw socket")?;
    result.context("receive loop failed")
}
