use crate::logging::{LogConfig, LogFormat};
use clap::{App, Arg, ArgMatches};
use std::ffi::OsString;
use thiserror::Error;
use tracing::Level;

/// Longest interface name the kernel accepts, without the trailing NUL.
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

const LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("interface name must be provided (-i parameter)")]
    MissingInterface,
    #[error("interface name {0:?} is longer than 15 bytes")]
    InterfaceNameTooLong(String),
    #[error("interface name {0:?} contains invalid characters")]
    InvalidInterfaceName(String),
    #[error("{0}")]
    InvalidValue(String),
    #[error(transparent)]
    Args(#[from] clap::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub interface: String,
    pub log: LogConfig,
}

pub fn app() -> App<'static, 'static> {
    App::new("proxy-arp")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Answer ARP requests for hosts routed through another interface")
        .arg(
            Arg::with_name("interface")
                .short("i")
                .long("interface")
                .value_name("IFACE")
                .help("Interface to run on")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("log_level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level, overridden by RUST_LOG")
                .possible_values(LEVELS)
                .default_value("info")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("log_format")
                .long("log-format")
                .value_name("FORMAT")
                .help("Log output format")
                .possible_values(LogFormat::NAMES)
                .default_value("pretty")
                .takes_value(true),
        )
}

impl Config {
    /// Parses command line arguments, including the program name.
    pub fn from_args<I, T>(args: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app().get_matches_from_safe(args)?;
        Config::from_matches(&matches)
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Config, ConfigError> {
        let interface = matches
            .value_of("interface")
            .ok_or(ConfigError::MissingInterface)?;
        validate_interface(interface)?;

        let level = matches
            .value_of("log_level")
            .unwrap_or("info")
            .parse::<Level>()
            .map_err(|err| ConfigError::InvalidValue(err.to_string()))?;
        let format = matches
            .value_of("log_format")
            .unwrap_or("pretty")
            .parse::<LogFormat>()
            .map_err(ConfigError::InvalidValue)?;

        Ok(Config {
            interface: interface.to_string(),
            log: LogConfig { level, format },
        })
    }
}

fn validate_interface(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::MissingInterface);
    }
    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(ConfigError::InterfaceNameTooLong(name.to_string()));
    }
    if name.chars().any(|c| c == '\0' || c == '/' || c.is_whitespace()) {
        return Err(ConfigError::InvalidInterfaceName(name.to_string()));
    }
    Ok(())
}
