use crate::crs::Crs;
use anyhow::{Result, anyhow};
use std::env;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

pub const DEFAULT_PORT: u16 = 8089;
pub const DEFAULT_PORT_RANGE_END: u16 = 8099;

/// Server settings, read from `PERMALINK_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: Ipv4Addr,
    pub port: u16,
    pub port_range_end: u16,
    /// Host (and port) written into generated permalinks
    pub public_host: Option<String>,
    pub working_crs: Crs,
    /// Map themes the session offers, from a comma separated list
    pub themes: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Ipv4Addr::LOCALHOST,
            port: DEFAULT_PORT,
            port_range_end: DEFAULT_PORT_RANGE_END,
            public_host: None,
            working_crs: Crs::default(),
            themes: vec![],
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable values fall back to the defaults
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let bind = match lookup("PERMALINK_BIND") {
            Some(bind) => bind.trim().parse::<Ipv4Addr>().unwrap_or(defaults.bind),
            None => defaults.bind,
        };
        let port: u16 = match lookup("PERMALINK_PORT") {
            Some(port) => port.trim().parse::<u16>().unwrap_or(DEFAULT_PORT),
            None => DEFAULT_PORT,
        };
        let port_range_end = match lookup("PERMALINK_PORT_RANGE_END") {
            Some(end) => end.trim().parse::<u16>().unwrap_or(DEFAULT_PORT_RANGE_END),
            None => DEFAULT_PORT_RANGE_END,
        }
        .max(port);
        let public_host = lookup("PERMALINK_PUBLIC_HOST")
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty());
        let working_crs = match lookup("PERMALINK_WORKING_CRS") {
            Some(crs) => Crs::parse(&crs).unwrap_or(defaults.working_crs),
            None => defaults.working_crs,
        };
        let themes = lookup("PERMALINK_THEMES")
            .map(|themes| {
                themes
                    .split(',')
                    .map(|theme| theme.trim().to_string())
                    .filter(|theme| !theme.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            bind,
            port,
            port_range_end,
            public_host,
            working_crs,
            themes,
        }
    }

    /// `host:port` to put into links once the server listens on `port`
    pub fn public_host(&self, port: u16) -> String {
        match &self.public_host {
            Some(host) => host.clone(),
            None => format!("localhost:{port}"),
        }
    }
}

/// First port in `start..=end` that can be bound on `bind`.
pub fn find_available_port(bind: Ipv4Addr, start: u16, end: u16) -> Result<u16> {
    for port in start..=end {
        if TcpListener::bind(SocketAddr::from((bind, port))).is_ok() {
            return Ok(port);
        }
    }
    Err(anyhow!("No free port between {start} and {end} on {bind}"))
}
