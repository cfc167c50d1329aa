use std::net::{IpAddr, Ipv4Addr};

use log::warn;
use once_cell::sync::OnceCell;
use serde::Deserialize;

static CONFIG: OnceCell<ServerConfig> = OnceCell::new();

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 42069,
            server_name: "httpframe/0.1".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("failed to read {path}: {err}, falling back to default config");
                return ServerConfig::default();
            }
        };

        match toml::from_str::<ServerConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                warn!("failed to deserialize {path}: {err}, falling back to default config");
                ServerConfig::default()
            }
        }
    }
}

pub fn set_config(config: ServerConfig) {
    CONFIG.set(config).expect("config already set");
}

pub fn config() -> &'static ServerConfig {
    CONFIG.get().expect("config not initialized")
}
