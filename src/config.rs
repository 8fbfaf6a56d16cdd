use anyhow::{Context, Result};
use std::{env, net::Ipv4Addr, path::PathBuf, time::Duration};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Balena supervisor (device-management) configuration
    pub supervisor: SupervisorConfig,

    /// Inputs to the default password / hostname generation
    pub identity: DeviceIdentityConfig,

    /// Key-value store configuration
    pub store: StoreConfig,

    /// Manufacturing detection configuration
    pub manufacturing: ManufacturingConfig,

    /// Outbound HTTP configuration
    pub http: HttpConfig,
}

#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    pub address: String,
    pub api_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DeviceIdentityConfig {
    pub device_uuid: String,
    pub mac_address_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ManufacturingConfig {
    /// Raw value of `IN_MANUFACTURING`, interpreted by the detector
    pub override_flag: Option<String>,
    pub marker_path: PathBuf,
    pub fixture_address: Ipv4Addr,
    pub ping_binary: PathBuf,
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub wan_ip_echo_url: String,
}

impl AppConfig {
    /// Load and validate all configuration from environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// `load()` passes the process environment; tests pass a map.
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            supervisor: SupervisorConfig::load(&lookup)?,
            identity: DeviceIdentityConfig::load(&lookup)?,
            store: StoreConfig::load(&lookup)?,
            manufacturing: ManufacturingConfig::load(&lookup)?,
            http: HttpConfig::load(&lookup)?,
        })
    }
}

impl SupervisorConfig {
    fn load(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let address = lookup("BALENA_SUPERVISOR_ADDRESS")
            .unwrap_or_else(|| "http://127.0.0.1:48484".to_string());
        let api_key = lookup("BALENA_SUPERVISOR_API_KEY").filter(|key| !key.is_empty());

        Ok(Self { address, api_key })
    }
}

impl DeviceIdentityConfig {
    fn load(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let device_uuid = lookup("BALENA_DEVICE_UUID").unwrap_or_default();
        let mac_address_path = lookup("DEVICE_MAC_ADDRESS_PATH")
            .unwrap_or_else(|| "/sys/class/net/eth0/address".to_string())
            .into();

        Ok(Self {
            device_uuid,
            mac_address_path,
        })
    }
}

impl StoreConfig {
    fn load(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_path = lookup("DATABASE_PATH")
            .unwrap_or_else(|| "/var/data/nebra/bootstrap.db".to_string())
            .into();

        Ok(Self { database_path })
    }
}

impl ManufacturingConfig {
    fn load(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let override_flag = lookup("IN_MANUFACTURING");
        let marker_path = lookup("MANUFACTURING_MARKER_PATH")
            .unwrap_or_else(|| "/var/nebra/in_manufacturing".to_string())
            .into();
        let fixture_address = lookup("MANUFACTURING_FIXTURE_ADDRESS")
            .unwrap_or_else(|| "192.168.220.1".to_string())
            .parse::<Ipv4Addr>()
            .context("failed to parse MANUFACTURING_FIXTURE_ADDRESS: invalid format")?;
        let ping_binary = lookup("PING_BINARY")
            .unwrap_or_else(|| "ping".to_string())
            .into();

        Ok(Self {
            override_flag,
            marker_path,
            fixture_address,
            ping_binary,
        })
    }
}

impl HttpConfig {
    fn load(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let timeout_secs = lookup("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| "5".to_string())
            .parse::<u64>()
            .context("failed to parse HTTP_TIMEOUT_SECS: invalid format")?;
        anyhow::ensure!(
            timeout_secs > 0,
            "failed to parse HTTP_TIMEOUT_SECS: must be greater than zero"
        );
        let wan_ip_echo_url =
            lookup("WAN_IP_ECHO_URL").unwrap_or_else(|| "https://icanhazip.com".to_string());

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            wan_ip_echo_url,
        })
    }
}
