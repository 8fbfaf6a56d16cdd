//! Default password generation
//!
//! The default password is derived from the device identity only, so it is
//! stable across reboots and identical for every caller on the same device.

use crate::config::DeviceIdentityConfig;
use anyhow::{Context, Result, ensure};
use log::debug;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Service for default password operations
pub struct PasswordService;

impl PasswordService {
    /// Length of the generated default password
    pub const LENGTH: usize = 14;

    /// Generate the default password for a device
    ///
    /// # Arguments
    /// * `mac_address` - Ethernet MAC address, any case, with or without separators
    /// * `device_uuid` - Fleet-assigned device UUID (may be empty)
    ///
    /// # Returns
    /// `LENGTH` lowercase hex characters
    pub fn generate_default_password(mac_address: &str, device_uuid: &str) -> Result<String> {
        debug!("generate_default_password() called");

        let mac = Self::normalize_mac(mac_address)?;

        let mut hasher = Sha256::new();
        hasher.update(mac.as_bytes());
        hasher.update(device_uuid.trim().as_bytes());
        let digest = hex::encode(hasher.finalize());

        Ok(digest[..Self::LENGTH].to_string())
    }

    /// Generate the default password from the configured identity sources
    pub fn default_password(identity: &DeviceIdentityConfig) -> Result<String> {
        let mac_address = Self::read_mac_address(&identity.mac_address_path)?;
        Self::generate_default_password(&mac_address, &identity.device_uuid)
    }

    fn read_mac_address(path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read mac address from {path:?}"))
    }

    fn normalize_mac(mac_address: &str) -> Result<String> {
        let mac: String = mac_address
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        ensure!(
            mac.len() == 12 && mac.chars().all(|c| c.is_ascii_hexdigit()),
            "failed to generate default password: invalid mac address {mac_address:?}"
        );

        Ok(mac)
    }
}
