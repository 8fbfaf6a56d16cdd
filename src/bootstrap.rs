//! One bootstrap cycle
//!
//! This is the boundary where typed outcomes become log lines. Nothing below
//! it panics on I/O failure and nothing here propagates an error, so a broken
//! network, store or supervisor never stops the rest of device startup.

use crate::{
    config::AppConfig,
    http_client::timeout_client,
    services::{
        hostname::{HostnameError, HostnameOutcome, HostnameProvisioner},
        manufacturing::{ManufacturingDecision, ManufacturingDetector},
        network::NetworkInfoService,
        store::SqliteKeyValueStore,
    },
    supervisor_client::BalenaSupervisorClient,
};
use log::{error, info, warn};
use std::net::IpAddr;

#[derive(Debug)]
pub struct BootstrapReport {
    pub manufacturing: ManufacturingDecision,
    pub hostname: Result<HostnameOutcome, HostnameError>,
    pub wan_ip: Option<IpAddr>,
    pub device_hostname: Option<String>,
}

/// Run manufacturing detection, hostname provisioning and network lookups once
pub async fn run(config: &AppConfig) -> BootstrapReport {
    let detector = ManufacturingDetector::from_config(&config.manufacturing);
    let manufacturing = detector.in_manufacturing().await;
    info!(
        "in manufacturing: {} ({:?})",
        manufacturing.in_manufacturing(),
        manufacturing.signal
    );

    let (hostname, device_hostname) =
        match BalenaSupervisorClient::new(&config.supervisor, config.http.timeout) {
            Ok(supervisor) => {
                let provisioner = HostnameProvisioner::new(
                    SqliteKeyValueStore::new(config.store.database_path.clone()),
                    supervisor.clone(),
                    config.identity.clone(),
                );
                let hostname = provisioner.ensure_hostname_set().await;
                let device_hostname = NetworkInfoService::get_device_hostname(&supervisor).await;
                (hostname, device_hostname)
            }
            Err(e) => (Err(HostnameError::SupervisorUnavailable(e)), None),
        };

    match &hostname {
        Ok(outcome) => info!("hostname provisioning: {outcome:?}"),
        Err(e @ HostnameError::SupervisorUnavailable(_)) => {
            warn!("hostname provisioning skipped: {e}")
        }
        Err(e) => error!("Error setting hostname: {e}"),
    }

    let wan_ip = match timeout_client(config.http.timeout) {
        Ok(client) => NetworkInfoService::get_wan_ip(&client, &config.http.wan_ip_echo_url).await,
        Err(e) => {
            error!("failed to create wan ip client: {e:#}");
            None
        }
    };

    BootstrapReport {
        manufacturing,
        hostname,
        wan_ip,
        device_hostname,
    }
}
