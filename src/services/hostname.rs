//! One-time hostname assignment
//!
//! The `hostname_set` flag in the key-value store gates the assignment. It is
//! flipped only after the supervisor accepted the new hostname, so a failure
//! or crash anywhere before that leaves the flag unset and the next boot
//! retries (at-least-once). The flip itself is a compare-and-set, so of any
//! number of concurrent callers exactly one records the transition. Because
//! the hostname is derived from the device identity, concurrent callers push
//! the same value.

use crate::{
    config::DeviceIdentityConfig,
    services::{password::PasswordService, store::KeyValueStore},
    supervisor_client::SupervisorClient,
};
use anyhow::{Result, ensure};
use log::{info, warn};
use tokio::sync::Mutex;

pub const HOSTNAME_SET_KEY: &str = "hostname_set";

const FLAG_SET: &str = "true";
const FLAG_UNSET: &str = "false";

const HOSTNAME_PREFIX: &str = "nebra-";
const HOSTNAME_DOMAIN: &str = ".local";
const SUFFIX_START: usize = 6;
const SUFFIX_LEN: usize = 8;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HostnameOutcome {
    /// The flag was already set; nothing was done
    AlreadySet,
    /// This call set the hostname and recorded the flag
    Assigned(String),
    /// This call set the hostname, but a concurrent caller recorded the flag first
    AssignedConcurrently(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HostnameError {
    #[error("failed to read hostname flag: {0:#}")]
    ReadFlag(anyhow::Error),
    #[error("failed to generate hostname: {0:#}")]
    Generate(anyhow::Error),
    #[error("failed to reach supervisor: {0:#}")]
    SupervisorUnavailable(anyhow::Error),
    #[error("failed to set hostname {hostname}: {reason:#}")]
    SetHostname {
        hostname: String,
        reason: anyhow::Error,
    },
    #[error("hostname {hostname} set, but failed to record flag: {reason:#}")]
    RecordFlag {
        hostname: String,
        reason: anyhow::Error,
    },
}

/// Build the hostname from a default password
///
/// `nebra-` followed by eight characters of the password starting at offset
/// six, followed by `.local`.
pub fn hostname_from_password(password: &str) -> Result<String> {
    let end = SUFFIX_START + SUFFIX_LEN;
    ensure!(
        password.is_ascii() && password.len() >= end,
        "failed to derive hostname: password must be at least {end} ascii characters"
    );

    Ok(format!(
        "{HOSTNAME_PREFIX}{}{HOSTNAME_DOMAIN}",
        &password[SUFFIX_START..end]
    ))
}

pub struct HostnameProvisioner<S, C>
where
    S: KeyValueStore,
    C: SupervisorClient,
{
    store: S,
    supervisor: C,
    identity: DeviceIdentityConfig,
    lock: Mutex<()>,
}

impl<S, C> HostnameProvisioner<S, C>
where
    S: KeyValueStore,
    C: SupervisorClient,
{
    pub fn new(store: S, supervisor: C, identity: DeviceIdentityConfig) -> Self {
        Self {
            store,
            supervisor,
            identity,
            lock: Mutex::new(()),
        }
    }

    /// Hostname this device would be assigned
    pub fn generate_hostname(&self) -> Result<String> {
        let password = PasswordService::default_password(&self.identity)?;
        hostname_from_password(&password)
    }

    /// Assign the hostname unless the flag says it already happened
    pub async fn ensure_hostname_set(&self) -> Result<HostnameOutcome, HostnameError> {
        let _guard = self.lock.lock().await;

        let flag = self
            .store
            .get_or_create(HOSTNAME_SET_KEY)
            .map_err(HostnameError::ReadFlag)?;

        if flag != FLAG_UNSET {
            if flag != FLAG_SET {
                warn!("unexpected {HOSTNAME_SET_KEY} value {flag:?}, treating as set");
            }
            info!("Hostname already set!");
            return Ok(HostnameOutcome::AlreadySet);
        }

        info!("Hostname not set yet...");

        let hostname = self.generate_hostname().map_err(HostnameError::Generate)?;

        self.supervisor
            .set_hostname(&hostname)
            .await
            .map_err(|reason| HostnameError::SetHostname {
                hostname: hostname.clone(),
                reason,
            })?;

        let recorded = self
            .store
            .compare_and_set(HOSTNAME_SET_KEY, FLAG_UNSET, FLAG_SET)
            .map_err(|reason| HostnameError::RecordFlag {
                hostname: hostname.clone(),
                reason,
            })?;

        if recorded {
            info!("hostname set to {hostname}");
            Ok(HostnameOutcome::Assigned(hostname))
        } else {
            info!("hostname set to {hostname}, flag already recorded by another caller");
            Ok(HostnameOutcome::AssignedConcurrently(hostname))
        }
    }
}
