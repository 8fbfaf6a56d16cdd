use crate::{
    config::SupervisorConfig,
    http_client::{handle_http_response, timeout_client},
};
use anyhow::{Context, Result};
use log::info;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, time::Duration};
use trait_variant::make;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub network: Option<HostNetwork>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct HostNetwork {
    #[serde(default)]
    pub hostname: Option<String>,
}

impl DeviceConfig {
    /// Hostname reported by the supervisor, if any
    pub fn hostname(&self) -> Option<&str> {
        self.network.as_ref()?.hostname.as_deref()
    }
}

#[derive(Debug, Serialize)]
struct HostnamePatch<'a> {
    network: HostnamePatchNetwork<'a>,
}

#[derive(Debug, Serialize)]
struct HostnamePatchNetwork<'a> {
    hostname: &'a str,
}

/// Device-management collaborator owning the durable hostname
#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait SupervisorClient {
    async fn device_config(&self) -> Result<DeviceConfig>;
    async fn set_hostname(&self, hostname: &str) -> Result<()>;
}

/// Client for the balena supervisor HTTP API
#[derive(Clone)]
pub struct BalenaSupervisorClient {
    client: Client,
    address: String,
    api_key: String,
}

impl BalenaSupervisorClient {
    const HOST_CONFIG_ENDPOINT: &str = "/v1/device/host-config";

    /// Create a client from configuration
    ///
    /// Fails when no API key is configured, which happens on devices not
    /// managed by balena. Callers treat that as "collaborator unavailable".
    pub fn new(config: &SupervisorConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("failed to create supervisor client: BALENA_SUPERVISOR_API_KEY missing")?;

        Ok(Self::with_client(
            timeout_client(timeout)?,
            config.address.clone(),
            api_key,
        ))
    }

    pub fn with_client(client: Client, address: String, api_key: String) -> Self {
        BalenaSupervisorClient {
            client,
            address,
            api_key,
        }
    }

    fn build_url(&self, path: &str) -> String {
        let address = self.address.trim_end_matches('/');
        let normalized_path = path.trim_start_matches('/');
        format!("{address}/{normalized_path}")
    }

    /// GET request to the supervisor API
    async fn get(&self, path: &str) -> Result<String> {
        let url = self.build_url(path);
        info!("GET {url}");

        let res = self
            .client
            .get(&url)
            .query(&[("apikey", &self.api_key)])
            .send()
            .await
            .context(format!("failed to send GET request to {url}"))?;

        handle_http_response(res, &format!("GET {url}")).await
    }

    /// PATCH request to the supervisor API with JSON body
    async fn patch_json(&self, path: &str, body: impl Debug + Serialize) -> Result<String> {
        let url = self.build_url(path);
        info!("PATCH {url} with body: {body:?}");

        let res = self
            .client
            .patch(&url)
            .query(&[("apikey", &self.api_key)])
            .json(&body)
            .send()
            .await
            .context(format!("failed to send PATCH request to {url}"))?;

        handle_http_response(res, &format!("PATCH {url}")).await
    }
}

impl SupervisorClient for BalenaSupervisorClient {
    async fn device_config(&self) -> Result<DeviceConfig> {
        let body = self.get(Self::HOST_CONFIG_ENDPOINT).await?;
        serde_json::from_str(&body).context("failed to parse device config")
    }

    async fn set_hostname(&self, hostname: &str) -> Result<()> {
        self.patch_json(
            Self::HOST_CONFIG_ENDPOINT,
            HostnamePatch {
                network: HostnamePatchNetwork { hostname },
            },
        )
        .await?;
        Ok(())
    }
}
