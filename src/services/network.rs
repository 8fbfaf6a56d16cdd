use crate::{http_client::handle_http_response, supervisor_client::SupervisorClient};
use anyhow::{Context, Result};
use log::{info, warn};
use reqwest::Client;
use std::net::IpAddr;

/// Stateless network information lookups
///
/// Both lookups return `None` instead of an error; the caller only ever
/// displays or logs these values.
pub struct NetworkInfoService;

impl NetworkInfoService {
    /// Public IP address as seen by an IP-echo service
    ///
    /// # Arguments
    /// * `client` - HTTP client; should carry a request timeout
    /// * `echo_url` - Endpoint answering with the caller's IP as plain text
    pub async fn get_wan_ip(client: &Client, echo_url: &str) -> Option<IpAddr> {
        match Self::fetch_wan_ip(client, echo_url).await {
            Ok(ip) => {
                info!("wan ip: {ip}");
                Some(ip)
            }
            Err(e) => {
                warn!("failed to get wan ip: {e:#}");
                None
            }
        }
    }

    /// Hostname as reported by the supervisor
    pub async fn get_device_hostname<T>(supervisor: &T) -> Option<String>
    where
        T: SupervisorClient,
    {
        match supervisor.device_config().await {
            Ok(config) => {
                let hostname = config.hostname().map(str::to_string);
                if hostname.is_none() {
                    warn!("device config has no hostname");
                }
                hostname
            }
            Err(e) => {
                warn!("failed to get device hostname: {e:#}");
                None
            }
        }
    }

    async fn fetch_wan_ip(client: &Client, echo_url: &str) -> Result<IpAddr> {
        let res = client
            .get(echo_url)
            .send()
            .await
            .context(format!("failed to send GET request to {echo_url}"))?;

        let body = handle_http_response(res, &format!("GET {echo_url}")).await?;

        body.trim()
            .parse::<IpAddr>()
            .context(format!("failed to parse wan ip from {body:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        http_client::timeout_client,
        supervisor_client::{DeviceConfig, HostNetwork, MockSupervisorClient},
    };
    use anyhow::anyhow;
    use std::time::Duration;

    #[tokio::test]
    async fn device_hostname_is_extracted() {
        let mut supervisor = MockSupervisorClient::new();
        supervisor.expect_device_config().returning(|| {
            Box::pin(async {
                Ok(DeviceConfig {
                    network: Some(HostNetwork {
                        hostname: Some("nebra-01234567.local".to_string()),
                    }),
                })
            })
        });

        assert_eq!(
            NetworkInfoService::get_device_hostname(&supervisor).await,
            Some("nebra-01234567.local".to_string())
        );
    }

    #[tokio::test]
    async fn device_hostname_absent_when_field_missing() {
        let mut supervisor = MockSupervisorClient::new();
        supervisor
            .expect_device_config()
            .returning(|| Box::pin(async { Ok(DeviceConfig { network: None }) }));

        assert_eq!(NetworkInfoService::get_device_hostname(&supervisor).await, None);
    }

    #[tokio::test]
    async fn device_hostname_absent_when_supervisor_unreachable() {
        let mut supervisor = MockSupervisorClient::new();
        supervisor
            .expect_device_config()
            .returning(|| Box::pin(async { Err(anyhow!("connection refused")) }));

        assert_eq!(NetworkInfoService::get_device_hostname(&supervisor).await, None);
    }

    #[tokio::test]
    async fn wan_ip_absent_when_endpoint_unreachable() {
        let client = timeout_client(Duration::from_secs(1)).unwrap();
        // port 9 (discard) on localhost is not expected to serve HTTP
        assert_eq!(
            NetworkInfoService::get_wan_ip(&client, "http://127.0.0.1:9/").await,
            None
        );
    }

    #[tokio::test]
    async fn wan_ip_absent_for_invalid_url() {
        let client = timeout_client(Duration::from_secs(1)).unwrap();
        assert_eq!(NetworkInfoService::get_wan_ip(&client, "not a url").await, None);
    }
}
