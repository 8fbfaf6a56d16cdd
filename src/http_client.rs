use anyhow::{Context, Result, ensure};
use reqwest::{Client, Response};
use std::time::Duration;

/// Create an HTTP client with an explicit request timeout
///
/// Every outbound call made during bootstrap goes through a client built here,
/// so no request can block the boot sequence indefinitely.
///
/// # Arguments
/// * `timeout` - Total time allowed per request, including connect
///
/// # Examples
/// ```no_run
/// use nebra_bootstrap::http_client::timeout_client;
/// use std::time::Duration;
///
/// let client = timeout_client(Duration::from_secs(5))
///     .expect("failed to create client");
/// ```
pub fn timeout_client(timeout: Duration) -> Result<Client> {
    ensure!(!timeout.is_zero(), "failed to create HTTP client: zero timeout");

    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .context("failed to create HTTP client")
}

/// Handle HTTP response by checking status and extracting body
///
/// # Arguments
/// * `res` - The HTTP response to handle
/// * `context_msg` - Context message describing the request (e.g., "GET host-config")
///
/// # Returns
/// * `Ok(String)` - The response body if the status is successful
/// * `Err` - If the status is not successful or reading the body fails
pub async fn handle_http_response(res: Response, context_msg: &str) -> Result<String> {
    let status = res.status();
    let body = res.text().await.context("failed to read response body")?;

    ensure!(
        status.is_success(),
        "{context_msg} failed with status {status} and body: {body}"
    );

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_client_builds() {
        assert!(timeout_client(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_timeout_client_rejects_zero_timeout() {
        let result = timeout_client(Duration::ZERO);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("zero timeout"));
    }
}
