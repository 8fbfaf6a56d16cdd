mod common;

use common::MockHttpServer;
use nebra_bootstrap::{
    http_client::timeout_client,
    services::network::NetworkInfoService,
    supervisor_client::{BalenaSupervisorClient, SupervisorClient},
};
use std::time::Duration;

fn client_for(server: &MockHttpServer) -> BalenaSupervisorClient {
    BalenaSupervisorClient::with_client(
        timeout_client(Duration::from_secs(2)).expect("failed to create client"),
        server.url(),
        "secret".to_string(),
    )
}

#[tokio::test]
async fn test_device_config_reads_host_config() {
    let server = MockHttpServer::start(|_| {
        (
            200,
            r#"{"network":{"hostname":"nebra-01234567.local"}}"#.to_string(),
        )
    })
    .await;
    let client = client_for(&server);

    let config = client
        .device_config()
        .await
        .expect("failed to get device config");
    assert_eq!(config.hostname(), Some("nebra-01234567.local"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/v1/device/host-config?apikey=secret");
}

#[tokio::test]
async fn test_set_hostname_patches_host_config() {
    let server = MockHttpServer::start(|_| (200, "OK".to_string())).await;
    let client = client_for(&server);

    client
        .set_hostname("nebra-01234567.local")
        .await
        .expect("failed to set hostname");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].target, "/v1/device/host-config?apikey=secret");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["network"]["hostname"], "nebra-01234567.local");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockHttpServer::start(|_| (503, "supervisor busy".to_string())).await;
    let client = client_for(&server);

    let err = client.set_hostname("nebra-01234567.local").await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("503"));
    assert!(message.contains("supervisor busy"));
}

#[tokio::test]
async fn test_device_hostname_absent_on_invalid_json() {
    let server = MockHttpServer::start(|_| (200, "not json".to_string())).await;
    let client = client_for(&server);

    assert!(client.device_config().await.is_err());
    assert_eq!(NetworkInfoService::get_device_hostname(&client).await, None);
}

#[tokio::test]
async fn test_device_hostname_absent_when_unreachable() {
    let server = MockHttpServer::start(|_| (200, String::new())).await;
    let url = server.url();
    drop(server);
    // give the aborted listener task a moment to release the port
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = BalenaSupervisorClient::with_client(
        timeout_client(Duration::from_secs(1)).unwrap(),
        url,
        "secret".to_string(),
    );
    assert_eq!(NetworkInfoService::get_device_hostname(&client).await, None);
}
