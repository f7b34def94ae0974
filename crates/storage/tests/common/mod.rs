#![allow(dead_code)]

use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};
use permastore_core::ArweaveConfig;
use permastore_storage::ArweaveClient;
use serde_json::json;
use std::net::TcpListener;

pub const WALLET_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../signer/tests/fixtures/test_jwk.json"
);
pub const TEST_TXT_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../signer/tests/fixtures/test.txt"
);
pub const TEST_TXT_SHA256: &str =
    "15ecc97f7dfeef2947db31073de813724a617b78086e374dedea866f010e5a75";

pub const EXISTING_TX: &str = "bNbA3TEQVL60xlgCcqdz4ZPHFZ711cZ3hmkpGttDt_U";
pub const RELAY_TX: &str = "Yq0o2s0QJ3lV7Jmv6b5wWbAG0z7u7mhtzbNpYaI4yd8";
pub const ANCHOR: &str = "0d8sBNg3ZsXqUCk3mhkvcYHTF6n1iqL0nmdRjS9Bhsw";

/// Refuses connections; stands in for an unreachable service.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn config(gateway: &str, bundler: &str) -> ArweaveConfig {
    ArweaveConfig {
        gateway_url: gateway.to_string(),
        bundler_url: bundler.to_string(),
        wallet_jwk: WALLET_PATH.to_string(),
    }
}

pub fn client(gateway: &str, bundler: &str) -> ArweaveClient {
    ArweaveClient::from_config(&config(gateway, bundler)).unwrap()
}

pub async fn mock_lookup<'a>(server: &'a MockServer, hash: &str, found: Option<&str>) -> Mock<'a> {
    let edges = match found {
        Some(id) => json!([{ "node": { "id": id } }]),
        None => json!([]),
    };
    server
        .mock_async(|when, then| {
            when.method(POST).path("/graphql").body_contains(hash);
            then.status(200)
                .json_body(json!({ "data": { "transactions": { "edges": edges } } }));
        })
        .await
}

pub async fn mock_relay_accepts<'a>(server: &'a MockServer, id: &str) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/tx/arweave")
                .header("content-type", "application/octet-stream");
            then.status(200).json_body(json!({ "id": id }));
        })
        .await
}

pub async fn mock_relay_rejects(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/tx/arweave");
            then.status(402).body("Not enough balance");
        })
        .await
}

/// Anchor, price, header and chunk endpoints all succeed.
pub struct BaseLayerMocks<'a> {
    pub anchor: Mock<'a>,
    pub price: Mock<'a>,
    pub tx: Mock<'a>,
    pub chunk: Mock<'a>,
}

pub async fn mock_base_layer(server: &MockServer) -> BaseLayerMocks<'_> {
    let anchor = server
        .mock_async(|when, then| {
            when.method(GET).path("/tx_anchor");
            then.status(200).body(ANCHOR);
        })
        .await;
    let price = server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/price/");
            then.status(200).body("1048576");
        })
        .await;
    let tx = server
        .mock_async(|when, then| {
            when.method(POST).path("/tx");
            then.status(200).body("OK");
        })
        .await;
    let chunk = server
        .mock_async(|when, then| {
            when.method(POST).path("/chunk");
            then.status(200).body("OK");
        })
        .await;
    BaseLayerMocks {
        anchor,
        price,
        tx,
        chunk,
    }
}
