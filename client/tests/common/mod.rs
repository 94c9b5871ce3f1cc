#![allow(dead_code)]

use mockito::{Matcher, Mock, ServerGuard};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stratus_client::config::{HttpConfig, KeystoneConfig};
use stratus_client::session::{StaticSession, VCLOUD_AUTH_HEADER};
use stratus_client::{keystone, HttpTransport, NovaApi, PollPolicy, VcloudClient};

pub const ZONE: &str = "az-1.region-a.geo-1";
pub const COMPUTE_PATH: &str = "/v1.1/3456";
pub const AUTH_TOKEN: &str = "Auth_4f173437e4b013bee56d1007";
pub const VCLOUD_TOKEN: &str = "vcloud-session-token";
pub const MEDIA_PATH: &str = "/api/media/794eb334-754e-4917-b5a0-5df85cbd61d1";
pub const TASK_PATH: &str = "/api/task/c6dca927-eab4-41fa-ad6a-d4e2d8e2a4f3";

pub fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {}", path.display(), e))
}

/// XML fixture with `{base}` pointing at the mock server.
pub fn vcloud_fixture(name: &str, base: &str) -> String {
    fixture(name).replace("{base}", base)
}

pub fn transport() -> Arc<HttpTransport> {
    Arc::new(HttpTransport::new(&HttpConfig::default()).unwrap())
}

/// Mocks Keystone login plus the extension listing of the single zone,
/// then discovers the Nova API against them.
pub async fn connect_nova(server: &mut ServerGuard, extensions: &str) -> (NovaApi, Vec<Mock>) {
    let compute_url = format!("{}{}", server.url(), COMPUTE_PATH);

    let login = server
        .mock("POST", "/v2.0/tokens")
        .match_header("accept", "application/json")
        .match_body(Matcher::JsonString(
            r#"{"auth":{"passwordCredentials":{"username":"identity","password":"credential"},"tenantName":"12346637803162"}}"#
                .to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(fixture("keystone_access.json").replace("{compute_url}", &compute_url))
        .create_async()
        .await;

    let listing = server
        .mock("GET", format!("{}/extensions", COMPUTE_PATH).as_str())
        .match_header("accept", "application/json")
        .match_header("x-auth-token", AUTH_TOKEN)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(fixture(extensions))
        .create_async()
        .await;

    let config = KeystoneConfig {
        identity_url: format!("{}/v2.0/", server.url()),
        username: "identity".to_string(),
        password: "credential".to_string(),
        tenant_name: "12346637803162".to_string(),
        service_type: "compute".to_string(),
    };

    let transport = transport();
    let session = keystone::login(transport.as_ref(), &config).await.unwrap();
    let nova = NovaApi::discover(transport, Arc::new(session)).await.unwrap();

    (nova, vec![login, listing])
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy {
        initial_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(40),
        backoff: 2.0,
        timeout: None,
    }
}

pub fn vcloud_client() -> VcloudClient {
    let session = StaticSession::new(VCLOUD_AUTH_HEADER, VCLOUD_TOKEN);
    VcloudClient::new(transport(), Arc::new(session)).with_poll_policy(fast_policy())
}
