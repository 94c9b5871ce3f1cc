//! Keystone v2 password login.
//!
//! Exchanges credentials for a token and reads the compute endpoints out of
//! the service catalog, keyed by region. Regions are the zones the Nova
//! bindings are scoped to.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use stratus_common::{CloudError, Result};

use crate::config::KeystoneConfig;
use crate::session::{Session, StaticSession, NOVA_AUTH_HEADER};
use crate::transport::{HttpRequest, Payload, Transport};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    password_credentials: PasswordCredentials<'a>,
    tenant_name: &'a str,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize, Debug)]
struct AccessResponse {
    access: Access,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Access {
    token: Token,
    #[serde(default)]
    service_catalog: Vec<Service>,
}

#[derive(Deserialize, Debug)]
struct Token {
    id: String,
}

#[derive(Deserialize, Debug)]
struct Service {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Endpoint {
    region: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: String,
}

pub async fn login(transport: &dyn Transport, config: &KeystoneConfig) -> Result<StaticSession> {
    let url = format!("{}/tokens", config.identity_url.trim_end_matches('/'));
    let body = serde_json::to_vec(&AuthRequest {
        auth: AuthBody {
            password_credentials: PasswordCredentials {
                username: &config.username,
                password: &config.password,
            },
            tenant_name: &config.tenant_name,
        },
    })
    .map_err(|e| CloudError::Encode(e.to_string()))?;

    let request = HttpRequest::new(Method::POST, &url)
        .header("Accept", "application/json")
        .payload(Payload::new("application/json", body));
    let response = transport.send(request).await?;

    if !response.is_success() {
        return Err(CloudError::Auth(format!(
            "keystone login as {} returned {}: {}",
            config.username,
            response.status,
            response.text()
        )));
    }

    let parsed: AccessResponse =
        serde_json::from_slice(&response.body).map_err(|e| CloudError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;

    let mut session = StaticSession::new(NOVA_AUTH_HEADER, parsed.access.token.id);
    for service in parsed
        .access
        .service_catalog
        .into_iter()
        .filter(|s| s.service_type == config.service_type)
    {
        for endpoint in service.endpoints {
            match endpoint.region {
                Some(region) => session.insert_endpoint(region, endpoint.public_url),
                None => tracing::debug!(
                    "Ignoring {} endpoint without region: {}",
                    config.service_type,
                    endpoint.public_url
                ),
            }
        }
    }

    tracing::info!(
        "Authenticated {} against {} ({} zones)",
        config.username,
        url,
        session.zones().len()
    );
    Ok(session)
}
