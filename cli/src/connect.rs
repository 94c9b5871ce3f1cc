use anyhow::{bail, Context, Result};
use std::sync::Arc;
use stratus_client::config::VcloudAuth;
use stratus_client::session::{StaticSession, NOVA_AUTH_HEADER, VCLOUD_AUTH_HEADER};
use stratus_client::{keystone, vcloud, Config, HttpTransport, NovaApi, Transport, VcloudClient};

pub async fn connect_nova(config: &Config) -> Result<NovaApi> {
    let nova = config
        .nova
        .as_ref()
        .context("No [nova] section in configuration")?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.http)?);

    let session = if let Some(keystone) = nova.get_keystone() {
        keystone::login(transport.as_ref(), keystone)
            .await
            .with_context(|| format!("Keystone login at {} failed", keystone.identity_url))?
    } else if let Some(token) = nova.get_token() {
        let mut session = StaticSession::new(NOVA_AUTH_HEADER, &token.token);
        for (zone, url) in &token.zones {
            session.insert_endpoint(zone, url);
        }
        session
    } else {
        bail!("[nova] has no credentials for its auth type");
    };

    NovaApi::discover(transport, Arc::new(session))
        .await
        .context("Failed to list Nova extensions")
}

pub async fn connect_vcloud(config: &Config) -> Result<VcloudClient> {
    let vcloud_config = config
        .vcloud
        .as_ref()
        .context("No [vcloud] section in configuration")?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.http)?);

    let session = match vcloud_config.auth()? {
        VcloudAuth::Token(token) => StaticSession::new(VCLOUD_AUTH_HEADER, token),
        VcloudAuth::Login {
            username,
            org,
            password,
        } => vcloud::login(
            transport.as_ref(),
            &vcloud_config.endpoint,
            username,
            org,
            password,
        )
        .await
        .with_context(|| format!("vCloud login at {} failed", vcloud_config.endpoint))?,
    };

    Ok(VcloudClient::new(transport, Arc::new(session)).with_poll_policy(config.polling.policy()))
}
