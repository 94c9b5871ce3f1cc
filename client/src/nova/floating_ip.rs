use reqwest::Method;
use serde::{Deserialize, Serialize};
use stratus_common::{FloatingIp, Result};

use super::JSON;
use crate::binding::{Format, Invoker, OnNotFound, Operation};

const LIST: Operation = Operation {
    name: "list_floating_ips",
    method: Method::GET,
    path: "/os-floating-ips",
    accept: JSON,
    content_type: None,
    format: Format::Json,
    on_not_found: OnNotFound::Absent,
};

const GET: Operation = Operation {
    name: "get_floating_ip",
    method: Method::GET,
    path: "/os-floating-ips/{id}",
    accept: JSON,
    content_type: None,
    format: Format::Json,
    on_not_found: OnNotFound::Absent,
};

const ALLOCATE: Operation = Operation {
    name: "allocate_floating_ip",
    method: Method::POST,
    path: "/os-floating-ips",
    accept: JSON,
    content_type: Some(JSON),
    format: Format::Json,
    on_not_found: OnNotFound::Absent,
};

const DEALLOCATE: Operation = Operation {
    name: "deallocate_floating_ip",
    method: Method::DELETE,
    path: "/os-floating-ips/{id}",
    accept: JSON,
    content_type: None,
    format: Format::Json,
    on_not_found: OnNotFound::Absent,
};

const SERVER_ACTION: Operation = Operation {
    name: "server_action",
    method: Method::POST,
    path: "/servers/{server_id}/action",
    accept: JSON,
    content_type: Some(JSON),
    format: Format::Json,
    on_not_found: OnNotFound::Fail,
};

/// Nova reports ids as numbers on some releases and strings on others.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

#[derive(Deserialize, Debug)]
struct WireFloatingIp {
    id: WireId,
    ip: String,
    fixed_ip: Option<String>,
    instance_id: Option<WireId>,
    pool: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FloatingIpsResponse {
    #[serde(default)]
    floating_ips: Vec<WireFloatingIp>,
}

#[derive(Deserialize, Debug)]
struct FloatingIpResponse {
    floating_ip: WireFloatingIp,
}

#[derive(Serialize)]
struct AllocateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pool: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum ServerAction<'a> {
    AddFloatingIp { address: &'a str },
    RemoveFloatingIp { address: &'a str },
}

fn convert_floating_ip(wire: WireFloatingIp) -> FloatingIp {
    FloatingIp {
        id: wire.id.into(),
        ip: wire.ip,
        fixed_ip: wire.fixed_ip,
        instance_id: wire.instance_id.map(String::from),
        pool: wire.pool,
    }
}

/// Floating-IP extension bound to one zone's compute endpoint.
pub struct FloatingIpApi<'a> {
    invoker: &'a Invoker,
    zone: String,
    base: &'a str,
}

impl<'a> FloatingIpApi<'a> {
    pub(super) fn new(invoker: &'a Invoker, zone: &str, base: &'a str) -> Self {
        Self {
            invoker,
            zone: zone.to_string(),
            base,
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// All floating IPs of the tenant; empty when the listing is absent.
    pub async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>> {
        let url = LIST.url(self.base, &[]);
        let listed: Option<FloatingIpsResponse> = self.invoker.fetch(&LIST, &url, None).await?;
        Ok(listed
            .map(|r| r.floating_ips.into_iter().map(convert_floating_ip).collect())
            .unwrap_or_default())
    }

    pub async fn get_floating_ip(&self, id: &str) -> Result<Option<FloatingIp>> {
        let url = GET.url(self.base, &[("id", id)]);
        let found: Option<FloatingIpResponse> = self.invoker.fetch(&GET, &url, None).await?;
        Ok(found.map(|r| convert_floating_ip(r.floating_ip)))
    }

    /// Allocates an address from the default pool.
    pub async fn allocate(&self) -> Result<Option<FloatingIp>> {
        self.allocate_request(None).await
    }

    pub async fn allocate_from_pool(&self, pool: &str) -> Result<Option<FloatingIp>> {
        self.allocate_request(Some(pool)).await
    }

    async fn allocate_request(&self, pool: Option<&str>) -> Result<Option<FloatingIp>> {
        let url = ALLOCATE.url(self.base, &[]);
        let body = ALLOCATE.encode(&AllocateRequest { pool })?;
        let allocated: Option<FloatingIpResponse> =
            self.invoker.fetch(&ALLOCATE, &url, Some(body)).await?;

        let allocated = allocated.map(|r| convert_floating_ip(r.floating_ip));
        match &allocated {
            Some(ip) => tracing::info!("Allocated floating IP {} in {}", ip.ip, self.zone),
            None => tracing::warn!("Floating IP allocation not available in {}", self.zone),
        }
        Ok(allocated)
    }

    /// Releases an address; releasing one that no longer exists succeeds.
    pub async fn deallocate(&self, id: &str) -> Result<()> {
        let url = DEALLOCATE.url(self.base, &[("id", id)]);
        self.invoker.execute(&DEALLOCATE, &url, None).await?;
        tracing::info!("Deallocated floating IP {} in {}", id, self.zone);
        Ok(())
    }

    pub async fn add_to_server(&self, address: &str, server_id: &str) -> Result<()> {
        self.server_action(server_id, ServerAction::AddFloatingIp { address })
            .await?;
        tracing::info!("Associated {} with server {}", address, server_id);
        Ok(())
    }

    pub async fn remove_from_server(&self, address: &str, server_id: &str) -> Result<()> {
        self.server_action(server_id, ServerAction::RemoveFloatingIp { address })
            .await?;
        tracing::info!("Disassociated {} from server {}", address, server_id);
        Ok(())
    }

    async fn server_action(&self, server_id: &str, action: ServerAction<'_>) -> Result<()> {
        let url = SERVER_ACTION.url(self.base, &[("server_id", server_id)]);
        let body = SERVER_ACTION.encode(&action)?;
        self.invoker.execute(&SERVER_ACTION, &url, Some(body)).await
    }
}
