//! OpenStack Nova compute (v1.1)
//!
//! Zone-scoped: every call resolves against the compute endpoint the session
//! lists for the zone. Optional API surfaces are published as extensions and
//! gated per zone by [`CapabilityGate`].

mod floating_ip;

pub use floating_ip::FloatingIpApi;

use reqwest::Method;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use stratus_common::{Extension, Result};

use crate::binding::{Format, Invoker, OnNotFound, Operation};
use crate::capability::CapabilityGate;
use crate::session::Session;
use crate::transport::Transport;

pub const FLOATING_IP_NAMESPACE: &str =
    "http://docs.openstack.org/compute/ext/floating_ips/api/v1.1";

pub(crate) const JSON: &str = "application/json";

const LIST_EXTENSIONS: Operation = Operation {
    name: "list_extensions",
    method: Method::GET,
    path: "/extensions",
    accept: JSON,
    content_type: None,
    format: Format::Json,
    on_not_found: OnNotFound::Absent,
};

#[derive(Deserialize, Debug)]
struct ExtensionsResponse {
    #[serde(default)]
    extensions: Vec<WireExtension>,
}

#[derive(Deserialize, Debug)]
struct WireExtension {
    name: String,
    namespace: String,
    alias: String,
    description: Option<String>,
    updated: Option<String>,
}

impl From<WireExtension> for Extension {
    fn from(wire: WireExtension) -> Self {
        Extension {
            name: wire.name,
            namespace: wire.namespace,
            alias: wire.alias,
            description: wire.description,
            updated: wire.updated,
        }
    }
}

pub struct NovaApi {
    invoker: Invoker,
    gate: CapabilityGate,
}

impl NovaApi {
    /// Connects to every zone the session knows and records its extensions.
    pub async fn discover(
        transport: Arc<dyn Transport>,
        session: Arc<dyn Session>,
    ) -> Result<Self> {
        let invoker = Invoker::new(transport, session);
        let mut gate = CapabilityGate::new();

        for zone in invoker.session().zones() {
            let Some(base) = invoker.session().endpoint(&zone) else {
                continue;
            };
            let url = LIST_EXTENSIONS.url(base, &[]);
            let listed: Option<ExtensionsResponse> =
                invoker.fetch(&LIST_EXTENSIONS, &url, None).await?;
            let extensions: Vec<Extension> = listed
                .map(|r| r.extensions.into_iter().map(Extension::from).collect())
                .unwrap_or_default();

            tracing::info!("Zone {}: {} extensions", zone, extensions.len());
            gate.register(zone, extensions);
        }

        Ok(Self { invoker, gate })
    }

    pub fn configured_zones(&self) -> BTreeSet<String> {
        self.invoker.session().zones()
    }

    pub fn extensions(&self, zone: &str) -> &[Extension] {
        self.gate.extensions(zone)
    }

    pub fn capability_for(&self, zone: &str, namespace: &str) -> Option<&Extension> {
        self.gate.capability_for(zone, namespace)
    }

    /// Floating-IP operations for `zone`, if the zone advertises them.
    pub fn floating_ip_extension_for_zone(&self, zone: &str) -> Option<FloatingIpApi<'_>> {
        self.gate.capability_for(zone, FLOATING_IP_NAMESPACE)?;
        let base = self.invoker.session().endpoint(zone)?;
        Some(FloatingIpApi::new(&self.invoker, zone, base))
    }
}
