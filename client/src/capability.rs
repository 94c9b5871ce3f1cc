use std::collections::BTreeMap;
use stratus_common::Extension;

/// Per-zone extension sets, fetched once and consulted without network calls.
#[derive(Debug, Clone, Default)]
pub struct CapabilityGate {
    zones: BTreeMap<String, Vec<Extension>>,
}

impl CapabilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever was registered for the zone.
    pub fn register(&mut self, zone: impl Into<String>, extensions: Vec<Extension>) {
        self.zones.insert(zone.into(), extensions);
    }

    /// The extension advertising `namespace` in `zone`, if any.
    ///
    /// Unknown zones and zones with no extensions yield `None`.
    pub fn capability_for(&self, zone: &str, namespace: &str) -> Option<&Extension> {
        self.zones
            .get(zone)?
            .iter()
            .find(|ext| ext.namespace == namespace)
    }

    pub fn extensions(&self, zone: &str) -> &[Extension] {
        self.zones.get(zone).map(Vec::as_slice).unwrap_or_default()
    }
}
