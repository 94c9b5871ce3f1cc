use serde::{Deserialize, Serialize};

/// Opaque locator of a remote resource.
///
/// References are created by the server (or by a parent listing) and are used
/// as the key for every subsequent operation on the resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Reference {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            media_type: None,
            name: None,
            id: None,
        }
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.href)
    }
}

impl From<&str> for Reference {
    fn from(href: &str) -> Self {
        Reference::new(href)
    }
}

/// Typed relation from one resource to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: None,
            name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_builder() {
        let reference = Reference::new("https://vcloud.example.com/api/media/42")
            .with_type("application/vnd.vmware.vcloud.media+xml")
            .with_name("ubuntu.iso")
            .with_id("urn:vcloud:media:42");

        assert_eq!(reference.href, "https://vcloud.example.com/api/media/42");
        assert_eq!(
            reference.media_type.as_deref(),
            Some("application/vnd.vmware.vcloud.media+xml")
        );
        assert_eq!(reference.name.as_deref(), Some("ubuntu.iso"));
        assert_eq!(reference.to_string(), reference.href);
    }

    #[test]
    fn test_reference_json_uses_type_key() {
        let reference = Reference::new("https://x/api/media/1").with_type("t");
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["type"], "t");
        assert!(json.get("name").is_none());

        let parsed: Reference = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, reference);
    }
}
