use serde::{Deserialize, Serialize};

use crate::reference::{Link, Reference};
use crate::task::Task;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Iso,
    Floppy,
}

impl std::fmt::Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageType::Iso => write!(f, "iso"),
            ImageType::Floppy => write!(f, "floppy"),
        }
    }
}

impl std::str::FromStr for ImageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "iso" => Ok(ImageType::Iso),
            "floppy" => Ok(ImageType::Floppy),
            _ => Err(format!(
                "Invalid image type '{}'. Valid types: iso, floppy",
                s
            )),
        }
    }
}

/// Snapshot of a media image (ISO or floppy) stored in a virtual datacenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_type: ImageType,
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// Tasks the server is currently running against this media.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
}

impl Media {
    pub fn new(name: impl Into<String>, image_type: ImageType, size: i64) -> Self {
        Self {
            href: None,
            id: None,
            name: name.into(),
            description: None,
            image_type,
            size,
            status: None,
            owner: None,
            links: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reference to this media, available once the server has assigned an href.
    pub fn reference(&self) -> Option<Reference> {
        self.href.as_ref().map(|href| {
            let mut reference = Reference::new(href.clone()).with_name(self.name.clone());
            reference.id = self.id.clone();
            reference
        })
    }
}

/// Owner of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Reference>,
}
