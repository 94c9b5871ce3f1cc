//! vCloud 1.5 XML documents and their conversion to domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratus_common::{
    CloudError, ImageType, Link, Media, Metadata, MetadataEntry, Owner, Reference, Result, Task,
    TaskError, TaskStatus,
};

pub(super) const XMLNS: &str = "http://www.vmware.com/vcloud/v1.5";

#[derive(Deserialize, Debug)]
pub(super) struct WireReference {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@type", default)]
    media_type: Option<String>,
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@id", default)]
    id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(super) struct WireLink {
    #[serde(rename = "@rel")]
    rel: String,
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@type", default)]
    media_type: Option<String>,
    #[serde(rename = "@name", default)]
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(super) struct WireError {
    #[serde(rename = "@message", default)]
    message: String,
    #[serde(rename = "@majorErrorCode", default)]
    major_error_code: Option<i32>,
    #[serde(rename = "@minorErrorCode", default)]
    minor_error_code: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(super) struct WireTask {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@type", default)]
    media_type: Option<String>,
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@operation", default)]
    operation: Option<String>,
    #[serde(rename = "@operationName", default)]
    operation_name: Option<String>,
    #[serde(rename = "@startTime", default)]
    start_time: Option<String>,
    #[serde(rename = "@endTime", default)]
    end_time: Option<String>,
    #[serde(rename = "Link", default)]
    links: Vec<WireLink>,
    #[serde(rename = "Error", default)]
    error: Option<WireError>,
}

#[derive(Deserialize, Debug, Default)]
pub(super) struct WireTasks {
    #[serde(rename = "Task", default)]
    tasks: Vec<WireTask>,
}

#[derive(Deserialize, Debug)]
pub(super) struct WireOwner {
    #[serde(rename = "@href", default)]
    href: Option<String>,
    #[serde(rename = "User", default)]
    user: Option<WireReference>,
}

#[derive(Deserialize, Debug)]
pub(super) struct WireMedia {
    #[serde(rename = "@href", default)]
    href: Option<String>,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(rename = "@imageType")]
    image_type: String,
    #[serde(rename = "@size")]
    size: i64,
    #[serde(rename = "@status", default)]
    status: Option<i32>,
    #[serde(rename = "Link", default)]
    links: Vec<WireLink>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Tasks", default)]
    tasks: Option<WireTasks>,
    #[serde(rename = "Owner", default)]
    owner: Option<WireOwner>,
}

#[derive(Deserialize, Debug)]
pub(super) struct WireMetadataEntry {
    #[serde(rename = "@href", default)]
    href: Option<String>,
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Deserialize, Debug)]
pub(super) struct WireMetadata {
    #[serde(rename = "@href", default)]
    href: Option<String>,
    #[serde(rename = "MetadataEntry", default)]
    entries: Vec<WireMetadataEntry>,
}

#[derive(Serialize, Debug)]
#[serde(rename = "Media")]
pub(super) struct MediaBody<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@name")]
    name: &'a str,
    #[serde(rename = "@imageType")]
    image_type: String,
    #[serde(rename = "@size")]
    size: i64,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> From<&'a Media> for MediaBody<'a> {
    fn from(media: &'a Media) -> Self {
        Self {
            xmlns: XMLNS,
            name: &media.name,
            image_type: media.image_type.to_string(),
            size: media.size,
            description: media.description.as_deref(),
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct EntryBody<'a> {
    #[serde(rename = "Key")]
    key: &'a str,
    #[serde(rename = "Value")]
    value: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename = "Metadata")]
pub(super) struct MetadataBody<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "MetadataEntry")]
    entries: Vec<EntryBody<'a>>,
}

impl<'a> From<&'a Metadata> for MetadataBody<'a> {
    fn from(metadata: &'a Metadata) -> Self {
        Self {
            xmlns: XMLNS,
            entries: metadata
                .iter()
                .map(|(key, value)| EntryBody { key, value })
                .collect(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename = "MetadataValue")]
pub(super) struct MetadataValueBody<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "Value")]
    value: &'a str,
}

impl<'a> MetadataValueBody<'a> {
    pub(super) fn new(value: &'a str) -> Self {
        Self {
            xmlns: XMLNS,
            value,
        }
    }
}

fn decode_error(url: &str, reason: impl Into<String>) -> CloudError {
    CloudError::Decode {
        url: url.to_string(),
        reason: reason.into(),
    }
}

fn parse_status(status: &str) -> Option<TaskStatus> {
    match status {
        "queued" | "preRunning" => Some(TaskStatus::Queued),
        "running" => Some(TaskStatus::Running),
        "success" => Some(TaskStatus::Succeeded),
        "error" | "aborted" => Some(TaskStatus::Failed),
        "canceled" => Some(TaskStatus::Canceled),
        _ => None,
    }
}

fn parse_time(url: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| decode_error(url, format!("invalid timestamp {}: {}", v, e)))
        })
        .transpose()
}

fn convert_reference(wire: WireReference) -> Reference {
    Reference {
        href: wire.href,
        media_type: wire.media_type,
        name: wire.name,
        id: wire.id,
    }
}

fn convert_link(wire: WireLink) -> Link {
    Link {
        rel: wire.rel,
        href: wire.href,
        media_type: wire.media_type,
        name: wire.name,
    }
}

pub(super) fn convert_task(url: &str, wire: WireTask) -> Result<Task> {
    let status = parse_status(&wire.status)
        .ok_or_else(|| decode_error(url, format!("unknown task status '{}'", wire.status)))?;

    let reference = Reference {
        href: wire.href,
        media_type: wire.media_type,
        name: wire.name,
        id: wire.id,
    };
    let mut task = Task::new(reference, status);
    task.operation = wire.operation;
    task.operation_name = wire.operation_name;
    task.start_time = parse_time(url, wire.start_time)?;
    task.end_time = parse_time(url, wire.end_time)?;
    task.error = wire.error.map(|e| TaskError {
        message: e.message,
        major_error_code: e.major_error_code,
        minor_error_code: e.minor_error_code,
    });
    task.links = wire.links.into_iter().map(convert_link).collect();
    Ok(task)
}

pub(super) fn convert_owner(wire: WireOwner) -> Owner {
    Owner {
        href: wire.href,
        user: wire.user.map(convert_reference),
    }
}

pub(super) fn convert_media(url: &str, wire: WireMedia) -> Result<Media> {
    let image_type: ImageType = wire
        .image_type
        .parse()
        .map_err(|e: String| decode_error(url, e))?;

    let tasks = wire
        .tasks
        .unwrap_or_default()
        .tasks
        .into_iter()
        .map(|t| convert_task(url, t))
        .collect::<Result<Vec<_>>>()?;

    Ok(Media {
        href: wire.href,
        id: wire.id,
        name: wire.name,
        description: wire.description,
        image_type,
        size: wire.size,
        status: wire.status,
        owner: wire.owner.map(convert_owner),
        links: wire.links.into_iter().map(convert_link).collect(),
        tasks,
    })
}

pub(super) fn convert_metadata(wire: WireMetadata) -> Metadata {
    let mut metadata: Metadata = wire
        .entries
        .into_iter()
        .map(|e| (e.key, e.value))
        .collect();
    metadata.href = wire.href;
    metadata
}

pub(super) fn convert_metadata_entry(wire: WireMetadataEntry) -> MetadataEntry {
    MetadataEntry {
        href: wire.href,
        key: wire.key,
        value: wire.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://vcloud.example.com/api/task/1";

    fn parse_task(xml: &str) -> Result<Task> {
        let wire: WireTask = quick_xml::de::from_str(xml).unwrap();
        convert_task(URL, wire)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(parse_status("queued"), Some(TaskStatus::Queued));
        assert_eq!(parse_status("preRunning"), Some(TaskStatus::Queued));
        assert_eq!(parse_status("running"), Some(TaskStatus::Running));
        assert_eq!(parse_status("success"), Some(TaskStatus::Succeeded));
        assert_eq!(parse_status("error"), Some(TaskStatus::Failed));
        assert_eq!(parse_status("aborted"), Some(TaskStatus::Failed));
        assert_eq!(parse_status("canceled"), Some(TaskStatus::Canceled));
        assert_eq!(parse_status("paused"), None);
    }

    #[test]
    fn test_task_with_error_and_cancel_link() {
        let task = parse_task(
            r#"<Task xmlns="http://www.vmware.com/vcloud/v1.5" status="error"
                    operationName="vdcDeleteMedia" operation="Deleting Media"
                    startTime="2012-02-07T12:02:51.830-05:00"
                    name="task" id="urn:vcloud:task:1"
                    type="application/vnd.vmware.vcloud.task+xml"
                    href="https://vcloud.example.com/api/task/1">
                 <Link rel="task:cancel" href="https://vcloud.example.com/api/task/1/action/cancel"/>
                 <Error message="Media is in use" majorErrorCode="400" minorErrorCode="BAD_REQUEST"/>
               </Task>"#,
        )
        .unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.href(), "https://vcloud.example.com/api/task/1");
        assert_eq!(task.reference.id.as_deref(), Some("urn:vcloud:task:1"));
        assert_eq!(task.operation_name.as_deref(), Some("vdcDeleteMedia"));
        assert!(task.start_time.is_some());
        assert_eq!(
            task.cancel_href(),
            Some("https://vcloud.example.com/api/task/1/action/cancel")
        );
        let error = task.error.unwrap();
        assert_eq!(error.message, "Media is in use");
        assert_eq!(error.major_error_code, Some(400));
        assert_eq!(error.minor_error_code.as_deref(), Some("BAD_REQUEST"));
    }

    #[test]
    fn test_unknown_status_is_decode_error() {
        let err = parse_task(
            r#"<Task status="paused" href="https://vcloud.example.com/api/task/1"/>"#,
        )
        .unwrap_err();
        assert!(matches!(err, CloudError::Decode { .. }), "got {:?}", err);
    }

    #[test]
    fn test_metadata_body_lists_entries_in_key_order() {
        let metadata = Metadata::new().with_entry("b", "2").with_entry("a", "1");
        let xml = quick_xml::se::to_string(&MetadataBody::from(&metadata)).unwrap();

        let a = xml.find("<Key>a</Key>").unwrap();
        let b = xml.find("<Key>b</Key>").unwrap();
        assert!(xml.starts_with("<Metadata"));
        assert!(xml.contains(r#"xmlns="http://www.vmware.com/vcloud/v1.5""#));
        assert!(a < b);
        assert!(xml.contains("<Value>2</Value>"));
    }

    #[test]
    fn test_media_body() {
        let media = Media::new("ubuntu.iso", ImageType::Iso, 1024).with_description("installer");
        let xml = quick_xml::se::to_string(&MediaBody::from(&media)).unwrap();

        assert!(xml.starts_with("<Media"));
        assert!(xml.contains(r#"name="ubuntu.iso""#));
        assert!(xml.contains(r#"imageType="iso""#));
        assert!(xml.contains(r#"size="1024""#));
        assert!(xml.contains("<Description>installer</Description>"));
    }
}
