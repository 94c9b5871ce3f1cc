use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;
use stratus_common::{
    Media, Metadata, MetadataEntry, MetadataValue, Owner, Reference, Result, Task,
};

use super::wire::{self, MediaBody, MetadataBody, MetadataValueBody, WireTask};
use super::{VcloudClient, TASK_TYPE};
use crate::binding::{Format, OnNotFound, Operation};
use crate::monitor::TaskMonitor;
use crate::transport::Payload;

const MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.media+xml";
const OWNER_TYPE: &str = "application/vnd.vmware.vcloud.owner+xml";
const METADATA_TYPE: &str = "application/vnd.vmware.vcloud.metadata+xml";
const METADATA_VALUE_TYPE: &str = "application/vnd.vmware.vcloud.metadata.value+xml";

const GET_MEDIA: Operation = Operation {
    name: "get_media",
    method: Method::GET,
    path: "",
    accept: MEDIA_TYPE,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Absent,
};

const UPDATE_MEDIA: Operation = Operation {
    name: "update_media",
    method: Method::PUT,
    path: "",
    accept: TASK_TYPE,
    content_type: Some(MEDIA_TYPE),
    format: Format::Xml,
    on_not_found: OnNotFound::Fail,
};

const DELETE_MEDIA: Operation = Operation {
    name: "delete_media",
    method: Method::DELETE,
    path: "",
    accept: TASK_TYPE,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Fail,
};

const GET_OWNER: Operation = Operation {
    name: "get_owner",
    method: Method::GET,
    path: "/owner",
    accept: OWNER_TYPE,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Absent,
};

const GET_METADATA: Operation = Operation {
    name: "get_metadata",
    method: Method::GET,
    path: "/metadata",
    accept: METADATA_TYPE,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Absent,
};

const MERGE_METADATA: Operation = Operation {
    name: "merge_metadata",
    method: Method::POST,
    path: "/metadata",
    accept: TASK_TYPE,
    content_type: Some(METADATA_TYPE),
    format: Format::Xml,
    on_not_found: OnNotFound::Fail,
};

const GET_METADATA_ENTRY: Operation = Operation {
    name: "get_metadata_entry",
    method: Method::GET,
    path: "/metadata/{key}",
    accept: METADATA_VALUE_TYPE,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Absent,
};

const SET_METADATA: Operation = Operation {
    name: "set_metadata",
    method: Method::PUT,
    path: "/metadata/{key}",
    accept: TASK_TYPE,
    content_type: Some(METADATA_VALUE_TYPE),
    format: Format::Xml,
    on_not_found: OnNotFound::Fail,
};

const DELETE_METADATA_ENTRY: Operation = Operation {
    name: "delete_metadata_entry",
    method: Method::DELETE,
    path: "/metadata/{key}",
    accept: TASK_TYPE,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Fail,
};

/// Media images and their metadata.
///
/// Mutations return the server's task as soon as the request is accepted;
/// the `*_and_wait` variants poll that task to completion under
/// [`MediaApi::TIMEOUT`].
pub struct MediaApi<'a> {
    client: &'a VcloudClient,
}

impl<'a> MediaApi<'a> {
    pub const TIMEOUT: Duration = Duration::from_secs(180);

    pub(super) fn new(client: &'a VcloudClient) -> Self {
        Self { client }
    }

    /// Monitor used by the `*_and_wait` operations.
    pub fn monitor(&self) -> TaskMonitor {
        TaskMonitor::new(self.client.poll_policy().clone()).with_ceiling(Self::TIMEOUT)
    }

    pub async fn get_media(&self, media: &Reference) -> Result<Option<Media>> {
        let url = GET_MEDIA.url(&media.href, &[]);
        let found: Option<wire::WireMedia> = self.fetch(&GET_MEDIA, &url, None).await?;
        found.map(|w| wire::convert_media(&url, w)).transpose()
    }

    pub async fn update_media(&self, media: &Reference, update: &Media) -> Result<Task> {
        let body = UPDATE_MEDIA.encode(&MediaBody::from(update))?;
        self.submit(&UPDATE_MEDIA, media, &[], Some(body)).await
    }

    pub async fn delete_media(&self, media: &Reference) -> Result<Task> {
        self.submit(&DELETE_MEDIA, media, &[], None).await
    }

    pub async fn get_owner(&self, media: &Reference) -> Result<Option<Owner>> {
        let url = GET_OWNER.url(&media.href, &[]);
        let found: Option<wire::WireOwner> = self.fetch(&GET_OWNER, &url, None).await?;
        Ok(found.map(wire::convert_owner))
    }

    /// Metadata attached to the media; empty when the server has none.
    pub async fn get_metadata(&self, media: &Reference) -> Result<Metadata> {
        let url = GET_METADATA.url(&media.href, &[]);
        let found: Option<wire::WireMetadata> = self.fetch(&GET_METADATA, &url, None).await?;
        Ok(found.map(wire::convert_metadata).unwrap_or_default())
    }

    /// Adds or replaces the given entries, leaving other keys untouched.
    pub async fn merge_metadata(&self, media: &Reference, metadata: &Metadata) -> Result<Task> {
        let body = MERGE_METADATA.encode(&MetadataBody::from(metadata))?;
        self.submit(&MERGE_METADATA, media, &[], Some(body)).await
    }

    pub async fn get_metadata_entry(
        &self,
        media: &Reference,
        key: &str,
    ) -> Result<Option<MetadataEntry>> {
        let url = GET_METADATA_ENTRY.url(&media.href, &[("key", key)]);
        let found: Option<wire::WireMetadataEntry> =
            self.fetch(&GET_METADATA_ENTRY, &url, None).await?;
        Ok(found.map(wire::convert_metadata_entry))
    }

    pub async fn set_metadata(
        &self,
        media: &Reference,
        key: &str,
        value: &MetadataValue,
    ) -> Result<Task> {
        let body = SET_METADATA.encode(&MetadataValueBody::new(&value.value))?;
        self.submit(&SET_METADATA, media, &[("key", key)], Some(body))
            .await
    }

    pub async fn delete_metadata_entry(&self, media: &Reference, key: &str) -> Result<Task> {
        self.submit(&DELETE_METADATA_ENTRY, media, &[("key", key)], None)
            .await
    }

    pub async fn update_media_and_wait(&self, media: &Reference, update: &Media) -> Result<Task> {
        let task = self.update_media(media, update).await?;
        self.settle(task).await
    }

    pub async fn delete_media_and_wait(&self, media: &Reference) -> Result<Task> {
        let task = self.delete_media(media).await?;
        self.settle(task).await
    }

    pub async fn merge_metadata_and_wait(
        &self,
        media: &Reference,
        metadata: &Metadata,
    ) -> Result<Task> {
        let task = self.merge_metadata(media, metadata).await?;
        self.settle(task).await
    }

    pub async fn set_metadata_and_wait(
        &self,
        media: &Reference,
        key: &str,
        value: &MetadataValue,
    ) -> Result<Task> {
        let task = self.set_metadata(media, key, value).await?;
        self.settle(task).await
    }

    pub async fn delete_metadata_entry_and_wait(
        &self,
        media: &Reference,
        key: &str,
    ) -> Result<Task> {
        let task = self.delete_metadata_entry(media, key).await?;
        self.settle(task).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        op: &Operation,
        url: &str,
        body: Option<Payload>,
    ) -> Result<Option<T>> {
        self.client.invoker().fetch(op, url, body).await
    }

    async fn submit(
        &self,
        op: &Operation,
        media: &Reference,
        params: &[(&str, &str)],
        body: Option<Payload>,
    ) -> Result<Task> {
        let url = op.url(&media.href, params);
        let raw: WireTask = self.client.invoker().call(op, &url, body).await?;
        let task = wire::convert_task(&url, raw)?;

        tracing::info!(
            "{} {} accepted as task {} ({})",
            op.name,
            media.href,
            task.href(),
            task.status
        );
        Ok(task)
    }

    async fn settle(&self, task: Task) -> Result<Task> {
        self.monitor().wait(self.client, task).await
    }
}
