//! Synchronous facade over the async clients.
//!
//! Each facade owns a tokio runtime and drives the same async bindings on
//! it. One-shot calls are bounded by the category ceiling; waits are bounded
//! by the task monitor. Do not call these from inside a tokio runtime.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use stratus_common::{
    CloudError, Extension, FloatingIp, Media, Metadata, MetadataEntry, MetadataValue, Owner,
    Reference, Result, Task,
};
use tokio::runtime::Runtime;

use crate::monitor::DEFAULT_TIMEOUT;
use crate::nova::{FloatingIpApi, NovaApi};
use crate::session::Session;
use crate::transport::Transport;
use crate::vcloud::{MediaApi, VcloudClient};

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("stratus-blocking")
        .build()
        .map_err(|e| CloudError::Transport(format!("Failed to create tokio runtime: {}", e)))
}

fn run_bounded<T>(
    runtime: &Runtime,
    ceiling: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    runtime.block_on(async {
        tokio::time::timeout(ceiling, future)
            .await
            .map_err(|_| CloudError::CallTimeout(ceiling))?
    })
}

pub struct BlockingVcloud {
    runtime: Runtime,
    client: VcloudClient,
}

impl BlockingVcloud {
    pub fn new(client: VcloudClient) -> Result<Self> {
        Ok(Self {
            runtime: build_runtime()?,
            client,
        })
    }

    pub fn client(&self) -> &VcloudClient {
        &self.client
    }

    fn run<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        run_bounded(&self.runtime, MediaApi::TIMEOUT, future)
    }

    pub fn get_media(&self, media: &Reference) -> Result<Option<Media>> {
        self.run(self.client.media().get_media(media))
    }

    pub fn update_media(&self, media: &Reference, update: &Media) -> Result<Task> {
        self.run(self.client.media().update_media(media, update))
    }

    pub fn delete_media(&self, media: &Reference) -> Result<Task> {
        self.run(self.client.media().delete_media(media))
    }

    pub fn get_owner(&self, media: &Reference) -> Result<Option<Owner>> {
        self.run(self.client.media().get_owner(media))
    }

    pub fn get_metadata(&self, media: &Reference) -> Result<Metadata> {
        self.run(self.client.media().get_metadata(media))
    }

    pub fn merge_metadata(&self, media: &Reference, metadata: &Metadata) -> Result<Task> {
        self.run(self.client.media().merge_metadata(media, metadata))
    }

    pub fn get_metadata_entry(
        &self,
        media: &Reference,
        key: &str,
    ) -> Result<Option<MetadataEntry>> {
        self.run(self.client.media().get_metadata_entry(media, key))
    }

    pub fn set_metadata(
        &self,
        media: &Reference,
        key: &str,
        value: &MetadataValue,
    ) -> Result<Task> {
        self.run(self.client.media().set_metadata(media, key, value))
    }

    pub fn delete_metadata_entry(&self, media: &Reference, key: &str) -> Result<Task> {
        self.run(self.client.media().delete_metadata_entry(media, key))
    }

    pub fn get_task(&self, task: &Reference) -> Result<Option<Task>> {
        self.run(self.client.get_task(task))
    }

    pub fn cancel_task(&self, task: &Task) -> Result<()> {
        self.run(self.client.cancel_task(task))
    }

    /// Polls `task` to completion under the media ceiling.
    pub fn wait_for_task(&self, task: Task) -> Result<Task> {
        let monitor = self.client.media().monitor();
        self.runtime.block_on(monitor.wait(&self.client, task))
    }
}

pub struct BlockingNova {
    runtime: Runtime,
    api: NovaApi,
}

impl BlockingNova {
    pub fn discover(transport: Arc<dyn Transport>, session: Arc<dyn Session>) -> Result<Self> {
        let runtime = build_runtime()?;
        let api = run_bounded(
            &runtime,
            DEFAULT_TIMEOUT,
            NovaApi::discover(transport, session),
        )?;
        Ok(Self { runtime, api })
    }

    pub fn configured_zones(&self) -> BTreeSet<String> {
        self.api.configured_zones()
    }

    pub fn extensions(&self, zone: &str) -> &[Extension] {
        self.api.extensions(zone)
    }

    pub fn floating_ip_extension_for_zone(&self, zone: &str) -> Option<BlockingFloatingIp<'_>> {
        let api = self.api.floating_ip_extension_for_zone(zone)?;
        Some(BlockingFloatingIp {
            runtime: &self.runtime,
            api,
        })
    }
}

pub struct BlockingFloatingIp<'a> {
    runtime: &'a Runtime,
    api: FloatingIpApi<'a>,
}

impl BlockingFloatingIp<'_> {
    fn run<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        run_bounded(self.runtime, DEFAULT_TIMEOUT, future)
    }

    pub fn list_floating_ips(&self) -> Result<Vec<FloatingIp>> {
        self.run(self.api.list_floating_ips())
    }

    pub fn get_floating_ip(&self, id: &str) -> Result<Option<FloatingIp>> {
        self.run(self.api.get_floating_ip(id))
    }

    pub fn allocate(&self) -> Result<Option<FloatingIp>> {
        self.run(self.api.allocate())
    }

    pub fn allocate_from_pool(&self, pool: &str) -> Result<Option<FloatingIp>> {
        self.run(self.api.allocate_from_pool(pool))
    }

    pub fn deallocate(&self, id: &str) -> Result<()> {
        self.run(self.api.deallocate(id))
    }

    pub fn add_to_server(&self, address: &str, server_id: &str) -> Result<()> {
        self.run(self.api.add_to_server(address, server_id))
    }

    pub fn remove_from_server(&self, address: &str, server_id: &str) -> Result<()> {
        self.run(self.api.remove_from_server(address, server_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::session::{StaticSession, VCLOUD_AUTH_HEADER};
    use crate::transport::HttpTransport;
    use stratus_common::TaskStatus;

    fn blocking_client() -> BlockingVcloud {
        let transport = Arc::new(HttpTransport::new(&HttpConfig::default()).unwrap());
        let session = Arc::new(StaticSession::new(VCLOUD_AUTH_HEADER, "tok"));
        BlockingVcloud::new(VcloudClient::new(transport, session)).unwrap()
    }

    #[test]
    fn test_call_exceeding_ceiling_is_not_transient() {
        let runtime = build_runtime().unwrap();

        let err = run_bounded(&runtime, Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .unwrap_err();

        assert!(matches!(err, CloudError::CallTimeout(c) if c == Duration::from_millis(20)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_blocking_get_task_and_missing_media() {
        let mut server = mockito::Server::new();
        let task_href = format!("{}/api/task/1", server.url());
        let _task = server
            .mock("GET", "/api/task/1")
            .match_header("x-vcloud-authorization", "tok")
            .with_status(200)
            .with_body(format!(
                r#"<Task xmlns="http://www.vmware.com/vcloud/v1.5" status="success" href="{}"/>"#,
                task_href
            ))
            .create();
        let _media = server
            .mock("GET", "/api/media/missing")
            .with_status(404)
            .create();

        let client = blocking_client();

        let task = client
            .get_task(&Reference::new(task_href.as_str()))
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Succeeded);

        let waited = client.wait_for_task(task).unwrap();
        assert_eq!(waited.status, TaskStatus::Succeeded);

        let missing = client
            .get_media(&Reference::new(format!("{}/api/media/missing", server.url())))
            .unwrap();
        assert!(missing.is_none());
    }
}
