//! VMware vCloud Director 1.5
//!
//! Resources are addressed by the absolute hrefs the server hands out, so
//! operations append their suffix to a [`Reference`] rather than to a zone
//! endpoint. Mutations answer with a [`Task`] which [`VcloudClient`] can
//! poll to completion.

mod media;
mod wire;

pub use media::MediaApi;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Method;
use std::future::Future;
use std::sync::Arc;
use stratus_common::{CloudError, Reference, Result, Task};

use crate::binding::{Format, Invoker, OnNotFound, Operation};
use crate::monitor::{PollPolicy, TaskMonitor, TaskSource};
use crate::session::{Session, StaticSession, VCLOUD_AUTH_HEADER};
use crate::transport::{HttpRequest, Transport};

pub const API_VERSION_ACCEPT: &str = "application/*+xml;version=1.5";
pub const TASK_TYPE: &str = "application/vnd.vmware.vcloud.task+xml";

const GET_TASK: Operation = Operation {
    name: "get_task",
    method: Method::GET,
    path: "",
    accept: TASK_TYPE,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Absent,
};

// A task the monitor is waiting on must exist.
const REFRESH_TASK: Operation = Operation {
    name: "refresh_task",
    method: Method::GET,
    path: "",
    accept: TASK_TYPE,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Fail,
};

const CANCEL_TASK: Operation = Operation {
    name: "cancel_task",
    method: Method::POST,
    path: "",
    accept: API_VERSION_ACCEPT,
    content_type: None,
    format: Format::Xml,
    on_not_found: OnNotFound::Fail,
};

/// Opens a session with HTTP Basic credentials (`user@org:password`).
pub async fn login(
    transport: &dyn Transport,
    endpoint: &str,
    username: &str,
    org: &str,
    password: &str,
) -> Result<StaticSession> {
    let url = format!("{}/sessions", endpoint.trim_end_matches('/'));
    let credentials = STANDARD.encode(format!("{}@{}:{}", username, org, password));
    let request = HttpRequest::new(Method::POST, &url)
        .header("Accept", API_VERSION_ACCEPT)
        .header("Authorization", format!("Basic {}", credentials));

    let response = transport.send(request).await?;
    if !response.is_success() {
        return Err(CloudError::Auth(format!(
            "vCloud login as {}@{} returned {}: {}",
            username,
            org,
            response.status,
            response.text()
        )));
    }

    let token = response.header(VCLOUD_AUTH_HEADER).ok_or_else(|| {
        CloudError::Auth(format!(
            "{} response carried no {} header",
            url, VCLOUD_AUTH_HEADER
        ))
    })?;

    tracing::info!("Opened vCloud session for {}@{}", username, org);
    Ok(StaticSession::new(VCLOUD_AUTH_HEADER, token))
}

pub struct VcloudClient {
    invoker: Invoker,
    policy: PollPolicy,
}

impl VcloudClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<dyn Session>) -> Self {
        Self {
            invoker: Invoker::new(transport, session),
            policy: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn media(&self) -> MediaApi<'_> {
        MediaApi::new(self)
    }

    pub(crate) fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub async fn get_task(&self, task: &Reference) -> Result<Option<Task>> {
        let url = GET_TASK.url(&task.href, &[]);
        let found: Option<wire::WireTask> = self.invoker.fetch(&GET_TASK, &url, None).await?;
        found.map(|w| wire::convert_task(&url, w)).transpose()
    }

    /// Asks the server to cancel `task` through its `task:cancel` link.
    pub async fn cancel_task(&self, task: &Task) -> Result<()> {
        let url = task
            .cancel_href()
            .ok_or_else(|| CloudError::MissingLink {
                resource: task.href().to_string(),
                rel: stratus_common::CANCEL_LINK_REL.to_string(),
            })?
            .to_string();
        self.invoker.execute(&CANCEL_TASK, &url, None).await?;
        tracing::info!("Requested cancellation of task {}", task.href());
        Ok(())
    }

    /// Waits under the default category ceiling.
    pub async fn wait_for_task(&self, task: Task) -> Result<Task> {
        TaskMonitor::new(self.policy.clone()).wait(self, task).await
    }

    pub async fn wait_for_task_with_cancel<F>(&self, task: Task, cancel: F) -> Result<Task>
    where
        F: Future<Output = ()>,
    {
        TaskMonitor::new(self.policy.clone())
            .wait_with_cancel(self, task, cancel)
            .await
    }
}

#[async_trait::async_trait]
impl TaskSource for VcloudClient {
    async fn refresh(&self, task: &Reference) -> Result<Task> {
        let url = REFRESH_TASK.url(&task.href, &[]);
        let raw: wire::WireTask = self.invoker.call(&REFRESH_TASK, &url, None).await?;
        wire::convert_task(&url, raw)
    }
}
