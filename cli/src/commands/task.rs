use crate::argparse::TaskCommands;
use anyhow::{Context, Result};
use std::future::Future;
use std::io;
use stratus_client::{TaskMonitor, VcloudClient};
use stratus_common::{Reference, Task};

use super::print_json;

pub async fn handle_task_command(client: &VcloudClient, command: TaskCommands) -> Result<()> {
    match command {
        TaskCommands::Get { href } => {
            match client.get_task(&Reference::new(href.as_str())).await? {
                Some(task) => print_json(&task)?,
                None => println!("Task {} not found", href),
            }
        }
        TaskCommands::Wait { href } => {
            let task = fetch_task(client, &href).await?;
            let monitor = TaskMonitor::new(client.poll_policy().clone());
            let done = wait_interruptible(client, &monitor, task).await?;
            print_json(&done)?;
        }
        TaskCommands::Cancel { href } => {
            let task = fetch_task(client, &href).await?;
            client.cancel_task(&task).await?;
            println!("Cancellation requested for {}", href);
        }
    }
    Ok(())
}

async fn fetch_task(client: &VcloudClient, href: &str) -> Result<Task> {
    client
        .get_task(&Reference::new(href))
        .await?
        .with_context(|| format!("Task {} not found", href))
}

/// Waits for `task`, giving up when the user presses Ctrl-C.
pub(super) async fn wait_interruptible(
    client: &VcloudClient,
    monitor: &TaskMonitor,
    task: Task,
) -> Result<Task> {
    tracing::info!(
        "Waiting up to {}s for task {}",
        monitor.timeout().as_secs(),
        task.href()
    );
    let done = monitor
        .wait_with_cancel(client, task, interrupted(tokio::signal::ctrl_c()))
        .await?;
    Ok(done)
}

/// Resolves when `signal` fires. If the handler could not be installed it
/// never resolves, so the wait can only end on its own.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::warn!("Cannot listen for Ctrl-C, waiting without interruption: {}", e);
        std::future::pending::<()>().await;
    }
}
