use crate::argparse::{MediaCommands, MetadataCommands};
use anyhow::{Context, Result};
use stratus_client::{MediaApi, VcloudClient};
use stratus_common::{Metadata, MetadataValue, Reference, Task};
use tabular::{Row, Table};

use super::print_json;
use super::task::wait_interruptible;

pub async fn handle_media_command(client: &VcloudClient, command: MediaCommands) -> Result<()> {
    let media = client.media();

    match command {
        MediaCommands::Get { href } => {
            match media.get_media(&Reference::new(href.as_str())).await? {
                Some(found) => print_json(&found)?,
                None => println!("Media {} not found", href),
            }
        }
        MediaCommands::Owner { href } => {
            match media.get_owner(&Reference::new(href.as_str())).await? {
                Some(owner) => print_json(&owner)?,
                None => println!("Media {} not found", href),
            }
        }
        MediaCommands::Delete { href, wait } => {
            let task = media.delete_media(&Reference::new(href.as_str())).await?;
            report(client, &media, task, wait).await?;
        }
        MediaCommands::Rename {
            href,
            name,
            description,
            wait,
        } => {
            let reference = Reference::new(href.as_str());
            let mut current = media
                .get_media(&reference)
                .await?
                .with_context(|| format!("Media {} not found", href))?;
            current.name = name;
            if description.is_some() {
                current.description = description;
            }
            let task = media.update_media(&reference, &current).await?;
            report(client, &media, task, wait).await?;
        }
    }
    Ok(())
}

pub async fn handle_metadata_command(
    client: &VcloudClient,
    command: MetadataCommands,
) -> Result<()> {
    let media = client.media();

    match command {
        MetadataCommands::List { href } => {
            let metadata = media.get_metadata(&Reference::new(href.as_str())).await?;

            #[allow(clippy::literal_string_with_formatting_args)]
            let mut table = Table::new("{:<}  {:<}")
                .with_row(Row::from_cells(["Key", "Value"].iter().cloned()));
            for (key, value) in metadata.iter() {
                table.add_row(Row::new().with_cell(key).with_cell(value));
            }
            print!("{}", table);
        }
        MetadataCommands::Get { href, key } => {
            match media
                .get_metadata_entry(&Reference::new(href.as_str()), &key)
                .await?
            {
                Some(entry) => println!("{}", entry.value),
                None => println!("No metadata entry '{}' on {}", key, href),
            }
        }
        MetadataCommands::Set {
            href,
            key,
            value,
            wait,
        } => {
            let task = media
                .set_metadata(
                    &Reference::new(href.as_str()),
                    &key,
                    &MetadataValue::new(value),
                )
                .await?;
            report(client, &media, task, wait).await?;
        }
        MetadataCommands::Delete { href, key, wait } => {
            let task = media
                .delete_metadata_entry(&Reference::new(href.as_str()), &key)
                .await?;
            report(client, &media, task, wait).await?;
        }
        MetadataCommands::Merge {
            href,
            entries,
            wait,
        } => {
            let metadata: Metadata = entries.into_iter().collect();
            let task = media
                .merge_metadata(&Reference::new(href.as_str()), &metadata)
                .await?;
            report(client, &media, task, wait).await?;
        }
    }
    Ok(())
}

/// Prints the accepted task, or its final state when `wait` is set.
async fn report(
    client: &VcloudClient,
    media: &MediaApi<'_>,
    task: Task,
    wait: bool,
) -> Result<()> {
    if wait {
        let done = wait_interruptible(client, &media.monitor(), task).await?;
        print_json(&done)
    } else {
        print_json(&task)
    }
}
