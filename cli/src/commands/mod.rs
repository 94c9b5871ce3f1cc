mod media;
mod nova;
mod task;

use crate::argparse::{Cli, Commands};
use crate::connect::{connect_nova, connect_vcloud};
use anyhow::Result;
use serde::Serialize;
use stratus_client::Config;

pub use media::{handle_media_command, handle_metadata_command};
pub use nova::{handle_extensions_command, handle_floating_ip_command, handle_zones_command};
pub use task::handle_task_command;

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Zones => handle_zones_command(&connect_nova(&config).await?),
        Commands::Extensions { zone } => {
            handle_extensions_command(&connect_nova(&config).await?, &zone)
        }
        Commands::FloatingIp { zone, command } => {
            handle_floating_ip_command(&connect_nova(&config).await?, &zone, command).await
        }
        Commands::Media(command) => {
            handle_media_command(&connect_vcloud(&config).await?, command).await
        }
        Commands::Metadata(command) => {
            handle_metadata_command(&connect_vcloud(&config).await?, command).await
        }
        Commands::Task(command) => {
            handle_task_command(&connect_vcloud(&config).await?, command).await
        }
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
