use crate::argparse::FloatingIpCommands;
use anyhow::{Context, Result};
use stratus_client::NovaApi;
use stratus_common::{CloudError, FloatingIp};
use tabular::{Row, Table};

use super::print_json;

pub fn handle_zones_command(nova: &NovaApi) -> Result<()> {
    for zone in nova.configured_zones() {
        println!("{}", zone);
    }
    Ok(())
}

fn ensure_zone(nova: &NovaApi, zone: &str) -> Result<()> {
    if !nova.configured_zones().contains(zone) {
        return Err(CloudError::UnknownZone(zone.to_string()).into());
    }
    Ok(())
}

pub fn handle_extensions_command(nova: &NovaApi, zone: &str) -> Result<()> {
    ensure_zone(nova, zone)?;

    #[allow(clippy::literal_string_with_formatting_args)]
    let mut table = Table::new("{:<}  {:<}  {:<}")
        .with_row(Row::from_cells(["Alias", "Name", "Namespace"].iter().cloned()));

    for ext in nova.extensions(zone) {
        table.add_row(
            Row::new()
                .with_cell(&ext.alias)
                .with_cell(&ext.name)
                .with_cell(&ext.namespace),
        );
    }
    print!("{}", table);
    Ok(())
}

pub async fn handle_floating_ip_command(
    nova: &NovaApi,
    zone: &str,
    command: FloatingIpCommands,
) -> Result<()> {
    ensure_zone(nova, zone)?;
    let api = nova
        .floating_ip_extension_for_zone(zone)
        .with_context(|| format!("Zone {} does not offer floating IPs", zone))?;

    match command {
        FloatingIpCommands::List => print_floating_ips(&api.list_floating_ips().await?),
        FloatingIpCommands::Get { id } => match api.get_floating_ip(&id).await? {
            Some(ip) => print_json(&ip)?,
            None => println!("Floating IP {} not found", id),
        },
        FloatingIpCommands::Allocate { pool } => {
            let allocated = match pool {
                Some(pool) => api.allocate_from_pool(&pool).await?,
                None => api.allocate().await?,
            };
            match allocated {
                Some(ip) => print_json(&ip)?,
                None => println!("Floating IP allocation is not available in {}", zone),
            }
        }
        FloatingIpCommands::Deallocate { id } => {
            api.deallocate(&id).await?;
            println!("Deallocated {}", id);
        }
        FloatingIpCommands::Add { address, server_id } => {
            api.add_to_server(&address, &server_id).await?;
            println!("Associated {} with {}", address, server_id);
        }
        FloatingIpCommands::Remove { address, server_id } => {
            api.remove_from_server(&address, &server_id).await?;
            println!("Disassociated {} from {}", address, server_id);
        }
    }
    Ok(())
}

fn print_floating_ips(ips: &[FloatingIp]) {
    #[allow(clippy::literal_string_with_formatting_args)]
    let mut table = Table::new("{:<}  {:<}  {:<}  {:<}  {:<}")
        .with_row(Row::from_cells(
            ["ID", "Address", "Fixed IP", "Instance", "Pool"].iter().cloned(),
        ));

    for ip in ips {
        table.add_row(
            Row::new()
                .with_cell(&ip.id)
                .with_cell(&ip.ip)
                .with_cell(ip.fixed_ip.as_deref().unwrap_or("-"))
                .with_cell(ip.instance_id.as_deref().unwrap_or("-"))
                .with_cell(ip.pool.as_deref().unwrap_or("-")),
        );
    }
    print!("{}", table);
}
