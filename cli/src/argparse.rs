use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "stratus",
    about = "Multi-provider cloud API client",
    version,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "stratus.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the Nova zones of the session
    Zones,
    /// List the extensions a Nova zone advertises
    Extensions { zone: String },
    /// Nova floating IPs
    FloatingIp {
        /// Zone to operate in
        #[arg(long)]
        zone: String,

        #[command(subcommand)]
        command: FloatingIpCommands,
    },
    /// vCloud media images
    #[command(subcommand)]
    Media(MediaCommands),
    /// vCloud media metadata
    #[command(subcommand)]
    Metadata(MetadataCommands),
    /// vCloud tasks
    #[command(subcommand)]
    Task(TaskCommands),
}

#[derive(Subcommand, Debug)]
pub enum FloatingIpCommands {
    List,
    Get {
        id: String,
    },
    /// Allocate an address, optionally from a named pool
    Allocate {
        #[arg(long)]
        pool: Option<String>,
    },
    Deallocate {
        id: String,
    },
    /// Associate an address with a server
    Add {
        address: String,
        server_id: String,
    },
    /// Disassociate an address from a server
    Remove {
        address: String,
        server_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum MediaCommands {
    Get {
        href: String,
    },
    Owner {
        href: String,
    },
    Delete {
        href: String,

        /// Wait for the task to finish
        #[arg(long)]
        wait: bool,
    },
    /// Change a media's name and, optionally, its description
    Rename {
        href: String,
        name: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        wait: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum MetadataCommands {
    List {
        href: String,
    },
    Get {
        href: String,
        key: String,
    },
    Set {
        href: String,
        key: String,
        value: String,

        #[arg(long)]
        wait: bool,
    },
    Delete {
        href: String,
        key: String,

        #[arg(long)]
        wait: bool,
    },
    /// Add or replace several entries at once
    Merge {
        href: String,

        /// Entries as KEY=VALUE
        #[arg(required = true, value_parser = parse_key_value)]
        entries: Vec<(String, String)>,

        #[arg(long)]
        wait: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    Get { href: String },
    /// Poll until the task finishes; Ctrl-C stops waiting without cancelling it
    Wait { href: String },
    /// Ask the server to cancel the task
    Cancel { href: String },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
