//! Stratus cloud client
//!
//! Typed bindings for OpenStack Nova (with the floating-IP extension gated
//! per zone) and vCloud Director 1.5 media, plus the task monitor that
//! drives vCloud's asynchronous mutations to completion.

pub mod binding;
pub mod blocking;
pub mod capability;
pub mod config;
pub mod keystone;
pub mod monitor;
pub mod nova;
pub mod session;
pub mod transport;
pub mod vcloud;

pub use capability::CapabilityGate;
pub use config::Config;
pub use monitor::{PollPolicy, TaskMonitor, TaskSource};
pub use nova::{FloatingIpApi, NovaApi, FLOATING_IP_NAMESPACE};
pub use session::{Session, StaticSession};
pub use transport::{HttpTransport, Transport};
pub use vcloud::{MediaApi, VcloudClient};
