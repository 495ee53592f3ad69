mod bitmap;
mod client;
pub mod naming;
pub mod oids;
mod poller;
mod rate;
mod sensors;
mod types;

pub use bitmap::{decode_port_bitmap, decode_vlan_bitmap};
pub use poller::{get_sys_name, Poller};
pub use rate::RateCache;
pub use sensors::{decode_dom, scale_multiplier, SensorRecord};
pub use types::{InterfaceRow, PollResult, SnmpError, SnmpResult};
