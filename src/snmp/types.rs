use std::collections::HashMap;

use csnmp::ObjectValue;
use thiserror::Error;

use crate::model::{DomInfo, PortMode, SystemInfo};

#[derive(Debug, Error)]
pub enum SnmpError {
    #[error("cancelled")]
    Cancelled,

    #[error("transport: {0}")]
    Transport(#[from] csnmp::SnmpClientError),

    #[error("cannot resolve target {0}")]
    Resolve(String),

    #[error("invalid OID: {0}")]
    InvalidOid(String),

    #[error("unexpected value type for {0}")]
    Decode(String),

    #[error("no interface rows returned")]
    EmptyResult,
}

pub type SnmpResult<T> = Result<T, SnmpError>;

/// Merged per-ifIndex state after reconciliation.
#[derive(Debug, Clone, Default)]
pub struct InterfaceRow {
    pub if_index: u32,
    pub if_name: String,
    pub if_alias: String,
    pub oper_status: i32,
    pub high_speed: u64,
    pub in_octets: u64,
    pub out_octets: u64,
    pub in_rate: u64,
    pub out_rate: u64,
    pub vlan_id: u16,
    pub allowed_vlans: String,
    pub mode: PortMode,
    pub dom: DomInfo,
}

/// Outcome of one successful device poll.
#[derive(Debug, Clone, Default)]
pub struct PollResult {
    pub interfaces: HashMap<u32, InterfaceRow>,
    pub system: SystemInfo,
}

/// Numeric view of a PDU value, for the counter and gauge walkers.
///
/// Negative integers and non-numeric types yield `None`; the corresponding
/// PDU is skipped.
pub(crate) fn to_unsigned(value: &ObjectValue) -> Option<u64> {
    match value {
        ObjectValue::Integer(i) => u64::try_from(*i).ok(),
        ObjectValue::Counter32(u) | ObjectValue::Unsigned32(u) | ObjectValue::TimeTicks(u) => {
            Some(u64::from(*u))
        }
        ObjectValue::Counter64(u) => Some(*u),
        _ => None,
    }
}

/// Signed view of a PDU value; sensor raw values may be negative.
pub(crate) fn to_signed(value: &ObjectValue) -> Option<i64> {
    match value {
        ObjectValue::Integer(i) => Some(i64::from(*i)),
        ObjectValue::Counter32(u) | ObjectValue::Unsigned32(u) | ObjectValue::TimeTicks(u) => {
            Some(i64::from(*u))
        }
        ObjectValue::Counter64(u) => i64::try_from(*u).ok(),
        _ => None,
    }
}

/// Text view of an octet-string PDU value.
pub(crate) fn to_text(value: &ObjectValue) -> Option<String> {
    match value {
        ObjectValue::String(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Raw octets of a string or opaque PDU value (VLAN and port bitmaps).
pub(crate) fn to_octets(value: &ObjectValue) -> Option<&[u8]> {
    match value {
        ObjectValue::String(bytes) | ObjectValue::Opaque(bytes) => Some(bytes),
        _ => None,
    }
}
