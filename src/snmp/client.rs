//! One SNMP session per worker.
//!
//! A session owns its own UDP socket; sockets are never shared between
//! concurrent workers because the transaction model below is strictly
//! request/response.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use csnmp::{ObjectIdentifier, ObjectValue, Snmp2cClient};
use tokio::net::lookup_host;

use super::types::{SnmpError, SnmpResult};
use crate::secret::SecretString;

pub(crate) const SNMP_PORT: u16 = 161;
const OP_TIMEOUT: Duration = Duration::from_secs(2);
const RETRIES: usize = 1;
const MAX_REPETITIONS: u32 = 63;

/// SNMPv2c session against one device.
pub(crate) struct SnmpSession {
    client: Snmp2cClient,
}

impl SnmpSession {
    /// Resolve the target (IPv4 literal or hostname) and bind a fresh socket.
    pub(crate) async fn connect(target: &str, community: &SecretString) -> SnmpResult<Self> {
        let addr = resolve(target).await?;
        let bind = SocketAddr::new(
            match addr {
                SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
                SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
            },
            0,
        );
        let client = Snmp2cClient::new(
            addr,
            community.expose().as_bytes().to_vec(),
            Some(bind),
            Some(OP_TIMEOUT),
            RETRIES,
        )
        .await?;
        Ok(Self { client })
    }

    pub(crate) async fn get(&self, oid: &[u32]) -> SnmpResult<ObjectValue> {
        Ok(self.client.get(to_oid(oid)?).await?)
    }

    /// GETBULK walk of the subtree under `column`.
    pub(crate) async fn walk(
        &self,
        column: &[u32],
    ) -> SnmpResult<Vec<(ObjectIdentifier, ObjectValue)>> {
        let values = self.client.walk_bulk(to_oid(column)?, MAX_REPETITIONS).await?;
        Ok(values.into_iter().collect())
    }
}

fn to_oid(parts: &[u32]) -> SnmpResult<ObjectIdentifier> {
    ObjectIdentifier::try_from(parts).map_err(|e| SnmpError::InvalidOid(format!("{e:?}")))
}

async fn resolve(target: &str) -> SnmpResult<SocketAddr> {
    let mut addrs = lookup_host((target, SNMP_PORT))
        .await
        .map_err(|_| SnmpError::Resolve(target.to_string()))?;
    addrs.next().ok_or_else(|| SnmpError::Resolve(target.to_string()))
}

/// Instance index of a walked OID relative to its column, e.g.
/// `ifName.1.3.6.1.2.1.31.1.1.1.1.49` -> 49. Multi-component suffixes do not
/// identify a row and yield `None`.
pub(crate) fn index_of(oid: &ObjectIdentifier, column: &[u32]) -> Option<u32> {
    let base = ObjectIdentifier::try_from(column).ok()?;
    let rel = oid.relative_to(&base)?;
    if rel.len() == 1 {
        Some(rel.as_slice()[0])
    } else {
        None
    }
}
