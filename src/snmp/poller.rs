//! Device poller.
//!
//! One poll fans out twelve workers, each on its own SNMP session: the
//! system-scalar fetch, six IF-MIB column walks, the grouped Cisco VLAN
//! walker and four ENTITY-SENSOR column walks. When every worker has joined
//! (or the caller cancels), a conditional sequential Q-BRIDGE phase runs, and
//! the collected tables are reconciled into per-ifIndex rows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use csnmp::{ObjectIdentifier, ObjectValue};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::bitmap;
use super::client::{index_of, SnmpSession};
use super::oids;
use super::rate::RateCache;
use super::sensors::{self, SensorRecord};
use super::types::{
    to_octets, to_signed, to_text, to_unsigned, InterfaceRow, PollResult, SnmpError, SnmpResult,
};
use crate::model::{Device, PortMode, SystemInfo};
use crate::ranges;
use crate::secret::SecretString;
use crate::snmp::naming;

/// Workers push at most this many errors; later ones are dropped.
const ERROR_CHANNEL_CAPACITY: usize = 10;

type WalkPairs = Vec<(ObjectIdentifier, ObjectValue)>;

#[derive(Debug, Clone, Copy)]
enum IfColumn {
    Name,
    Alias,
    OperStatus,
    HighSpeed,
    InOctets,
    OutOctets,
}

impl IfColumn {
    const ALL: [IfColumn; 6] = [
        IfColumn::Name,
        IfColumn::Alias,
        IfColumn::OperStatus,
        IfColumn::HighSpeed,
        IfColumn::InOctets,
        IfColumn::OutOctets,
    ];

    fn oid(self) -> &'static [u32] {
        match self {
            IfColumn::Name => oids::IF_NAME,
            IfColumn::Alias => oids::IF_ALIAS,
            IfColumn::OperStatus => oids::IF_OPER_STATUS,
            IfColumn::HighSpeed => oids::IF_HIGH_SPEED,
            IfColumn::InOctets => oids::IF_HC_IN_OCTETS,
            IfColumn::OutOctets => oids::IF_HC_OUT_OCTETS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SensorColumn {
    Descr,
    Type,
    Scale,
    Value,
}

impl SensorColumn {
    const ALL: [SensorColumn; 4] = [
        SensorColumn::Descr,
        SensorColumn::Type,
        SensorColumn::Scale,
        SensorColumn::Value,
    ];

    fn oid(self) -> &'static [u32] {
        match self {
            SensorColumn::Descr => oids::ENT_PHYSICAL_DESCR,
            SensorColumn::Type => oids::ENT_SENSOR_TYPE,
            SensorColumn::Scale => oids::ENT_SENSOR_SCALE,
            SensorColumn::Value => oids::ENT_SENSOR_VALUE,
        }
    }
}

/// Cisco VLAN tables merged by the grouped walker, keyed by ifIndex except
/// for the base-port translation.
#[derive(Debug, Default)]
pub(crate) struct VlanTables {
    pub(crate) access: HashMap<u32, u16>,
    pub(crate) trunk_native: HashMap<u32, u16>,
    pub(crate) trunk_allowed: HashMap<u32, Vec<u16>>,
    pub(crate) trunk_status: HashMap<u32, u64>,
    pub(crate) base_port_to_if_index: HashMap<u32, u32>,
}

/// Q-BRIDGE state from the second phase, already translated to ifIndexes.
#[derive(Debug, Default)]
pub(crate) struct QBridgeTables {
    pub(crate) pvid: HashMap<u32, u16>,
    pub(crate) by_if_index: HashMap<u32, QBridgeEntry>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct QBridgeEntry {
    pub(crate) native_vlan: u16,
    pub(crate) allowed_vlans: Vec<u16>,
}

pub struct Poller {
    rate_cache: Arc<RateCache>,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller {
    pub fn new() -> Self {
        Self::with_rate_cache(Arc::new(RateCache::new()))
    }

    /// Share a rate cache between pollers, or inject one for tests.
    pub fn with_rate_cache(rate_cache: Arc<RateCache>) -> Self {
        Self { rate_cache }
    }

    pub fn rate_cache(&self) -> &Arc<RateCache> {
        &self.rate_cache
    }

    /// Poll one device and reconcile the walked tables into interface rows.
    ///
    /// Partial SNMP failures are tolerated: the poll succeeds as long as at
    /// least one interface row was merged. It fails on cancellation, or when
    /// nothing was merged and a worker recorded an error.
    pub async fn poll(&self, device: &Device, token: &CancellationToken) -> SnmpResult<PollResult> {
        info!(
            "Polling device {} at {} (community: {})",
            device.name,
            device.ip_address,
            device.community.preview()
        );

        let target = device.ip_address.clone();
        let community = device.community.clone();

        let rows: Arc<Mutex<HashMap<u32, InterfaceRow>>> = Arc::default();
        let vlans: Arc<Mutex<VlanTables>> = Arc::default();
        let sensor_rows: Arc<Mutex<HashMap<u32, SensorRecord>>> = Arc::default();
        let system: Arc<Mutex<SystemInfo>> = Arc::default();
        let (err_tx, mut err_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);

        let mut workers = JoinSet::new();

        spawn_worker(
            &mut workers,
            err_tx.clone(),
            system_worker(target.clone(), community.clone(), token.clone(), Arc::clone(&system)),
        );
        for column in IfColumn::ALL {
            spawn_worker(
                &mut workers,
                err_tx.clone(),
                if_column_worker(
                    target.clone(),
                    community.clone(),
                    token.clone(),
                    column,
                    Arc::clone(&rows),
                ),
            );
        }
        spawn_worker(
            &mut workers,
            err_tx.clone(),
            vlan_worker(target.clone(), community.clone(), token.clone(), Arc::clone(&vlans)),
        );
        for column in SensorColumn::ALL {
            spawn_worker(
                &mut workers,
                err_tx.clone(),
                sensor_column_worker(
                    target.clone(),
                    community.clone(),
                    token.clone(),
                    column,
                    Arc::clone(&sensor_rows),
                ),
            );
        }
        drop(err_tx);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    workers.abort_all();
                    return Err(SnmpError::Cancelled);
                }
                joined = workers.join_next() => {
                    match joined {
                        Some(Err(e)) if e.is_panic() => {
                            warn!(device = %device.name, "poll worker panicked: {e}");
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
            }
        }

        let mut errors = Vec::new();
        while let Ok(e) = err_rx.try_recv() {
            errors.push(e);
        }

        let raw_rows = std::mem::take(&mut *rows.lock().unwrap());
        let vlan_tables = std::mem::take(&mut *vlans.lock().unwrap());
        let sensor_rows = std::mem::take(&mut *sensor_rows.lock().unwrap());
        let system = std::mem::take(&mut *system.lock().unwrap());

        if raw_rows.is_empty() {
            if let Some(e) = errors.into_iter().next() {
                return Err(e);
            }
            // Some devices legitimately answer nothing but the system group.
            return Ok(PollResult {
                interfaces: HashMap::new(),
                system,
            });
        }
        if !errors.is_empty() {
            debug!(
                device = %device.name,
                count = errors.len(),
                "tolerating partial SNMP errors"
            );
        }

        if token.is_cancelled() {
            return Err(SnmpError::Cancelled);
        }

        let qbridge = if vlan_tables.base_port_to_if_index.is_empty() {
            QBridgeTables::default()
        } else {
            walk_q_bridge(&target, &community, &vlan_tables.base_port_to_if_index).await
        };

        let dom_map = sensors::decode_dom(&sensor_rows);
        let interfaces = reconcile(
            device.id,
            raw_rows,
            &vlan_tables,
            &qbridge,
            &dom_map,
            &self.rate_cache,
        );

        Ok(PollResult { interfaces, system })
    }
}

/// Single-OID probe for the device name, used when a device is added without
/// an explicit one.
pub async fn get_sys_name(
    target: &str,
    community: &SecretString,
    token: &CancellationToken,
) -> SnmpResult<String> {
    tokio::select! {
        _ = token.cancelled() => Err(SnmpError::Cancelled),
        res = async {
            let session = SnmpSession::connect(target, community).await?;
            let value = session.get(oids::SYS_NAME).await?;
            to_text(&value).ok_or_else(|| SnmpError::Decode("sysName".to_string()))
        } => res,
    }
}

fn spawn_worker(
    workers: &mut JoinSet<()>,
    err_tx: mpsc::Sender<SnmpError>,
    work: impl std::future::Future<Output = SnmpResult<()>> + Send + 'static,
) {
    workers.spawn(async move {
        if let Err(e) = work.await {
            if !matches!(e, SnmpError::Cancelled) {
                // Channel full means we already have plenty to report.
                let _ = err_tx.try_send(e);
            }
        }
    });
}

async fn connect_or_cancel(
    target: &str,
    community: &SecretString,
    token: &CancellationToken,
) -> SnmpResult<SnmpSession> {
    if token.is_cancelled() {
        return Err(SnmpError::Cancelled);
    }
    tokio::select! {
        _ = token.cancelled() => Err(SnmpError::Cancelled),
        res = SnmpSession::connect(target, community) => res,
    }
}

async fn walk_or_cancel(
    session: &SnmpSession,
    token: &CancellationToken,
    column: &[u32],
) -> SnmpResult<WalkPairs> {
    tokio::select! {
        _ = token.cancelled() => Err(SnmpError::Cancelled),
        res = session.walk(column) => res,
    }
}

async fn system_worker(
    target: String,
    community: SecretString,
    token: CancellationToken,
    system: Arc<Mutex<SystemInfo>>,
) -> SnmpResult<()> {
    let session = connect_or_cancel(&target, &community, &token).await?;
    let mut info = SystemInfo::default();

    if let Some(v) = get_scalar(&session, &token, oids::SYS_NAME).await? {
        if let Some(s) = to_text(&v) {
            info.name = s;
        }
    }
    if let Some(v) = get_scalar(&session, &token, oids::SYS_DESCR).await? {
        if let Some(s) = to_text(&v) {
            info.descr = s;
        }
    }
    if let Some(v) = get_scalar(&session, &token, oids::SYS_CONTACT).await? {
        if let Some(s) = to_text(&v) {
            info.contact = s;
        }
    }
    if let Some(v) = get_scalar(&session, &token, oids::SYS_LOCATION).await? {
        if let Some(s) = to_text(&v) {
            info.location = s;
        }
    }
    if let Some(v) = get_scalar(&session, &token, oids::SYS_UPTIME).await? {
        if let Some(ticks) = to_unsigned(&v) {
            info.uptime = format_uptime(ticks);
        }
    }

    *system.lock().unwrap() = info;
    Ok(())
}

/// GET one scalar; transport errors degrade to `None` (the field stays
/// empty), cancellation aborts the worker.
async fn get_scalar(
    session: &SnmpSession,
    token: &CancellationToken,
    oid: &[u32],
) -> SnmpResult<Option<ObjectValue>> {
    let res = tokio::select! {
        _ = token.cancelled() => return Err(SnmpError::Cancelled),
        res = session.get(oid) => res,
    };
    match res {
        Ok(v) => Ok(Some(v)),
        Err(SnmpError::Cancelled) => Err(SnmpError::Cancelled),
        Err(e) => {
            debug!("system scalar fetch failed: {e}");
            Ok(None)
        }
    }
}

/// sysUpTime ticks are centiseconds, rendered as a duration string with
/// hours as the largest unit, e.g. "244h32m11s". Sub-second uptimes print in
/// milliseconds; fractional seconds drop trailing zeros.
fn format_uptime(ticks: u64) -> String {
    if ticks == 0 {
        return "0s".to_string();
    }
    if ticks < 100 {
        return format!("{}ms", ticks * 10);
    }

    let total_secs = ticks / 100;
    let centis = ticks % 100;
    let hours = total_secs / 3_600;
    let mins = (total_secs % 3_600) / 60;
    let secs = total_secs % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if mins > 0 || hours > 0 {
        out.push_str(&format!("{mins}m"));
    }
    match centis {
        0 => out.push_str(&format!("{secs}s")),
        c if c % 10 == 0 => out.push_str(&format!("{secs}.{}s", c / 10)),
        c => out.push_str(&format!("{secs}.{c:02}s")),
    }
    out
}

async fn if_column_worker(
    target: String,
    community: SecretString,
    token: CancellationToken,
    column: IfColumn,
    rows: Arc<Mutex<HashMap<u32, InterfaceRow>>>,
) -> SnmpResult<()> {
    let session = connect_or_cancel(&target, &community, &token).await?;
    let pairs = walk_or_cancel(&session, &token, column.oid()).await?;

    let mut rows = rows.lock().unwrap();
    for (oid, value) in pairs {
        let Some(idx) = index_of(&oid, column.oid()) else {
            continue;
        };
        if idx == 0 {
            continue;
        }
        let row = rows.entry(idx).or_insert_with(|| InterfaceRow {
            if_index: idx,
            ..InterfaceRow::default()
        });
        match column {
            IfColumn::Name => {
                if let Some(text) = to_text(&value) {
                    row.if_name = text;
                }
            }
            IfColumn::Alias => {
                if let Some(text) = to_text(&value) {
                    row.if_alias = text;
                }
            }
            IfColumn::OperStatus => {
                if let Some(v) = to_signed(&value) {
                    row.oper_status = v as i32;
                }
            }
            IfColumn::HighSpeed => {
                if let Some(v) = to_unsigned(&value) {
                    row.high_speed = v;
                }
            }
            IfColumn::InOctets => {
                if let Some(v) = to_unsigned(&value) {
                    row.in_octets = v;
                }
            }
            IfColumn::OutOctets => {
                if let Some(v) = to_unsigned(&value) {
                    row.out_octets = v;
                }
            }
        }
    }
    Ok(())
}

/// The Cisco VLAN tables share one session and run sequentially, like a
/// single logical walker.
async fn vlan_worker(
    target: String,
    community: SecretString,
    token: CancellationToken,
    tables: Arc<Mutex<VlanTables>>,
) -> SnmpResult<()> {
    let session = connect_or_cancel(&target, &community, &token).await?;

    let pairs = walk_or_cancel(&session, &token, oids::VM_VLAN).await?;
    {
        let mut tables = tables.lock().unwrap();
        for (oid, value) in pairs {
            if let (Some(idx), Some(vlan)) = (index_of(&oid, oids::VM_VLAN), to_vlan_id(&value)) {
                if idx > 0 {
                    tables.access.insert(idx, vlan);
                }
            }
        }
    }

    let pairs = walk_or_cancel(&session, &token, oids::VLAN_TRUNK_PORT_NATIVE_VLAN).await?;
    {
        let mut tables = tables.lock().unwrap();
        for (oid, value) in pairs {
            if let (Some(idx), Some(vlan)) = (
                index_of(&oid, oids::VLAN_TRUNK_PORT_NATIVE_VLAN),
                to_vlan_id(&value),
            ) {
                if idx > 0 {
                    tables.trunk_native.insert(idx, vlan);
                }
            }
        }
    }

    for (column, offset) in [
        (oids::VLAN_TRUNK_PORT_VLANS_ENABLED, 0u16),
        (oids::VLAN_TRUNK_PORT_VLANS_X_ENABLED, 1024),
        (oids::VLAN_TRUNK_PORT_VLANS_2K_ENABLED, 2048),
        (oids::VLAN_TRUNK_PORT_VLANS_3K_ENABLED, 3072),
    ] {
        let pairs = walk_or_cancel(&session, &token, column).await?;
        let mut tables = tables.lock().unwrap();
        for (oid, value) in pairs {
            let Some(idx) = index_of(&oid, column) else {
                continue;
            };
            if idx == 0 {
                continue;
            }
            if let Some(bytes) = to_octets(&value) {
                tables
                    .trunk_allowed
                    .entry(idx)
                    .or_default()
                    .extend(bitmap::decode_vlan_bitmap(bytes, offset));
            }
        }
    }

    let pairs = walk_or_cancel(&session, &token, oids::VLAN_TRUNK_PORT_DYNAMIC_STATUS).await?;
    {
        let mut tables = tables.lock().unwrap();
        for (oid, value) in pairs {
            if let (Some(idx), Some(status)) = (
                index_of(&oid, oids::VLAN_TRUNK_PORT_DYNAMIC_STATUS),
                to_unsigned(&value),
            ) {
                if idx > 0 {
                    tables.trunk_status.insert(idx, status);
                }
            }
        }
    }

    let pairs = walk_or_cancel(&session, &token, oids::DOT1D_BASE_PORT_IF_INDEX).await?;
    {
        let mut tables = tables.lock().unwrap();
        for (oid, value) in pairs {
            if let (Some(base_port), Some(if_index)) = (
                index_of(&oid, oids::DOT1D_BASE_PORT_IF_INDEX),
                to_unsigned(&value),
            ) {
                if base_port > 0 {
                    if let Ok(if_index) = u32::try_from(if_index) {
                        tables.base_port_to_if_index.insert(base_port, if_index);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn sensor_column_worker(
    target: String,
    community: SecretString,
    token: CancellationToken,
    column: SensorColumn,
    sensors: Arc<Mutex<HashMap<u32, SensorRecord>>>,
) -> SnmpResult<()> {
    let session = connect_or_cancel(&target, &community, &token).await?;
    let pairs = walk_or_cancel(&session, &token, column.oid()).await?;

    let mut sensors = sensors.lock().unwrap();
    for (oid, value) in pairs {
        let Some(idx) = index_of(&oid, column.oid()) else {
            continue;
        };
        if idx == 0 {
            continue;
        }
        let record = sensors.entry(idx).or_default();
        match column {
            SensorColumn::Descr => {
                if let Some(text) = to_text(&value) {
                    record.descr = text;
                }
            }
            SensorColumn::Type => {
                if let Some(v) = to_signed(&value) {
                    record.sensor_type = v;
                }
            }
            SensorColumn::Scale => {
                if let Some(v) = to_signed(&value) {
                    record.scale = v;
                }
            }
            SensorColumn::Value => {
                if let Some(v) = to_signed(&value) {
                    record.value = v;
                }
            }
        }
    }
    Ok(())
}

/// Sequential Q-BRIDGE phase. Only consulted when the device exposes the
/// bridge base-port translation; every failure here degrades to empty tables
/// because the standard MIBs are a fallback source.
async fn walk_q_bridge(
    target: &str,
    community: &SecretString,
    base_port_to_if_index: &HashMap<u32, u32>,
) -> QBridgeTables {
    let mut tables = QBridgeTables::default();

    let session = match SnmpSession::connect(target, community).await {
        Ok(session) => session,
        Err(e) => {
            debug!("q-bridge session failed: {e}");
            return tables;
        }
    };

    match session.walk(oids::DOT1Q_PVID).await {
        Ok(pairs) => {
            for (oid, value) in pairs {
                if let (Some(base_port), Some(vlan)) =
                    (index_of(&oid, oids::DOT1Q_PVID), to_vlan_id(&value))
                {
                    if let Some(if_index) = base_port_to_if_index.get(&base_port) {
                        tables.pvid.insert(*if_index, vlan);
                    }
                }
            }
        }
        Err(e) => debug!("dot1qPvid walk failed: {e}"),
    }

    match session.walk(oids::DOT1Q_VLAN_STATIC_EGRESS_PORTS).await {
        Ok(pairs) => {
            for (oid, value) in pairs {
                let Some(vlan_id) =
                    index_of(&oid, oids::DOT1Q_VLAN_STATIC_EGRESS_PORTS).and_then(to_u16)
                else {
                    continue;
                };
                if vlan_id == 0 {
                    continue;
                }
                let Some(bytes) = to_octets(&value) else {
                    continue;
                };
                for base_port in bitmap::decode_port_bitmap(bytes) {
                    if let Some(if_index) = base_port_to_if_index.get(&base_port) {
                        tables
                            .by_if_index
                            .entry(*if_index)
                            .or_default()
                            .allowed_vlans
                            .push(vlan_id);
                    }
                }
            }
        }
        Err(e) => debug!("dot1qVlanStaticEgressPorts walk failed: {e}"),
    }

    match session.walk(oids::DOT1Q_VLAN_STATIC_UNTAGGED_PORTS).await {
        Ok(pairs) => {
            for (oid, value) in pairs {
                let Some(vlan_id) =
                    index_of(&oid, oids::DOT1Q_VLAN_STATIC_UNTAGGED_PORTS).and_then(to_u16)
                else {
                    continue;
                };
                if vlan_id == 0 {
                    continue;
                }
                let Some(bytes) = to_octets(&value) else {
                    continue;
                };
                for base_port in bitmap::decode_port_bitmap(bytes) {
                    if let Some(if_index) = base_port_to_if_index.get(&base_port) {
                        tables.by_if_index.entry(*if_index).or_default().native_vlan = vlan_id;
                    }
                }
            }
        }
        Err(e) => debug!("dot1qVlanStaticUntaggedPorts walk failed: {e}"),
    }

    tables
}

fn to_vlan_id(value: &ObjectValue) -> Option<u16> {
    to_unsigned(value).and_then(|v| u16::try_from(v).ok())
}

fn to_u16(value: u32) -> Option<u16> {
    u16::try_from(value).ok()
}

/// Merge the walked tables into the final per-ifIndex rows.
///
/// Rows without an ifName are dropped. VLAN resolution prefers the vendor
/// tables over the standard ones: trunk native / trunk allowed for trunks;
/// vmVlan, then trunk native, then PVID for access ports; the Q-BRIDGE
/// inference only fills in when everything else left the row blank.
pub(crate) fn reconcile(
    device_id: i64,
    raw_rows: HashMap<u32, InterfaceRow>,
    vlans: &VlanTables,
    qbridge: &QBridgeTables,
    dom_map: &HashMap<u32, crate::model::DomInfo>,
    rate_cache: &RateCache,
) -> HashMap<u32, InterfaceRow> {
    let trunk_allowed_fmt: HashMap<u32, String> = vlans
        .trunk_allowed
        .iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(idx, list)| {
            let widened: Vec<u32> = list.iter().map(|v| u32::from(*v)).collect();
            (*idx, ranges::format_ranges(&widened))
        })
        .collect();

    let mut out = HashMap::with_capacity(raw_rows.len());
    for (idx, mut row) in raw_rows {
        if row.if_name.is_empty() {
            continue;
        }

        let (in_rate, out_rate) = rate_cache.observe(device_id, idx, row.in_octets, row.out_octets);
        row.in_rate = in_rate;
        row.out_rate = out_rate;

        if let Some(phys_idx) = naming::physical_index(&row.if_name, &row.if_alias) {
            if let Some(dom) = dom_map.get(&phys_idx) {
                row.dom = dom.clone();
            }
        }

        let is_trunk = match vlans.trunk_status.get(&idx) {
            Some(status) => *status == 1,
            None => trunk_allowed_fmt.contains_key(&idx),
        };

        if is_trunk {
            row.mode = PortMode::Trunk;
            if let Some(vlan) = vlans.trunk_native.get(&idx) {
                row.vlan_id = *vlan;
            }
            if let Some(list) = trunk_allowed_fmt.get(&idx) {
                row.allowed_vlans = list.clone();
            }
        } else {
            row.mode = PortMode::Access;
            if let Some(vlan) = vlans
                .access
                .get(&idx)
                .or_else(|| vlans.trunk_native.get(&idx))
                .or_else(|| qbridge.pvid.get(&idx))
            {
                row.vlan_id = *vlan;
            }
        }

        if row.vlan_id == 0 && row.mode == PortMode::Access && row.allowed_vlans.is_empty() {
            if let Some(info) = qbridge.by_if_index.get(&idx) {
                if !info.allowed_vlans.is_empty() {
                    let widened: Vec<u32> =
                        info.allowed_vlans.iter().map(|v| u32::from(*v)).collect();
                    row.allowed_vlans = ranges::format_ranges(&widened);
                }
                if info.native_vlan > 0 {
                    row.vlan_id = info.native_vlan;
                }
            }
        }

        out.insert(idx, row);
    }
    out
}
