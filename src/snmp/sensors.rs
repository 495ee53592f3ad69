//! ENTITY-SENSOR decoding into DOM readings.
//!
//! Each physical entity contributes four walked columns (descr, type, scale,
//! raw value). Sensors are matched to faceplate ports by running the entity
//! description through the naming classifier.

use std::collections::HashMap;

use crate::model::DomInfo;
use crate::snmp::naming;

// entPhySensorType codes carried by optical transceivers.
const SENSOR_TYPE_CELSIUS: i64 = 8;
const SENSOR_TYPE_VOLTS: i64 = 9;
const SENSOR_TYPE_AMPERES: i64 = 10;
const SENSOR_TYPE_WATTS: i64 = 11;

/// Raw walked columns for one entity index.
#[derive(Debug, Clone, Default)]
pub struct SensorRecord {
    pub descr: String,
    pub sensor_type: i64,
    pub scale: i64,
    pub value: i64,
}

/// entPhySensorScale code to multiplier. The scale enumeration runs from
/// yocto (1) to yotta (12) in steps of 10^3, with 9 = units.
pub fn scale_multiplier(code: i64) -> f64 {
    match code {
        1 => 1e-24,
        2 => 1e-21,
        3 => 1e-18,
        4 => 1e-15,
        5 => 1e-12,
        6 => 1e-9,
        7 => 1e-6,
        8 => 1e-3,
        9 => 1.0,
        10 => 1e3,
        11 => 1e6,
        12 => 1e9,
        _ => 1.0,
    }
}

/// Fold the walked sensor records into per-physical-port DOM blocks.
///
/// Records with an empty description or a zero type are skipped, as are
/// descriptions the classifier cannot place on a port.
pub fn decode_dom(sensors: &HashMap<u32, SensorRecord>) -> HashMap<u32, DomInfo> {
    let mut dom_by_port: HashMap<u32, DomInfo> = HashMap::new();

    for record in sensors.values() {
        if record.descr.is_empty() || record.sensor_type == 0 {
            continue;
        }
        let Some(phys_idx) = naming::physical_index(&record.descr, "") else {
            continue;
        };

        let dom = dom_by_port.entry(phys_idx).or_default();
        let value = record.value as f64 * scale_multiplier(record.scale);
        match record.sensor_type {
            SENSOR_TYPE_CELSIUS => dom.temperature = Some(value),
            SENSOR_TYPE_VOLTS => dom.voltage = Some(value),
            SENSOR_TYPE_AMPERES => dom.bias_current = Some(value * 1000.0),
            SENSOR_TYPE_WATTS => {
                if value > 0.0 {
                    let dbm = 10.0 * (value * 1000.0).log10();
                    let descr = record.descr.to_lowercase();
                    if descr.contains("tx") || descr.contains("output") {
                        dom.tx_power = Some(dbm);
                    }
                    if descr.contains("rx") || descr.contains("input") {
                        dom.rx_power = Some(dbm);
                    }
                }
            }
            _ => {}
        }
    }

    dom_by_port
}
