use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::secret::SecretString;

/// A monitored switch, as stored by the device store.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    pub community: SecretString,
    pub detected_ports: u32,
    pub allow_port_zero: bool,
    pub enabled: bool,
    pub layout: Layout,
    pub created_at: DateTime<Utc>,
}

/// Physical port layout of a device: an ordered list of sections.
///
/// Persisted per device as JSON (`{"sections":[...]}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    pub sections: Vec<PortSection>,
}

/// One group of ports on the faceplate (e.g. the RJ45 block, the SFP+ block).
///
/// `port_ranges` is a range string over physical port indices, e.g.
/// `"1-24, 49-52"`. In a status response the same struct carries the mapped
/// `ports`; in the persisted layout that list is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSection {
    pub id: String,
    pub title: String,
    pub port_type: String,
    pub layout: String,
    pub rows: u32,
    pub port_ranges: String,
    #[serde(default)]
    pub is_combo: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortStatus>,
}

/// Access vs trunk, as reconciled from the Cisco trunk tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortMode {
    #[default]
    Access,
    Trunk,
}

/// Digital optical monitoring readings for one transceiver. Any field may be
/// absent when the device does not expose the sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomInfo {
    pub temperature: Option<f64>,
    pub voltage: Option<f64>,
    pub tx_power: Option<f64>,
    pub rx_power: Option<f64>,
    pub bias_current: Option<f64>,
}

impl DomInfo {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.voltage.is_none()
            && self.tx_power.is_none()
            && self.rx_power.is_none()
            && self.bias_current.is_none()
    }
}

/// View-ready state of one physical port.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortStatus {
    pub physical_index: u32,
    pub port_type: String,
    pub status: String,
    pub if_name: String,
    pub if_desc: String,
    pub speed: u64,
    pub in_traffic: u64,
    pub out_traffic: u64,
    pub in_rate: u64,
    pub out_rate: u64,
    pub vlan_id: u16,
    pub allowed_vlans: String,
    pub mode: PortMode,
    pub is_breakout: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakout_ports: Vec<PortStatus>,
    pub dom: DomInfo,
}

/// System-level scalars read from the device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    pub name: String,
    pub descr: String,
    pub uptime: String,
    pub contact: String,
    pub location: String,
}

/// Response of a status request: system info plus the layout with ports
/// filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub system: SystemInfo,
    pub sections: Vec<PortSection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_json_round_trip() {
        let layout = Layout {
            sections: vec![PortSection {
                id: "sec-1".to_string(),
                title: "All Ports".to_string(),
                port_type: "SFP+".to_string(),
                layout: "odd_top".to_string(),
                rows: 2,
                port_ranges: "1-24, 49".to_string(),
                is_combo: false,
                ports: Vec::new(),
            }],
        };
        let json = serde_json::to_string(&layout).unwrap();
        assert!(json.contains("\"port_ranges\":\"1-24, 49\""));
        // The persisted form never carries mapped ports.
        assert!(!json.contains("\"ports\""));

        let back: Layout = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sections.len(), 1);
        assert_eq!(back.sections[0].port_type, "SFP+");
    }

    #[test]
    fn port_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PortMode::Trunk).unwrap(), "\"trunk\"");
        assert_eq!(
            serde_json::to_string(&PortMode::Access).unwrap(),
            "\"access\""
        );
    }

    #[test]
    fn dom_fields_default_to_null() {
        let dom = DomInfo::default();
        assert!(dom.is_empty());
        let json = serde_json::to_string(&dom).unwrap();
        assert!(json.contains("\"temperature\":null"));
    }
}
