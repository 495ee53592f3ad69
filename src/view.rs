//! Mapping poll results onto a stored layout, and the mock fallback view.

use std::collections::HashMap;

use crate::model::{DomInfo, Layout, PortMode, PortStatus, StatusResponse, SystemInfo};
use crate::ranges;
use crate::snmp::{naming, InterfaceRow};

/// Expand each section's port ranges and fill in live data.
///
/// Ports with no matching interface become DOWN placeholders. A physical
/// index claimed by two or more interfaces renders as a breakout parent with
/// the lanes as children, sorted by ifName.
pub fn map_sections(
    layout: &Layout,
    interfaces: &HashMap<u32, InterfaceRow>,
    allow_port_zero: bool,
) -> Vec<crate::model::PortSection> {
    let mut by_phys: HashMap<u32, Vec<&InterfaceRow>> = HashMap::new();
    for row in interfaces.values() {
        if naming::is_ignored(&row.if_name) {
            continue;
        }
        let Some(phys_idx) = naming::physical_index(&row.if_name, &row.if_alias) else {
            continue;
        };
        if phys_idx == 0 && !allow_port_zero {
            continue;
        }
        by_phys.entry(phys_idx).or_default().push(row);
    }

    layout
        .sections
        .iter()
        .map(|section| {
            let mut ports = Vec::new();
            for idx in ranges::parse_ranges(&section.port_ranges) {
                if idx == 0 && !allow_port_zero {
                    continue;
                }
                let Some(rows) = by_phys.get_mut(&idx).filter(|rows| !rows.is_empty()) else {
                    ports.push(PortStatus {
                        physical_index: idx,
                        port_type: section.port_type.clone(),
                        status: "DOWN".to_string(),
                        if_name: format!("Port {idx}"),
                        ..PortStatus::default()
                    });
                    continue;
                };

                if rows.len() == 1 {
                    ports.push(port_status(idx, &section.port_type, rows[0], false));
                } else {
                    rows.sort_by(|a, b| a.if_name.cmp(&b.if_name));
                    let children = rows
                        .iter()
                        .map(|row| port_status(idx, &section.port_type, row, true))
                        .collect();
                    ports.push(PortStatus {
                        physical_index: idx,
                        port_type: section.port_type.clone(),
                        status: "UP".to_string(),
                        if_name: format!("Port {idx} (Breakout)"),
                        is_breakout: true,
                        breakout_ports: children,
                        ..PortStatus::default()
                    });
                }
            }
            crate::model::PortSection {
                ports,
                ..section.clone()
            }
        })
        .collect()
}

fn port_status(phys_idx: u32, port_type: &str, row: &InterfaceRow, is_child: bool) -> PortStatus {
    // Breakout lanes display as the split-out module type.
    let port_type = if is_child && port_type.contains("QSFP28") {
        "SFP28".to_string()
    } else if is_child && port_type.contains("QSFP+") {
        "SFP+".to_string()
    } else {
        port_type.to_string()
    };

    PortStatus {
        physical_index: phys_idx,
        port_type,
        status: if row.oper_status == 1 { "UP" } else { "DOWN" }.to_string(),
        if_name: row.if_name.clone(),
        if_desc: row.if_alias.clone(),
        speed: row.high_speed * 1_000_000,
        in_traffic: row.in_octets,
        out_traffic: row.out_octets,
        in_rate: row.in_rate,
        out_rate: row.out_rate,
        vlan_id: row.vlan_id,
        allowed_vlans: row.allowed_vlans.clone(),
        mode: row.mode,
        is_breakout: false,
        breakout_ports: Vec::new(),
        dom: row.dom.clone(),
    }
}

/// Deterministic stand-in view served when polling fails. The operator sees
/// plausible data instead of an error page.
pub fn mock_view(layout: &Layout) -> StatusResponse {
    let sections = layout
        .sections
        .iter()
        .map(|section| {
            let ports = ranges::parse_ranges(&section.port_ranges)
                .into_iter()
                .map(|idx| PortStatus {
                    physical_index: idx,
                    port_type: section.port_type.clone(),
                    status: if idx % 3 != 0 { "UP" } else { "DOWN" }.to_string(),
                    if_name: format!("Eth{idx}"),
                    if_desc: "Mock Interface".to_string(),
                    speed: 10_000_000_000,
                    in_rate: u64::from(idx) * 500_000,
                    out_rate: u64::from(idx) * 120_000,
                    vlan_id: 1,
                    mode: if idx > 20 {
                        PortMode::Trunk
                    } else {
                        PortMode::Access
                    },
                    dom: mock_dom(),
                    ..PortStatus::default()
                })
                .collect();
            crate::model::PortSection {
                ports,
                ..section.clone()
            }
        })
        .collect();

    StatusResponse {
        system: SystemInfo {
            name: "Mock-Device".to_string(),
            descr: "Mock Device".to_string(),
            uptime: "10 days".to_string(),
            contact: "admin".to_string(),
            location: "Lab".to_string(),
        },
        sections,
    }
}

fn mock_dom() -> DomInfo {
    DomInfo {
        temperature: Some(45.5),
        voltage: Some(3.3),
        tx_power: Some(-2.5),
        rx_power: Some(-5.1),
        bias_current: None,
    }
}
