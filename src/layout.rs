//! Layout synthesis from live poll data.

use thiserror::Error;

use crate::model::{Layout, PortSection};
use crate::ranges;
use crate::snmp::{naming, PollResult};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("no valid ports found")]
    NoValidPorts,
}

/// Starter layout for a freshly added device.
pub fn default_layout() -> Layout {
    Layout {
        sections: vec![PortSection {
            id: "sec-1".to_string(),
            title: "Default".to_string(),
            port_type: "RJ45".to_string(),
            layout: "odd_top".to_string(),
            rows: 2,
            port_ranges: "1-48".to_string(),
            is_combo: false,
            ports: Vec::new(),
        }],
    }
}

/// Build a single-section layout covering every classifiable port of a poll
/// result. Returns the layout and the largest physical index seen.
pub fn synthesize(result: &PollResult, allow_port_zero: bool) -> Result<(Layout, u32), LayoutError> {
    let mut indices: Vec<u32> = result
        .interfaces
        .values()
        .filter(|row| !naming::is_ignored(&row.if_name))
        .filter_map(|row| naming::physical_index(&row.if_name, &row.if_alias))
        .filter(|idx| *idx != 0 || allow_port_zero)
        .collect();

    if indices.is_empty() {
        return Err(LayoutError::NoValidPorts);
    }
    indices.sort_unstable();
    indices.dedup();
    let max_port = indices.last().copied().unwrap_or(0);

    let layout = Layout {
        sections: vec![PortSection {
            id: "sec-1".to_string(),
            title: "All Ports".to_string(),
            port_type: "RJ45".to_string(),
            layout: "odd_top".to_string(),
            rows: 2,
            port_ranges: ranges::format_ranges(&indices),
            is_combo: false,
            ports: Vec::new(),
        }],
    };
    Ok((layout, max_port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::InterfaceRow;
    use std::collections::HashMap;

    fn result_with(names: &[(u32, &str, &str)]) -> PollResult {
        let mut interfaces = HashMap::new();
        for (idx, name, alias) in names {
            interfaces.insert(
                *idx,
                InterfaceRow {
                    if_index: *idx,
                    if_name: name.to_string(),
                    if_alias: alias.to_string(),
                    ..InterfaceRow::default()
                },
            );
        }
        PollResult {
            interfaces,
            system: Default::default(),
        }
    }

    #[test]
    fn synthesis_with_gaps() {
        let result = result_with(&[
            (101, "Ethernet1", ""),
            (102, "Ethernet2", ""),
            (103, "Ethernet3", ""),
            (105, "Ethernet5", ""),
            (106, "Ethernet6", ""),
            (110, "Ethernet10", ""),
        ]);
        let (layout, detected) = synthesize(&result, false).unwrap();
        assert_eq!(layout.sections.len(), 1);
        assert_eq!(layout.sections[0].port_ranges, "1-3, 5-6, 10");
        assert_eq!(layout.sections[0].id, "sec-1");
        assert_eq!(layout.sections[0].title, "All Ports");
        assert_eq!(detected, 10);
    }

    #[test]
    fn breakout_lanes_collapse_to_one_port() {
        let result = result_with(&[
            (48, "Ethernet48", "Eth 13/1"),
            (49, "Ethernet49", "Eth 13/2"),
            (50, "Ethernet50", "Eth 13/3"),
            (51, "Ethernet51", "Eth 13/4"),
        ]);
        let (layout, detected) = synthesize(&result, false).unwrap();
        assert_eq!(layout.sections[0].port_ranges, "13");
        assert_eq!(detected, 13);
    }

    #[test]
    fn ignored_interfaces_do_not_contribute() {
        let result = result_with(&[
            (1, "Vlan100", ""),
            (2, "mgmt0", ""),
            (3, "Ethernet3", ""),
        ]);
        let (layout, _) = synthesize(&result, false).unwrap();
        assert_eq!(layout.sections[0].port_ranges, "3");
    }

    #[test]
    fn port_zero_requires_opt_in() {
        let result = result_with(&[(1, "Ethernet0", "")]);
        assert!(matches!(
            synthesize(&result, false),
            Err(LayoutError::NoValidPorts)
        ));
        let (layout, detected) = synthesize(&result, true).unwrap();
        assert_eq!(layout.sections[0].port_ranges, "0");
        assert_eq!(detected, 0);
    }

    #[test]
    fn empty_result_fails() {
        let result = result_with(&[]);
        assert!(matches!(
            synthesize(&result, false),
            Err(LayoutError::NoValidPorts)
        ));
    }

    #[test]
    fn default_layout_shape() {
        let layout = default_layout();
        assert_eq!(layout.sections.len(), 1);
        assert_eq!(layout.sections[0].port_ranges, "1-48");
        assert_eq!(layout.sections[0].port_type, "RJ45");
    }
}
