//! End-to-end scenarios through the public API: poll results mapped onto
//! layouts, the synthesis pipeline, and the status service fallbacks.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use switchview::layout;
use switchview::model::{Device, Layout, PortSection};
use switchview::secret::SecretString;
use switchview::snmp::{InterfaceRow, PollResult, SnmpError};
use switchview::status::{StatusError, StatusService};
use switchview::view;

fn section(port_type: &str, port_ranges: &str) -> PortSection {
    PortSection {
        id: "sec-1".to_string(),
        title: "Uplinks".to_string(),
        port_type: port_type.to_string(),
        layout: "odd_top".to_string(),
        rows: 2,
        port_ranges: port_ranges.to_string(),
        is_combo: false,
        ports: Vec::new(),
    }
}

fn row(if_index: u32, if_name: &str, if_alias: &str, oper_status: i32) -> InterfaceRow {
    InterfaceRow {
        if_index,
        if_name: if_name.to_string(),
        if_alias: if_alias.to_string(),
        oper_status,
        ..InterfaceRow::default()
    }
}

fn sonic_breakout_result() -> PollResult {
    let mut interfaces = HashMap::new();
    interfaces.insert(48, row(48, "Ethernet48", "Eth 13/1", 1));
    interfaces.insert(49, row(49, "Ethernet49", "Eth 13/2", 2));
    interfaces.insert(50, row(50, "Ethernet50", "Eth 13/3", 1));
    interfaces.insert(51, row(51, "Ethernet51", "Eth 13/4", 2));
    PollResult {
        interfaces,
        system: Default::default(),
    }
}

#[test]
fn sonic_breakout_renders_parent_with_sorted_lanes() {
    let result = sonic_breakout_result();
    let layout = Layout {
        sections: vec![section("QSFP28", "13")],
    };

    let sections = view::map_sections(&layout, &result.interfaces, false);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].ports.len(), 1);

    let parent = &sections[0].ports[0];
    assert!(parent.is_breakout);
    assert_eq!(parent.physical_index, 13);
    assert_eq!(parent.status, "UP");
    assert_eq!(parent.if_name, "Port 13 (Breakout)");
    assert_eq!(parent.breakout_ports.len(), 4);

    let names: Vec<&str> = parent
        .breakout_ports
        .iter()
        .map(|p| p.if_name.as_str())
        .collect();
    assert_eq!(names, ["Ethernet48", "Ethernet49", "Ethernet50", "Ethernet51"]);
    assert!(parent.breakout_ports.iter().all(|p| p.port_type == "SFP28"));
    assert_eq!(parent.breakout_ports[0].status, "UP");
    assert_eq!(parent.breakout_ports[1].status, "DOWN");
}

#[test]
fn synthesis_feeds_straight_back_into_the_mapper() {
    let result = sonic_breakout_result();
    let (layout, detected) = layout::synthesize(&result, false).unwrap();
    assert_eq!(detected, 13);
    assert_eq!(layout.sections[0].port_ranges, "13");

    let sections = view::map_sections(&layout, &result.interfaces, false);
    assert!(sections[0].ports[0].is_breakout);
}

fn test_device(ip: &str, enabled: bool) -> Device {
    Device {
        id: 42,
        name: "lab-sw".to_string(),
        ip_address: ip.to_string(),
        community: SecretString::new("public"),
        detected_ports: 0,
        allow_port_zero: false,
        enabled,
        layout: Layout {
            sections: vec![section("RJ45", "1-8")],
        },
        created_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn unreachable_device_serves_the_mock_view() {
    // Nothing listens on the SNMP port of localhost; every worker fails and
    // the service falls back to deterministic mock data.
    let service = StatusService::new();
    let token = CancellationToken::new();
    let response = service
        .get_status(&test_device("127.0.0.1", true), &token)
        .await
        .unwrap();

    assert_eq!(response.system.name, "Mock-Device");
    assert_eq!(response.system.location, "Lab");
    let ports = &response.sections[0].ports;
    assert_eq!(ports.len(), 8);
    assert_eq!(ports[0].if_name, "Eth1");
    assert_eq!(ports[2].status, "DOWN");
    assert_eq!(ports[0].in_rate, 500_000);
}

#[tokio::test]
async fn mock_fallback_can_be_disabled() {
    let service = StatusService::new().with_mock_fallback(false);
    let token = CancellationToken::new();
    let res = service
        .get_status(&test_device("127.0.0.1", true), &token)
        .await;
    assert!(matches!(res, Err(StatusError::Snmp(_))));
}

#[tokio::test]
async fn disabled_device_is_not_polled() {
    // 192.0.2.1 would take seconds to time out; a disabled device must come
    // back instantly with the canned system block.
    let service = StatusService::new();
    let token = CancellationToken::new();
    let response = service
        .get_status(&test_device("192.0.2.1", false), &token)
        .await
        .unwrap();

    assert_eq!(response.system.descr, "Monitoring Disabled");
    assert_eq!(response.system.name, "lab-sw");
    assert_eq!(response.sections[0].ports.len(), 8);
    assert!(response.sections[0].ports.iter().all(|p| p.status == "DOWN"));
}

#[tokio::test]
async fn cancelled_status_request_propagates() {
    let service = StatusService::new();
    let token = CancellationToken::new();
    token.cancel();
    let res = service
        .get_status(&test_device("127.0.0.1", true), &token)
        .await;
    assert!(matches!(res, Err(StatusError::Snmp(SnmpError::Cancelled))));
}
