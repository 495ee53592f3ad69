//! Status service: the surface the HTTP collaborator calls.

use std::collections::HashMap;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::layout::{self, LayoutError};
use crate::model::{Device, Layout, StatusResponse, SystemInfo};
use crate::snmp::{Poller, SnmpError};
use crate::store::DeviceStore;
use crate::view;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error(transparent)]
    Snmp(#[from] SnmpError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Wires the poller to the view mapper and the device store.
pub struct StatusService {
    poller: Poller,
    mock_fallback: bool,
}

impl Default for StatusService {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusService {
    pub fn new() -> Self {
        Self {
            poller: Poller::new(),
            mock_fallback: true,
        }
    }

    /// Disable the mock fallback so callers see the underlying poll error.
    pub fn with_mock_fallback(mut self, enabled: bool) -> Self {
        self.mock_fallback = enabled;
        self
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Poll a device and map the result onto its stored layout.
    ///
    /// Disabled devices are never polled; they render their layout with a
    /// canned system block. Any poll failure other than cancellation serves
    /// the mock view instead (unless the fallback is disabled).
    pub async fn get_status(
        &self,
        device: &Device,
        token: &CancellationToken,
    ) -> Result<StatusResponse, StatusError> {
        if !device.enabled {
            let system = SystemInfo {
                name: device.name.clone(),
                descr: "Monitoring Disabled".to_string(),
                uptime: "-".to_string(),
                contact: "-".to_string(),
                location: "-".to_string(),
            };
            let sections = view::map_sections(&device.layout, &HashMap::new(), device.allow_port_zero);
            return Ok(StatusResponse { system, sections });
        }

        match self.poller.poll(device, token).await {
            Ok(result) => {
                let sections =
                    view::map_sections(&device.layout, &result.interfaces, device.allow_port_zero);
                Ok(StatusResponse {
                    system: result.system,
                    sections,
                })
            }
            Err(SnmpError::Cancelled) => Err(SnmpError::Cancelled.into()),
            Err(e) if self.mock_fallback => {
                warn!(device = %device.name, target = %device.ip_address,
                      "SNMP poll failed ({e}), serving mock data");
                Ok(view::mock_view(&device.layout))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Poll a device and synthesize a fresh single-section layout from what
    /// answered.
    pub async fn synthesize(
        &self,
        device: &Device,
        token: &CancellationToken,
    ) -> Result<(Layout, u32), StatusError> {
        let result = self.poller.poll(device, token).await?;
        Ok(layout::synthesize(&result, device.allow_port_zero)?)
    }

    /// Re-synthesize a device's layout and persist it.
    pub async fn sync(
        &self,
        store: &DeviceStore,
        device: &Device,
        token: &CancellationToken,
    ) -> Result<(Layout, u32), StatusError> {
        let (layout, detected_ports) = self.synthesize(device, token).await?;
        store.update_layout(device.id, &layout, detected_ports)?;
        Ok((layout, detected_ports))
    }
}
