//! SQLite-backed device store.
//!
//! Owns the `devices` table; layouts are stored as the JSON form of
//! [`Layout`]. The HTTP collaborator holds one store for the process.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::model::{Device, Layout};
use crate::secret::SecretString;

#[derive(Clone)]
pub struct DeviceStore {
    conn: Arc<Mutex<Connection>>,
}

impl DeviceStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS devices (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                ip_address TEXT NOT NULL,
                community TEXT NOT NULL,
                detected_ports INTEGER NOT NULL DEFAULT 0,
                allow_port_zero INTEGER NOT NULL DEFAULT 0,
                enabled INTEGER NOT NULL DEFAULT 1,
                layout TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create devices table")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn add_device(
        &self,
        name: &str,
        ip_address: &str,
        community: &SecretString,
        allow_port_zero: bool,
        layout: &Layout,
    ) -> Result<Device> {
        let layout_json = serde_json::to_string(layout).context("Failed to serialize layout")?;
        let created_at = Utc::now();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO devices (name, ip_address, community, detected_ports,
                                  allow_port_zero, enabled, layout, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, 1, ?5, ?6)",
            params![
                name,
                ip_address,
                community.expose(),
                allow_port_zero,
                layout_json,
                created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert device")?;

        Ok(Device {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            ip_address: ip_address.to_string(),
            community: community.clone(),
            detected_ports: 0,
            allow_port_zero,
            enabled: true,
            layout: layout.clone(),
            created_at,
        })
    }

    pub fn get_device(&self, id: i64) -> Result<Device> {
        let conn = self.conn.lock().unwrap();
        let device = conn
            .query_row(
                "SELECT id, name, ip_address, community, detected_ports,
                        allow_port_zero, enabled, layout, created_at
                 FROM devices WHERE id = ?1",
                [id],
                device_from_row,
            )
            .context("Device not found")?;
        Ok(device)
    }

    pub fn list_devices(&self) -> Result<Vec<Device>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, ip_address, community, detected_ports,
                        allow_port_zero, enabled, layout, created_at
                 FROM devices ORDER BY id",
            )
            .context("Failed to prepare statement")?;
        let devices = stmt
            .query_map([], device_from_row)
            .context("Failed to query devices")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read device row")?;
        Ok(devices)
    }

    pub fn update_layout(&self, id: i64, layout: &Layout, detected_ports: u32) -> Result<()> {
        let layout_json = serde_json::to_string(layout).context("Failed to serialize layout")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE devices SET layout = ?1, detected_ports = ?2 WHERE id = ?3",
            params![layout_json, detected_ports, id],
        )
        .context("Failed to update layout")?;
        Ok(())
    }

    pub fn set_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE devices SET enabled = ?1 WHERE id = ?2",
            params![enabled, id],
        )
        .context("Failed to update device")?;
        Ok(())
    }

    pub fn delete_device(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM devices WHERE id = ?1", [id])
            .context("Failed to delete device")?;
        Ok(())
    }
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    let community: String = row.get(3)?;
    let layout_json: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        ip_address: row.get(2)?,
        community: SecretString::new(community),
        detected_ports: row.get(4)?,
        allow_port_zero: row.get(5)?,
        enabled: row.get(6)?,
        layout: serde_json::from_str(&layout_json).unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
