//! Traffic rate cache.
//!
//! Bits-per-second rates come from the delta between the current HC octet
//! counters and the previous observation of the same `(device, ifIndex)`
//! pair. The cache lives for the process lifetime and is shared by every
//! poll; concurrent polls of the same device are last-writer-wins, so a rate
//! is always computed from the two most recent observations this process made.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Observation {
    at: Instant,
    in_octets: u64,
    out_octets: u64,
}

/// Per-process cache of the last counter observation per `(device, ifIndex)`.
#[derive(Debug, Default)]
pub struct RateCache {
    entries: Mutex<HashMap<(i64, u32), Observation>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation and return `(in_rate, out_rate)` in bit/s.
    ///
    /// Rates are 0 when there is no prior entry, when no time has passed, or
    /// when a counter moved backwards (wrap or device reboot).
    pub fn observe(
        &self,
        device_id: i64,
        if_index: u32,
        in_octets: u64,
        out_octets: u64,
    ) -> (u64, u64) {
        self.observe_at(Instant::now(), device_id, if_index, in_octets, out_octets)
    }

    fn observe_at(
        &self,
        now: Instant,
        device_id: i64,
        if_index: u32,
        in_octets: u64,
        out_octets: u64,
    ) -> (u64, u64) {
        let key = (device_id, if_index);
        let mut entries = self.entries.lock().unwrap();

        let mut rates = (0, 0);
        if let Some(prev) = entries.get(&key) {
            let elapsed = now.saturating_duration_since(prev.at).as_secs_f64();
            if elapsed > 0.0 {
                let in_diff = in_octets.saturating_sub(prev.in_octets);
                let out_diff = out_octets.saturating_sub(prev.out_octets);
                rates = (
                    ((in_diff * 8) as f64 / elapsed) as u64,
                    ((out_diff * 8) as f64 / elapsed) as u64,
                );
            }
        }

        entries.insert(
            key,
            Observation {
                at: now,
                in_octets,
                out_octets,
            },
        );
        rates
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
