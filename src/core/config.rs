//! Protocol tunables.

use std::time::Duration;

use crate::core::vtime::ValidityTime;

/// How long a processed control message is remembered, fixed by the protocol.
pub const DUPLICATE_HOLD_TIME: Duration = Duration::from_secs(30);

/// Resolved protocol parameters for a single node.
#[derive(Debug, Clone)]
pub struct Config {
    /// The interval at which HELLO messages are emitted.
    pub hello_interval: Duration,
    /// The interval at which TC messages are emitted.
    pub tc_interval: Duration,
    /// The validity time advertised in HELLO messages.
    pub neighbor_hold_time: Duration,
    /// The validity time advertised in TC messages.
    pub topology_hold_time: Duration,
    /// How long processed control messages are remembered.
    pub duplicate_hold_time: Duration,
    /// The interval at which tables are swept and derived state is recomputed.
    pub maintenance_interval: Duration,
    /// The number of maintenance ticks a departed group member keeps receiving traffic.
    pub grace_ticks: u32,
    /// The TTL of originated TC messages.
    pub max_ttl: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hello_interval: Duration::from_secs(2),
            tc_interval: Duration::from_secs(5),
            neighbor_hold_time: Duration::from_secs(6),
            topology_hold_time: Duration::from_secs(15),
            duplicate_hold_time: DUPLICATE_HOLD_TIME,
            maintenance_interval: Duration::from_secs(1),
            grace_ticks: 3,
            max_ttl: u8::MAX,
        }
    }
}

impl Config {
    pub fn hello_vtime(&self) -> ValidityTime {
        ValidityTime::from_duration(self.neighbor_hold_time)
    }

    pub fn tc_vtime(&self) -> ValidityTime {
        ValidityTime::from_duration(self.topology_hold_time)
    }

    pub fn duplicate_ttl_millis(&self) -> u64 {
        self.duplicate_hold_time.as_millis() as u64
    }
}
