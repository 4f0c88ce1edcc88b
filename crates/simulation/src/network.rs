//! Simulated links between chains.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use xregion_types::Location;

/// Latency model for messages and relayed headers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Minimum one-way latency in milliseconds.
    pub base_latency_ms: u64,

    /// Uniform extra latency in milliseconds, drawn per message.
    pub jitter_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_latency_ms: 500,
            jitter_ms: 1_500,
        }
    }
}

impl NetworkConfig {
    /// Set the base latency.
    pub fn with_base_latency(mut self, latency: Duration) -> Self {
        self.base_latency_ms = latency.as_millis() as u64;
        self
    }

    /// Set the jitter.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter_ms = jitter.as_millis() as u64;
        self
    }
}

/// Seeded latency with in-order delivery per `(from, to)` channel.
///
/// A message never overtakes an earlier one on the same channel, however
/// the jitter falls.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
    rng: ChaCha8Rng,
    /// Last delivery time scheduled on each channel.
    last_delivery: HashMap<(Location, Location), Duration>,
}

impl SimulatedNetwork {
    pub fn new(config: NetworkConfig, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            rng,
            last_delivery: HashMap::new(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn sample_latency(&mut self) -> Duration {
        let jitter = if self.config.jitter_ms == 0 {
            0
        } else {
            self.rng.gen_range(0..=self.config.jitter_ms)
        };
        Duration::from_millis(self.config.base_latency_ms + jitter)
    }

    /// When a message sent from `from` to `to` at `now` arrives.
    pub fn delivery_time(&mut self, from: Location, to: Location, now: Duration) -> Duration {
        let sampled = now + self.sample_latency();
        let at = match self.last_delivery.get(&(from, to)) {
            Some(last) if *last >= sampled => *last + Duration::from_nanos(1),
            _ => sampled,
        };
        self.last_delivery.insert((from, to), at);
        at
    }
}
