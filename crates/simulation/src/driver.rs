//! Drives a [`SimulationRunner`] from tokio time.
//!
//! The runner is shared behind a mutex: a background task sleeps until the
//! next queued event and processes everything due, while [`SimChain`]
//! clients lock it briefly to submit or read. With tokio's clock paused,
//! sleeping auto-advances, so a whole multi-chain scenario runs in
//! simulated time as fast as it computes.

use crate::{SimChain, SimulationConfig, SimulationError, SimulationRunner, SimulationStats};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use xregion_protocol::Chains;
use xregion_types::Location;

/// A running simulated network.
///
/// Must be created inside a tokio runtime. Dropping it stops the network.
pub struct Simulation {
    runner: Arc<Mutex<SimulationRunner>>,
    driver: JoinHandle<()>,
}

impl Simulation {
    /// Build the network and start driving it.
    pub fn start(config: SimulationConfig) -> Result<Self, SimulationError> {
        let seed = config.seed;
        let runner = Arc::new(Mutex::new(SimulationRunner::new(config)?));
        let driver = tokio::spawn(drive(runner.clone()));
        info!(seed, "Simulation started");
        Ok(Self { runner, driver })
    }

    /// Client for the chain at `location`.
    pub fn chain(&self, location: Location) -> Result<Arc<SimChain>, SimulationError> {
        if self.runner.lock().chain(location).is_none() {
            return Err(SimulationError::UnknownChain(location));
        }
        Ok(Arc::new(SimChain::new(location, self.runner.clone())))
    }

    /// Clients for every chain.
    pub fn chains(&self) -> Chains {
        let locations: Vec<Location> = self.runner.lock().locations().collect();
        let mut chains = Chains::new();
        for location in locations {
            chains.insert(Arc::new(SimChain::new(location, self.runner.clone())));
        }
        chains
    }

    /// Run `f` against the runner, e.g. to inspect chain state directly.
    pub fn with_runner<R>(&self, f: impl FnOnce(&mut SimulationRunner) -> R) -> R {
        f(&mut self.runner.lock())
    }

    /// Simulated time elapsed.
    pub fn now(&self) -> Duration {
        self.runner.lock().now()
    }

    pub fn stats(&self) -> SimulationStats {
        self.runner.lock().stats().clone()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(runner: Arc<Mutex<SimulationRunner>>) {
    let start = Instant::now() - runner.lock().now();
    loop {
        let Some(next) = runner.lock().next_event_time() else {
            debug!("Event queue empty; driver stopping");
            return;
        };
        tokio::time::sleep_until(start + next).await;
        runner.lock().run_until(next);
    }
}
