//! Ordering of scheduled events.

use std::time::Duration;
use xregion_types::Location;

/// Relative order of events scheduled for the same instant.
///
/// Deliveries land before the block timer fires, so a message arriving at
/// the same instant as a block slot is included in that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    /// Extrinsics entering a pool.
    Submission,
    /// Messages and headers arriving from other chains.
    Delivery,
    /// Block production.
    Timer,
}

/// Key of the event queue.
///
/// Ordered by time, then priority, then chain, then insertion sequence, so
/// iteration order is fully determined by the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub time: Duration,
    pub priority: EventPriority,
    pub chain: Location,
    pub seq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use xregion_types::{CORETIME_PARA_ID, REGIONX_PARA_ID};

    fn key(ms: u64, priority: EventPriority, chain: Location, seq: u64) -> EventKey {
        EventKey {
            time: Duration::from_millis(ms),
            priority,
            chain,
            seq,
        }
    }

    #[test]
    fn test_queue_order() {
        let coretime = Location::Para(CORETIME_PARA_ID);
        let regionx = Location::Para(REGIONX_PARA_ID);
        let mut queue = BTreeMap::new();
        queue.insert(key(10, EventPriority::Timer, coretime, 0), "timer");
        queue.insert(key(10, EventPriority::Delivery, regionx, 1), "delivery-regionx");
        queue.insert(key(10, EventPriority::Delivery, coretime, 2), "delivery-coretime");
        queue.insert(key(5, EventPriority::Timer, regionx, 3), "earlier");
        queue.insert(key(10, EventPriority::Delivery, coretime, 4), "second-delivery");

        let order: Vec<_> = queue.values().copied().collect();
        assert_eq!(
            order,
            vec![
                "earlier",
                "delivery-coretime",
                "second-delivery",
                "delivery-regionx",
                "timer"
            ]
        );
    }
}
