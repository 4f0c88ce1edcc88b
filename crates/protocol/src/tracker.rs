//! Which chain the protocol expects to hold each region.

use crate::ProtocolError;
use std::collections::{HashMap, HashSet};
use xregion_types::{Location, RegionId};

/// Where a tracked region is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustodyStatus {
    /// Settled on one chain.
    Held(Location),
    /// Left `from`, not yet observed on `to`.
    InFlight { from: Location, to: Location },
}

impl CustodyStatus {
    /// The chain the region is, or will be, held by.
    pub fn expected_at(&self) -> Location {
        match self {
            CustodyStatus::Held(holder) => *holder,
            CustodyStatus::InFlight { to, .. } => *to,
        }
    }
}

/// Tracks custody of every region the protocol has moved.
///
/// Maintains a bidirectional index:
///
/// 1. Given a region, where is it (or where is it heading)?
/// 2. Given a chain, which regions should it end up holding?
///
/// Observed ledgers are checked against it; a region seen settled on more
/// than one chain is a custody violation.
#[derive(Debug, Default)]
pub struct CustodyTracker {
    /// region -> custody status
    regions: HashMap<RegionId, CustodyStatus>,
    /// Reverse index: chain -> regions expected there
    expected_at: HashMap<Location, HashSet<RegionId>>,
}

impl CustodyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&mut self, region_id: RegionId, status: CustodyStatus) {
        self.unindex(&region_id);
        self.expected_at
            .entry(status.expected_at())
            .or_default()
            .insert(region_id);
        self.regions.insert(region_id, status);
    }

    fn unindex(&mut self, region_id: &RegionId) {
        if let Some(status) = self.regions.get(region_id) {
            let location = status.expected_at();
            if let Some(regions) = self.expected_at.get_mut(&location) {
                regions.remove(region_id);
                if regions.is_empty() {
                    self.expected_at.remove(&location);
                }
            }
        }
    }

    /// Record that `holder` settled the region.
    pub fn settle(&mut self, region_id: RegionId, holder: Location) {
        self.set(region_id, CustodyStatus::Held(holder));
    }

    /// Record that a transfer left `from` for `to`.
    pub fn begin_transfer(&mut self, region_id: RegionId, from: Location, to: Location) {
        self.set(region_id, CustodyStatus::InFlight { from, to });
    }

    /// Stop tracking a consumed region.
    ///
    /// Cleans up both the forward and reverse indexes.
    pub fn remove(&mut self, region_id: &RegionId) {
        self.unindex(region_id);
        self.regions.remove(region_id);
    }

    /// Check a set of chains observed holding the region.
    ///
    /// Exactly one holder settles the region there. None leaves the
    /// tracker as is. More than one is a violation.
    pub fn observe(
        &mut self,
        region_id: RegionId,
        holders: &[Location],
    ) -> Result<(), ProtocolError> {
        match holders {
            [] => Ok(()),
            [holder] => {
                self.settle(region_id, *holder);
                Ok(())
            }
            _ => Err(ProtocolError::CustodyViolation {
                region_id,
                holders: holders.to_vec(),
            }),
        }
    }

    pub fn status(&self, region_id: &RegionId) -> Option<CustodyStatus> {
        self.regions.get(region_id).copied()
    }

    /// Regions held by, or heading to, `location`.
    pub fn regions_at(&self, location: Location) -> Option<&HashSet<RegionId>> {
        self.expected_at.get(&location)
    }

    /// Number of regions between chains.
    pub fn in_flight(&self) -> usize {
        self.regions
            .values()
            .filter(|status| matches!(status, CustodyStatus::InFlight { .. }))
            .count()
    }

    pub fn contains(&self, region_id: &RegionId) -> bool {
        self.regions.contains_key(region_id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xregion_types::{CoreMask, CORETIME_PARA_ID, REGIONX_PARA_ID};

    fn region(core: u16) -> RegionId {
        RegionId {
            begin: 40,
            core,
            mask: CoreMask::complete(),
        }
    }

    const CORETIME: Location = Location::Para(CORETIME_PARA_ID);
    const REGIONX: Location = Location::Para(REGIONX_PARA_ID);

    #[test]
    fn test_transfer_moves_reverse_index() {
        let mut tracker = CustodyTracker::new();
        tracker.settle(region(0), CORETIME);
        assert!(tracker.regions_at(CORETIME).unwrap().contains(&region(0)));

        tracker.begin_transfer(region(0), CORETIME, REGIONX);
        assert!(tracker.regions_at(CORETIME).is_none());
        assert!(tracker.regions_at(REGIONX).unwrap().contains(&region(0)));
        assert_eq!(tracker.in_flight(), 1);

        tracker.observe(region(0), &[REGIONX]).unwrap();
        assert_eq!(tracker.status(&region(0)), Some(CustodyStatus::Held(REGIONX)));
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_nothing_observed_keeps_in_flight() {
        let mut tracker = CustodyTracker::new();
        tracker.begin_transfer(region(1), CORETIME, REGIONX);
        tracker.observe(region(1), &[]).unwrap();
        assert_eq!(
            tracker.status(&region(1)),
            Some(CustodyStatus::InFlight {
                from: CORETIME,
                to: REGIONX
            })
        );
    }

    #[test]
    fn test_double_custody_is_violation() {
        let mut tracker = CustodyTracker::new();
        assert_eq!(
            tracker.observe(region(2), &[CORETIME, REGIONX]),
            Err(ProtocolError::CustodyViolation {
                region_id: region(2),
                holders: vec![CORETIME, REGIONX],
            })
        );
        assert!(!tracker.contains(&region(2)));
    }

    #[test]
    fn test_remove_cleans_both_indexes() {
        let mut tracker = CustodyTracker::new();
        tracker.settle(region(0), REGIONX);
        tracker.settle(region(1), REGIONX);
        tracker.remove(&region(0));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.regions_at(REGIONX).unwrap().len(), 1);
        tracker.remove(&region(1));
        assert!(tracker.is_empty());
        assert!(tracker.regions_at(REGIONX).is_none());
    }
}
