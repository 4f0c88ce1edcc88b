//! Orders for coretime and the requirement check used at fulfillment.

use crate::{AccountId, ParaId, RegionId, RegionRecord, Timeslice};
use serde::{Deserialize, Serialize};

/// What a region must cover to fulfill an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// The region must start no later than this timeslice.
    pub begin: Timeslice,
    /// The region must last at least until this timeslice.
    pub end: Timeslice,
    /// Minimum core occupancy, out of 57_600.
    pub core_occupancy: u32,
}

/// A request for coretime on behalf of a parachain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Account that created the order.
    pub creator: AccountId,
    /// Parachain the coretime is for.
    pub para_id: ParaId,
    /// What the fulfilling region must cover.
    pub requirements: Requirements,
}

/// Reason a region cannot fulfill an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RequirementsMismatch {
    /// Region begins after the required start.
    #[error("region starts too late")]
    StartsTooLate,
    /// Region ends before the required end.
    #[error("region ends too soon")]
    EndsTooSoon,
    /// Region covers too little of its core.
    #[error("region core occupancy insufficient")]
    CoreOccupancyInsufficient,
}

/// Check that a region satisfies an order's requirements.
pub fn check_requirements(
    region_id: &RegionId,
    record: &RegionRecord,
    requirements: &Requirements,
) -> Result<(), RequirementsMismatch> {
    if region_id.begin > requirements.begin {
        return Err(RequirementsMismatch::StartsTooLate);
    }
    if record.end < requirements.end {
        return Err(RequirementsMismatch::EndsTooSoon);
    }
    if region_id.mask.occupancy() < requirements.core_occupancy {
        return Err(RequirementsMismatch::CoreOccupancyInsufficient);
    }
    Ok(())
}
