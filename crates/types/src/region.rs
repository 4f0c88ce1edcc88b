//! Coretime regions and their custody records.
//!
//! A region is issued once by the coretime chain and then moves between
//! chains. Wherever it currently lives, exactly one ledger entry describes
//! it. On chains that cannot read the coretime ledger directly the entry
//! starts out [`RegionState::Pending`] and is settled by a state proof.

use crate::{AccountId, Balance, CoreIndex, Hash, ParaId, Timeslice};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of parts a core is divided into.
pub const CORE_MASK_BITS: u32 = 80;

/// Occupancy of a fully used core.
pub const MAX_CORE_OCCUPANCY: u32 = 57_600;

/// Occupancy contributed by a single mask bit.
pub const OCCUPANCY_PER_PART: u32 = MAX_CORE_OCCUPANCY / CORE_MASK_BITS;

/// 80-bit mask of the parts of a core a region covers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoreMask([u8; 10]);

impl CoreMask {
    /// Mask with every part set.
    pub fn complete() -> Self {
        Self([0xFF; 10])
    }

    /// Mask with no part set.
    pub fn void() -> Self {
        Self([0; 10])
    }

    /// Mask with parts `from..to` set (bit 0 is the most significant bit).
    pub fn from_chunk(from: u32, to: u32) -> Self {
        let mut bytes = [0u8; 10];
        for bit in from.min(CORE_MASK_BITS)..to.min(CORE_MASK_BITS) {
            bytes[(bit / 8) as usize] |= 0x80 >> (bit % 8);
        }
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 10] {
        &self.0
    }

    /// Number of parts covered.
    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|b| b.count_ones()).sum()
    }

    /// True if no part is covered.
    pub fn is_void(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Core occupancy expressed in the same units as order requirements.
    pub fn occupancy(&self) -> u32 {
        self.count_ones() * OCCUPANCY_PER_PART
    }
}

impl fmt::Debug for CoreMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoreMask(0x{})", hex::encode(self.0))
    }
}

/// Identity of a region. Immutable once issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId {
    /// First timeslice the region covers.
    pub begin: Timeslice,
    /// Core the region is on.
    pub core: CoreIndex,
    /// Parts of the core covered.
    pub mask: CoreMask,
}

impl RegionId {
    /// Pack into the 128-bit index used when the region travels as a
    /// non-fungible asset: `begin (32) | core (16) | mask (80)`.
    pub fn to_index(&self) -> u128 {
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&self.begin.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.core.to_be_bytes());
        bytes[6..].copy_from_slice(&self.mask.0);
        u128::from_be_bytes(bytes)
    }

    /// Inverse of [`RegionId::to_index`].
    pub fn from_index(index: u128) -> Self {
        let bytes = index.to_be_bytes();
        let mut begin = [0u8; 4];
        begin.copy_from_slice(&bytes[..4]);
        let mut core = [0u8; 2];
        core.copy_from_slice(&bytes[4..6]);
        let mut mask = [0u8; 10];
        mask.copy_from_slice(&bytes[6..]);
        Self {
            begin: Timeslice::from_be_bytes(begin),
            core: CoreIndex::from_be_bytes(core),
            mask: CoreMask(mask),
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region(core={}, begin={}, parts={})",
            self.core,
            self.begin,
            self.mask.count_ones()
        )
    }
}

/// Metadata the coretime chain keeps for a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Timeslice at which the region ends (exclusive).
    pub end: Timeslice,
    /// Owner on the coretime chain.
    pub owner: AccountId,
    /// Price paid at sale, if bought.
    pub paid: Option<Balance>,
}

/// Settlement state of a region hosted away from the coretime chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionState {
    /// Record requested; waiting for the proof identified by `commitment`.
    Pending {
        /// Commitment of the outstanding state-read request.
        commitment: Hash,
    },
    /// Record proven against the coretime chain's state.
    Available {
        /// The proven record.
        record: RegionRecord,
    },
    /// The request expired unanswered. A new request may be issued.
    Unavailable,
}

impl RegionState {
    /// True once the record has been proven.
    pub fn is_available(&self) -> bool {
        matches!(self, RegionState::Available { .. })
    }

    /// True while a proof is outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self, RegionState::Pending { .. })
    }

    /// Outstanding request commitment, if pending.
    pub fn commitment(&self) -> Option<Hash> {
        match self {
            RegionState::Pending { commitment } => Some(*commitment),
            _ => None,
        }
    }

    /// Proven record, if available.
    pub fn record(&self) -> Option<&RegionRecord> {
        match self {
            RegionState::Available { record } => Some(record),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            RegionState::Pending { .. } => "Pending",
            RegionState::Available { .. } => "Available",
            RegionState::Unavailable => "Unavailable",
        }
    }
}

/// Ledger entry for a region held on a non-coretime chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Local owner.
    pub owner: AccountId,
    /// Record settlement state.
    pub state: RegionState,
}

/// What a core part is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreAssignment {
    /// Nothing.
    Idle,
    /// Instantaneous coretime pool.
    Pool,
    /// A specific parachain.
    Task(ParaId),
}

/// One item of the coretime workplan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// Parts of the core this item covers.
    pub mask: CoreMask,
    /// Assignment of those parts.
    pub assignment: CoreAssignment,
}
