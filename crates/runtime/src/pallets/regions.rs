//! Regions hosted on RegionX.
//!
//! A region arrives without its record. Minting it issues a state read of
//! the coretime chain's reserve entry; the entry stays `Pending` until that
//! read is answered with a valid proof.
//!
//! ```text
//!   mint ──► Pending ──response──► Available ──burn / fulfill──► (removed)
//!               │  ▲
//!         timeout  └──── request_region_record
//!               ▼        │
//!           Unavailable ─┘
//! ```

use crate::pallets::ismp;
use crate::{Context, Ledger, Origin};
use tracing::{debug, info};
use xregion_messages::RegionsCall;
use xregion_types::{
    AccountId, BlockHeight, DispatchError, GetRequest, Hash, IsmpError, Region, RegionId,
    RegionRecord, RegionState, RegionsError, RuntimeEvent, StorageKey, StorageValue,
};

/// The region entry, if hosted here.
pub fn region(ledger: &Ledger, region_id: &RegionId) -> Option<Region> {
    ledger
        .get(&StorageKey::Region(*region_id))
        .and_then(StorageValue::as_region)
        .cloned()
}

fn put(ctx: &mut Context, region_id: RegionId, region: Region) {
    ctx.ledger
        .insert(StorageKey::Region(region_id), StorageValue::Region(region));
}

fn request_record(
    ctx: &mut Context,
    region_id: RegionId,
    height: BlockHeight,
) -> Result<Hash, DispatchError> {
    let coretime = ctx.config.coretime_para;
    let commitment = ismp::dispatch_get(
        ctx,
        coretime,
        vec![StorageKey::ReservedRegion(region_id)],
        height,
    )?;
    ctx.deposit_event(RuntimeEvent::RegionRecordRequested {
        region_id,
        commitment,
    });
    Ok(commitment)
}

/// Create a region that just arrived from the coretime chain and request
/// its record at the height of the block that sent it.
pub fn mint_into(
    ctx: &mut Context,
    region_id: RegionId,
    owner: AccountId,
    sent_at: BlockHeight,
) -> Result<Hash, DispatchError> {
    if ctx.ledger.contains(&StorageKey::Region(region_id)) {
        return Err(RegionsError::AlreadyExists.into());
    }
    ctx.deposit_event(RuntimeEvent::RegionMinted { region_id, owner });
    let commitment = request_record(ctx, region_id, sent_at)?;
    put(
        ctx,
        region_id,
        Region {
            owner,
            state: RegionState::Pending { commitment },
        },
    );
    info!(%region_id, %owner, commitment = %commitment, "Region minted, record pending");
    Ok(commitment)
}

/// Remove a region owned by `owner` whose record is available, returning
/// the record.
pub fn burn(
    ctx: &mut Context,
    region_id: RegionId,
    owner: AccountId,
) -> Result<RegionRecord, DispatchError> {
    let region = region(&ctx.ledger, &region_id).ok_or(RegionsError::UnknownRegion)?;
    if region.owner != owner {
        return Err(RegionsError::NotOwner.into());
    }
    let RegionState::Available { record } = region.state else {
        return Err(RegionsError::RegionNotAvailable.into());
    };
    ctx.ledger.remove(&StorageKey::Region(region_id));
    ctx.deposit_event(RuntimeEvent::RegionBurnt { region_id });
    Ok(record)
}

/// Change the owner of a hosted region. Allowed in any record state.
pub fn transfer(
    ctx: &mut Context,
    who: AccountId,
    region_id: RegionId,
    new_owner: AccountId,
) -> Result<(), DispatchError> {
    let mut region = region(&ctx.ledger, &region_id).ok_or(RegionsError::UnknownRegion)?;
    if region.owner != who {
        return Err(RegionsError::NotOwner.into());
    }
    region.owner = new_owner;
    put(ctx, region_id, region);
    ctx.deposit_event(RuntimeEvent::RegionTransferred {
        region_id,
        old_owner: who,
        new_owner,
    });
    Ok(())
}

/// Issue a fresh record request for a region whose previous one expired.
pub fn request_region_record(
    ctx: &mut Context,
    region_id: RegionId,
) -> Result<Hash, DispatchError> {
    let mut region = region(&ctx.ledger, &region_id).ok_or(RegionsError::UnknownRegion)?;
    if region.state != RegionState::Unavailable {
        return Err(RegionsError::NotUnavailable.into());
    }
    let height = ismp::latest_height(&ctx.ledger, ctx.config.coretime_para)
        .ok_or(IsmpError::UntrackedChain)?;
    let commitment = request_record(ctx, region_id, height)?;
    region.state = RegionState::Pending { commitment };
    put(ctx, region_id, region);
    Ok(commitment)
}

/// Settle the record of the region a verified response was for.
pub fn on_response(
    ctx: &mut Context,
    commitment: Hash,
    values: Vec<(StorageKey, StorageValue)>,
) -> Result<(), DispatchError> {
    for (key, value) in values {
        let StorageKey::ReservedRegion(region_id) = key else {
            continue;
        };
        let record = value
            .as_region_record()
            .cloned()
            .ok_or(IsmpError::ValueNotFound)?;
        let mut region = region(&ctx.ledger, &region_id).ok_or(RegionsError::UnknownRegion)?;
        if region.state.commitment() != Some(commitment) {
            return Err(RegionsError::RecordAlreadySet.into());
        }
        region.state = RegionState::Available { record };
        put(ctx, region_id, region);
        info!(%region_id, "Region record available");
        ctx.deposit_event(RuntimeEvent::RecordSet { region_id });
    }
    Ok(())
}

/// Mark regions waiting on an expired request as unavailable.
pub fn on_timeout(ctx: &mut Context, request: &GetRequest) {
    let commitment = request.commitment();
    for key in &request.keys {
        let StorageKey::ReservedRegion(region_id) = key else {
            continue;
        };
        let Some(mut region) = region(&ctx.ledger, region_id) else {
            continue;
        };
        if region.state.commitment() == Some(commitment) {
            region.state = RegionState::Unavailable;
            put(ctx, *region_id, region);
            debug!(%region_id, "Region record unavailable");
            ctx.deposit_event(RuntimeEvent::RecordUnavailable {
                region_id: *region_id,
                commitment,
            });
        }
    }
}

pub(crate) fn dispatch(
    ctx: &mut Context,
    origin: Origin,
    call: RegionsCall,
) -> Result<(), DispatchError> {
    let who = origin.ensure_signed()?;
    match call {
        RegionsCall::Transfer {
            region_id,
            new_owner,
        } => transfer(ctx, who, region_id, new_owner),
        RegionsCall::RequestRegionRecord { region_id } => {
            request_region_record(ctx, region_id).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainConfig;
    use std::time::Duration;
    use xregion_messages::FinalizedHeader;
    use xregion_types::{CoreMask, Location, CORETIME_PARA_ID};

    fn region_id() -> RegionId {
        RegionId {
            begin: 34,
            core: 0,
            mask: CoreMask::complete(),
        }
    }

    fn record() -> RegionRecord {
        RegionRecord {
            end: 44,
            owner: AccountId::from_seed("//Alice"),
            paid: Some(100),
        }
    }

    fn ctx(config: &ChainConfig) -> Context<'_> {
        Context::new(config, Ledger::new(), Duration::from_secs(10), BlockHeight(1))
    }

    #[test]
    fn test_mint_starts_pending() {
        let config = ChainConfig::regionx();
        let mut ctx = ctx(&config);
        let alice = AccountId::from_seed("//Alice");

        let commitment = mint_into(&mut ctx, region_id(), alice, BlockHeight(7)).unwrap();
        let hosted = region(&ctx.ledger, &region_id()).unwrap();
        assert_eq!(hosted.owner, alice);
        assert_eq!(hosted.state, RegionState::Pending { commitment });

        let request = ctx
            .ledger
            .get(&StorageKey::Request(commitment))
            .and_then(StorageValue::as_request)
            .and_then(|r| r.as_get().cloned())
            .unwrap();
        assert_eq!(request.dest, CORETIME_PARA_ID);
        assert_eq!(request.height, BlockHeight(7));
        assert_eq!(request.keys, vec![StorageKey::ReservedRegion(region_id())]);

        assert_eq!(
            mint_into(&mut ctx, region_id(), alice, BlockHeight(8)),
            Err(RegionsError::AlreadyExists.into())
        );
    }

    #[test]
    fn test_pending_region_cannot_burn() {
        let config = ChainConfig::regionx();
        let mut ctx = ctx(&config);
        let alice = AccountId::from_seed("//Alice");
        mint_into(&mut ctx, region_id(), alice, BlockHeight(7)).unwrap();

        let err = burn(&mut ctx, region_id(), alice).unwrap_err();
        assert_eq!(err, RegionsError::RegionNotAvailable.into());
        assert!(err.is_region_not_available());
        assert!(region(&ctx.ledger, &region_id()).is_some());
    }

    #[test]
    fn test_response_settles_record() {
        let config = ChainConfig::regionx();
        let mut ctx = ctx(&config);
        let alice = AccountId::from_seed("//Alice");
        let commitment = mint_into(&mut ctx, region_id(), alice, BlockHeight(7)).unwrap();

        on_response(
            &mut ctx,
            commitment,
            vec![(
                StorageKey::ReservedRegion(region_id()),
                StorageValue::RegionRecord(record()),
            )],
        )
        .unwrap();
        let hosted = region(&ctx.ledger, &region_id()).unwrap();
        assert_eq!(hosted.state, RegionState::Available { record: record() });

        // A second answer for the same region is refused.
        assert_eq!(
            on_response(
                &mut ctx,
                commitment,
                vec![(
                    StorageKey::ReservedRegion(region_id()),
                    StorageValue::RegionRecord(record()),
                )],
            ),
            Err(RegionsError::RecordAlreadySet.into())
        );

        assert_eq!(burn(&mut ctx, region_id(), alice).unwrap(), record());
        assert!(region(&ctx.ledger, &region_id()).is_none());
    }

    #[test]
    fn test_timeout_then_rerequest() {
        let config = ChainConfig::regionx();
        let mut ctx = ctx(&config);
        let alice = AccountId::from_seed("//Alice");
        mint_into(&mut ctx, region_id(), alice, BlockHeight(7)).unwrap();
        assert_eq!(
            request_region_record(&mut ctx, region_id()),
            Err(RegionsError::NotUnavailable.into())
        );

        ctx.now += config.request_timeout.unwrap();
        ismp::on_initialize(&mut ctx);
        assert_eq!(
            region(&ctx.ledger, &region_id()).unwrap().state,
            RegionState::Unavailable
        );

        // Without any trusted coretime state there is no height to read at.
        assert_eq!(
            request_region_record(&mut ctx, region_id()),
            Err(IsmpError::UntrackedChain.into())
        );
        ismp::add_parachains(&mut ctx, vec![CORETIME_PARA_ID]);
        ismp::on_header(
            &mut ctx,
            &FinalizedHeader {
                origin: Location::Para(CORETIME_PARA_ID),
                height: BlockHeight(9),
                hash: Hash::from_bytes(b"block 9"),
                state_root: Hash::from_bytes(b"root"),
            },
        );
        let commitment = request_region_record(&mut ctx, region_id()).unwrap();
        assert_eq!(
            region(&ctx.ledger, &region_id()).unwrap().state,
            RegionState::Pending { commitment }
        );
    }

    #[test]
    fn test_transfer_keeps_state() {
        let config = ChainConfig::regionx();
        let mut ctx = ctx(&config);
        let alice = AccountId::from_seed("//Alice");
        let bob = AccountId::from_seed("//Bob");
        let commitment = mint_into(&mut ctx, region_id(), alice, BlockHeight(7)).unwrap();

        assert_eq!(
            transfer(&mut ctx, bob, region_id(), bob),
            Err(RegionsError::NotOwner.into())
        );
        transfer(&mut ctx, alice, region_id(), bob).unwrap();
        let hosted = region(&ctx.ledger, &region_id()).unwrap();
        assert_eq!(hosted.owner, bob);
        assert_eq!(hosted.state, RegionState::Pending { commitment });
    }
}
