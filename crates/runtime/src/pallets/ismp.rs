//! State-read requests to other chains and verification of their responses.
//!
//! A request is stored under its commitment until a response proves the
//! requested keys against a state root this chain already trusts, or until
//! it times out. State roots arrive as finalized headers of tracked chains.

use crate::pallets::regions;
use crate::{Context, Ledger, Origin};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use xregion_messages::{Datagram, FinalizedHeader, IsmpCall, ResponseMessage};
use xregion_types::{
    BlockHeight, DispatchError, GetRequest, Hash, IsmpError, Location, ParaId, Request,
    RuntimeEvent, StorageKey, StoragePrefix, StorageValue,
};

/// Whether this chain tracks `para`'s state roots.
pub fn is_tracked(ledger: &Ledger, para: ParaId) -> bool {
    ledger.contains(&StorageKey::TrackedChain(para))
}

/// Trusted state root of `para` at `height`.
pub fn state_commitment(ledger: &Ledger, para: ParaId, height: BlockHeight) -> Option<Hash> {
    ledger
        .get(&StorageKey::StateCommitment { para, height })
        .and_then(StorageValue::as_state_root)
}

/// Highest height of `para` with a trusted state root.
pub fn latest_height(ledger: &Ledger, para: ParaId) -> Option<BlockHeight> {
    ledger
        .get(&StorageKey::LatestStateHeight(para))
        .and_then(StorageValue::as_height)
}

/// Heights of `para` that outstanding requests read at.
fn pinned_heights(ledger: &Ledger, para: ParaId) -> BTreeSet<BlockHeight> {
    ledger
        .range(StorageKey::Request(Hash::ZERO)..=StorageKey::Request(Hash::MAX))
        .filter_map(|(_, value)| value.as_request()?.as_get())
        .filter(|get| get.dest == para)
        .map(|get| get.height)
        .collect()
}

/// Drop state roots of `para` that fell out of the retention window,
/// unless an outstanding request still needs them.
fn prune_commitments(ctx: &mut Context, para: ParaId, latest: BlockHeight) {
    let Some(cutoff) = latest.0.checked_sub(ctx.config.state_root_retention) else {
        return;
    };
    let from = StorageKey::StateCommitment {
        para,
        height: BlockHeight(0),
    };
    let to = StorageKey::StateCommitment {
        para,
        height: BlockHeight(cutoff),
    };
    let stale: Vec<BlockHeight> = ctx
        .ledger
        .range(from..to)
        .filter_map(|(key, _)| match key {
            StorageKey::StateCommitment { height, .. } => Some(*height),
            _ => None,
        })
        .collect();
    if stale.is_empty() {
        return;
    }
    let pinned = pinned_heights(&ctx.ledger, para);
    for height in stale.into_iter().filter(|height| !pinned.contains(height)) {
        ctx.ledger.remove(&StorageKey::StateCommitment { para, height });
    }
}

/// Start tracking state roots of `para_ids`.
pub fn add_parachains(ctx: &mut Context, para_ids: Vec<ParaId>) {
    for para in para_ids {
        ctx.ledger
            .insert(StorageKey::TrackedChain(para), StorageValue::Flag);
    }
}

/// Store the state root of a relayed header if its chain is tracked.
pub fn on_header(ctx: &mut Context, header: &FinalizedHeader) -> bool {
    let Location::Para(para) = header.origin else {
        return false;
    };
    if !is_tracked(&ctx.ledger, para) {
        return false;
    }
    ctx.ledger.insert(
        StorageKey::StateCommitment {
            para,
            height: header.height,
        },
        StorageValue::StateRoot(header.state_root),
    );
    let latest = match latest_height(&ctx.ledger, para) {
        Some(latest) if latest >= header.height => latest,
        _ => {
            ctx.ledger.insert(
                StorageKey::LatestStateHeight(para),
                StorageValue::Height(header.height),
            );
            header.height
        }
    };
    prune_commitments(ctx, para, latest);
    ctx.deposit_event(RuntimeEvent::StateCommitmentUpdated {
        para,
        height: header.height,
    });
    true
}

/// Issue a request to read `keys` from `dest` at `height`.
pub fn dispatch_get(
    ctx: &mut Context,
    dest: ParaId,
    keys: Vec<StorageKey>,
    height: BlockHeight,
) -> Result<Hash, DispatchError> {
    let source = ctx.config.para_id().ok_or(DispatchError::CallUnavailable)?;
    let nonce = match ctx.ledger.get(&StorageKey::RequestNonce) {
        Some(StorageValue::Nonce(nonce)) => *nonce,
        _ => 0,
    };
    ctx.ledger
        .insert(StorageKey::RequestNonce, StorageValue::Nonce(nonce + 1));

    let timeout_timestamp = ctx
        .config
        .request_timeout
        .map(|timeout| ctx.now_secs() + timeout.as_secs())
        .unwrap_or(0);
    let request = Request::Get(GetRequest {
        source,
        dest,
        nonce,
        keys,
        height,
        timeout_timestamp,
    });
    let commitment = request.commitment();
    ctx.ledger.insert(
        StorageKey::Request(commitment),
        StorageValue::Request(request),
    );
    debug!(%dest, height = height.0, commitment = %commitment, "Get request dispatched");
    Ok(commitment)
}

/// Check a response against the outstanding request and the trusted state
/// root, returning the proven values in request-key order.
pub fn validate_response(
    ledger: &Ledger,
    message: &ResponseMessage,
) -> Result<(GetRequest, Vec<(StorageKey, StorageValue)>), IsmpError> {
    let get = message.request.as_get().ok_or(IsmpError::NotGetRequest)?;
    let stored = ledger
        .get(&StorageKey::Request(message.commitment()))
        .and_then(StorageValue::as_request)
        .ok_or(IsmpError::UnknownRequest)?;
    if stored != &message.request {
        return Err(IsmpError::UnknownRequest);
    }
    if message.proof.para != get.dest || message.proof.height != get.height {
        return Err(IsmpError::InvalidProof);
    }
    let root = state_commitment(ledger, get.dest, get.height).ok_or(
        IsmpError::UnknownStateCommitment {
            para: get.dest,
            height: get.height.0,
        },
    )?;
    let values = message
        .proof
        .proof
        .verify(&root, &get.keys)
        .map_err(|_| IsmpError::InvalidProof)?;
    Ok((get.clone(), values))
}

/// Apply verified responses.
pub fn handle_responses(ctx: &mut Context, messages: Vec<Datagram>) -> Result<(), DispatchError> {
    for Datagram::Response(message) in messages {
        let (request, values) = validate_response(&ctx.ledger, &message)?;
        let commitment = request.commitment();
        ctx.ledger.remove(&StorageKey::Request(commitment));
        regions::on_response(ctx, commitment, values)?;
        ctx.deposit_event(RuntimeEvent::GetRequestHandled { commitment });
    }
    Ok(())
}

/// Expire requests whose timeout has passed.
pub fn on_initialize(ctx: &mut Context) {
    let now = ctx.now_secs();
    let expired: Vec<GetRequest> = ctx
        .ledger
        .iter_prefix(StoragePrefix::Requests)
        .filter_map(|(_, value)| value.as_request()?.as_get().cloned())
        .filter(|get| get.timed_out(now))
        .collect();

    for request in expired {
        let commitment = request.commitment();
        warn!(commitment = %commitment, dest = %request.dest, "Get request timed out");
        ctx.ledger.remove(&StorageKey::Request(commitment));
        regions::on_timeout(ctx, &request);
        ctx.deposit_event(RuntimeEvent::GetRequestTimedOut { commitment });
    }
}

pub(crate) fn dispatch(
    ctx: &mut Context,
    origin: Origin,
    call: IsmpCall,
) -> Result<(), DispatchError> {
    match call {
        IsmpCall::HandleUnsigned { messages } => {
            origin.ensure_none()?;
            handle_responses(ctx, messages)
        }
        IsmpCall::AddParachain { para_ids } => {
            origin.ensure_root()?;
            add_parachains(ctx, para_ids);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainConfig;
    use std::time::Duration;
    use xregion_messages::StateProof;
    use xregion_types::{AccountId, StorageProof, CORETIME_PARA_ID};

    fn remote_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.insert(StorageKey::NextOrderId, StorageValue::Nonce(3));
        ledger.insert(StorageKey::RequestNonce, StorageValue::Nonce(8));
        ledger
    }

    fn tracked(config: &ChainConfig, root: Hash) -> Context<'_> {
        let mut ctx = Context::new(config, Ledger::new(), Duration::from_secs(100), BlockHeight(1));
        add_parachains(&mut ctx, vec![CORETIME_PARA_ID]);
        let header = FinalizedHeader {
            origin: Location::Para(CORETIME_PARA_ID),
            height: BlockHeight(5),
            hash: Hash::from_bytes(b"block 5"),
            state_root: root,
        };
        assert!(on_header(&mut ctx, &header));
        ctx
    }

    fn response(ctx: &mut Context, remote: &Ledger) -> ResponseMessage {
        let keys = vec![StorageKey::NextOrderId];
        let commitment = dispatch_get(ctx, CORETIME_PARA_ID, keys.clone(), BlockHeight(5)).unwrap();
        let request = ctx
            .ledger
            .get(&StorageKey::Request(commitment))
            .and_then(StorageValue::as_request)
            .cloned()
            .unwrap();
        ResponseMessage {
            request,
            proof: StateProof {
                para: CORETIME_PARA_ID,
                height: BlockHeight(5),
                proof: remote.proof(&keys),
            },
            signer: AccountId::from_seed("//Relayer"),
        }
    }

    #[test]
    fn test_untracked_headers_are_ignored() {
        let config = ChainConfig::regionx();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        let header = FinalizedHeader {
            origin: Location::Para(CORETIME_PARA_ID),
            height: BlockHeight(1),
            hash: Hash::ZERO,
            state_root: Hash::ZERO,
        };
        assert!(!on_header(&mut ctx, &header));
        assert_eq!(latest_height(&ctx.ledger, CORETIME_PARA_ID), None);
    }

    fn header(height: u64) -> FinalizedHeader {
        FinalizedHeader {
            origin: Location::Para(CORETIME_PARA_ID),
            height: BlockHeight(height),
            hash: Hash::from_bytes(&height.to_le_bytes()),
            state_root: Hash::from_bytes(b"root"),
        }
    }

    fn trusted_heights(ledger: &Ledger) -> Vec<u64> {
        ledger
            .iter_prefix(StoragePrefix::StateCommitments)
            .filter_map(|(key, _)| match key {
                StorageKey::StateCommitment { height, .. } => Some(height.0),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_latest_height_ignores_late_headers() {
        let config = ChainConfig::regionx();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        add_parachains(&mut ctx, vec![CORETIME_PARA_ID]);
        assert!(on_header(&mut ctx, &header(4)));
        assert!(on_header(&mut ctx, &header(2)));
        assert_eq!(latest_height(&ctx.ledger, CORETIME_PARA_ID), Some(BlockHeight(4)));
        assert_eq!(trusted_heights(&ctx.ledger), vec![2, 4]);
    }

    #[test]
    fn test_old_state_roots_are_pruned() {
        let config = ChainConfig::regionx().with_state_root_retention(3);
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        add_parachains(&mut ctx, vec![CORETIME_PARA_ID]);
        for height in 1..=10 {
            on_header(&mut ctx, &header(height));
        }
        assert_eq!(trusted_heights(&ctx.ledger), vec![7, 8, 9, 10]);
        assert_eq!(latest_height(&ctx.ledger, CORETIME_PARA_ID), Some(BlockHeight(10)));
    }

    #[test]
    fn test_roots_of_outstanding_requests_survive_pruning() {
        let config = ChainConfig::regionx().with_state_root_retention(3);
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        add_parachains(&mut ctx, vec![CORETIME_PARA_ID]);
        on_header(&mut ctx, &header(1));
        on_header(&mut ctx, &header(2));
        let commitment = dispatch_get(
            &mut ctx,
            CORETIME_PARA_ID,
            vec![StorageKey::NextOrderId],
            BlockHeight(2),
        )
        .unwrap();
        for height in 3..=10 {
            on_header(&mut ctx, &header(height));
        }
        assert_eq!(trusted_heights(&ctx.ledger), vec![2, 7, 8, 9, 10]);

        // Once the request is gone, the next header releases its root.
        ctx.ledger.remove(&StorageKey::Request(commitment));
        on_header(&mut ctx, &header(11));
        assert_eq!(trusted_heights(&ctx.ledger), vec![8, 9, 10, 11]);
    }

    #[test]
    fn test_valid_response_verifies() {
        let config = ChainConfig::regionx();
        let remote = remote_ledger();
        let mut ctx = tracked(&config, remote.root());
        let message = response(&mut ctx, &remote);

        let (request, values) = validate_response(&ctx.ledger, &message).unwrap();
        assert_eq!(request.nonce, 0);
        assert_eq!(request.timeout_timestamp, 100 + 3_600);
        assert_eq!(values, vec![(StorageKey::NextOrderId, StorageValue::Nonce(3))]);
    }

    #[test]
    fn test_response_against_wrong_root_is_rejected() {
        let config = ChainConfig::regionx();
        let remote = remote_ledger();
        let mut ctx = tracked(&config, Hash::from_bytes(b"some other root"));
        let message = response(&mut ctx, &remote);
        assert_eq!(
            validate_response(&ctx.ledger, &message).unwrap_err(),
            IsmpError::InvalidProof
        );
    }

    #[test]
    fn test_response_at_wrong_height_is_rejected() {
        let config = ChainConfig::regionx();
        let remote = remote_ledger();
        let mut ctx = tracked(&config, remote.root());
        let mut message = response(&mut ctx, &remote);
        message.proof.height = BlockHeight(6);
        assert_eq!(
            validate_response(&ctx.ledger, &message).unwrap_err(),
            IsmpError::InvalidProof
        );
    }

    #[test]
    fn test_unknown_and_non_get_requests_are_rejected() {
        let config = ChainConfig::regionx();
        let remote = remote_ledger();
        let mut ctx = tracked(&config, remote.root());
        let mut message = response(&mut ctx, &remote);

        let mut unknown = message.clone();
        if let Request::Get(get) = &mut unknown.request {
            get.nonce = 99;
        }
        assert_eq!(
            validate_response(&ctx.ledger, &unknown).unwrap_err(),
            IsmpError::UnknownRequest
        );

        message.request = Request::Post {
            source: ParaId(2000),
            dest: CORETIME_PARA_ID,
            nonce: 0,
            body: vec![],
        };
        message.proof.proof = StorageProof::default();
        assert_eq!(
            validate_response(&ctx.ledger, &message).unwrap_err(),
            IsmpError::NotGetRequest
        );
    }

    #[test]
    fn test_requests_expire() {
        let config = ChainConfig::regionx();
        let remote = remote_ledger();
        let mut ctx = tracked(&config, remote.root());
        let message = response(&mut ctx, &remote);

        ctx.now = Duration::from_secs(100 + 3_600);
        on_initialize(&mut ctx);
        assert!(!ctx.ledger.contains(&StorageKey::Request(message.commitment())));
        assert_eq!(
            validate_response(&ctx.ledger, &message).unwrap_err(),
            IsmpError::UnknownRequest
        );
    }
}
