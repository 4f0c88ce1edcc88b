//! Moving regions between chains and resolving their records.
//!
//! # Custody of one region
//!
//! ```text
//!   coretime: owned ──transfer_resource──► reserved for RegionX
//!                                                │ message
//!   RegionX:                                     ▼
//!                           Pending(commitment) ──resolve_record──► Available(record)
//!                                                                        │
//!   coretime: owned ◄──────────────────── transfer_resource_back ────────┘
//! ```
//!
//! The sending chain drops its entry in the same block that emits the
//! message, so at any finalized instant at most one chain holds the region.
//! The record never travels with the region; RegionX proves it from the
//! coretime chain's state at the height the message was sent.

use crate::{
    read_finalized, ChainApi, Chains, CustodyStatus, CustodyTracker, Included, ProtocolConfig,
    ProtocolError, Reconciler, TransactionSubmitter,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};
use xregion_messages::{
    AssetClass, Call, Datagram, IsmpCall, MultiAsset, RegionsCall, ResponseMessage, XcmCall,
};
use xregion_types::{
    AccountId, BlockRef, Hash, IsmpError, Location, Region, RegionId, RegionRecord, RegionState,
    RuntimeEvent, StorageKey, StoragePrefix, StorageValue,
};

/// Ledger key under which `location` holds a settled region.
///
/// The chain that issues regions keeps them in its broker ledger; every
/// other chain keeps them in its region ledger.
pub fn custody_key(location: Location, region_id: RegionId) -> StorageKey {
    if AssetClass::Region.is_reserve(location) {
        StorageKey::BrokerRegion(region_id)
    } else {
        StorageKey::Region(region_id)
    }
}

/// A region that left its sending chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub region_id: RegionId,
    pub from: Location,
    pub to: Location,
    pub receiver: AccountId,
    /// Block on `from` that removed the region and emitted the message.
    pub block: BlockRef,
}

/// Region custody across chains.
pub struct RegionCustody {
    chains: Chains,
    config: ProtocolConfig,
    submitter: TransactionSubmitter,
    reconciler: Reconciler,
    tracker: Mutex<CustodyTracker>,
}

impl RegionCustody {
    pub fn new(chains: Chains, config: ProtocolConfig) -> Self {
        let reconciler = Reconciler::new(config.settle_within_blocks);
        Self {
            chains,
            config,
            submitter: TransactionSubmitter::new(),
            reconciler,
            tracker: Mutex::new(CustodyTracker::new()),
        }
    }

    fn chain(&self, location: Location) -> Result<Arc<dyn ChainApi>, ProtocolError> {
        self.chains
            .get(location)
            .ok_or(ProtocolError::UnknownChain(location))
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Where the protocol last saw or sent the region.
    pub fn custody(&self, region_id: &RegionId) -> Option<CustodyStatus> {
        self.tracker.lock().status(region_id)
    }

    /// Stop tracking a region that was consumed.
    pub(crate) fn forget(&self, region_id: &RegionId) {
        self.tracker.lock().remove(region_id);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    /// The region entry on a non-issuing chain, at its best block.
    pub async fn region(
        &self,
        chain: Location,
        region_id: RegionId,
    ) -> Result<Option<Region>, ProtocolError> {
        let api = self.chain(chain)?;
        Ok(api
            .storage(&StorageKey::Region(region_id), None)
            .await?
            .as_ref()
            .and_then(StorageValue::as_region)
            .cloned())
    }

    /// Every finalized region entry on `chain`.
    pub async fn regions(&self, chain: Location) -> Result<Vec<(RegionId, Region)>, ProtocolError> {
        let api = self.chain(chain)?;
        let head = api.finalized_head().await?;
        Ok(api
            .storage_iter(StoragePrefix::Regions, Some(head.hash))
            .await?
            .into_iter()
            .filter_map(|(key, value)| match (key, value) {
                (StorageKey::Region(id), StorageValue::Region(region)) => Some((id, region)),
                _ => None,
            })
            .collect())
    }

    /// Every finalized region entry in the broker ledger of `chain`.
    pub async fn broker_regions(
        &self,
        chain: Location,
    ) -> Result<Vec<(RegionId, RegionRecord)>, ProtocolError> {
        let api = self.chain(chain)?;
        let head = api.finalized_head().await?;
        Ok(api
            .storage_iter(StoragePrefix::BrokerRegions, Some(head.hash))
            .await?
            .into_iter()
            .filter_map(|(key, value)| match (key, value) {
                (StorageKey::BrokerRegion(id), StorageValue::RegionRecord(record)) => {
                    Some((id, record))
                }
                _ => None,
            })
            .collect())
    }

    /// Chains among `chains` whose finalized ledger holds the region.
    pub async fn holders(
        &self,
        region_id: RegionId,
        chains: &[Location],
    ) -> Result<Vec<Location>, ProtocolError> {
        let mut holders = Vec::new();
        for &location in chains {
            let api = self.chain(location)?;
            if read_finalized(api.as_ref(), &custody_key(location, region_id))
                .await?
                .is_some()
            {
                holders.push(location);
            }
        }
        Ok(holders)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transfers
    // ═══════════════════════════════════════════════════════════════════════

    /// Move a region from the issuing chain to `destination`.
    ///
    /// The destination mints it `Pending` on arrival and requests its record.
    pub async fn transfer_resource(
        &self,
        region_id: RegionId,
        origin: Location,
        destination: Location,
        sender: AccountId,
        receiver: AccountId,
    ) -> Result<TransferReceipt, ProtocolError> {
        self.transfer_between(region_id, origin, destination, sender, receiver)
            .await
    }

    /// Move a region back to the issuing chain.
    ///
    /// Only an `Available` region can leave; a `Pending` one fails with
    /// [`ProtocolError::RegionNotAvailable`] before anything is submitted.
    /// The issuing chain reinstates it directly, without a pending phase.
    pub async fn transfer_resource_back(
        &self,
        region_id: RegionId,
        destination: Location,
        origin: Location,
        sender: AccountId,
        receiver: AccountId,
    ) -> Result<TransferReceipt, ProtocolError> {
        self.transfer_between(region_id, destination, origin, sender, receiver)
            .await
    }

    async fn transfer_between(
        &self,
        region_id: RegionId,
        from: Location,
        to: Location,
        sender: AccountId,
        receiver: AccountId,
    ) -> Result<TransferReceipt, ProtocolError> {
        let api = self.chain(from)?;
        let entry = api.storage(&custody_key(from, region_id), None).await?;
        let movable = match &entry {
            Some(StorageValue::RegionRecord(_)) => true,
            Some(StorageValue::Region(region)) => region.state.is_available(),
            _ => false,
        };
        if !movable {
            let state = entry
                .as_ref()
                .and_then(StorageValue::as_region)
                .map(|r| r.state.name());
            debug!(%region_id, %from, ?state, "Region cannot leave");
            return Err(ProtocolError::RegionNotAvailable);
        }

        let call = Call::Xcm(XcmCall::ReserveTransferAssets {
            dest: to,
            beneficiary: receiver,
            assets: vec![
                MultiAsset::relay_token(self.config.region_transfer_fee),
                MultiAsset::region(region_id),
            ],
        });
        let included = self
            .submitter
            .execute(api.as_ref(), sender, call, self.config.submit_options)
            .await?;
        self.tracker.lock().begin_transfer(region_id, from, to);
        info!(%region_id, %from, %to, block = %included.block, "Region sent");

        Ok(TransferReceipt {
            region_id,
            from,
            to,
            receiver,
            block: included.block,
        })
    }

    /// Wait until exactly one of `chains` holds the region in its finalized
    /// ledger, and return that chain.
    ///
    /// While a transfer is in flight the sending chain no longer holds the
    /// region, so this waits for the receiving chain. Two holders is a
    /// custody violation.
    pub async fn await_settled(
        &self,
        region_id: RegionId,
        chains: &[Location],
    ) -> Result<Location, ProtocolError> {
        let apis = chains
            .iter()
            .map(|location| self.chain(*location))
            .collect::<Result<Vec<_>, _>>()?;

        let holder = self
            .reconciler
            .wait_for(&apis, "region custody", move || async move {
                let holders = self.holders(region_id, chains).await?;
                let expected = match self.custody(&region_id) {
                    Some(CustodyStatus::InFlight { to, .. }) => Some(to),
                    _ => None,
                };
                self.tracker.lock().observe(region_id, &holders)?;
                Ok(match holders.as_slice() {
                    [holder] if expected.map_or(true, |to| to == *holder) => Some(*holder),
                    _ => None,
                })
            })
            .await?;
        info!(%region_id, %holder, "Custody settled");
        Ok(holder)
    }

    /// Transfer a hosted region to a new owner on the same chain.
    pub async fn transfer(
        &self,
        chain: Location,
        region_id: RegionId,
        owner: AccountId,
        new_owner: AccountId,
    ) -> Result<Included, ProtocolError> {
        let api = self.chain(chain)?;
        self.submitter
            .execute(
                api.as_ref(),
                owner,
                Call::Regions(RegionsCall::Transfer {
                    region_id,
                    new_owner,
                }),
                self.config.submit_options,
            )
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Record resolution
    // ═══════════════════════════════════════════════════════════════════════

    /// Commitment of the state read that will resolve the region's record.
    ///
    /// A `Pending` record already has one. An `Unavailable` record (its
    /// previous request timed out) gets a fresh request.
    pub async fn request_record(
        &self,
        region_id: RegionId,
        destination: Location,
    ) -> Result<Hash, ProtocolError> {
        let region = self
            .region(destination, region_id)
            .await?
            .ok_or(ProtocolError::RegionNotAvailable)?;
        match region.state {
            RegionState::Pending { commitment } => Ok(commitment),
            RegionState::Available { .. } => Err(ProtocolError::RecordAlreadyAvailable(region_id)),
            RegionState::Unavailable => {
                let api = self.chain(destination)?;
                let included = self
                    .submitter
                    .execute(
                        api.as_ref(),
                        self.config.relayer,
                        Call::Regions(RegionsCall::RequestRegionRecord { region_id }),
                        self.config.submit_options,
                    )
                    .await?;
                let commitment = included
                    .find_event(|event| match event {
                        RuntimeEvent::RegionRecordRequested { commitment, .. } => Some(*commitment),
                        _ => None,
                    })
                    .ok_or(ProtocolError::MissingEvent("RegionRecordRequested"))?;
                info!(%region_id, %commitment, "Record re-requested");
                Ok(commitment)
            }
        }
    }

    /// Build the response to an outstanding record request: the origin
    /// chain's storage proof at the requested height.
    ///
    /// Waits until `destination` trusts the origin's state root at that
    /// height, so the proof can verify.
    pub async fn build_response(
        &self,
        commitment: Hash,
        origin: Location,
        destination: Location,
        responder: AccountId,
    ) -> Result<ResponseMessage, ProtocolError> {
        let origin_api = self.chain(origin)?;
        let dest_api = self.chain(destination)?;

        let request = dest_api
            .query_pending_requests(vec![commitment])
            .await?
            .into_iter()
            .next()
            .ok_or(ProtocolError::UnknownCommitment(commitment))?;
        let get = request
            .as_get()
            .cloned()
            .ok_or(ProtocolError::InvalidProof(IsmpError::NotGetRequest))?;

        self.reconciler
            .wait_for_storage(
                &dest_api,
                "trusted state root",
                StorageKey::StateCommitment {
                    para: get.dest,
                    height: get.height,
                },
                |value| value.as_ref().and_then(StorageValue::as_state_root),
            )
            .await?;

        let at = origin_api.block_hash(get.height).await?.ok_or(
            ProtocolError::InvalidProof(IsmpError::UnknownStateCommitment {
                para: get.dest,
                height: get.height.0,
            }),
        )?;
        let proof = origin_api.query_state_proof(get.keys.clone(), at).await?;
        debug!(
            %commitment,
            height = get.height.0,
            entries = proof.proof.entries.len(),
            "Proof built"
        );

        Ok(ResponseMessage {
            request,
            proof,
            signer: responder,
        })
    }

    /// Submit a response as an unsigned extrinsic.
    pub async fn submit_response(
        &self,
        destination: Location,
        response: ResponseMessage,
    ) -> Result<Included, ProtocolError> {
        let api = self.chain(destination)?;
        let call = Call::Ismp(IsmpCall::HandleUnsigned {
            messages: vec![Datagram::Response(response)],
        });
        self.submitter
            .submit_unsigned(api.as_ref(), call)
            .await?
            .into_result()
    }

    /// Prove the record behind `commitment` and deliver it to
    /// `destination`, turning the region `Available`.
    ///
    /// A response that does not verify is rejected with
    /// [`ProtocolError::InvalidProof`] and the region stays `Pending`.
    pub async fn resolve_record(
        &self,
        commitment: Hash,
        origin: Location,
        destination: Location,
        responder: AccountId,
    ) -> Result<RegionRecord, ProtocolError> {
        let response = self
            .build_response(commitment, origin, destination, responder)
            .await?;
        let region_id = response
            .request
            .as_get()
            .and_then(|get| match get.keys.first() {
                Some(StorageKey::ReservedRegion(id)) => Some(*id),
                _ => None,
            })
            .ok_or(ProtocolError::InvalidProof(IsmpError::ValueNotFound))?;

        let included = self.submit_response(destination, response).await?;
        let api = self.chain(destination)?;
        let record = api
            .storage(&StorageKey::Region(region_id), Some(included.block.hash))
            .await?
            .as_ref()
            .and_then(StorageValue::as_region)
            .and_then(|region| region.state.record().cloned())
            .ok_or(ProtocolError::MissingEvent("RecordSet"))?;
        info!(%region_id, %commitment, end = record.end, "Record resolved");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use xregion_types::{CoreMask, GetRequest, Request, CORETIME_PARA_ID, REGIONX_PARA_ID};

    const CORETIME: Location = Location::Para(CORETIME_PARA_ID);
    const REGIONX: Location = Location::Para(REGIONX_PARA_ID);

    fn alice() -> AccountId {
        AccountId::from_seed("//Alice")
    }

    fn region_id() -> RegionId {
        RegionId {
            begin: 40,
            core: 0,
            mask: CoreMask::complete(),
        }
    }

    fn record() -> RegionRecord {
        RegionRecord {
            end: 45,
            owner: alice(),
            paid: Some(100),
        }
    }

    fn with_region(chain: MockChain, state: RegionState) -> MockChain {
        chain.with_storage(
            StorageKey::Region(region_id()),
            StorageValue::Region(Region {
                owner: alice(),
                state,
            }),
        )
    }

    fn custody(chains: Vec<Arc<MockChain>>) -> RegionCustody {
        let mut registry = Chains::new();
        for chain in chains {
            registry.insert(chain);
        }
        RegionCustody::new(registry, ProtocolConfig::default())
    }

    #[test]
    fn test_custody_key_by_chain() {
        assert_eq!(
            custody_key(CORETIME, region_id()),
            StorageKey::BrokerRegion(region_id())
        );
        assert_eq!(
            custody_key(REGIONX, region_id()),
            StorageKey::Region(region_id())
        );
    }

    #[tokio::test]
    async fn test_pending_region_cannot_go_back() {
        let regionx = Arc::new(with_region(
            MockChain::at(REGIONX),
            RegionState::Pending {
                commitment: Hash::from_bytes(b"c"),
            },
        ));
        let coretime = Arc::new(MockChain::at(CORETIME));
        let custody = custody(vec![regionx.clone(), coretime]);

        let result = custody
            .transfer_resource_back(region_id(), REGIONX, CORETIME, alice(), alice())
            .await;
        assert_eq!(result, Err(ProtocolError::RegionNotAvailable));
        assert!(regionx.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_available_region_goes_back() {
        let regionx = Arc::new(with_region(
            MockChain::at(REGIONX),
            RegionState::Available { record: record() },
        ));
        let coretime = Arc::new(MockChain::at(CORETIME));
        let custody = custody(vec![regionx.clone(), coretime]);

        let receipt = custody
            .transfer_resource_back(region_id(), REGIONX, CORETIME, alice(), alice())
            .await
            .unwrap();
        assert_eq!((receipt.from, receipt.to), (REGIONX, CORETIME));
        assert_eq!(
            custody.custody(&region_id()),
            Some(CustodyStatus::InFlight {
                from: REGIONX,
                to: CORETIME
            })
        );
        let Call::Xcm(XcmCall::ReserveTransferAssets { dest, assets, .. }) =
            &regionx.submitted()[0].call
        else {
            panic!("expected a reserve transfer");
        };
        assert_eq!(*dest, CORETIME);
        assert_eq!(assets[1], MultiAsset::region(region_id()));
    }

    #[tokio::test]
    async fn test_request_record_by_state() {
        let commitment = Hash::from_bytes(b"pending");
        let pending = custody(vec![Arc::new(with_region(
            MockChain::at(REGIONX),
            RegionState::Pending { commitment },
        ))]);
        assert_eq!(
            pending.request_record(region_id(), REGIONX).await,
            Ok(commitment)
        );

        let available = custody(vec![Arc::new(with_region(
            MockChain::at(REGIONX),
            RegionState::Available { record: record() },
        ))]);
        assert_eq!(
            available.request_record(region_id(), REGIONX).await,
            Err(ProtocolError::RecordAlreadyAvailable(region_id()))
        );

        let absent = custody(vec![Arc::new(MockChain::at(REGIONX))]);
        assert_eq!(
            absent.request_record(region_id(), REGIONX).await,
            Err(ProtocolError::RegionNotAvailable)
        );
    }

    #[tokio::test]
    async fn test_unknown_commitment() {
        let custody = custody(vec![
            Arc::new(MockChain::at(REGIONX)),
            Arc::new(MockChain::at(CORETIME)),
        ]);
        let commitment = Hash::from_bytes(b"nope");
        assert_eq!(
            custody
                .resolve_record(commitment, CORETIME, REGIONX, alice())
                .await,
            Err(ProtocolError::UnknownCommitment(commitment))
        );
    }

    #[tokio::test]
    async fn test_post_request_cannot_be_resolved() {
        let post = Request::Post {
            source: REGIONX_PARA_ID,
            dest: CORETIME_PARA_ID,
            nonce: 0,
            body: vec![],
        };
        let commitment = post.commitment();
        let custody = custody(vec![
            Arc::new(MockChain::at(REGIONX).with_request(post)),
            Arc::new(MockChain::at(CORETIME)),
        ]);
        assert_eq!(
            custody
                .resolve_record(commitment, CORETIME, REGIONX, alice())
                .await,
            Err(ProtocolError::InvalidProof(IsmpError::NotGetRequest))
        );
    }

    #[tokio::test]
    async fn test_response_proves_requested_key() {
        let coretime = Arc::new(MockChain::at(CORETIME).with_storage(
            StorageKey::ReservedRegion(region_id()),
            StorageValue::RegionRecord(record()),
        ));
        let at = coretime.finalize_next();
        let get = GetRequest {
            source: REGIONX_PARA_ID,
            dest: CORETIME_PARA_ID,
            nonce: 0,
            keys: vec![StorageKey::ReservedRegion(region_id())],
            height: at.height,
            timeout_timestamp: 0,
        };
        let request = Request::Get(get.clone());
        let regionx = Arc::new(
            MockChain::at(REGIONX)
                .with_request(request.clone())
                .with_storage(
                    StorageKey::StateCommitment {
                        para: CORETIME_PARA_ID,
                        height: at.height,
                    },
                    StorageValue::StateRoot(Hash::from_bytes(b"root")),
                ),
        );
        let custody = custody(vec![coretime, regionx]);

        let response = custody
            .build_response(request.commitment(), CORETIME, REGIONX, alice())
            .await
            .unwrap();
        assert_eq!(response.request, request);
        assert_eq!(response.proof.para, CORETIME_PARA_ID);
        assert_eq!(response.proof.height, at.height);
        assert_eq!(response.proof.proof.entries.len(), 1);
        assert_eq!(response.signer, alice());
    }
}
