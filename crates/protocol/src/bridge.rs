//! Asset registration and fungible transfers between chains.

use crate::{
    read_finalized, ChainApi, Chains, Included, ProtocolConfig, ProtocolError, Reconciler,
    TransactionSubmitter,
};
use std::sync::Arc;
use tracing::info;
use xregion_messages::{
    AssetRateCall, AssetRegistryCall, BalancesCall, Call, MultiAsset, TokensCall, XcmCall,
};
use xregion_types::{
    AccountId, AssetId, AssetMetadata, Balance, BlockRef, DispatchError, ExchangeRate, Location,
    ParaId, StorageKey, StorageValue, TransferMode, RELAY_ASSET_ID,
};

/// Ledger key of `who`'s relay token balance on `location`.
///
/// System chains use the relay token as their native currency; other
/// chains hold it as the registered asset [`RELAY_ASSET_ID`].
pub fn relay_balance_key(location: Location, who: AccountId) -> StorageKey {
    if location.is_system() {
        StorageKey::Account(who)
    } else {
        StorageKey::Token {
            asset: RELAY_ASSET_ID,
            who,
        }
    }
}

fn balance_key(asset: Option<AssetId>, who: AccountId) -> StorageKey {
    match asset {
        None => StorageKey::Account(who),
        Some(asset) => StorageKey::Token { asset, who },
    }
}

fn balance_of(value: Option<StorageValue>) -> Balance {
    value.as_ref().and_then(StorageValue::as_balance).unwrap_or(0)
}

/// A transfer that left its origin chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeReceipt {
    pub mode: TransferMode,
    pub origin: Location,
    pub dest: Location,
    pub receiver: AccountId,
    pub amount: Balance,
    /// Origin block that debited the sender and emitted the message.
    pub block: BlockRef,
    /// Receiver's finalized balance on `dest` before the transfer.
    pub balance_before: Balance,
}

/// Registers assets and moves fungible value between chains.
pub struct AssetBridge {
    chains: Chains,
    config: ProtocolConfig,
    submitter: TransactionSubmitter,
    reconciler: Reconciler,
}

impl AssetBridge {
    pub fn new(chains: Chains, config: ProtocolConfig) -> Self {
        let reconciler = Reconciler::new(config.settle_within_blocks);
        Self {
            chains,
            config,
            submitter: TransactionSubmitter::new(),
            reconciler,
        }
    }

    fn chain(&self, location: Location) -> Result<Arc<dyn ChainApi>, ProtocolError> {
        self.chains
            .get(location)
            .ok_or(ProtocolError::UnknownChain(location))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Administration
    // ═══════════════════════════════════════════════════════════════════════

    /// Register an asset. Fails if the id is taken.
    pub async fn register_asset(
        &self,
        chain: Location,
        metadata: AssetMetadata,
        asset_id: AssetId,
    ) -> Result<Included, ProtocolError> {
        let api = self.chain(chain)?;
        let call = Call::AssetRegistry(AssetRegistryCall::RegisterAsset { metadata, asset_id });
        let included = self
            .submitter
            .execute_sudo(api.as_ref(), self.config.sudo, call)
            .await?;
        info!(%chain, asset = asset_id, "Asset registered");
        Ok(included)
    }

    /// Create or update the fee exchange rate of a registered asset.
    pub async fn set_exchange_rate(
        &self,
        chain: Location,
        asset_id: AssetId,
        rate: ExchangeRate,
    ) -> Result<Included, ProtocolError> {
        let api = self.chain(chain)?;
        let exists = api
            .storage(&StorageKey::AssetRate(asset_id), None)
            .await?
            .is_some();
        let call = if exists {
            Call::AssetRate(AssetRateCall::Update {
                asset: asset_id,
                rate,
            })
        } else {
            Call::AssetRate(AssetRateCall::Create {
                asset: asset_id,
                rate,
            })
        };
        let included = self
            .submitter
            .execute_sudo(api.as_ref(), self.config.sudo, call)
            .await?;
        info!(
            %chain,
            asset = asset_id,
            rate = rate.into_inner(),
            updated = exists,
            "Exchange rate set"
        );
        Ok(included)
    }

    /// Add `amount` to an account's balance directly. `None` is the chain's
    /// native currency. Returns the new balance.
    pub async fn credit_balance(
        &self,
        chain: Location,
        account: AccountId,
        asset: Option<AssetId>,
        amount: Balance,
    ) -> Result<Balance, ProtocolError> {
        let api = self.chain(chain)?;
        let current = balance_of(api.storage(&balance_key(asset, account), None).await?);
        let free = current
            .checked_add(amount)
            .ok_or(ProtocolError::TransactionFailed(DispatchError::Overflow))?;
        let call = match asset {
            None => Call::Balances(BalancesCall::ForceSetBalance {
                who: account,
                new_free: free,
            }),
            Some(asset) => Call::Tokens(TokensCall::SetBalance {
                who: account,
                asset,
                free,
            }),
        };
        self.submitter
            .execute_sudo(api.as_ref(), self.config.sudo, call)
            .await?;
        Ok(free)
    }

    /// Finalized balance of `account`. `None` is the native currency.
    pub async fn balance(
        &self,
        chain: Location,
        account: AccountId,
        asset: Option<AssetId>,
    ) -> Result<Balance, ProtocolError> {
        let api = self.chain(chain)?;
        Ok(balance_of(
            read_finalized(api.as_ref(), &balance_key(asset, account)).await?,
        ))
    }

    /// Finalized relay token balance of `account` on `chain`.
    pub async fn relay_balance(
        &self,
        chain: Location,
        account: AccountId,
    ) -> Result<Balance, ProtocolError> {
        let api = self.chain(chain)?;
        Ok(balance_of(
            read_finalized(api.as_ref(), &relay_balance_key(chain, account)).await?,
        ))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transfers
    // ═══════════════════════════════════════════════════════════════════════

    /// Send relay token to a parachain.
    ///
    /// Teleports to system chains and reserve-transfers to everything else.
    /// Returns once the origin debit is final; the credit on `dest` arrives
    /// later and is observed with [`AssetBridge::await_credit`].
    pub async fn bridge_asset(
        &self,
        amount: Balance,
        dest: ParaId,
        origin: Location,
        sender: AccountId,
        receiver: AccountId,
    ) -> Result<BridgeReceipt, ProtocolError> {
        let mode = TransferMode::for_destination(dest);
        let dest_location = Location::Para(dest);
        let dest_api = self.chain(dest_location)?;

        if mode == TransferMode::ReserveTransfer
            && dest_api
                .storage(&StorageKey::AssetMetadata(RELAY_ASSET_ID), None)
                .await?
                .is_none()
        {
            return Err(ProtocolError::AssetNotRegistered(RELAY_ASSET_ID));
        }

        let assets = vec![MultiAsset::relay_token(amount)];
        let call = match mode {
            TransferMode::Teleport => Call::Xcm(XcmCall::TeleportAssets {
                dest: dest_location,
                beneficiary: receiver,
                assets,
            }),
            TransferMode::ReserveTransfer => Call::Xcm(XcmCall::ReserveTransferAssets {
                dest: dest_location,
                beneficiary: receiver,
                assets,
            }),
        };
        self.send(mode, origin, dest_location, sender, receiver, amount, call)
            .await
    }

    /// Return relay token held as a reserve-backed asset to the relay chain.
    pub async fn withdraw_to_relay(
        &self,
        amount: Balance,
        origin: Location,
        sender: AccountId,
        receiver: AccountId,
    ) -> Result<BridgeReceipt, ProtocolError> {
        let call = Call::Xcm(XcmCall::ReserveTransferAssets {
            dest: Location::Relay,
            beneficiary: receiver,
            assets: vec![MultiAsset::relay_token(amount)],
        });
        self.send(
            TransferMode::ReserveTransfer,
            origin,
            Location::Relay,
            sender,
            receiver,
            amount,
            call,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn send(
        &self,
        mode: TransferMode,
        origin: Location,
        dest: Location,
        sender: AccountId,
        receiver: AccountId,
        amount: Balance,
        call: Call,
    ) -> Result<BridgeReceipt, ProtocolError> {
        let origin_api = self.chain(origin)?;
        let dest_api = self.chain(dest)?;
        let balance_before = balance_of(
            read_finalized(dest_api.as_ref(), &relay_balance_key(dest, receiver)).await?,
        );

        let included = self
            .submitter
            .execute(origin_api.as_ref(), sender, call, self.config.submit_options)
            .await?;
        info!(%origin, %dest, %mode, amount, block = %included.block, "Transfer sent");

        Ok(BridgeReceipt {
            mode,
            origin,
            dest,
            receiver,
            amount,
            block: included.block,
            balance_before,
        })
    }

    /// Wait until the receiver's finalized balance on the destination grows,
    /// returning the amount credited (net of the destination's execution fee).
    pub async fn await_credit(&self, receipt: &BridgeReceipt) -> Result<Balance, ProtocolError> {
        let api = self.chain(receipt.dest)?;
        let before = receipt.balance_before;
        let credited = self
            .reconciler
            .wait_for_storage(
                &api,
                "bridge credit",
                relay_balance_key(receipt.dest, receipt.receiver),
                |value| {
                    let now = balance_of(value);
                    (now > before).then(|| now - before)
                },
            )
            .await?;
        info!(dest = %receipt.dest, receiver = %receipt.receiver, credited, "Transfer credited");
        Ok(credited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use xregion_types::{CORETIME_PARA_ID, REGIONX_PARA_ID};

    fn alice() -> AccountId {
        AccountId::from_seed("//Alice")
    }

    fn bridge(chains: Vec<Arc<MockChain>>) -> AssetBridge {
        let mut registry = Chains::new();
        for chain in chains {
            registry.insert(chain);
        }
        AssetBridge::new(registry, ProtocolConfig::default())
    }

    #[test]
    fn test_relay_balance_key_by_trust() {
        assert_eq!(
            relay_balance_key(Location::Relay, alice()),
            StorageKey::Account(alice())
        );
        assert_eq!(
            relay_balance_key(Location::Para(CORETIME_PARA_ID), alice()),
            StorageKey::Account(alice())
        );
        assert_eq!(
            relay_balance_key(Location::Para(REGIONX_PARA_ID), alice()),
            StorageKey::Token {
                asset: RELAY_ASSET_ID,
                who: alice()
            }
        );
    }

    #[tokio::test]
    async fn test_reserve_transfer_requires_registered_asset() {
        let relay = Arc::new(MockChain::at(Location::Relay));
        let regionx = Arc::new(MockChain::at(Location::Para(REGIONX_PARA_ID)));
        let bridge = bridge(vec![relay.clone(), regionx]);

        let result = bridge
            .bridge_asset(10, REGIONX_PARA_ID, Location::Relay, alice(), alice())
            .await;
        assert_eq!(result, Err(ProtocolError::AssetNotRegistered(RELAY_ASSET_ID)));
        assert!(relay.submitted().is_empty(), "nothing submitted");
    }

    #[tokio::test]
    async fn test_mode_follows_destination() {
        let relay = Arc::new(MockChain::at(Location::Relay));
        let coretime = Arc::new(MockChain::at(Location::Para(CORETIME_PARA_ID)));
        let regionx = Arc::new(
            MockChain::at(Location::Para(REGIONX_PARA_ID)).with_storage(
                StorageKey::AssetMetadata(RELAY_ASSET_ID),
                StorageValue::AssetMetadata(AssetMetadata::relay_token()),
            ),
        );
        let bridge = bridge(vec![relay.clone(), coretime, regionx]);

        let teleport = bridge
            .bridge_asset(10, CORETIME_PARA_ID, Location::Relay, alice(), alice())
            .await
            .unwrap();
        assert_eq!(teleport.mode, TransferMode::Teleport);

        let reserve = bridge
            .bridge_asset(10, REGIONX_PARA_ID, Location::Relay, alice(), alice())
            .await
            .unwrap();
        assert_eq!(reserve.mode, TransferMode::ReserveTransfer);

        let submitted = relay.submitted();
        assert!(matches!(
            submitted[0].call,
            Call::Xcm(XcmCall::TeleportAssets { .. })
        ));
        assert!(matches!(
            submitted[1].call,
            Call::Xcm(XcmCall::ReserveTransferAssets { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let relay = Arc::new(MockChain::at(Location::Relay));
        let bridge = bridge(vec![relay]);
        let result = bridge
            .bridge_asset(10, ParaId(3000), Location::Relay, alice(), alice())
            .await;
        assert_eq!(
            result,
            Err(ProtocolError::UnknownChain(Location::Para(ParaId(3000))))
        );
    }

    #[tokio::test]
    async fn test_credit_adds_to_existing_balance() {
        let bob = AccountId::from_seed("//Bob");
        let relay = Arc::new(
            MockChain::at(Location::Relay)
                .with_storage(StorageKey::Account(bob), StorageValue::Balance(40)),
        );
        let bridge = bridge(vec![relay.clone()]);
        let free = bridge
            .credit_balance(Location::Relay, bob, None, 2)
            .await
            .unwrap();
        assert_eq!(free, 42);
        assert_eq!(
            relay.submitted()[0].call,
            Call::Balances(BalancesCall::ForceSetBalance {
                who: bob,
                new_free: 42
            })
            .sudo()
        );
    }
}
