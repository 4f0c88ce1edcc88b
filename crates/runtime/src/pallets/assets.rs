//! Asset registry and fee exchange rates.

use crate::{Context, Ledger, Origin};
use xregion_messages::{AssetRateCall, AssetRegistryCall};
use xregion_types::{
    AssetId, AssetMetadata, AssetsError, DispatchError, ExchangeRate, RuntimeEvent, StorageKey,
    StorageValue,
};

/// Registry metadata for `asset`.
pub fn metadata(ledger: &Ledger, asset: AssetId) -> Option<AssetMetadata> {
    match ledger.get(&StorageKey::AssetMetadata(asset)) {
        Some(StorageValue::AssetMetadata(metadata)) => Some(metadata.clone()),
        _ => None,
    }
}

/// Fee exchange rate of `asset`.
pub fn rate(ledger: &Ledger, asset: AssetId) -> Option<ExchangeRate> {
    match ledger.get(&StorageKey::AssetRate(asset)) {
        Some(StorageValue::ExchangeRate(rate)) => Some(*rate),
        _ => None,
    }
}

/// Register `asset`. Ids are never reused.
pub fn register(
    ctx: &mut Context,
    asset: AssetId,
    metadata: AssetMetadata,
) -> Result<(), DispatchError> {
    let key = StorageKey::AssetMetadata(asset);
    if ctx.ledger.contains(&key) {
        return Err(AssetsError::AssetAlreadyRegistered(asset).into());
    }
    ctx.ledger.insert(key, StorageValue::AssetMetadata(metadata));
    ctx.deposit_event(RuntimeEvent::AssetRegistered { asset });
    Ok(())
}

fn ensure_registered(ledger: &Ledger, asset: AssetId) -> Result<(), DispatchError> {
    if ledger.contains(&StorageKey::AssetMetadata(asset)) {
        Ok(())
    } else {
        Err(AssetsError::AssetNotRegistered(asset).into())
    }
}

/// Set the rate of an asset that has none.
pub fn create_rate(
    ctx: &mut Context,
    asset: AssetId,
    rate: ExchangeRate,
) -> Result<(), DispatchError> {
    ensure_registered(&ctx.ledger, asset)?;
    let key = StorageKey::AssetRate(asset);
    if ctx.ledger.contains(&key) {
        return Err(AssetsError::RateAlreadyExists(asset).into());
    }
    ctx.ledger.insert(key, StorageValue::ExchangeRate(rate));
    ctx.deposit_event(RuntimeEvent::AssetRateCreated { asset });
    Ok(())
}

/// Change the rate of an asset that has one.
pub fn update_rate(
    ctx: &mut Context,
    asset: AssetId,
    rate: ExchangeRate,
) -> Result<(), DispatchError> {
    let key = StorageKey::AssetRate(asset);
    if !ctx.ledger.contains(&key) {
        return Err(AssetsError::UnknownRate(asset).into());
    }
    ctx.ledger.insert(key, StorageValue::ExchangeRate(rate));
    ctx.deposit_event(RuntimeEvent::AssetRateUpdated { asset });
    Ok(())
}

pub(crate) fn dispatch_registry(
    ctx: &mut Context,
    origin: Origin,
    call: AssetRegistryCall,
) -> Result<(), DispatchError> {
    match call {
        AssetRegistryCall::RegisterAsset { metadata, asset_id } => {
            origin.ensure_root()?;
            register(ctx, asset_id, metadata)
        }
    }
}

pub(crate) fn dispatch_rate(
    ctx: &mut Context,
    origin: Origin,
    call: AssetRateCall,
) -> Result<(), DispatchError> {
    origin.ensure_root()?;
    match call {
        AssetRateCall::Create { asset, rate } => create_rate(ctx, asset, rate),
        AssetRateCall::Update { asset, rate } => update_rate(ctx, asset, rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainConfig;
    use std::time::Duration;
    use xregion_types::{BlockHeight, RELAY_ASSET_ID};

    #[test]
    fn test_register_is_unique_by_id() {
        let config = ChainConfig::regionx();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));
        register(&mut ctx, RELAY_ASSET_ID, AssetMetadata::relay_token()).unwrap();
        assert_eq!(
            register(&mut ctx, RELAY_ASSET_ID, AssetMetadata::relay_token()),
            Err(AssetsError::AssetAlreadyRegistered(RELAY_ASSET_ID).into())
        );
        assert_eq!(
            metadata(&ctx.ledger, RELAY_ASSET_ID),
            Some(AssetMetadata::relay_token())
        );
    }

    #[test]
    fn test_rate_lifecycle() {
        let config = ChainConfig::regionx();
        let mut ctx = Context::new(&config, Ledger::new(), Duration::ZERO, BlockHeight(1));

        assert_eq!(
            create_rate(&mut ctx, RELAY_ASSET_ID, ExchangeRate::ONE),
            Err(AssetsError::AssetNotRegistered(RELAY_ASSET_ID).into())
        );
        register(&mut ctx, RELAY_ASSET_ID, AssetMetadata::relay_token()).unwrap();
        assert_eq!(
            update_rate(&mut ctx, RELAY_ASSET_ID, ExchangeRate::ONE),
            Err(AssetsError::UnknownRate(RELAY_ASSET_ID).into())
        );
        create_rate(&mut ctx, RELAY_ASSET_ID, ExchangeRate::ONE).unwrap();
        assert!(create_rate(&mut ctx, RELAY_ASSET_ID, ExchangeRate::ONE).is_err());

        let half = ExchangeRate::from_rational(1, 2).unwrap();
        update_rate(&mut ctx, RELAY_ASSET_ID, half).unwrap();
        assert_eq!(rate(&ctx.ledger, RELAY_ASSET_ID), Some(half));
    }
}
