//! Waiting for cross-chain effects by observing finalized state.
//!
//! A probe reads finalized ledger state and returns `Some` once the
//! expected transition is visible. The reconciler runs the probe once up
//! front and again after every block any of the watched chains finalizes.
//! It never sleeps for a fixed time.

use crate::{ChainApi, ProtocolError};
use futures::future::select_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace, warn};
use xregion_types::{StorageKey, StorageValue};

/// Read `key` at the chain's latest finalized block.
pub async fn read_finalized(
    chain: &dyn ChainApi,
    key: &StorageKey,
) -> Result<Option<StorageValue>, ProtocolError> {
    let head = chain.finalized_head().await?;
    Ok(chain.storage(key, Some(head.hash)).await?)
}

/// Follows finality on a set of chains until a probe succeeds.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    /// Blocks to observe before giving up; `None` never gives up.
    limit: Option<u64>,
}

impl Reconciler {
    pub fn new(limit: Option<u64>) -> Self {
        Self { limit }
    }

    /// Wait until `probe` returns `Some`.
    ///
    /// Subscriptions are taken before the first probe, so a transition that
    /// finalizes while probing is never missed.
    pub async fn wait_for<T, F, Fut>(
        &self,
        chains: &[Arc<dyn ChainApi>],
        what: &'static str,
        mut probe: F,
    ) -> Result<T, ProtocolError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, ProtocolError>>,
    {
        let mut subscriptions: Vec<_> = chains
            .iter()
            .map(|chain| chain.subscribe_finalized())
            .collect();

        if let Some(value) = probe().await? {
            return Ok(value);
        }
        if subscriptions.is_empty() {
            return Err(ProtocolError::NotSettled { what, blocks: 0 });
        }

        let mut observed = 0u64;
        loop {
            let (result, index) = {
                let (result, index, _) =
                    select_all(subscriptions.iter_mut().map(|rx| Box::pin(rx.recv()))).await;
                (result, index)
            };
            match result {
                Ok(block) => {
                    trace!(
                        what,
                        chain = %chains[index].location(),
                        %block,
                        "Finalized block observed"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(what, skipped, "Finality stream lagged; re-probing");
                }
                Err(RecvError::Closed) => {
                    warn!(what, chain = %chains[index].location(), "Finality stream closed");
                    return Err(ProtocolError::SubscriptionClosed);
                }
            }

            observed += 1;
            if let Some(value) = probe().await? {
                debug!(what, observed, "Transition observed");
                return Ok(value);
            }
            if let Some(limit) = self.limit {
                if observed >= limit {
                    return Err(ProtocolError::NotSettled {
                        what,
                        blocks: observed,
                    });
                }
            }
        }
    }

    /// Wait until `key` holds a value on `chain` that `accept` maps to `Some`.
    pub async fn wait_for_storage<T, F>(
        &self,
        chain: &Arc<dyn ChainApi>,
        what: &'static str,
        key: StorageKey,
        accept: F,
    ) -> Result<T, ProtocolError>
    where
        F: Fn(Option<StorageValue>) -> Option<T>,
    {
        let target = chain.clone();
        let key = &key;
        let accept = &accept;
        self.wait_for(std::slice::from_ref(chain), what, move || {
            let target = target.clone();
            async move {
                let value = read_finalized(target.as_ref(), key).await?;
                Ok(accept(value))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use xregion_types::AccountId;

    fn key() -> StorageKey {
        StorageKey::Account(AccountId::from_seed("//Bob"))
    }

    fn balance(value: Option<StorageValue>) -> Option<u128> {
        value.as_ref().and_then(StorageValue::as_balance)
    }

    #[tokio::test]
    async fn test_already_visible_needs_no_blocks() {
        let chain: Arc<dyn ChainApi> =
            Arc::new(MockChain::new().with_storage(key(), StorageValue::Balance(5)));
        let found = Reconciler::new(Some(0))
            .wait_for_storage(&chain, "credit", key(), balance)
            .await
            .unwrap();
        assert_eq!(found, 5);
    }

    #[tokio::test]
    async fn test_transition_observed_after_finality() {
        let mock = Arc::new(MockChain::new());
        let chain: Arc<dyn ChainApi> = mock.clone();

        let driver = tokio::spawn(async move {
            tokio::task::yield_now().await;
            mock.finalize_next();
            mock.set_storage(key(), StorageValue::Balance(9));
            mock.finalize_next();
        });

        let found = Reconciler::new(Some(10))
            .wait_for_storage(&chain, "credit", key(), balance)
            .await
            .unwrap();
        assert_eq!(found, 9);
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn test_gives_up_after_limit() {
        let mock = Arc::new(MockChain::new());
        let chain: Arc<dyn ChainApi> = mock.clone();

        let driver = tokio::spawn(async move {
            for _ in 0..3 {
                tokio::task::yield_now().await;
                mock.finalize_next();
            }
        });

        let result = Reconciler::new(Some(2))
            .wait_for_storage(&chain, "credit", key(), balance)
            .await;
        assert_eq!(
            result,
            Err(ProtocolError::NotSettled {
                what: "credit",
                blocks: 2
            })
        );
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn test_waits_on_any_chain() {
        let first = Arc::new(MockChain::new());
        let second = Arc::new(MockChain::new());
        let chains: Vec<Arc<dyn ChainApi>> = vec![first.clone(), second.clone()];

        let driver = tokio::spawn(async move {
            tokio::task::yield_now().await;
            second.set_storage(key(), StorageValue::Balance(1));
            second.finalize_next();
        });

        let probed = second_holder(&chains).await;
        assert_eq!(probed, Ok(1));
        driver.await.unwrap();
        drop(first);
    }

    async fn second_holder(chains: &[Arc<dyn ChainApi>]) -> Result<usize, ProtocolError> {
        Reconciler::new(Some(5))
            .wait_for(chains, "holder", move || async move {
                for (index, chain) in chains.iter().enumerate() {
                    if read_finalized(chain.as_ref(), &key()).await?.is_some() {
                        return Ok(Some(index));
                    }
                }
                Ok(None)
            })
            .await
    }
}
