//! Development accounts funded by the standard genesis.

use xregion_types::AccountId;

/// Names of the funded development accounts.
pub const DEV_ACCOUNT_NAMES: [&str; 4] = ["Alice", "Bob", "Charlie", "Dave"];

/// Account derived from `//{name}`.
pub fn dev_account(name: &str) -> AccountId {
    AccountId::from_seed(&format!("//{name}"))
}

pub fn dev_accounts() -> impl Iterator<Item = AccountId> {
    DEV_ACCOUNT_NAMES.into_iter().map(dev_account)
}

pub fn alice() -> AccountId {
    dev_account("Alice")
}

pub fn bob() -> AccountId {
    dev_account("Bob")
}

pub fn charlie() -> AccountId {
    dev_account("Charlie")
}

pub fn dave() -> AccountId {
    dev_account("Dave")
}
