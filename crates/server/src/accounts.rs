//! External account-store collaborator.
//!
//! The simulation never touches balances or skin catalogs directly; it only
//! fires coin credits and asks about skin ownership through this trait.
//! Calls must not block the tick, and credits are best-effort.

use crate::entity::AccountId;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// The two operations the core needs from persistent storage.
pub trait AccountStore: Send + Sync {
    /// Credit coins to a linked account. Fire-and-forget; failures are not
    /// surfaced to the game.
    fn credit_coins(&self, account_id: AccountId, amount: u32);

    /// Whether the account owns the given image-skin filename.
    fn owns_skin(&self, account_id: AccountId, filename: &str) -> bool;
}

/// In-memory account store, used standalone and in tests.
#[derive(Debug, Default)]
pub struct MemoryAccounts {
    coins: Mutex<HashMap<AccountId, u64>>,
    skins: Mutex<HashSet<(AccountId, String)>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skin purchase for an account.
    pub fn grant_skin(&self, account_id: AccountId, filename: &str) {
        self.skins
            .lock()
            .unwrap()
            .insert((account_id, filename.to_string()));
    }

    /// Current coin balance for an account.
    pub fn balance(&self, account_id: AccountId) -> u64 {
        self.coins
            .lock()
            .unwrap()
            .get(&account_id)
            .copied()
            .unwrap_or(0)
    }
}

impl AccountStore for MemoryAccounts {
    fn credit_coins(&self, account_id: AccountId, amount: u32) {
        *self.coins.lock().unwrap().entry(account_id).or_insert(0) += amount as u64;
    }

    fn owns_skin(&self, account_id: AccountId, filename: &str) -> bool {
        self.skins
            .lock()
            .unwrap()
            .contains(&(account_id, filename.to_string()))
    }
}
