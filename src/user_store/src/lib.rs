// src/user_store/lib.rs

use ic_cdk_macros::{init, post_upgrade, pre_upgrade, query, update};
use ic_cdk::api::debug_print;
use candid::{CandidType, Deserialize, Nat, Principal};

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use once_cell::sync::Lazy;
use num_bigint::BigUint;

pub mod types;
use types::{OrderEntry, PaymentEntry, StoreError, UserProfileRecord, UserRecord, UserSummary};

/// Account and transaction history for every known user.
#[derive(CandidType, Deserialize, Clone, Default)]
pub struct UserStore {
    pub users: HashMap<String, UserRecord>,
}

impl UserStore {
    /// Create a user with empty history, created at `now_ns`.
    pub fn register(&mut self, user_id: &str, now_ns: u64) -> Result<(), StoreError> {
        if user_id.trim().is_empty() {
            return Err(StoreError::InvalidUserId);
        }
        if self.users.contains_key(user_id) {
            return Err(StoreError::AlreadyExists(user_id.to_string()));
        }

        let record = UserRecord {
            created_at_ns: now_ns,
            ..UserRecord::default()
        };
        self.users.insert(user_id.to_string(), record);
        Ok(())
    }

    fn user_mut(&mut self, user_id: &str) -> Result<&mut UserRecord, StoreError> {
        self.users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }

    pub fn set_kyc_verified(&mut self, user_id: &str, verified: bool) -> Result<(), StoreError> {
        self.user_mut(user_id)?.kyc_verified = verified;
        Ok(())
    }

    pub fn set_repayment_on_time(&mut self, user_id: &str, on_time: bool) -> Result<(), StoreError> {
        self.user_mut(user_id)?.repayment_on_time = on_time;
        Ok(())
    }

    pub fn record_order(&mut self, user_id: &str, order_id: String, amount: Nat) -> Result<(), StoreError> {
        self.user_mut(user_id)?.orders.push(OrderEntry { order_id, amount });
        Ok(())
    }

    pub fn record_payment(&mut self, user_id: &str, amount: Nat, on_time: bool) -> Result<(), StoreError> {
        self.user_mut(user_id)?.payments.push(PaymentEntry { amount, on_time });
        Ok(())
    }

    pub fn add_review(&mut self, user_id: &str, text: String) -> Result<(), StoreError> {
        self.user_mut(user_id)?.reviews.push(text);
        Ok(())
    }

    pub fn find(&self, user_id: &str) -> Option<UserProfileRecord> {
        self.users.get(user_id).map(UserProfileRecord::from)
    }

    pub fn summary(&self, user_id: &str) -> Option<UserSummary> {
        let record = self.users.get(user_id)?;

        let order_volume = record
            .orders
            .iter()
            .fold(BigUint::from(0u32), |acc, o| acc + &o.amount.0);
        let paid_total = record
            .payments
            .iter()
            .fold(BigUint::from(0u32), |acc, p| acc + &p.amount.0);

        Some(UserSummary {
            user_id: user_id.to_string(),
            profile: UserProfileRecord::from(record),
            order_volume: Nat::from(order_volume),
            paid_total: Nat::from(paid_total),
        })
    }

    /// All user ids, sorted
    pub fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.users.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Global, thread-safe store state.
static STORE: Lazy<Mutex<UserStore>> = Lazy::new(|| Mutex::new(UserStore::default()));

fn with_store<R>(f: impl FnOnce(&mut UserStore) -> R) -> R {
    let mut store = STORE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut store)
}

/// Log a failed mutation and pass the result through
fn logged(op: &str, user_id: &str, result: Result<(), StoreError>) -> Result<(), StoreError> {
    if let Err(e) = &result {
        debug_print(&format!("{} failed for '{}': {}", op, user_id, e));
    }
    result
}

/// Only controllers may write the records the risk engine scores.
pub fn authorize(caller: &Principal, is_controller: impl Fn(&Principal) -> bool) -> Result<(), StoreError> {
    if is_controller(caller) {
        Ok(())
    } else {
        Err(StoreError::Unauthorized(caller.to_text()))
    }
}

fn guarded(
    op: &str,
    user_id: &str,
    f: impl FnOnce(&mut UserStore) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    let result = authorize(&ic_cdk::api::msg_caller(), ic_cdk::api::is_controller)
        .and_then(|()| with_store(f));
    logged(op, user_id, result)
}

/// Canister initialization
#[init]
fn init() {
    ic_cdk::println!("User store initialized");
}

#[pre_upgrade]
fn pre_upgrade() {
    let snapshot = with_store(|store| store.clone());
    if let Err(e) = ic_cdk::storage::stable_save((snapshot,)) {
        debug_print(&format!("Saving user store to stable memory failed: {}", e));
    }
}

#[post_upgrade]
fn post_upgrade() {
    match ic_cdk::storage::stable_restore::<(UserStore,)>() {
        Ok((restored,)) => {
            let count = restored.users.len();
            with_store(|store| *store = restored);
            ic_cdk::println!("User store restored {} users", count);
        }
        Err(e) => debug_print(&format!("Restoring user store from stable memory failed: {}", e)),
    }
}

/// Register a new user, stamped with the current canister time.
#[update]
fn register_user(user_id: String) -> Result<(), StoreError> {
    let now = ic_cdk::api::time();
    let result = guarded("register_user", &user_id, |store| store.register(&user_id, now));
    if result.is_ok() {
        debug_print(&format!("Registered user '{}' at {}", user_id, now));
    }
    result
}

#[update]
fn set_kyc_verified(user_id: String, verified: bool) -> Result<(), StoreError> {
    guarded("set_kyc_verified", &user_id, |store| store.set_kyc_verified(&user_id, verified))
}

#[update]
fn set_repayment_on_time(user_id: String, on_time: bool) -> Result<(), StoreError> {
    guarded("set_repayment_on_time", &user_id, |store| store.set_repayment_on_time(&user_id, on_time))
}

#[update]
fn record_order(user_id: String, order_id: String, amount: Nat) -> Result<(), StoreError> {
    guarded("record_order", &user_id, |store| store.record_order(&user_id, order_id, amount))
}

#[update]
fn record_payment(user_id: String, amount: Nat, on_time: bool) -> Result<(), StoreError> {
    guarded("record_payment", &user_id, |store| store.record_payment(&user_id, amount, on_time))
}

#[update]
fn add_review(user_id: String, text: String) -> Result<(), StoreError> {
    guarded("add_review", &user_id, |store| store.add_review(&user_id, text))
}

/// Profile lookup consumed by the risk engine
#[query]
fn find_user(user_id: String) -> Option<UserProfileRecord> {
    with_store(|store| store.find(&user_id))
}

#[query]
fn get_user_summary(user_id: String) -> Option<UserSummary> {
    with_store(|store| store.summary(&user_id))
}

// List all registered users
#[query]
fn list_users() -> Vec<String> {
    with_store(|store| store.user_ids())
}

#[query]
fn version() -> String {
    "user_store v1.0.0".to_string()
}
