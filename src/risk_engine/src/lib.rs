// src/risk_engine/lib.rs
use candid::Principal;
use ic_cdk::api::debug_print;
use ic_cdk_macros::{init, post_upgrade, pre_upgrade, query, update};
use once_cell::sync::Lazy;
use std::sync::{Mutex, PoisonError};

pub mod directory;
pub mod handler;
pub mod scoring;
pub mod types;

use directory::StoreCanister;
use handler::RiskQueryHandler;
use types::{RiskAssessment, RiskEngineInit, RiskOutcome, RiskRequest};

/// Principal of the user store canister queried for profiles.
static USER_STORE_PRINCIPAL: Lazy<Mutex<Option<Principal>>> = Lazy::new(|| Mutex::new(None));

fn configured_store() -> Option<Principal> {
    *USER_STORE_PRINCIPAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn replace_configured_store(principal: Option<Principal>) {
    *USER_STORE_PRINCIPAL.lock().unwrap_or_else(PoisonError::into_inner) = principal;
}

/// The store principal decides which records get scored, so only
/// controllers may change it.
pub fn may_configure(caller: &Principal, is_controller: impl Fn(&Principal) -> bool) -> bool {
    is_controller(caller)
}

fn store_handler() -> RiskQueryHandler<StoreCanister, fn() -> u64> {
    // Copy the principal out so no lock is held across the inter-canister await.
    RiskQueryHandler::new(
        StoreCanister::new(configured_store()),
        ic_cdk::api::time as fn() -> u64,
    )
}

#[init]
fn init(arg: Option<RiskEngineInit>) {
    let user_store = arg.and_then(|a| a.user_store);
    replace_configured_store(user_store);

    match user_store {
        Some(p) => ic_cdk::println!("Risk engine initialized, user store {}", p),
        None => ic_cdk::println!("Risk engine initialized without a user store"),
    }
}

#[pre_upgrade]
fn pre_upgrade() {
    let snapshot = RiskEngineInit {
        user_store: configured_store(),
    };
    if let Err(e) = ic_cdk::storage::stable_save((snapshot,)) {
        debug_print(&format!("Saving risk engine config failed: {}", e));
    }
}

#[post_upgrade]
fn post_upgrade() {
    match ic_cdk::storage::stable_restore::<(RiskEngineInit,)>() {
        Ok((saved,)) => replace_configured_store(saved.user_store),
        Err(e) => debug_print(&format!("Restoring risk engine config failed: {}", e)),
    }
}

/// Set the user store canister principal; controllers only
#[update]
fn set_user_store(principal: Principal) -> bool {
    let caller = ic_cdk::api::msg_caller();
    if !may_configure(&caller, ic_cdk::api::is_controller) {
        debug_print(&format!("Rejected set_user_store from non-controller {}", caller));
        return false;
    }
    replace_configured_store(Some(principal));
    debug_print(&format!("User store set to {}", principal));
    true
}

#[query]
fn user_store() -> Option<Principal> {
    configured_store()
}

/// Score a user; unknown users and store failures both yield score 0, not approved.
#[update]
async fn risk(req: RiskRequest) -> RiskAssessment {
    let assessment = store_handler().handle(&req).await;
    debug_print(&format!(
        "Risk for '{}': score={} approved={}",
        req.user_id, assessment.score, assessment.approved
    ));
    assessment
}

/// Score a user, reporting not-found and store failures separately.
#[update]
async fn risk_detailed(req: RiskRequest) -> RiskOutcome {
    store_handler().assess(&req).await
}

#[query]
fn version() -> String {
    "risk_engine v1.0.0".to_string()
}
