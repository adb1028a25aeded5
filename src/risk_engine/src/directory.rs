// src/risk_engine/directory.rs
use candid::Principal;
use ic_cdk::api::debug_print;
#[allow(deprecated)]
use ic_cdk::api::call::RejectionCode;
use thiserror::Error;

use crate::types::UserProfileRecord;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("user not found")]
    UserNotFound,
    #[error("user store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Source of user profile records.
#[allow(async_fn_in_trait)]
pub trait UserDirectory {
    async fn find_user(&self, user_id: &str) -> Result<UserProfileRecord, LookupError>;
}

/// Raw reply of the store's `find_user` call.
#[allow(deprecated)]
pub type FindUserReply = Result<(Option<UserProfileRecord>,), (RejectionCode, String)>;

/// Map a `find_user` reply onto the lookup taxonomy.
pub fn lookup_result(reply: FindUserReply) -> Result<UserProfileRecord, LookupError> {
    match reply {
        Ok((Some(profile),)) => Ok(profile),
        Ok((None,)) => Err(LookupError::UserNotFound),
        Err((code, msg)) => Err(LookupError::StoreUnavailable(format!("{:?}: {}", code, msg))),
    }
}

/// Looks users up in the user store canister via an inter-canister call.
#[derive(Clone, Copy, Debug)]
pub struct StoreCanister {
    principal: Option<Principal>,
}

impl StoreCanister {
    pub fn new(principal: Option<Principal>) -> Self {
        Self { principal }
    }

    fn principal(&self) -> Result<Principal, LookupError> {
        self.principal
            .ok_or_else(|| LookupError::StoreUnavailable("user store not configured".to_string()))
    }
}

impl UserDirectory for StoreCanister {
    async fn find_user(&self, user_id: &str) -> Result<UserProfileRecord, LookupError> {
        let principal = self.principal().inspect_err(|_| {
            debug_print("User store lookup skipped: store principal not configured");
        })?;

        #[allow(deprecated)]
        let reply: FindUserReply =
            ic_cdk::api::call::call(principal, "find_user", (user_id.to_string(),)).await;

        lookup_result(reply).inspect_err(|e| {
            if let LookupError::StoreUnavailable(reason) = e {
                debug_print(&format!(
                    "Error getting user data for '{}' from {}: {}",
                    user_id, principal, reason
                ));
            }
        })
    }
}
