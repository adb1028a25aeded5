// Import Candid serialization for Internet Computer (ICP) interfaces
use candid::CandidType;

// Import Serde for serialization/deserialization
use serde::{Deserialize, Serialize};

// Candid arbitrary-precision unsigned integer type
use candid::Nat;

use thiserror::Error;

/// A single order placed by a user
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OrderEntry {
    pub order_id: String,
    pub amount: Nat,
}

/// A repayment made by a user
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaymentEntry {
    pub amount: Nat,
    pub on_time: bool,
}

/// Stored account and transaction history of a user
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserRecord {
    pub kyc_verified: bool,
    /// Nanoseconds since the Unix epoch
    pub created_at_ns: u64,
    pub orders: Vec<OrderEntry>,
    pub repayment_on_time: bool,
    pub reviews: Vec<String>,
    pub payments: Vec<PaymentEntry>,
}

/// Profile served to the risk engine by `find_user`
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserProfileRecord {
    pub kyc_verified: bool,
    pub created_at_ns: u64,
    pub order_count: u64,
    pub repayment_on_time: bool,
    pub review_count: u64,
    pub payment_count: u64,
}

impl From<&UserRecord> for UserProfileRecord {
    fn from(record: &UserRecord) -> Self {
        Self {
            kyc_verified: record.kyc_verified,
            created_at_ns: record.created_at_ns,
            order_count: record.orders.len() as u64,
            repayment_on_time: record.repayment_on_time,
            review_count: record.reviews.len() as u64,
            payment_count: record.payments.len() as u64,
        }
    }
}

/// Aggregate view of a user's history
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    pub user_id: String,
    pub profile: UserProfileRecord,
    pub order_volume: Nat,
    pub paid_total: Nat,
}

#[derive(CandidType, Serialize, Deserialize, Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("user '{0}' not found")]
    NotFound(String),
    #[error("user '{0}' already exists")]
    AlreadyExists(String),
    #[error("user id must not be empty")]
    InvalidUserId,
    #[error("caller {0} is not a controller")]
    Unauthorized(String),
}
