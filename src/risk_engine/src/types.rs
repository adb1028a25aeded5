use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};

/// Request payload for the `risk` RPC.
///
/// Only the identifier is read by the scoring rule, so it is the only field
/// declared here.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RiskRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl RiskRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

/// Response payload of the `risk` RPC.
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RiskAssessment {
    pub score: u8,
    pub approved: bool,
}

impl RiskAssessment {
    /// Returned when no profile could be scored.
    pub const DEFAULT: RiskAssessment = RiskAssessment {
        score: 0,
        approved: false,
    };
}

/// Profile record as served by the user store canister's `find_user`.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserProfileRecord {
    pub kyc_verified: bool,
    /// Account creation, nanoseconds since the Unix epoch
    pub created_at_ns: u64,
    pub order_count: u64,
    pub repayment_on_time: bool,
    // Reserved for model inputs; the rule does not score these.
    pub review_count: u64,
    pub payment_count: u64,
}

/// Tagged result of `risk_detailed`, keeping "no such user" apart from
/// "store unreachable".
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum RiskOutcome {
    Assessed(RiskAssessment),
    UserNotFound,
    StoreUnavailable(String),
}

impl RiskOutcome {
    /// Collapse to the wire-compatible assessment used by `risk`.
    pub fn into_assessment(self) -> RiskAssessment {
        match self {
            RiskOutcome::Assessed(assessment) => assessment,
            RiskOutcome::UserNotFound | RiskOutcome::StoreUnavailable(_) => RiskAssessment::DEFAULT,
        }
    }
}

/// Init argument for the risk engine canister.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, Default)]
pub struct RiskEngineInit {
    pub user_store: Option<Principal>,
}
