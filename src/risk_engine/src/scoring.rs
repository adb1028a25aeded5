// src/risk_engine/scoring.rs
use crate::types::{RiskAssessment, UserProfileRecord};

pub const ORDER_COUNT_THRESHOLD: u64 = 10;
pub const MIN_ACCOUNT_AGE_MONTHS: i32 = 6;

pub const ORDER_POINTS: u8 = 30;
pub const REPAYMENT_POINTS: u8 = 40;
pub const KYC_POINTS: u8 = 20;
pub const ACCOUNT_AGE_POINTS: u8 = 10;

/// Minimum score for approval
pub const APPROVAL_THRESHOLD: u8 = 70;

/// Anything that turns a profile and its account age into an assessment.
///
/// The rule set below is a stand-in; a learned model only has to implement
/// this to be swapped into the handler.
pub trait RiskModel {
    fn score(&self, profile: &UserProfileRecord, account_age_months: i32) -> RiskAssessment;
}

/// Additive point rule over four independent conditions.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleBasedModel;

impl RiskModel for RuleBasedModel {
    fn score(&self, profile: &UserProfileRecord, account_age_months: i32) -> RiskAssessment {
        score(profile, account_age_months)
    }
}

/// Score a profile. Cannot fail and has no side effects.
pub fn score(profile: &UserProfileRecord, account_age_months: i32) -> RiskAssessment {
    let mut score = 0u8;

    if profile.order_count > ORDER_COUNT_THRESHOLD {
        score += ORDER_POINTS;
    }
    if profile.repayment_on_time {
        score += REPAYMENT_POINTS;
    }
    if profile.kyc_verified {
        score += KYC_POINTS;
    }
    if account_age_months > MIN_ACCOUNT_AGE_MONTHS {
        score += ACCOUNT_AGE_POINTS;
    }

    RiskAssessment {
        score,
        approved: is_approved(score),
    }
}

pub fn is_approved(score: u8) -> bool {
    score >= APPROVAL_THRESHOLD
}
