// src/risk_engine/handler.rs
use chrono::{DateTime, Datelike, Utc};

use crate::directory::{LookupError, UserDirectory};
use crate::scoring::{RiskModel, RuleBasedModel};
use crate::types::{RiskAssessment, RiskOutcome, RiskRequest};

/// Resolves a request to a profile, derives account age and scores it.
pub struct RiskQueryHandler<D, C, M = RuleBasedModel> {
    directory: D,
    clock: C,
    model: M,
}

impl<D, C> RiskQueryHandler<D, C, RuleBasedModel>
where
    D: UserDirectory,
    C: Fn() -> u64,
{
    /// `clock` returns the current time in nanoseconds since the Unix epoch.
    pub fn new(directory: D, clock: C) -> Self {
        Self::with_model(directory, clock, RuleBasedModel)
    }
}

impl<D, C, M> RiskQueryHandler<D, C, M>
where
    D: UserDirectory,
    C: Fn() -> u64,
    M: RiskModel,
{
    pub fn with_model(directory: D, clock: C, model: M) -> Self {
        Self { directory, clock, model }
    }

    /// Score the user, falling back to the default assessment when the
    /// profile is missing or the store cannot be reached.
    pub async fn handle(&self, request: &RiskRequest) -> RiskAssessment {
        self.assess(request).await.into_assessment()
    }

    /// Like `handle`, but reports why no score was produced.
    pub async fn assess(&self, request: &RiskRequest) -> RiskOutcome {
        let profile = match self.directory.find_user(&request.user_id).await {
            Ok(profile) => profile,
            Err(LookupError::UserNotFound) => return RiskOutcome::UserNotFound,
            Err(LookupError::StoreUnavailable(reason)) => {
                return RiskOutcome::StoreUnavailable(reason)
            }
        };

        let age = account_age_months(profile.created_at_ns, (self.clock)());
        RiskOutcome::Assessed(self.model.score(&profile, age))
    }
}

/// Whole calendar months between two instants, UTC.
///
/// Day of month is ignored, so 2023-06-30 to 2023-07-01 counts as one month.
/// Negative when `created_at_ns` is after `now_ns`.
pub fn account_age_months(created_at_ns: u64, now_ns: u64) -> i32 {
    let created = to_datetime(created_at_ns);
    let now = to_datetime(now_ns);

    (now.year() - created.year()) * 12 + (now.month() as i32 - created.month() as i32)
}

fn to_datetime(ns: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(i64::try_from(ns).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserProfileRecord;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::collections::HashMap;

    fn ns(y: i32, m: u32, d: u32) -> u64 {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .and_then(|t| t.timestamp_nanos_opt())
            .map(|n| n as u64)
            .expect("valid test date")
    }

    const NOW: (i32, u32, u32) = (2024, 3, 20);

    fn now() -> u64 {
        ns(NOW.0, NOW.1, NOW.2)
    }

    fn record(kyc: bool, created_at_ns: u64, orders: u64, on_time: bool) -> UserProfileRecord {
        UserProfileRecord {
            kyc_verified: kyc,
            created_at_ns,
            order_count: orders,
            repayment_on_time: on_time,
            review_count: 2,
            payment_count: 4,
        }
    }

    /// In-memory directory that counts lookups.
    #[derive(Default)]
    struct MemoryDirectory {
        users: HashMap<String, UserProfileRecord>,
        lookups: Cell<usize>,
    }

    impl MemoryDirectory {
        fn with(mut self, id: &str, profile: UserProfileRecord) -> Self {
            self.users.insert(id.to_string(), profile);
            self
        }
    }

    impl UserDirectory for MemoryDirectory {
        async fn find_user(&self, user_id: &str) -> Result<UserProfileRecord, LookupError> {
            self.lookups.set(self.lookups.get() + 1);
            self.users.get(user_id).cloned().ok_or(LookupError::UserNotFound)
        }
    }

    struct DownDirectory;

    impl UserDirectory for DownDirectory {
        async fn find_user(&self, _user_id: &str) -> Result<UserProfileRecord, LookupError> {
            Err(LookupError::StoreUnavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn account_age_uses_calendar_months() {
        assert_eq!(account_age_months(ns(2023, 6, 15), ns(2024, 1, 10)), 7);
        assert_eq!(account_age_months(ns(2023, 6, 30), ns(2023, 7, 1)), 1);
        assert_eq!(account_age_months(ns(2024, 1, 1), ns(2024, 1, 31)), 0);
        assert_eq!(account_age_months(ns(2020, 12, 1), ns(2021, 1, 1)), 1);
    }

    #[test]
    fn account_age_is_negative_for_future_creation() {
        assert_eq!(account_age_months(ns(2024, 5, 1), ns(2024, 3, 20)), -2);
    }

    #[tokio::test]
    async fn established_user_is_fully_approved() {
        let dir = MemoryDirectory::default().with("alice", record(true, ns(2023, 2, 20), 15, true));
        let handler = RiskQueryHandler::new(dir, now);

        let got = handler.handle(&RiskRequest::new("alice")).await;
        assert_eq!(got, RiskAssessment { score: 100, approved: true });
    }

    #[tokio::test]
    async fn new_user_without_history_scores_zero() {
        let dir = MemoryDirectory::default().with("bob", record(false, ns(2024, 1, 20), 3, false));
        let handler = RiskQueryHandler::new(dir, now);

        let got = handler.handle(&RiskRequest::new("bob")).await;
        assert_eq!(got, RiskAssessment { score: 0, approved: false });
    }

    #[tokio::test]
    async fn verified_but_late_payer_is_declined() {
        let dir = MemoryDirectory::default().with("carol", record(true, ns(2023, 7, 20), 5, false));
        let handler = RiskQueryHandler::new(dir, now);

        let got = handler.handle(&RiskRequest::new("carol")).await;
        assert_eq!(got, RiskAssessment { score: 30, approved: false });
    }

    #[tokio::test]
    async fn unknown_user_gets_default() {
        let handler = RiskQueryHandler::new(MemoryDirectory::default(), now);

        assert_eq!(handler.handle(&RiskRequest::new("nobody")).await, RiskAssessment::DEFAULT);
        assert_eq!(handler.assess(&RiskRequest::new("nobody")).await, RiskOutcome::UserNotFound);
    }

    // Same caller-visible result as an unknown user; only `assess` tells them apart.
    #[tokio::test]
    async fn store_failure_gets_default() {
        let handler = RiskQueryHandler::new(DownDirectory, now);

        assert_eq!(handler.handle(&RiskRequest::new("alice")).await, RiskAssessment::DEFAULT);
        assert_eq!(
            handler.assess(&RiskRequest::new("alice")).await,
            RiskOutcome::StoreUnavailable("connection refused".to_string())
        );
    }

    #[tokio::test]
    async fn repeated_calls_are_identical() {
        let dir = MemoryDirectory::default().with("dave", record(true, ns(2023, 9, 1), 11, false));
        let handler = RiskQueryHandler::new(dir, now);
        let req = RiskRequest::new("dave");

        let first = handler.handle(&req).await;
        for _ in 0..5 {
            assert_eq!(handler.handle(&req).await, first);
        }
        assert_eq!(first, RiskAssessment { score: 50, approved: false });
        assert_eq!(handler.directory.lookups.get(), 6);
    }

    #[tokio::test]
    async fn account_age_follows_the_clock() {
        let created = ns(2023, 6, 15);
        let dir = MemoryDirectory::default().with("erin", record(false, created, 0, false));

        let early = RiskQueryHandler::new(dir, || ns(2023, 12, 31));
        assert_eq!(early.handle(&RiskRequest::new("erin")).await.score, 0);

        let dir = MemoryDirectory::default().with("erin", record(false, created, 0, false));
        let later = RiskQueryHandler::new(dir, || ns(2024, 1, 10));
        assert_eq!(later.handle(&RiskRequest::new("erin")).await.score, 10);
    }

    struct FlatModel(u8);

    impl RiskModel for FlatModel {
        fn score(&self, _profile: &UserProfileRecord, _age: i32) -> RiskAssessment {
            RiskAssessment {
                score: self.0,
                approved: crate::scoring::is_approved(self.0),
            }
        }
    }

    #[tokio::test]
    async fn model_can_be_swapped() {
        let dir = MemoryDirectory::default().with("frank", record(false, now(), 0, false));
        let handler = RiskQueryHandler::with_model(dir, now, FlatModel(85));

        let got = handler.handle(&RiskRequest::new("frank")).await;
        assert_eq!(got, RiskAssessment { score: 85, approved: true });
    }
}
