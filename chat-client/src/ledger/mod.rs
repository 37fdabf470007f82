//! Client-side accounting of requests per minute and tokens per day.
//!
//! The ledger is restored from a [`KeyValueStore`] at startup and written
//! through on every mutation. Storage failures never reach the caller: a bad
//! read falls back to a zeroed record and a failed write is logged.

pub mod reset;
pub mod store;

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

pub use reset::ResetTask;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

pub const USAGE_KEY: &str = "api-usage";
pub const LAST_RESET_KEY: &str = "api-usage-last-reset";

const DATE_FORMAT: &str = "%a %b %d %Y";

/// Today's date in local time, e.g. `Sun Oct 18 2026`.
pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub requests_used: u64,
    pub requests_limit: u64,
    pub tokens_used: u64,
    pub tokens_limit: u64,
    /// Stored under its own key, not inside the record.
    #[serde(skip)]
    pub last_reset_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageLimits {
    pub requests_per_minute: u64,
    pub tokens_per_day: u64,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
            tokens_per_day: 14_400,
        }
    }
}

impl UsageRecord {
    fn fresh(limits: UsageLimits, today: &str) -> Self {
        Self {
            requests_used: 0,
            requests_limit: limits.requests_per_minute,
            tokens_used: 0,
            tokens_limit: limits.tokens_per_day,
            last_reset_date: today.to_string(),
        }
    }
}

pub struct UsageLedger {
    store: Arc<dyn KeyValueStore>,
    record: UsageRecord,
}

impl UsageLedger {
    pub fn load(store: Arc<dyn KeyValueStore>, limits: UsageLimits) -> Self {
        Self::load_on(store, limits, &today())
    }

    /// Restore the ledger as of `today`, applying the calendar-day reset if
    /// the stored reset date is different.
    pub fn load_on(store: Arc<dyn KeyValueStore>, limits: UsageLimits, today: &str) -> Self {
        let stored = match store.get(USAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<UsageRecord>(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Stored usage record is unreadable, starting fresh");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read usage record, starting fresh");
                None
            }
        };

        let Some(mut record) = stored else {
            let mut ledger = Self {
                store,
                record: UsageRecord::fresh(limits, today),
            };
            ledger.persist();
            return ledger;
        };

        record.requests_limit = limits.requests_per_minute;
        record.tokens_limit = limits.tokens_per_day;
        record.last_reset_date = match store.get(LAST_RESET_KEY) {
            Ok(date) => date.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read last reset date");
                String::new()
            }
        };

        let mut ledger = Self { store, record };
        if !ledger.rollover(today) {
            ledger.persist();
        }
        ledger
    }

    /// Count one outbound request and the tokens it consumed.
    pub fn record_call(&mut self, tokens: u64) {
        self.record.requests_used += 1;
        self.record.tokens_used += tokens;
        tracing::debug!(
            requests_used = self.record.requests_used,
            tokens_used = self.record.tokens_used,
            "Recorded completion call"
        );
        self.persist();
    }

    pub fn is_request_limit_reached(&self) -> bool {
        self.record.requests_used >= self.record.requests_limit
    }

    pub fn is_token_limit_reached(&self) -> bool {
        self.record.tokens_used >= self.record.tokens_limit
    }

    pub fn reset_minute_window(&mut self) {
        self.record.requests_used = 0;
        self.persist();
    }

    /// Zero the daily token count when `today` differs from the last reset
    /// date. Returns whether a reset happened.
    pub fn rollover(&mut self, today: &str) -> bool {
        if self.record.last_reset_date == today {
            return false;
        }
        tracing::info!(
            previous = %self.record.last_reset_date,
            today,
            "New day, resetting token usage"
        );
        self.record.tokens_used = 0;
        self.record.last_reset_date = today.to_string();
        self.persist();
        true
    }

    pub fn snapshot(&self) -> UsageRecord {
        self.record.clone()
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.record) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize usage record");
                return;
            }
        };
        if let Err(e) = self.store.set(USAGE_KEY, &json) {
            tracing::warn!(error = %e, "Failed to persist usage record");
        }
        if let Err(e) = self.store.set(LAST_RESET_KEY, &self.record.last_reset_date) {
            tracing::warn!(error = %e, "Failed to persist last reset date");
        }
    }
}

/// Handle shared by the session and the reset task.
#[derive(Clone)]
pub struct SharedLedger(Arc<Mutex<UsageLedger>>);

impl SharedLedger {
    pub fn new(ledger: UsageLedger) -> Self {
        Self(Arc::new(Mutex::new(ledger)))
    }

    /// Run `f` with the ledger locked. The lock is never held across an await.
    pub fn with<R>(&self, f: impl FnOnce(&mut UsageLedger) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> UsageRecord {
        self.with(|ledger| ledger.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_ONE: &str = "Sat Oct 17 2026";
    const DAY_TWO: &str = "Sun Oct 18 2026";

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
    }

    fn stored_record(store: &MemoryStore) -> UsageRecord {
        serde_json::from_str(&store.get(USAGE_KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn first_load_creates_and_stamps_fresh_record() {
        let store = Arc::new(MemoryStore::new());
        let ledger = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_ONE);

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.requests_used, 0);
        assert_eq!(snapshot.tokens_used, 0);
        assert_eq!(snapshot.requests_limit, 30);
        assert_eq!(snapshot.tokens_limit, 14_400);
        assert_eq!(store.get(LAST_RESET_KEY).unwrap().as_deref(), Some(DAY_ONE));
        assert_eq!(stored_record(&store).requests_limit, 30);
    }

    #[test]
    fn record_call_counts_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_ONE);

        ledger.record_call(120);
        ledger.record_call(0);

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.requests_used, 2);
        assert_eq!(snapshot.tokens_used, 120);

        let stored = stored_record(&store);
        assert_eq!(stored.requests_used, 2);
        assert_eq!(stored.tokens_used, 120);
    }

    #[test]
    fn stored_json_uses_camel_case_keys() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_ONE);
        ledger.record_call(7);

        let raw: serde_json::Value =
            serde_json::from_str(&store.get(USAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["requestsUsed"], 1);
        assert_eq!(raw["tokensUsed"], 7);
        assert_eq!(raw["requestsLimit"], 30);
        assert_eq!(raw["tokensLimit"], 14_400);
        assert!(raw.get("lastResetDate").is_none());
    }

    #[test]
    fn reload_on_same_day_keeps_tokens() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_ONE);
        ledger.record_call(500);

        let reloaded = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_ONE);
        let again = UsageLedger::load_on(store, UsageLimits::default(), DAY_ONE);

        assert_eq!(reloaded.snapshot().tokens_used, 500);
        assert_eq!(again.snapshot().tokens_used, 500);
        assert_eq!(again.snapshot().requests_used, 1);
    }

    #[test]
    fn reload_on_new_day_resets_tokens_only() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_ONE);
        ledger.record_call(500);

        let reloaded = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_TWO);

        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.tokens_used, 0);
        assert_eq!(snapshot.requests_used, 1);
        assert_eq!(snapshot.last_reset_date, DAY_TWO);
        assert_eq!(store.get(LAST_RESET_KEY).unwrap().as_deref(), Some(DAY_TWO));
        assert_eq!(stored_record(&store).tokens_used, 0);
    }

    #[test]
    fn configured_limits_override_stored_limits() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                USAGE_KEY,
                r#"{"requestsUsed":3,"requestsLimit":5,"tokensUsed":10,"tokensLimit":20}"#,
            )
            .unwrap();
        store.set(LAST_RESET_KEY, DAY_ONE).unwrap();

        let limits = UsageLimits {
            requests_per_minute: 60,
            tokens_per_day: 1_000,
        };
        let ledger = UsageLedger::load_on(store, limits, DAY_ONE);

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.requests_used, 3);
        assert_eq!(snapshot.tokens_used, 10);
        assert_eq!(snapshot.requests_limit, 60);
        assert_eq!(snapshot.tokens_limit, 1_000);
    }

    #[test]
    fn corrupt_record_falls_back_to_fresh() {
        let store = Arc::new(MemoryStore::new());
        store.set(USAGE_KEY, "{not json").unwrap();

        let ledger = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_ONE);

        assert_eq!(ledger.snapshot().requests_used, 0);
        assert_eq!(stored_record(&store).requests_used, 0);
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let mut ledger = UsageLedger::load_on(Arc::new(FailingStore), UsageLimits::default(), DAY_ONE);

        ledger.record_call(10);
        ledger.reset_minute_window();

        assert_eq!(ledger.snapshot().requests_used, 0);
        assert_eq!(ledger.snapshot().tokens_used, 10);
    }

    #[test]
    fn minute_reset_clears_requests_and_keeps_tokens() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = UsageLedger::load_on(store.clone(), UsageLimits::default(), DAY_ONE);
        ledger.record_call(42);
        ledger.record_call(8);

        ledger.reset_minute_window();

        assert_eq!(ledger.snapshot().requests_used, 0);
        assert_eq!(ledger.snapshot().tokens_used, 50);
        assert_eq!(stored_record(&store).requests_used, 0);
    }

    #[test]
    fn limits_are_reached_at_equality() {
        let limits = UsageLimits {
            requests_per_minute: 2,
            tokens_per_day: 100,
        };
        let mut ledger = UsageLedger::load_on(Arc::new(MemoryStore::new()), limits, DAY_ONE);

        ledger.record_call(99);
        assert!(!ledger.is_request_limit_reached());
        assert!(!ledger.is_token_limit_reached());

        ledger.record_call(1);
        assert!(ledger.is_request_limit_reached());
        assert!(ledger.is_token_limit_reached());

        // No clamp: usage may run past the limit.
        ledger.record_call(50);
        assert_eq!(ledger.snapshot().tokens_used, 150);
    }

    #[test]
    fn rollover_is_noop_on_same_day() {
        let mut ledger =
            UsageLedger::load_on(Arc::new(MemoryStore::new()), UsageLimits::default(), DAY_ONE);
        ledger.record_call(30);

        assert!(!ledger.rollover(DAY_ONE));
        assert_eq!(ledger.snapshot().tokens_used, 30);

        assert!(ledger.rollover(DAY_TWO));
        assert_eq!(ledger.snapshot().tokens_used, 0);
        assert_eq!(ledger.snapshot().requests_used, 1);
    }

    #[test]
    fn shared_ledger_exposes_snapshot() {
        let shared = SharedLedger::new(UsageLedger::load_on(
            Arc::new(MemoryStore::new()),
            UsageLimits::default(),
            DAY_ONE,
        ));
        shared.with(|ledger| ledger.record_call(5));
        assert_eq!(shared.snapshot().tokens_used, 5);
    }

    #[test]
    fn today_uses_short_weekday_month_format() {
        let date = today();
        let parts: Vec<&str> = date.split(' ').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].len(), 3);
        assert_eq!(parts[1].len(), 3);
        assert_eq!(parts[2].len(), 2);
        assert_eq!(parts[3].len(), 4);
    }
}
