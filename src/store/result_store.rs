use crate::error::AppError;
use crate::pipeline::types::AnalysisResult;
use crate::store::clock::{Clock, SystemClock};
use crate::store::handle::{HandleSource, RandomHandles, ResultHandle};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// What a successful fetch does to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Any number of reads until the entry expires.
    #[default]
    RepeatableUntilExpiry,
    /// The first successful read removes the entry.
    SingleShot,
}

#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub result: Arc<AnalysisResult>,
    pub expires_at: DateTime<Utc>,
}

impl StoreEntry {
    /// An entry is expired from the instant `expires_at` is reached.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Handle-keyed, TTL-bounded map of completed analyses. Volatile: nothing survives a restart.
///
/// Every map operation holds one mutex for its whole duration and never across an await,
/// so store, fetch and sweep may be called from any number of tasks.
pub struct ResultStore {
    entries: Mutex<HashMap<ResultHandle, StoreEntry>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    handles: Arc<dyn HandleSource>,
    read_policy: ReadPolicy,
    sweep_on_store: bool,
}

impl ResultStore {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
    /// Results are ephemeral; anything beyond a year is a misconfiguration.
    pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
    const MAX_HANDLE_ATTEMPTS: usize = 8;

    pub fn new(ttl: Duration) -> Result<Self, AppError> {
        if ttl.is_zero() {
            return Err(AppError::Config("The result TTL must be positive".to_string()));
        }
        if ttl > Self::MAX_TTL {
            return Err(AppError::Config(format!(
                "The result TTL must not exceed {} seconds",
                Self::MAX_TTL.as_secs()
            )));
        }
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| AppError::Config(format!("The result TTL is out of range: {}", e)))?;

        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock: Arc::new(SystemClock),
            handles: Arc::new(RandomHandles),
            read_policy: ReadPolicy::default(),
            sweep_on_store: true,
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    pub fn with_handle_source(mut self, handles: impl HandleSource + 'static) -> Self {
        self.handles = Arc::new(handles);
        self
    }

    // Sweeps expired entries right after each store, in addition to the periodic sweeper.
    pub fn with_sweep_on_store(mut self, sweep_on_store: bool) -> Self {
        self.sweep_on_store = sweep_on_store;
        self
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResultHandle, StoreEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `result` under a fresh handle that expires one TTL from now. A handle that
    /// is still live is never handed out twice.
    pub fn store(
        &self,
        result: impl Into<Arc<AnalysisResult>>,
    ) -> Result<ResultHandle, AppError> {
        let result = result.into();
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AppError::Store(format!("Expiry of {} past {} is out of range", self.ttl, now))
        })?;
        let mut entries = self.lock();

        for _ in 0..Self::MAX_HANDLE_ATTEMPTS {
            let handle = self.handles.next_handle();
            if entries.get(&handle).is_some_and(|entry| entry.is_live(now)) {
                warn!("Generated handle {} is already live, drawing another", handle);
                continue;
            }

            entries.insert(handle, StoreEntry { result, expires_at });
            debug!("Stored result {} until {}", handle, expires_at);

            if self.sweep_on_store {
                let removed = remove_expired(&mut entries, now);
                if removed > 0 {
                    debug!("Swept {} expired results after store", removed);
                }
            }
            return Ok(handle);
        }

        Err(AppError::Store(format!(
            "No unused handle after {} attempts",
            Self::MAX_HANDLE_ATTEMPTS
        )))
    }

    /// Returns the result if the entry is live. An expired entry is removed and reported as
    /// absent.
    pub fn fetch(&self, handle: &ResultHandle) -> Option<Arc<AnalysisResult>> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(handle).map(|entry| entry.is_live(now)) {
            None => None,
            Some(false) => {
                entries.remove(handle);
                debug!("Result {} expired, removed on read", handle);
                None
            }
            Some(true) => match self.read_policy {
                ReadPolicy::RepeatableUntilExpiry => {
                    entries.get(handle).map(|entry| Arc::clone(&entry.result))
                }
                ReadPolicy::SingleShot => entries.remove(handle).map(|entry| entry.result),
            },
        }
    }

    /// Removes every expired entry and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let removed = remove_expired(&mut self.lock(), now);
        if removed > 0 {
            debug!("Swept {} expired results", removed);
        }
        removed
    }

    /// Entries currently held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn remove_expired(entries: &mut HashMap<ResultHandle, StoreEntry>, now: DateTime<Utc>) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.is_live(now));
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::classification;
    use crate::store::clock::ManualClock;
    use std::collections::VecDeque;

    fn result(label: &str) -> AnalysisResult {
        AnalysisResult::low_confidence(classification(label, 0.2), 0.5)
    }

    fn store_with_clock() -> (ResultStore, ManualClock) {
        let clock = ManualClock::default();
        let store = ResultStore::new(ResultStore::DEFAULT_TTL)
            .unwrap()
            .with_clock(clock.clone());
        (store, clock)
    }

    struct ScriptedHandles(Mutex<VecDeque<ResultHandle>>);

    impl HandleSource for ScriptedHandles {
        fn next_handle(&self) -> ResultHandle {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(ResultHandle::generate)
        }
    }

    #[test]
    fn fetch_returns_what_was_stored() {
        let (store, _clock) = store_with_clock();
        let stored = result("deer");
        let handle = store.store(stored.clone()).unwrap();

        assert_eq!(*store.fetch(&handle).unwrap(), stored);
        assert_eq!(*store.fetch(&handle).unwrap(), stored);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_handle_is_absent() {
        let (store, _clock) = store_with_clock();
        assert!(store.fetch(&ResultHandle::generate()).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn entry_expires_at_exactly_the_ttl() {
        let (store, clock) = store_with_clock();
        let handle = store.store(result("deer")).unwrap();

        clock.advance(TimeDelta::minutes(29) + TimeDelta::seconds(59));
        assert!(store.fetch(&handle).is_some());

        clock.advance(TimeDelta::seconds(1));
        assert!(store.fetch(&handle).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired_and_is_idempotent() {
        let (store, clock) = store_with_clock();
        let old = store.store(result("cat")).unwrap();
        clock.advance(TimeDelta::minutes(20));
        let fresh = store.store(result("dog")).unwrap();
        clock.advance(TimeDelta::minutes(15));

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.sweep(), 0);
        assert!(store.fetch(&old).is_none());
        assert!(store.fetch(&fresh).is_some());
    }

    #[test]
    fn store_sweeps_expired_entries_opportunistically() {
        let (store, clock) = store_with_clock();
        store.store(result("cat")).unwrap();
        clock.advance(TimeDelta::hours(1));
        store.store(result("dog")).unwrap();
        assert_eq!(store.len(), 1);

        let (lazy, clock) = store_with_clock();
        let lazy = lazy.with_sweep_on_store(false);
        lazy.store(result("cat")).unwrap();
        clock.advance(TimeDelta::hours(1));
        lazy.store(result("dog")).unwrap();
        assert_eq!(lazy.len(), 2);
    }

    #[test]
    fn live_handles_are_never_reused() {
        let taken = ResultHandle::generate();
        let next = ResultHandle::generate();
        let (store, _clock) = store_with_clock();
        let store = store.with_handle_source(ScriptedHandles(Mutex::new(VecDeque::from([
            taken, taken, next,
        ]))));

        assert_eq!(store.store(result("cat")).unwrap(), taken);
        assert_eq!(store.store(result("dog")).unwrap(), next);
        assert_eq!(store.fetch(&taken).unwrap().label(), "cat");
    }

    #[test]
    fn expired_handles_may_be_reissued() {
        let handle = ResultHandle::generate();
        let (store, clock) = store_with_clock();
        let store = store
            .with_sweep_on_store(false)
            .with_handle_source(ScriptedHandles(Mutex::new(VecDeque::from([handle, handle]))));

        store.store(result("cat")).unwrap();
        clock.advance(TimeDelta::hours(1));
        assert_eq!(store.store(result("dog")).unwrap(), handle);
        assert_eq!(store.fetch(&handle).unwrap().label(), "dog");
    }

    #[test]
    fn single_shot_reads_remove_the_entry() {
        let (store, _clock) = store_with_clock();
        let store = store.with_read_policy(ReadPolicy::SingleShot);
        let handle = store.store(result("deer")).unwrap();

        assert!(store.fetch(&handle).is_some());
        assert!(store.fetch(&handle).is_none());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        assert!(matches!(
            ResultStore::new(Duration::ZERO),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn ttl_beyond_the_maximum_is_rejected() {
        assert!(ResultStore::new(ResultStore::MAX_TTL).is_ok());
        assert!(matches!(
            ResultStore::new(Duration::from_secs(10_000_000_000_000)),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn expiry_past_the_calendar_range_is_an_error() {
        let clock = ManualClock::default();
        clock.set(DateTime::<Utc>::MAX_UTC - TimeDelta::minutes(1));
        let store = ResultStore::new(ResultStore::DEFAULT_TTL)
            .unwrap()
            .with_clock(clock);

        assert!(matches!(store.store(result("deer")), Err(AppError::Store(_))));
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_store_and_fetch() {
        let store = Arc::new(ResultStore::new(ResultStore::DEFAULT_TTL).unwrap());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let label = format!("animal-{}", i);
                let handle = store.store(result(&label)).unwrap();
                store.sweep();
                let fetched = store.fetch(&handle).unwrap();
                assert_eq!(fetched.label(), label);
                handle
            }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        handles.sort_by_key(|h| *h.as_uuid());
        handles.dedup();
        assert_eq!(handles.len(), 32);
        assert_eq!(store.len(), 32);
    }
}
