//! Membership cache with per-key single-flight validation.
//!
//! Each key maps to either a ready decision or a pending lookup. The first
//! caller that misses becomes the leader: it marks the key as pending and
//! spawns the validator call. Callers arriving while the key is pending
//! subscribe to the same outcome instead of calling the validator again.
//!
//! The map lock is only held while a slot is inspected or replaced, never
//! across the validator call, so unrelated keys never wait on each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::MAX_CACHE_DURATION_MINUTES;

use super::{Credential, MembershipCacheConfig, MembershipError, MembershipKey, MembershipValidator};

/// Lifetime used when the configured one does not fit the clock.
const MAX_TTL: Duration = Duration::from_secs(MAX_CACHE_DURATION_MINUTES as u64 * 60);

/// Shortest period of the background sweep.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Value published to everyone waiting on one validator call.
type Outcome = Option<Result<bool, MembershipError>>;

// =============================================================================
// Slots
// =============================================================================

/// A membership decision together with its validity window.
#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    is_member: bool,
    created_at: Instant,
    expires_at: Instant,
}

impl CachedDecision {
    fn new(is_member: bool, ttl: Duration) -> Self {
        let created_at = Instant::now();
        let expires_at = created_at
            .checked_add(ttl)
            .unwrap_or_else(|| created_at + MAX_TTL);
        Self {
            is_member,
            created_at,
            expires_at,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

enum Slot {
    Ready(CachedDecision),
    Pending(watch::Receiver<Outcome>),
}

enum Lookup {
    Hit(bool),
    Join(watch::Receiver<Outcome>),
    Lead(watch::Sender<Outcome>, watch::Receiver<Outcome>),
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    validator_calls: AtomicU64,
    failures: AtomicU64,
}

struct Inner {
    entries: DashMap<MembershipKey, Slot>,
    validator: Arc<dyn MembershipValidator>,
    config: ArcSwap<MembershipCacheConfig>,
    counters: Counters,
}

impl Inner {
    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();

        self.entries.retain(|_, slot| match slot {
            Slot::Ready(decision) => decision.is_fresh(now),
            Slot::Pending(_) => true,
        });

        before.saturating_sub(self.entries.len())
    }
}

/// Removes a pending slot whose validator call never reported back.
///
/// Dropped without being disarmed only when the validation task unwinds
/// or is torn down with the runtime.
struct PendingGuard {
    inner: Arc<Inner>,
    key: MembershipKey,
    armed: bool,
}

impl PendingGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner
                .entries
                .remove_if(&self.key, |_, slot| matches!(slot, Slot::Pending(_)));
            tracing::warn!(key = %self.key, "Membership validation aborted before completion");
        }
    }
}

// =============================================================================
// Membership Cache
// =============================================================================

/// Time-bounded cache of team membership decisions.
///
/// Construct one per process and hand out clones; clones share the same
/// entries.
#[derive(Clone)]
pub struct MembershipCache {
    inner: Arc<Inner>,
}

impl MembershipCache {
    /// Creates a new membership cache.
    ///
    /// # Arguments
    ///
    /// * `validator` - Collaborator answering membership questions on a miss
    /// * `config` - Cache duration settings
    #[must_use]
    pub fn new(validator: Arc<dyn MembershipValidator>, config: MembershipCacheConfig) -> Self {
        log_duration_fallback(&config);

        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                validator,
                config: ArcSwap::from_pointee(config),
                counters: Counters::default(),
            }),
        }
    }

    /// Returns whether `user_id` is currently a member of `group_id`.
    ///
    /// A fresh cached decision is returned without calling the validator.
    /// On a miss the validator is called once for the key, however many
    /// callers are waiting, and its outcome is handed to all of them.
    ///
    /// Cancelling the returned future only stops this caller from waiting;
    /// the validator call keeps running and still populates the cache.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if either identifier is empty
    /// - `ValidatorFailure` if the validator call failed; nothing is cached
    /// - `Interrupted` if the validator call ended without an answer
    pub async fn is_member(
        &self,
        group_id: &str,
        user_id: &str,
        credential: &Credential,
    ) -> Result<bool, MembershipError> {
        let key = MembershipKey::new(group_id, user_id)?;

        let mut receiver = match self.lookup(&key) {
            Lookup::Hit(is_member) => {
                tracing::trace!(key = %key, is_member, "Membership cache hit");
                return Ok(is_member);
            }
            Lookup::Join(receiver) => {
                tracing::debug!(key = %key, "Joining in-flight membership validation");
                receiver
            }
            Lookup::Lead(sender, receiver) => {
                self.spawn_validation(key, credential.clone(), sender);
                receiver
            }
        };

        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        outcome.unwrap_or(Err(MembershipError::Interrupted))
    }

    /// Inspects the slot for `key` and claims it when the caller must lead.
    fn lookup(&self, key: &MembershipKey) -> Lookup {
        let now = Instant::now();
        let counters = &self.inner.counters;

        match self.inner.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = match occupied.get() {
                    Slot::Ready(decision) if decision.is_fresh(now) => {
                        Some(Lookup::Hit(decision.is_member))
                    }
                    Slot::Pending(receiver) => Some(Lookup::Join(receiver.clone())),
                    Slot::Ready(_) => None,
                };

                match existing {
                    Some(lookup) => {
                        match lookup {
                            Lookup::Hit(_) => counters.hits.fetch_add(1, Ordering::Relaxed),
                            _ => counters.joined.fetch_add(1, Ordering::Relaxed),
                        };
                        lookup
                    }
                    None => {
                        counters.misses.fetch_add(1, Ordering::Relaxed);
                        let (sender, receiver) = watch::channel(None);
                        occupied.insert(Slot::Pending(receiver.clone()));
                        Lookup::Lead(sender, receiver)
                    }
                }
            }
            Entry::Vacant(vacant) => {
                counters.misses.fetch_add(1, Ordering::Relaxed);
                let (sender, receiver) = watch::channel(None);
                vacant.insert(Slot::Pending(receiver.clone()));
                Lookup::Lead(sender, receiver)
            }
        }
    }

    /// Runs the validator call for a claimed key on its own task.
    fn spawn_validation(
        &self,
        key: MembershipKey,
        credential: Credential,
        sender: watch::Sender<Outcome>,
    ) {
        // Resolved per miss so configuration updates apply to the next entry.
        let ttl = self.inner.config.load().effective_ttl();
        let inner = Arc::clone(&self.inner);
        let span = tracing::debug_span!(
            "membership.validate",
            group_id = %key.group_id(),
            user_id = %key.user_id()
        );

        tokio::spawn(
            async move {
                let guard = PendingGuard {
                    inner: Arc::clone(&inner),
                    key: key.clone(),
                    armed: true,
                };

                inner.counters.validator_calls.fetch_add(1, Ordering::Relaxed);
                let result = inner
                    .validator
                    .validate(key.user_id(), key.group_id(), &credential)
                    .await;

                let outcome = match result {
                    Ok(is_member) => {
                        let decision = CachedDecision::new(is_member, ttl);
                        inner.entries.insert(key.clone(), Slot::Ready(decision));
                        tracing::debug!(
                            is_member,
                            ttl_secs = ttl.as_secs(),
                            "Membership decision cached"
                        );
                        Ok(is_member)
                    }
                    Err(err) => {
                        inner
                            .entries
                            .remove_if(&key, |_, slot| matches!(slot, Slot::Pending(_)));
                        inner.counters.failures.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(error = %err, "Membership validation failed");
                        Err(MembershipError::from(err))
                    }
                };

                guard.disarm();
                sender.send_replace(Some(outcome));
            }
            .instrument(span),
        );
    }

    /// Replaces the cache settings. Applies from the next cache miss on.
    pub fn update_config(&self, config: MembershipCacheConfig) {
        tracing::info!(
            cache_duration_in_minutes = config.cache_duration_in_minutes,
            "Membership cache configuration updated"
        );
        log_duration_fallback(&config);
        self.inner.config.store(Arc::new(config));
    }

    /// Returns the current cache settings.
    #[must_use]
    pub fn config(&self) -> MembershipCacheConfig {
        self.inner.config.load().as_ref().clone()
    }

    /// Removes expired decisions and returns how many were dropped.
    ///
    /// Expired entries are already ignored on lookup; this only frees memory.
    pub fn purge_expired(&self) -> usize {
        let removed = self.inner.purge_expired();
        if removed > 0 {
            tracing::debug!(removed, "Purged expired membership decisions");
        }
        removed
    }

    /// Starts a background task calling [`purge_expired`](Self::purge_expired)
    /// every `interval`. The task ends once every cache handle is dropped.
    ///
    /// Intervals shorter than one second are raised to one second.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        if interval < MIN_SWEEP_INTERVAL {
            tracing::warn!(
                interval = ?interval,
                "Membership cache sweep interval too short, using 1s"
            );
        }
        let interval = interval.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let removed = inner.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Membership cache sweep");
                }
            }
        })
    }

    /// Returns the number of entries, pending lookups included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Returns the age of the cached decision for a key, if one is fresh.
    #[must_use]
    pub fn entry_age(&self, group_id: &str, user_id: &str) -> Option<Duration> {
        let key = MembershipKey::new(group_id, user_id).ok()?;
        let now = Instant::now();

        match self.inner.entries.get(&key)?.value() {
            Slot::Ready(decision) if decision.is_fresh(now) => {
                Some(now.duration_since(decision.created_at))
            }
            _ => None,
        }
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> MembershipCacheStats {
        let counters = &self.inner.counters;
        MembershipCacheStats {
            entries: self.len(),
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            joined: counters.joined.load(Ordering::Relaxed),
            validator_calls: counters.validator_calls.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
            ttl: self.inner.config.load().effective_ttl(),
        }
    }
}

/// Notes when the configured duration is replaced by the default or capped.
fn log_duration_fallback(config: &MembershipCacheConfig) {
    if config.uses_default_duration() {
        tracing::info!(
            configured = config.cache_duration_in_minutes,
            "Membership cache duration is not positive, entries will live 60 minutes"
        );
    } else if config.cache_duration_in_minutes > MAX_CACHE_DURATION_MINUTES {
        tracing::warn!(
            configured = config.cache_duration_in_minutes,
            max = MAX_CACHE_DURATION_MINUTES,
            "Membership cache duration too long, capping"
        );
    }
}

// =============================================================================
// Cache Statistics
// =============================================================================

/// Statistics about the membership cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipCacheStats {
    /// Ready and pending entries currently held.
    pub entries: usize,

    /// Lookups answered from a fresh entry.
    pub hits: u64,

    /// Lookups that started a validator call.
    pub misses: u64,

    /// Lookups that waited on another caller's validator call.
    pub joined: u64,

    /// Validator calls issued.
    pub validator_calls: u64,

    /// Validator calls that failed.
    pub failures: u64,

    /// Lifetime given to entries created now.
    pub ttl: Duration,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::ValidatorError;
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    // -------------------------------------------------------------------------
    // Mock Validator
    // -------------------------------------------------------------------------

    struct MockValidator {
        members: Mutex<HashSet<(String, String)>>,
        failure: Mutex<Option<ValidatorError>>,
        delay: Duration,
        call_count: AtomicUsize,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl MockValidator {
        fn new() -> Self {
            Self {
                members: Mutex::new(HashSet::new()),
                failure: Mutex::new(None),
                delay: Duration::ZERO,
                call_count: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn with_member(self, group_id: &str, user_id: &str) -> Self {
            self.add_member(group_id, user_id);
            self
        }

        fn add_member(&self, group_id: &str, user_id: &str) {
            self.members
                .lock()
                .unwrap()
                .insert((group_id.to_string(), user_id.to_string()));
        }

        fn remove_member(&self, group_id: &str, user_id: &str) {
            self.members
                .lock()
                .unwrap()
                .remove(&(group_id.to_string(), user_id.to_string()));
        }

        fn fail_with(&self, error: Option<ValidatorError>) {
            *self.failure.lock().unwrap() = error;
        }

        fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MembershipValidator for MockValidator {
        async fn validate(
            &self,
            user_id: &str,
            group_id: &str,
            credential: &Credential,
        ) -> Result<bool, ValidatorError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push((
                user_id.to_string(),
                group_id.to_string(),
                credential.expose().to_string(),
            ));

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if let Some(err) = self.failure.lock().unwrap().clone() {
                return Err(err);
            }

            Ok(self
                .members
                .lock()
                .unwrap()
                .contains(&(group_id.to_string(), user_id.to_string())))
        }
    }

    struct PanickingValidator;

    #[async_trait]
    impl MembershipValidator for PanickingValidator {
        async fn validate(
            &self,
            _user_id: &str,
            _group_id: &str,
            _credential: &Credential,
        ) -> Result<bool, ValidatorError> {
            panic!("validator blew up");
        }
    }

    // -------------------------------------------------------------------------
    // Helper Functions
    // -------------------------------------------------------------------------

    fn create_cache(validator: &Arc<MockValidator>, minutes: i64) -> MembershipCache {
        MembershipCache::new(
            validator.clone(),
            MembershipCacheConfig::with_cache_duration_minutes(minutes),
        )
    }

    fn token() -> Credential {
        Credential::new("Bearer tokenA")
    }

    fn minutes(n: u64) -> Duration {
        Duration::from_secs(n * 60)
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cache_hit_avoids_validator_call() {
        let validator = Arc::new(MockValidator::new().with_member("team-42", "user-7"));
        let cache = create_cache(&validator, 60);

        for _ in 0..5 {
            assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        }

        assert_eq!(validator.call_count(), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 4);
        assert_eq!(stats.validator_calls, 1);
    }

    #[tokio::test]
    async fn test_validator_receives_identifiers_and_credential() {
        let validator = Arc::new(MockValidator::new());
        let cache = create_cache(&validator, 60);

        assert!(!cache.is_member("team-42", "user-7", &token()).await.unwrap());

        let calls = validator.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                "user-7".to_string(),
                "team-42".to_string(),
                "Bearer tokenA".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_negative_decision_is_cached() {
        let validator = Arc::new(MockValidator::new());
        let cache = create_cache(&validator, 60);

        assert!(!cache.is_member("team-42", "user-7", &token()).await.unwrap());
        validator.add_member("team-42", "user-7");
        assert!(!cache.is_member("team-42", "user-7", &token()).await.unwrap());

        assert_eq!(validator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_triggers_revalidation() {
        let validator = Arc::new(MockValidator::new().with_member("team-42", "user-7"));
        let cache = create_cache(&validator, 10);

        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());

        tokio::time::advance(minutes(9)).await;
        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 1);

        validator.remove_member("team-42", "user-7");
        tokio::time::advance(minutes(2)).await;
        assert!(!cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_substitution() {
        for configured in [0, -5] {
            let validator = Arc::new(MockValidator::new().with_member("team-42", "user-7"));
            let cache = create_cache(&validator, configured);

            assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());

            tokio::time::advance(minutes(59)).await;
            assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
            assert_eq!(validator.call_count(), 1, "configured = {configured}");

            tokio::time::advance(minutes(2)).await;
            assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
            assert_eq!(validator.call_count(), 2, "configured = {configured}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_whole_hour_duration_is_honoured() {
        let validator = Arc::new(MockValidator::new().with_member("team-42", "user-7"));
        let cache = create_cache(&validator, 120);

        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        tokio::time::advance(minutes(90)).await;
        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());

        assert_eq!(validator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_concurrent_callers() {
        let validator = Arc::new(
            MockValidator::new()
                .with_member("team-42", "user-7")
                .with_delay(Duration::from_millis(50)),
        );
        let cache = create_cache(&validator, 60);
        let credential = token();

        let results = join_all(
            (0..16).map(|_| cache.is_member("team-42", "user-7", &credential)),
        )
        .await;

        assert_eq!(results.len(), 16);
        assert!(results.iter().all(|r| r == &Ok(true)));
        assert_eq!(validator.call_count(), 1);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.joined, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_across_tasks() {
        let validator = Arc::new(
            MockValidator::new()
                .with_member("team-42", "user-7")
                .with_delay(Duration::from_millis(50)),
        );
        let cache = create_cache(&validator, 60);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.is_member("team-42", "user-7", &token()).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(true));
        }
        assert_eq!(validator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_shares_failure() {
        let validator = Arc::new(MockValidator::new().with_delay(Duration::from_millis(50)));
        validator.fail_with(Some(ValidatorError::Rejected { status: 401 }));
        let cache = create_cache(&validator, 60);
        let credential = token();

        let results =
            join_all((0..8).map(|_| cache.is_member("team-42", "user-7", &credential))).await;

        let expected = Err(MembershipError::ValidatorFailure(ValidatorError::Rejected {
            status: 401,
        }));
        assert!(results.iter().all(|r| r == &expected));
        assert_eq!(validator.call_count(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_no_negative_caching_of_failures() {
        let validator = Arc::new(MockValidator::new().with_member("team-42", "user-7"));
        validator.fail_with(Some(ValidatorError::transport("connection refused")));
        let cache = create_cache(&validator, 60);

        let err = cache
            .is_member("team-42", "user-7", &token())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MembershipError::ValidatorFailure(ValidatorError::Transport(_))
        ));
        assert_eq!(cache.stats().failures, 1);

        validator.fail_with(None);
        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_key_isolation() {
        let validator = Arc::new(
            MockValidator::new()
                .with_member("G1", "U1")
                .with_member("G2", "U2"),
        );
        let cache = create_cache(&validator, 60);

        assert!(cache.is_member("G1", "U1", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 1);

        assert!(!cache.is_member("G1", "U2", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 2);

        assert!(!cache.is_member("G2", "U1", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 3);

        assert!(!cache.is_member("g1", "U1", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 4);

        // The first entry is untouched by the others.
        assert!(cache.is_member("G1", "U1", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 4);
        assert_eq!(cache.len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_validator() {
        let validator = Arc::new(MockValidator::new());
        let cache = create_cache(&validator, 60);

        let err = cache.is_member("", "user-7", &token()).await.unwrap_err();
        assert!(matches!(err, MembershipError::InvalidArgument { .. }));

        let err = cache.is_member("team-42", "", &token()).await.unwrap_err();
        assert!(matches!(err, MembershipError::InvalidArgument { .. }));

        assert_eq!(validator.call_count(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concrete_scenario() {
        let validator = Arc::new(MockValidator::new().with_member("team-42", "user-7"));
        let cache = create_cache(&validator, 60);

        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 1);

        tokio::time::advance(minutes(5)).await;
        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 1);
        assert_eq!(cache.entry_age("team-42", "user-7"), Some(minutes(5)));

        tokio::time::advance(minutes(56)).await;
        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_still_populates_cache() {
        let validator = Arc::new(
            MockValidator::new()
                .with_member("team-42", "user-7")
                .with_delay(minutes(1)),
        );
        let cache = create_cache(&validator, 60);

        let cancelled = tokio::time::timeout(
            Duration::from_secs(1),
            cache.is_member("team-42", "user-7", &token()),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(minutes(2)).await;

        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_lookup_is_visible_until_resolved() {
        let validator = Arc::new(
            MockValidator::new()
                .with_member("team-42", "user-7")
                .with_delay(minutes(1)),
        );
        let cache = create_cache(&validator, 60);
        let credential = token();

        let mut leader = tokio_test::task::spawn(cache.is_member("team-42", "user-7", &credential));
        let mut follower =
            tokio_test::task::spawn(cache.is_member("team-42", "user-7", &credential));
        tokio_test::assert_pending!(leader.poll());
        tokio_test::assert_pending!(follower.poll());

        let stats = cache.stats();
        assert_eq!((stats.entries, stats.misses, stats.joined), (1, 1, 1));
        assert_eq!(cache.entry_age("team-42", "user-7"), None);

        tokio::time::sleep(minutes(2)).await;

        assert!(leader.is_woken());
        tokio_test::assert_ready_eq!(leader.poll(), Ok(true));
        tokio_test::assert_ready_eq!(follower.poll(), Ok(true));
        assert_eq!(validator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follower_survives_cancelled_leader() {
        let validator = Arc::new(
            MockValidator::new()
                .with_member("team-42", "user-7")
                .with_delay(minutes(1)),
        );
        let cache = create_cache(&validator, 60);

        let leader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.is_member("team-42", "user-7", &token()).await })
        };
        tokio::task::yield_now().await;

        let follower = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.is_member("team-42", "user-7", &token()).await })
        };
        tokio::task::yield_now().await;

        leader.abort();
        assert_eq!(follower.await.unwrap(), Ok(true));
        assert_eq!(validator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_change_applies_on_next_miss() {
        let validator = Arc::new(MockValidator::new().with_member("team-42", "user-7"));
        let cache = create_cache(&validator, 60);

        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        cache.update_config(MembershipCacheConfig::with_cache_duration_minutes(5));
        assert_eq!(cache.config().cache_duration_in_minutes, 5);

        // The existing entry keeps the lifetime it was created with.
        tokio::time::advance(minutes(10)).await;
        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 1);

        assert!(cache.is_member("team-42", "user-8", &token()).await.is_ok());
        tokio::time::advance(minutes(6)).await;
        assert!(cache.is_member("team-42", "user-8", &token()).await.is_ok());
        assert_eq!(validator.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let validator = Arc::new(MockValidator::new());
        let cache = create_cache(&validator, 10);

        cache.is_member("G1", "U1", &token()).await.unwrap();
        tokio::time::advance(minutes(5)).await;
        cache.is_member("G1", "U2", &token()).await.unwrap();
        assert_eq!(cache.len(), 2);

        tokio::time::advance(minutes(6)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.entry_age("G1", "U2").is_some());
        assert!(cache.entry_age("G1", "U1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_in_background() {
        let validator = Arc::new(MockValidator::new());
        let cache = create_cache(&validator, 1);

        cache.is_member("G1", "U1", &token()).await.unwrap();
        let sweeper = cache.spawn_sweeper(Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(cache.is_empty());

        sweeper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_duration_is_cached_with_capped_lifetime() {
        let validator = Arc::new(MockValidator::new().with_member("team-42", "user-7"));
        let cache = create_cache(&validator, i64::MAX);

        assert_eq!(
            cache.is_member("team-42", "user-7", &token()).await,
            Ok(true)
        );
        assert_eq!(
            cache.is_member("team-42", "user-7", &token()).await,
            Ok(true)
        );
        assert_eq!(validator.call_count(), 1);
        assert_eq!(cache.stats().ttl, MAX_TTL);

        tokio::time::advance(MAX_TTL + minutes(1)).await;
        assert!(cache.is_member("team-42", "user-7", &token()).await.unwrap());
        assert_eq!(validator.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_sweep_interval_still_sweeps() {
        let validator = Arc::new(MockValidator::new());
        let cache = create_cache(&validator, 1);

        cache.is_member("G1", "U1", &token()).await.unwrap();
        let sweeper = cache.spawn_sweeper(Duration::ZERO);

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(!sweeper.is_finished());
        assert!(cache.is_empty());

        sweeper.abort();
    }

    #[tokio::test]
    async fn test_panicking_validator_is_interrupted_and_retried() {
        let cache = MembershipCache::new(
            Arc::new(PanickingValidator),
            MembershipCacheConfig::default(),
        );

        let err = cache
            .is_member("team-42", "user-7", &token())
            .await
            .unwrap_err();
        assert_eq!(err, MembershipError::Interrupted);
        assert!(cache.is_empty());

        let err = cache
            .is_member("team-42", "user-7", &token())
            .await
            .unwrap_err();
        assert_eq!(err, MembershipError::Interrupted);
    }
}
