//! # Reference Cache
//!
//! In-memory set of reference numbers already handed to the intake servers,
//! each with an expiry time. Expired entries are removed lazily by the next
//! lookup that finds them; there is no background sweep. Nothing is
//! persisted, so a restart forgets every reference.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use super::cv::ReferenceNumber;
use super::error::ScraperError;

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Meant for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// A clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How long a reference stays cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheTtl {
    /// 12 hours.
    Hours12,
    /// 24 hours.
    Hours24,
    /// 72 hours.
    #[default]
    Hours72,
}

impl CacheTtl {
    /// Length in hours.
    pub fn hours(self) -> i64 {
        match self {
            CacheTtl::Hours12 => 12,
            CacheTtl::Hours24 => 24,
            CacheTtl::Hours72 => 72,
        }
    }

    /// Length as a duration.
    pub fn duration(self) -> Duration {
        Duration::hours(self.hours())
    }
}

impl TryFrom<u32> for CacheTtl {
    type Error = ScraperError;

    fn try_from(hours: u32) -> Result<Self, Self::Error> {
        match hours {
            12 => Ok(CacheTtl::Hours12),
            24 => Ok(CacheTtl::Hours24),
            72 => Ok(CacheTtl::Hours72),
            other => Err(ScraperError::InvalidTtl(other)),
        }
    }
}

/// # Reference Cache
///
/// Maps a reference's canonical text to its expiry. All access goes through
/// one mutex so a lookup followed by an insert can be made atomic
/// ([`ReferenceCache::claim`]).
#[derive(Debug)]
pub struct ReferenceCache {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ReferenceCache {
    /// An empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live-entry check on an already locked map; drops the entry if it expired.
    fn contains_live(entries: &mut HashMap<String, DateTime<Utc>>, key: &str, now: DateTime<Utc>) -> bool {
        match entries.get(key) {
            None => false,
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                entries.remove(key);
                false
            }
        }
    }

    /// True if `reference` is cached and its expiry is strictly in the future.
    pub fn has(&self, reference: &ReferenceNumber) -> bool {
        let now = self.clock.now();
        Self::contains_live(&mut self.lock(), &reference.key(), now)
    }

    /// Caches `reference` for `ttl`. A live entry is left untouched, its TTL
    /// is not refreshed.
    pub fn set(&self, reference: &ReferenceNumber, ttl: CacheTtl) -> Result<(), ScraperError> {
        self.claim(reference, ttl).map(|_| ())
    }

    /// Atomic has-then-set. Returns `true` when this call inserted the entry,
    /// `false` when a live entry already existed.
    pub fn claim(&self, reference: &ReferenceNumber, ttl: CacheTtl) -> Result<bool, ScraperError> {
        if reference.is_empty() {
            return Err(ScraperError::InvalidReference);
        }

        let key = reference.key();
        let now = self.clock.now();
        let mut entries = self.lock();
        if Self::contains_live(&mut entries, &key, now) {
            return Ok(false);
        }
        entries.insert(key, now + ttl.duration());
        Ok(true)
    }

    /// Number of stored entries, expired ones not yet evicted included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock() -> (ReferenceCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (ReferenceCache::new(clock.clone()), clock)
    }

    #[test]
    fn test_set_then_has() {
        let (cache, _clock) = cache_with_clock();
        let reference = ReferenceNumber::from("abc");
        assert!(!cache.has(&reference));
        cache.set(&reference, CacheTtl::default()).unwrap();
        assert!(cache.has(&reference));
    }

    #[test]
    fn test_empty_reference_rejected() {
        let (cache, _clock) = cache_with_clock();
        let err = cache.set(&ReferenceNumber::from(""), CacheTtl::default()).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidReference));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expiry_boundary() {
        let (cache, clock) = cache_with_clock();
        let reference = ReferenceNumber::from("abc");
        cache.set(&reference, CacheTtl::Hours12).unwrap();

        clock.advance(Duration::hours(12) - Duration::seconds(1));
        assert!(cache.has(&reference));

        clock.advance(Duration::seconds(2));
        assert!(!cache.has(&reference));
    }

    #[test]
    fn test_entry_expiring_now_is_gone() {
        let (cache, clock) = cache_with_clock();
        let reference = ReferenceNumber::from("abc");
        cache.set(&reference, CacheTtl::Hours24).unwrap();
        clock.advance(Duration::hours(24));
        assert!(!cache.has(&reference));
    }

    #[test]
    fn test_lookup_evicts_expired_entry() {
        let (cache, clock) = cache_with_clock();
        cache.set(&ReferenceNumber::from("abc"), CacheTtl::Hours12).unwrap();
        clock.advance(Duration::hours(13));
        assert_eq!(cache.len(), 1);
        assert!(!cache.has(&ReferenceNumber::from("abc")));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_set_does_not_refresh_ttl() {
        let (cache, clock) = cache_with_clock();
        let reference = ReferenceNumber::from("abc");
        cache.set(&reference, CacheTtl::Hours12).unwrap();

        clock.advance(Duration::hours(11));
        // Longer TTL on a live entry is ignored.
        cache.set(&reference, CacheTtl::Hours72).unwrap();

        clock.advance(Duration::hours(2));
        assert!(!cache.has(&reference));
    }

    #[test]
    fn test_claim_reports_first_writer() {
        let (cache, clock) = cache_with_clock();
        let reference = ReferenceNumber::from(99i64);
        assert!(cache.claim(&reference, CacheTtl::Hours12).unwrap());
        assert!(!cache.claim(&reference, CacheTtl::Hours12).unwrap());

        clock.advance(Duration::hours(12));
        assert!(cache.claim(&reference, CacheTtl::Hours12).unwrap());
    }

    #[test]
    fn test_numeric_and_text_references_share_an_entry() {
        let (cache, _clock) = cache_with_clock();
        cache.set(&ReferenceNumber::from(7i64), CacheTtl::default()).unwrap();
        assert!(cache.has(&ReferenceNumber::from("7")));
    }

    #[test]
    fn test_ttl_from_hours() {
        assert_eq!(CacheTtl::try_from(24u32).unwrap(), CacheTtl::Hours24);
        assert!(matches!(CacheTtl::try_from(48u32), Err(ScraperError::InvalidTtl(48))));
        assert_eq!(CacheTtl::default().hours(), 72);
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let cache = Arc::new(ReferenceCache::default());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache.claim(&ReferenceNumber::from("same"), CacheTtl::default()).unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
