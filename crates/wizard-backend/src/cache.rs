//! Time-to-live cache for catalog reads.
//!
//! An explicit cache object with an injected clock. Expiry decisions go
//! through [`Clock::now`], so tests drive time with a manual clock instead
//! of sleeping, and nothing in here touches global mutable state.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use wizard_types::{Catalog, Journey};

/// Source of the current time.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
	/// Starts the clock at the given instant.
	pub fn starting_at(now: DateTime<Utc>) -> Self {
		Self { now: Mutex::new(now) }
	}

	/// Moves the clock forward.
	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap();
		*now += by;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap()
	}
}

struct CacheEntry {
	catalog: Catalog,
	expires_at: DateTime<Utc>,
}

/// Per-journey catalog cache with a fixed time-to-live.
pub struct CatalogCache<C: Clock> {
	clock: C,
	ttl: Duration,
	entries: Mutex<HashMap<Journey, CacheEntry>>,
}

impl<C: Clock> CatalogCache<C> {
	/// Creates a cache whose entries live for `ttl_seconds`.
	pub fn new(ttl_seconds: u64, clock: C) -> Self {
		Self {
			clock,
			ttl: Duration::seconds(ttl_seconds as i64),
			entries: Mutex::new(HashMap::new()),
		}
	}

	/// Returns the cached catalog if present and not expired. Expired
	/// entries are evicted on the way out.
	pub fn get(&self, journey: Journey) -> Option<Catalog> {
		let now = self.clock.now();
		let mut entries = self.entries.lock().unwrap();
		match entries.get(&journey) {
			Some(entry) if entry.expires_at > now => Some(entry.catalog.clone()),
			Some(_) => {
				entries.remove(&journey);
				None
			}
			None => None,
		}
	}

	/// Stores a catalog, stamping its expiry from the injected clock.
	pub fn put(&self, journey: Journey, catalog: Catalog) {
		let expires_at = self.clock.now() + self.ttl;
		self.entries
			.lock()
			.unwrap()
			.insert(journey, CacheEntry { catalog, expires_at });
	}

	/// Drops a journey's entry regardless of expiry.
	pub fn invalidate(&self, journey: Journey) {
		self.entries.lock().unwrap().remove(&journey);
	}

	/// When the journey's entry expires, if one is cached.
	pub fn expires_at(&self, journey: Journey) -> Option<DateTime<Utc>> {
		self.entries
			.lock()
			.unwrap()
			.get(&journey)
			.map(|e| e.expires_at)
	}
}
