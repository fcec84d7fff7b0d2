// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for one provider instance.
#[derive(Debug, Default)]
pub struct ProviderMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	identity_refreshes: AtomicU64,
	identity_refresh_failures: AtomicU64,
	cache_hits: AtomicU64,
}
impl ProviderMetrics {
	/// Returns the total number of `provide` calls.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of `provide` calls that returned a credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed `provide` calls.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of successful identity token refreshes.
	pub fn identity_refreshes(&self) -> u64 {
		self.identity_refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of failed identity token refreshes.
	pub fn identity_refresh_failures(&self) -> u64 {
		self.identity_refresh_failures.load(Ordering::Relaxed)
	}

	/// Returns how often a cached identity token was reused.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_identity_refresh(&self) {
		self.identity_refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_identity_refresh_failure(&self) {
		self.identity_refresh_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}
}
