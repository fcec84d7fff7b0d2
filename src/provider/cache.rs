//! In-memory cache for the identity-provider access token of one provider instance.

// crates.io
use async_lock::MutexGuard as AsyncMutexGuard;
// self
use crate::{_prelude::*, auth::IdentityToken};

/// Holds the last identity token and serializes refreshes.
///
/// The token is replaced only with a successful identity-provider response; a failed or
/// cancelled refresh leaves the previous value in place.
#[derive(Default)]
pub struct IdentityTokenCache {
	current: RwLock<Option<IdentityToken>>,
	refresh_guard: AsyncMutex<()>,
}
impl IdentityTokenCache {
	/// Creates a cache seeded with `token`.
	pub fn new(token: Option<IdentityToken>) -> Self {
		Self { current: RwLock::new(token), refresh_guard: AsyncMutex::new(()) }
	}

	/// Returns a copy of the cached token, if any.
	pub fn snapshot(&self) -> Option<IdentityToken> {
		self.current.read().clone()
	}

	/// Returns `true` when a non-empty access token is cached.
	pub fn has_access_token(&self) -> bool {
		self.current.read().as_ref().is_some_and(|token| !token.access_token.is_empty())
	}

	/// Returns the cached token when it is neither missing nor stale at `now`.
	pub fn fresh_at(&self, now: OffsetDateTime, margin: Duration) -> Option<IdentityToken> {
		self.current.read().as_ref().filter(|token| !token.is_stale_at(now, margin)).cloned()
	}

	pub(crate) fn store(&self, token: IdentityToken) {
		*self.current.write() = Some(token);
	}

	pub(crate) async fn lock_refresh(&self) -> AsyncMutexGuard<'_, ()> {
		self.refresh_guard.lock().await
	}
}
impl Debug for IdentityTokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityTokenCache").field("current", &*self.current.read()).finish()
	}
}
