//! Identity-provider access tokens held by the provider cache.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Access token issued by the identity provider for a federated workload identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityToken {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant after which the identity provider no longer honors the token.
	pub expires_on: OffsetDateTime,
}
impl IdentityToken {
	/// Creates a token from its secret and expiry instant.
	pub fn new(access_token: impl Into<String>, expires_on: OffsetDateTime) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_on }
	}

	/// Returns `true` when the token is expired, or expires within `margin`, at `now`.
	///
	/// A zero margin treats a token expiring exactly at `now` as stale.
	pub fn is_stale_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		self.expires_on <= now + margin
	}
}
impl Debug for IdentityToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityToken")
			.field("access_token", &"<redacted>")
			.field("expires_on", &self.expires_on)
			.finish()
	}
}
