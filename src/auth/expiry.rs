//! Reconciles the lifetimes of the identity token and the registry refresh token it backs.

// self
use crate::_prelude::*;

/// Validity window the registry grants a refresh token, measured from the exchange.
pub const DEFAULT_REGISTRY_TOKEN_LIFETIME: Duration = Duration::hours(3);

/// Returns whichever of `identity_expiry` and `now + DEFAULT_REGISTRY_TOKEN_LIFETIME` comes
/// first.
///
/// A registry credential never outlives the identity token it was derived from.
pub fn earlier_expiry(identity_expiry: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
	identity_expiry.min(now + DEFAULT_REGISTRY_TOKEN_LIFETIME)
}
