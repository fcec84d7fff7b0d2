//! Identity-provider access token acquisition for federated workload identities.
//!
//! [`IdentityTokenSource`] is the seam the provider calls when its cached token goes stale.
//! The reqwest-backed [`FederatedTokenSource`] performs a `client_credentials` grant whose
//! client assertion is the federated token projected into the workload's file system.

#[cfg(feature = "reqwest")] pub mod federated;

#[cfg(feature = "reqwest")] pub use federated::*;

// self
use crate::{_prelude::*, auth::IdentityToken};

/// Resource the identity token must be scoped to for registry exchanges.
pub const REGISTRY_RESOURCE: &str = "https://containerregistry.azure.net/.default";

/// Boxed future returned by [`IdentityTokenSource::access_token`].
pub type IdentityTokenFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IdentityToken, BoxError>> + 'a + Send>>;

/// Parameters of a single identity token acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityTokenRequest<'a> {
	/// Directory (tenant) the workload identity belongs to.
	pub tenant_id: &'a str,
	/// Client identifier of the workload identity.
	pub client_id: &'a str,
	/// Resource (scope) the token is requested for.
	pub resource: &'a str,
}

/// Obtains identity-provider access tokens.
///
/// Implementations must not retry internally and must leave no partial state behind when the
/// returned future is dropped.
pub trait IdentityTokenSource
where
	Self: Send + Sync,
{
	/// Requests a new access token for the provided identity and resource.
	fn access_token<'a>(&'a self, request: IdentityTokenRequest<'a>) -> IdentityTokenFuture<'a>;
}
