//! Registry authentication clients that exchange identity tokens for registry refresh tokens.
//!
//! The provider never builds a registry client inline; it asks an injected
//! [`RegistryClientFactory`] for one per call so tests can swap the network-bound client out.

#[cfg(feature = "reqwest")] pub mod client;

#[cfg(feature = "reqwest")] pub use client::*;

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Grant type selecting the identity-token-to-refresh-token exchange.
pub const GRANT_TYPE_ACCESS_TOKEN: &str = "access_token";

/// Boxed future returned by [`RegistryAuthClient::exchange`].
pub type ExchangeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ExchangeResponse, BoxError>> + 'a + Send>>;

/// Client-side knobs forwarded to [`RegistryClientFactory::new_client`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryClientOptions {
	/// Per-request timeout; `None` leaves the transport default in place.
	pub timeout: Option<std::time::Duration>,
	/// User agent announced to the registry.
	pub user_agent: Option<String>,
}
impl RegistryClientOptions {
	/// Sets the per-request timeout.
	pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the user agent.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}
}

/// Parameters of one exchange call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExchangeRequest<'a> {
	/// OAuth grant type; always [`GRANT_TYPE_ACCESS_TOKEN`] for this flow.
	pub grant_type: &'a str,
	/// Registry host the refresh token is scoped to.
	pub service: &'a str,
	/// Tenant that issued the identity token.
	pub tenant: Option<&'a str>,
	/// Identity-provider access token being exchanged.
	pub access_token: &'a TokenSecret,
}

/// Registry answer to an exchange call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeResponse {
	/// Refresh token issued by the registry, when present.
	pub refresh_token: Option<TokenSecret>,
}

/// Authentication client bound to a single registry server.
pub trait RegistryAuthClient
where
	Self: Send + Sync,
{
	/// Exchanges an identity access token for a registry refresh token.
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a>;
}

/// Constructs [`RegistryAuthClient`]s for registry servers.
pub trait RegistryClientFactory
where
	Self: Send + Sync,
{
	/// Builds a client for `server_url`.
	fn new_client(
		&self,
		server_url: &Url,
		options: &RegistryClientOptions,
	) -> Result<Box<dyn RegistryAuthClient>, BoxError>;
}
impl<F> RegistryClientFactory for F
where
	F: Send
		+ Sync
		+ Fn(&Url, &RegistryClientOptions) -> Result<Box<dyn RegistryAuthClient>, BoxError>,
{
	fn new_client(
		&self,
		server_url: &Url,
		options: &RegistryClientOptions,
	) -> Result<Box<dyn RegistryAuthClient>, BoxError> {
		self(server_url, options)
	}
}
