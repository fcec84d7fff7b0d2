//! Provider-level error types shared across configuration, identity, and registry steps.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Type-erased error crossing collaborator seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Each `provide` step wraps its failure in its own variant, so callers can tell which hop
/// failed without string matching.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Construction-time validation rejected the configuration or environment.
	#[error("Authentication denied: {detail}.")]
	ConfigDenied {
		/// Human-readable detail; matched literally by callers.
		detail: String,
	},
	/// Local configuration could not be interpreted.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The artifact reference does not name a registry host.
	#[error("Failed to resolve the registry host.")]
	HostResolution(
		#[from]
		#[source]
		crate::reference::ReferenceError,
	),
	/// The identity provider did not issue a new access token.
	#[error("Failed to refresh the identity access token.")]
	IdentityTokenRefresh {
		/// Failure reported by the identity token source.
		#[source]
		source: BoxError,
	},
	/// The registry authentication client could not be constructed.
	#[error("Failed to construct the registry authentication client.")]
	ClientConstruction {
		/// Failure reported by the client factory.
		#[source]
		source: BoxError,
	},
	/// The registry rejected or failed the token exchange.
	#[error("Failed to exchange the identity token for a registry refresh token.")]
	RegistryExchange {
		/// Failure reported by the registry client.
		#[source]
		source: BoxError,
	},
	/// The registry answered the exchange without a refresh token.
	#[error("Registry `{host}` returned no refresh token.")]
	MissingRefreshToken {
		/// Registry host that produced the malformed response.
		host: String,
	},
}
impl Error {
	/// Builds a [`Error::ConfigDenied`] carrying the provided detail.
	pub fn denied(detail: impl Into<String>) -> Self {
		Self::ConfigDenied { detail: detail.into() }
	}

	/// Returns the denial detail when this is a [`Error::ConfigDenied`].
	pub fn denied_detail(&self) -> Option<&str> {
		match self {
			Self::ConfigDenied { detail } => Some(detail),
			_ => None,
		}
	}
}

/// Configuration failures that are not access denials.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The configuration map does not deserialize into the expected shape.
	#[error("Auth provider configuration is malformed.")]
	InvalidConfig {
		/// Structured deserialization failure with the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The configuration names a provider this crate does not implement.
	#[error("Auth provider `{name}` is not supported.")]
	UnsupportedProvider {
		/// Provider discriminator found in the configuration.
		name: String,
	},
	/// The authority host environment variable is not a valid URL.
	#[error("Authority host `{value}` is not a valid URL.")]
	InvalidAuthorityHost {
		/// Raw environment value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
