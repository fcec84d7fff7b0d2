//! Construction-time configuration: the declarative provider map plus the workload
//! environment, validated before any network call is made.
//!
//! Validation gates run in a fixed order and stop at the first failure:
//!
//! 1. `AZURE_TENANT_ID` must be non-empty.
//! 2. A client ID must come from the `clientID` config key or `AZURE_CLIENT_ID`.
//! 3. `AZURE_FEDERATED_TOKEN_FILE` and `AZURE_AUTHORITY_HOST` must both be non-empty.
//!
//! Every gate failure is an [`Error::ConfigDenied`] whose detail string is stable.

pub mod env;

pub use env::*;

// std
use std::path::PathBuf;
// self
use crate::{_prelude::*, error::ConfigError};

/// Discriminator selecting the workload-identity provider.
pub const PROVIDER_NAME: &str = "azureWorkloadIdentity";
/// Directory (tenant) of the workload identity.
pub const AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
/// Client ID of the workload identity, used when the config omits `clientID`.
pub const AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
/// Path of the projected federated token.
pub const AZURE_FEDERATED_TOKEN_FILE: &str = "AZURE_FEDERATED_TOKEN_FILE";
/// Base URL of the identity provider.
pub const AZURE_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";

/// Declarative provider configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProviderConfig {
	/// Provider discriminator; must equal [`PROVIDER_NAME`].
	pub name: String,
	/// Explicit client ID overriding `AZURE_CLIENT_ID`.
	#[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
	pub client_id: Option<String>,
}
impl AuthProviderConfig {
	/// Deserializes a generic key-value map, reporting the path of any malformed field.
	pub fn from_value(value: serde_json::Value) -> Result<Self> {
		serde_path_to_error::deserialize(value)
			.map_err(|source| ConfigError::InvalidConfig { source }.into())
	}

	/// Rejects configurations that select another provider kind.
	pub fn ensure_supported(&self) -> Result<()> {
		if self.name == PROVIDER_NAME {
			Ok(())
		} else {
			Err(ConfigError::UnsupportedProvider { name: self.name.clone() }.into())
		}
	}
}

/// Validated settings a workload-identity provider is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSettings {
	/// Directory (tenant) of the workload identity.
	pub tenant_id: String,
	/// Client ID of the workload identity.
	pub client_id: String,
	/// Path of the projected federated token.
	pub federated_token_file: PathBuf,
	/// Base URL of the identity provider.
	pub authority_host: Url,
}
impl ProviderSettings {
	/// Validates `config` against `env`, returning the first failing gate.
	pub fn resolve(config: &AuthProviderConfig, env: &impl EnvSource) -> Result<Self> {
		config.ensure_supported()?;

		let tenant_id = env.var_or_empty(AZURE_TENANT_ID);

		if tenant_id.is_empty() {
			return Err(Error::denied("azure tenant id environment variable is empty"));
		}

		let client_id = match config.client_id.as_deref().filter(|id| !id.is_empty()) {
			Some(id) => id.to_owned(),
			None => env.var_or_empty(AZURE_CLIENT_ID),
		};

		if client_id.is_empty() {
			return Err(Error::denied(format!(
				"no client ID provided and {AZURE_CLIENT_ID} environment variable is empty"
			)));
		}

		let token_file = env.var_or_empty(AZURE_FEDERATED_TOKEN_FILE);
		let authority_host = env.var_or_empty(AZURE_AUTHORITY_HOST);
		let missing = [(AZURE_FEDERATED_TOKEN_FILE, &token_file), (AZURE_AUTHORITY_HOST, &authority_host)]
			.into_iter()
			.filter(|(_, value)| value.is_empty())
			.map(|(name, value)| format!("{name}: {value}"))
			.collect::<Vec<_>>();

		if !missing.is_empty() {
			return Err(Error::denied(format!(
				"required environment variables not set, {}",
				missing.join(", ")
			)));
		}

		let authority_host = Url::parse(&authority_host).map_err(|source| {
			ConfigError::InvalidAuthorityHost { value: authority_host.clone(), source }
		})?;

		Ok(Self {
			tenant_id,
			client_id,
			federated_token_file: PathBuf::from(token_file),
			authority_host,
		})
	}

	/// Deserializes `config` and validates it against `env`.
	pub fn from_config(config: serde_json::Value, env: &impl EnvSource) -> Result<Self> {
		Self::resolve(&AuthProviderConfig::from_value(config)?, env)
	}
}
