//! Registry host resolution for artifact references.
//!
//! References are parsed with [`oci_client::Reference`], which applies the distribution grammar
//! (lowercase repository paths, tag and digest formats, name length, numeric ports). The
//! registry must be written out: a reference such as `app:v1` that would fall back to the
//! public default registry is rejected, so identity tokens only reach hosts named explicitly.

// crates.io
use oci_client::Reference;
// self
use crate::_prelude::*;

/// Resolves the registry host an artifact reference points at.
pub trait HostResolver
where
	Self: Send + Sync,
{
	/// Returns the registry host (with port, if any) for `reference`.
	fn resolve_host(&self, reference: &str) -> Result<String, ReferenceError>;
}
impl<F> HostResolver for F
where
	F: Send + Sync + Fn(&str) -> Result<String, ReferenceError>,
{
	fn resolve_host(&self, reference: &str) -> Result<String, ReferenceError> {
		self(reference)
	}
}

/// Default [`HostResolver`] backed by [`oci_client::Reference`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceHostResolver;
impl HostResolver for ReferenceHostResolver {
	fn resolve_host(&self, reference: &str) -> Result<String, ReferenceError> {
		if reference.is_empty() {
			return Err(ReferenceError::Empty);
		}

		let Some(host) = registry_component(reference) else {
			return Err(ReferenceError::ImplicitRegistry { reference: reference.to_owned() });
		};

		Reference::try_from(reference).map_err(|e| ReferenceError::Malformed {
			reference: reference.to_owned(),
			source: Box::new(e),
		})?;

		// The exchange endpoint is `https://{host}`; hosts that cannot form one fail here.
		if Url::parse(&format!("https://{host}")).is_err() {
			return Err(ReferenceError::InvalidRegistry { host: host.to_owned() });
		}

		Ok(host.to_owned())
	}
}

/// Error returned when an artifact reference does not name a usable registry.
#[derive(Debug, ThisError)]
pub enum ReferenceError {
	/// The reference was empty.
	#[error("Artifact reference cannot be empty.")]
	Empty,
	/// The reference omits its registry host.
	#[error("Artifact reference `{reference}` does not name a registry.")]
	ImplicitRegistry {
		/// Offending reference.
		reference: String,
	},
	/// The reference violates the distribution reference grammar.
	#[error("Artifact reference `{reference}` is malformed.")]
	Malformed {
		/// Offending reference.
		reference: String,
		/// Parser failure.
		#[source]
		source: BoxError,
	},
	/// The registry component is not a valid host.
	#[error("Registry host `{host}` is invalid.")]
	InvalidRegistry {
		/// Offending host component.
		host: String,
	},
}

// Same rule the distribution parser uses to tell a host from a repository path component.
fn registry_component(reference: &str) -> Option<&str> {
	let (first, _) = reference.split_once('/')?;

	(first.contains('.') || first.contains(':') || first == "localhost").then_some(first)
}
