//! Environment access abstracted so validation can run against fixtures.

// self
use crate::_prelude::*;

/// Read-only view of environment variables.
pub trait EnvSource {
	/// Returns the value of `key`, or `None` when unset or not valid Unicode.
	fn var(&self, key: &str) -> Option<String>;

	/// Returns the value of `key`, treating unset variables as empty.
	fn var_or_empty(&self, key: &str) -> String {
		self.var(key).unwrap_or_default()
	}
}

/// [`EnvSource`] reading the current process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;
impl EnvSource for ProcessEnv {
	fn var(&self, key: &str) -> Option<String> {
		std::env::var(key).ok()
	}
}

impl EnvSource for HashMap<String, String> {
	fn var(&self, key: &str) -> Option<String> {
		self.get(key).cloned()
	}
}

impl EnvSource for BTreeMap<String, String> {
	fn var(&self, key: &str) -> Option<String> {
		self.get(key).cloned()
	}
}

impl<const N: usize> EnvSource for [(&str, &str); N] {
	fn var(&self, key: &str) -> Option<String> {
		self.iter().find(|(name, _)| *name == key).map(|(_, value)| (*value).to_owned())
	}
}
