//! Registry credentials handed to image clients.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Username the registry expects when the password is a refresh token.
pub const TOKEN_LOGIN_USERNAME: &str = "00000000-0000-0000-0000-000000000000";

/// Username/password pair derived from a registry refresh token.
///
/// A new credential is minted on every `provide` call; `expires_on` is advisory.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredential {
	/// Fixed sentinel identifying token-based login.
	pub username: String,
	/// Registry refresh token.
	pub password: TokenSecret,
	/// Earlier of the identity token expiry and the registry token window.
	pub expires_on: OffsetDateTime,
}
impl RegistryCredential {
	/// Builds a token-login credential around a refresh token.
	pub fn from_refresh_token(refresh_token: TokenSecret, expires_on: OffsetDateTime) -> Self {
		Self { username: TOKEN_LOGIN_USERNAME.into(), password: refresh_token, expires_on }
	}
}
impl Debug for RegistryCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegistryCredential")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("expires_on", &self.expires_on)
			.finish()
	}
}
