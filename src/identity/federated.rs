//! Reqwest-backed identity token source using federated client assertions.

// std
use std::path::{Path, PathBuf};
// crates.io
use oauth2::{
	AuthType, ClientId, EndpointNotSet, EndpointSet, HttpClientError, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::IdentityToken,
	clock::{Clock, SystemClock},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	identity::{IdentityTokenFuture, IdentityTokenRequest, IdentityTokenSource},
};

/// Assertion type announcing a JWT bearer client assertion.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

type TokenEndpointClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Failures raised while acquiring an identity token with a federated assertion.
#[derive(Debug, ThisError)]
pub enum IdentityError {
	/// The projected federated token could not be read.
	#[error("Failed to read the federated token file `{}`.", path.display())]
	TokenFile {
		/// Path taken from the workload environment.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The projected federated token file exists but holds no token.
	#[error("Federated token file `{}` is empty.", path.display())]
	EmptyTokenFile {
		/// Path taken from the workload environment.
		path: PathBuf,
	},
	/// The token endpoint URL could not be derived from the authority host.
	#[error("Token endpoint URL could not be built.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The identity provider answered with an OAuth error.
	#[error("Identity provider rejected the token request: {error}.")]
	Rejected {
		/// OAuth `error` code.
		error: String,
		/// OAuth `error_description`, when supplied.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The request never produced a usable HTTP response.
	#[error("Network error occurred while calling the identity provider.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The identity provider responded with JSON that could not be parsed.
	#[error("Identity provider returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The identity provider responded in an unexpected way.
	#[error("Identity provider returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The token response omitted `expires_in`.
	#[error("Identity token response is missing expires_in.")]
	MissingExpiresIn,
	/// The token response carried an `expires_in` beyond the supported range.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// The token response carried a zero `expires_in`.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}

/// [`IdentityTokenSource`] that trades the projected federated token for an access token.
///
/// The token file is re-read on every request because the platform rotates it in place.
#[derive(Clone)]
pub struct FederatedTokenSource {
	token_file: PathBuf,
	authority_host: Url,
	http_client: ReqwestHttpClient,
	clock: Arc<dyn Clock>,
}
impl FederatedTokenSource {
	/// Creates a source reading assertions from `token_file` and calling `authority_host`.
	pub fn new(token_file: impl Into<PathBuf>, authority_host: Url) -> Self {
		Self {
			token_file: token_file.into(),
			authority_host,
			http_client: ReqwestHttpClient::default(),
			clock: Arc::new(SystemClock),
		}
	}

	/// Replaces the HTTP client used for token requests.
	pub fn with_http_client(mut self, http_client: ReqwestHttpClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Replaces the clock used to turn `expires_in` into an absolute expiry.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Path of the federated token file.
	pub fn token_file(&self) -> &Path {
		&self.token_file
	}

	/// Token endpoint for `tenant_id` under the configured authority host.
	pub fn token_endpoint(&self, tenant_id: &str) -> Result<Url, IdentityError> {
		let mut base = self.authority_host.clone();

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		base.join(&format!("{tenant_id}/oauth2/v2.0/token"))
			.map_err(|source| IdentityError::InvalidEndpoint { source })
	}

	/// Requests an access token, returning the typed failure.
	pub async fn request_token(
		&self,
		request: IdentityTokenRequest<'_>,
	) -> Result<IdentityToken, IdentityError> {
		let assertion = self.read_assertion()?;
		let token_url = TokenUrl::from_url(self.token_endpoint(request.tenant_id)?);
		let client: TokenEndpointClient =
			BasicClient::new(ClientId::new(request.client_id.to_owned()))
				.set_token_uri(token_url)
				.set_auth_type(AuthType::RequestBody);
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let response = client
			.exchange_client_credentials()
			.add_scope(Scope::new(request.resource.to_owned()))
			.add_extra_param("client_assertion_type", CLIENT_ASSERTION_TYPE)
			.add_extra_param("client_assertion", assertion)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;
		let expires_in = response.expires_in().ok_or(IdentityError::MissingExpiresIn)?;
		let expires_in =
			Duration::try_from(expires_in).map_err(|_| IdentityError::ExpiresInOutOfRange)?;

		if !expires_in.is_positive() {
			return Err(IdentityError::NonPositiveExpiresIn);
		}

		Ok(IdentityToken::new(
			response.access_token().secret().to_owned(),
			self.clock.now() + expires_in,
		))
	}

	fn read_assertion(&self) -> Result<String, IdentityError> {
		let raw = std::fs::read_to_string(&self.token_file).map_err(|source| {
			IdentityError::TokenFile { path: self.token_file.clone(), source }
		})?;
		let assertion = raw.trim();

		if assertion.is_empty() {
			return Err(IdentityError::EmptyTokenFile { path: self.token_file.clone() });
		}

		Ok(assertion.to_owned())
	}
}
impl IdentityTokenSource for FederatedTokenSource {
	fn access_token<'a>(&'a self, request: IdentityTokenRequest<'a>) -> IdentityTokenFuture<'a> {
		Box::pin(async move { self.request_token(request).await.map_err(BoxError::from) })
	}
}
impl Debug for FederatedTokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FederatedTokenSource")
			.field("token_file", &self.token_file)
			.field("authority_host", &self.authority_host.as_str())
			.finish()
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> IdentityError {
	let status = meta.as_ref().and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => IdentityError::Rejected {
			error: response.error().as_ref().to_string(),
			description: response.error_description().cloned(),
			status,
		},
		RequestTokenError::Request(error) => IdentityError::Transport { source: Box::new(error) },
		RequestTokenError::Parse(source, _body) => IdentityError::Parse { source, status },
		RequestTokenError::Other(message) => IdentityError::Unexpected {
			message,
			status,
			retry_after: meta.and_then(|value| value.retry_after),
		},
	}
}
