//! Reqwest-backed registry exchange client (`POST /oauth2/exchange`).

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	http::{ReqwestHttpClient, response_metadata},
	registry::{
		ExchangeFuture, ExchangeRequest, ExchangeResponse, RegistryAuthClient,
		RegistryClientFactory, RegistryClientOptions,
	},
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Failures raised by the reqwest registry client and its factory.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// The registry server URL cannot carry an exchange request.
	#[error("Registry server URL `{url}` must use http or https.")]
	UnsupportedServerUrl {
		/// Offending URL.
		url: String,
	},
	/// The exchange endpoint could not be derived from the server URL.
	#[error("Registry exchange endpoint could not be built.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed from the requested options.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild(#[source] ReqwestError),
	/// Network failure while talking to the registry.
	#[error("Network error occurred while calling the registry exchange endpoint.")]
	Transport(#[source] ReqwestError),
	/// The registry answered with a non-success status.
	#[error("Registry exchange endpoint returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body_preview: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The registry answered with JSON that could not be parsed.
	#[error("Registry exchange endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
}

#[derive(Deserialize)]
struct ExchangePayload {
	#[serde(default)]
	refresh_token: Option<String>,
}

/// [`RegistryClientFactory`] producing [`ReqwestRegistryClient`]s.
#[derive(Clone, Debug, Default)]
pub struct ReqwestRegistryClientFactory {
	http_client: Option<ReqwestHttpClient>,
}
impl ReqwestRegistryClientFactory {
	/// Reuses `http_client` for every client whose options are left at their defaults.
	pub fn with_http_client(http_client: ReqwestHttpClient) -> Self {
		Self { http_client: Some(http_client) }
	}

	/// Builds a typed client for `server_url`.
	pub fn build(
		&self,
		server_url: &Url,
		options: &RegistryClientOptions,
	) -> Result<ReqwestRegistryClient, ExchangeError> {
		if !matches!(server_url.scheme(), "http" | "https") {
			return Err(ExchangeError::UnsupportedServerUrl { url: server_url.to_string() });
		}

		let http_client = match &self.http_client {
			Some(shared) if *options == RegistryClientOptions::default() => shared.clone(),
			_ => ReqwestHttpClient::configured(options.timeout, options.user_agent.as_deref())
				.map_err(ExchangeError::HttpClientBuild)?,
		};

		Ok(ReqwestRegistryClient { server_url: server_url.clone(), http_client })
	}
}
impl RegistryClientFactory for ReqwestRegistryClientFactory {
	fn new_client(
		&self,
		server_url: &Url,
		options: &RegistryClientOptions,
	) -> Result<Box<dyn RegistryAuthClient>, BoxError> {
		Ok(Box::new(self.build(server_url, options)?))
	}
}

/// Registry client speaking the refresh-token exchange over reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestRegistryClient {
	server_url: Url,
	http_client: ReqwestHttpClient,
}
impl ReqwestRegistryClient {
	/// Exchange endpoint under the registry server URL.
	pub fn exchange_endpoint(&self) -> Result<Url, ExchangeError> {
		let mut base = self.server_url.clone();

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		base.join("oauth2/exchange").map_err(|source| ExchangeError::InvalidEndpoint { source })
	}

	/// Performs the exchange, returning the typed failure.
	pub async fn exchange_token(
		&self,
		request: ExchangeRequest<'_>,
	) -> Result<ExchangeResponse, ExchangeError> {
		let endpoint = self.exchange_endpoint()?;
		let mut form = vec![("grant_type", request.grant_type), ("service", request.service)];

		if let Some(tenant) = request.tenant {
			form.push(("tenant", tenant));
		}

		form.push(("access_token", request.access_token.expose()));

		let response = self
			.http_client
			.post(endpoint)
			.form(&form)
			.send()
			.await
			.map_err(ExchangeError::Transport)?;
		let status = response.status().as_u16();
		let meta = response_metadata(status, response.headers());
		let body = response.bytes().await.map_err(ExchangeError::Transport)?;

		if !(200..300).contains(&status) {
			return Err(ExchangeError::Status {
				status,
				body_preview: truncate_preview(&body),
				retry_after: meta.retry_after,
			});
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&body);
		let payload: ExchangePayload = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ExchangeError::Parse { source, status })?;

		Ok(ExchangeResponse { refresh_token: payload.refresh_token.map(TokenSecret::new) })
	}
}
impl RegistryAuthClient for ReqwestRegistryClient {
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a> {
		Box::pin(async move { self.exchange_token(request).await.map_err(BoxError::from) })
	}
}

fn truncate_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut buf: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();

	buf.push('…');

	buf
}
