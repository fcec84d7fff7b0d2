//! Collaborator doubles shared by the provider integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
use time::{OffsetDateTime, macros};
use url::Url;
// self
use acr_workload_identity::{
	WorkloadIdentityProvider,
	auth::IdentityToken,
	clock::ManualClock,
	error::BoxError,
	identity::{IdentityTokenFuture, IdentityTokenRequest, IdentityTokenSource},
	obs::MetricsSink,
	registry::{
		ExchangeFuture, ExchangeRequest, ExchangeResponse, RegistryAuthClient,
		RegistryClientFactory, RegistryClientOptions,
	},
};

pub const REGISTRY_HOST: &str = "myregistry.azurecr.io";
pub const TENANT_ID: &str = "mockTenantID";
pub const CLIENT_ID: &str = "mockClientID";
pub const REFRESH_TOKEN: &str = "mocked_refresh_token";

pub fn epoch() -> OffsetDateTime {
	macros::datetime!(2025-01-01 00:00 UTC)
}

/// Identity request as seen by [`StubIdentitySource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedIdentityRequest {
	pub tenant_id: String,
	pub client_id: String,
	pub resource: String,
}

/// Identity token source returning a canned outcome and counting calls.
pub struct StubIdentitySource {
	outcome: Result<IdentityToken, String>,
	yield_before_answer: bool,
	calls: AtomicUsize,
	requests: Mutex<Vec<RecordedIdentityRequest>>,
}
impl StubIdentitySource {
	pub fn issuing(token: IdentityToken) -> Self {
		Self {
			outcome: Ok(token),
			yield_before_answer: false,
			calls: AtomicUsize::new(0),
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn failing(message: &str) -> Self {
		Self { outcome: Err(message.to_owned()), ..Self::issuing(IdentityToken::new("", epoch())) }
	}

	/// Suspends once before answering so concurrent callers get a chance to interleave.
	pub fn yielding(mut self) -> Self {
		self.yield_before_answer = true;

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn requests(&self) -> Vec<RecordedIdentityRequest> {
		self.requests.lock().clone()
	}
}
impl IdentityTokenSource for StubIdentitySource {
	fn access_token<'a>(&'a self, request: IdentityTokenRequest<'a>) -> IdentityTokenFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.requests.lock().push(RecordedIdentityRequest {
			tenant_id: request.tenant_id.to_owned(),
			client_id: request.client_id.to_owned(),
			resource: request.resource.to_owned(),
		});

		Box::pin(async move {
			if self.yield_before_answer {
				tokio::task::yield_now().await;
			}

			match &self.outcome {
				Ok(token) => Ok(token.clone()),
				Err(message) => Err(BoxError::from(message.clone())),
			}
		})
	}
}

/// How [`StubRegistry`] answers.
#[derive(Clone, Debug)]
pub enum RegistryBehavior {
	RefreshToken(Option<String>),
	FailBuild(String),
	FailExchange(String),
}

/// Exchange call as seen by [`StubRegistry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedExchange {
	pub server_url: String,
	pub grant_type: String,
	pub service: String,
	pub tenant: Option<String>,
	pub access_token: String,
}

struct RegistryState {
	behavior: RegistryBehavior,
	builds: Mutex<Vec<String>>,
	exchanges: Mutex<Vec<RecordedExchange>>,
}

/// Registry client factory whose clients record every exchange.
#[derive(Clone)]
pub struct StubRegistry(Arc<RegistryState>);
impl StubRegistry {
	pub fn new(behavior: RegistryBehavior) -> Self {
		Self(Arc::new(RegistryState {
			behavior,
			builds: Mutex::new(Vec::new()),
			exchanges: Mutex::new(Vec::new()),
		}))
	}

	pub fn issuing(refresh_token: &str) -> Self {
		Self::new(RegistryBehavior::RefreshToken(Some(refresh_token.to_owned())))
	}

	pub fn builds(&self) -> Vec<String> {
		self.0.builds.lock().clone()
	}

	pub fn exchanges(&self) -> Vec<RecordedExchange> {
		self.0.exchanges.lock().clone()
	}
}
impl RegistryClientFactory for StubRegistry {
	fn new_client(
		&self,
		server_url: &Url,
		_: &RegistryClientOptions,
	) -> Result<Box<dyn RegistryAuthClient>, BoxError> {
		self.0.builds.lock().push(server_url.to_string());

		if let RegistryBehavior::FailBuild(message) = &self.0.behavior {
			return Err(message.clone().into());
		}

		Ok(Box::new(StubRegistryClient {
			server_url: server_url.to_string(),
			state: Arc::clone(&self.0),
		}))
	}
}

struct StubRegistryClient {
	server_url: String,
	state: Arc<RegistryState>,
}
impl RegistryAuthClient for StubRegistryClient {
	fn exchange<'a>(&'a self, request: ExchangeRequest<'a>) -> ExchangeFuture<'a> {
		self.state.exchanges.lock().push(RecordedExchange {
			server_url: self.server_url.clone(),
			grant_type: request.grant_type.to_owned(),
			service: request.service.to_owned(),
			tenant: request.tenant.map(str::to_owned),
			access_token: request.access_token.expose().to_owned(),
		});

		let outcome = match &self.state.behavior {
			RegistryBehavior::RefreshToken(token) => Ok(ExchangeResponse {
				refresh_token: token.clone().map(acr_workload_identity::auth::TokenSecret::new),
			}),
			RegistryBehavior::FailExchange(message) => Err(BoxError::from(message.clone())),
			RegistryBehavior::FailBuild(_) => Err(BoxError::from("client should not exist")),
		};

		Box::pin(async move { outcome })
	}
}

/// Metrics sink remembering the registry host of every report.
#[derive(Default)]
pub struct RecordingMetricsSink {
	hosts: Mutex<Vec<String>>,
}
impl RecordingMetricsSink {
	pub fn hosts(&self) -> Vec<String> {
		self.hosts.lock().clone()
	}
}
impl MetricsSink for RecordingMetricsSink {
	fn record_exchange_duration(&self, _: std::time::Duration, registry_host: &str) {
		self.hosts.lock().push(registry_host.to_owned());
	}
}

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by `httpmock`.
#[cfg(feature = "reqwest")]
pub fn test_reqwest_http_client() -> acr_workload_identity::http::ReqwestHttpClient {
	let client = acr_workload_identity::reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(acr_workload_identity::reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	acr_workload_identity::http::ReqwestHttpClient::with_client(client)
}

/// Provider wired to the doubles and a manual clock.
pub fn build_provider(
	identity: &Arc<StubIdentitySource>,
	registry: &StubRegistry,
	sink: &Arc<RecordingMetricsSink>,
	clock: &Arc<ManualClock>,
) -> WorkloadIdentityProvider {
	WorkloadIdentityProvider::with_collaborators(
		TENANT_ID,
		CLIENT_ID,
		identity.clone(),
		Arc::new(registry.clone()),
	)
	.with_metrics_sink(sink.clone())
	.with_clock(clock.clone())
}
