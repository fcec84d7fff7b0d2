//! Credential provider turning a federated workload identity into registry credentials.
//!
//! [`WorkloadIdentityProvider::provide`] runs a fixed sequence for every call:
//!
//! 1. resolve the registry host of the artifact reference;
//! 2. reuse the cached identity token, or refresh it when stale;
//! 3. build a registry client for `https://{host}`;
//! 4. exchange the identity token for a registry refresh token (`grant_type=access_token`);
//! 5. reject responses without a refresh token;
//! 6. report the latency of steps 3-4 to the [`MetricsSink`];
//! 7. return a [`RegistryCredential`] whose expiry is the earlier of both tokens.
//!
//! Each step fails fast with its own [`Error`] variant and nothing is retried. Only the identity
//! token is cached; the registry credential is derived anew on every call. Concurrent stale
//! callers share a single refresh through the cache's guard.

pub mod cache;
mod metrics;

pub use cache::IdentityTokenCache;
pub use metrics::ProviderMetrics;

// std
use std::time::Instant;
// self
#[cfg(feature = "reqwest")]
use crate::{
	config::{EnvSource, ProviderSettings},
	identity::FederatedTokenSource,
	registry::ReqwestRegistryClientFactory,
};
use crate::{
	_prelude::*,
	auth::{self, IdentityToken, RegistryCredential},
	clock::{Clock, SystemClock},
	identity::{IdentityTokenRequest, IdentityTokenSource, REGISTRY_RESOURCE},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, GlobalMetricsSink, MetricsSink},
	reference::{HostResolver, ReferenceHostResolver},
	registry::{
		ExchangeRequest, GRANT_TYPE_ACCESS_TOKEN, RegistryClientFactory, RegistryClientOptions,
	},
};

/// Registry credential provider backed by a federated workload identity.
pub struct WorkloadIdentityProvider {
	tenant_id: String,
	client_id: String,
	cache: IdentityTokenCache,
	host_resolver: Arc<dyn HostResolver>,
	identity_source: Arc<dyn IdentityTokenSource>,
	client_factory: Arc<dyn RegistryClientFactory>,
	metrics_sink: Arc<dyn MetricsSink>,
	clock: Arc<dyn Clock>,
	client_options: RegistryClientOptions,
	refresh_margin: Duration,
	/// Counters for this provider instance.
	pub metrics: Arc<ProviderMetrics>,
}
impl WorkloadIdentityProvider {
	/// Window before expiry in which a cached identity token is already refreshed.
	pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::minutes(5);

	/// Creates a provider around the two network-bound collaborators.
	///
	/// Host resolution defaults to [`ReferenceHostResolver`], latency reports to
	/// [`GlobalMetricsSink`], and time to [`SystemClock`]. The identity token cache starts empty.
	pub fn with_collaborators(
		tenant_id: impl Into<String>,
		client_id: impl Into<String>,
		identity_source: Arc<dyn IdentityTokenSource>,
		client_factory: Arc<dyn RegistryClientFactory>,
	) -> Self {
		Self {
			tenant_id: tenant_id.into(),
			client_id: client_id.into(),
			cache: IdentityTokenCache::default(),
			host_resolver: Arc::new(ReferenceHostResolver),
			identity_source,
			client_factory,
			metrics_sink: Arc::new(GlobalMetricsSink),
			clock: Arc::new(SystemClock),
			client_options: RegistryClientOptions::default(),
			refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
			metrics: Default::default(),
		}
	}

	/// Replaces the host resolver.
	pub fn with_host_resolver(mut self, host_resolver: Arc<dyn HostResolver>) -> Self {
		self.host_resolver = host_resolver;

		self
	}

	/// Replaces the sink receiving exchange latency reports.
	pub fn with_metrics_sink(mut self, metrics_sink: Arc<dyn MetricsSink>) -> Self {
		self.metrics_sink = metrics_sink;

		self
	}

	/// Replaces the clock driving staleness and expiry decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Sets the options passed to the registry client factory.
	pub fn with_client_options(mut self, options: RegistryClientOptions) -> Self {
		self.client_options = options;

		self
	}

	/// Overrides the refresh margin (defaults to five minutes; negative values clamp to zero).
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Seeds the identity token cache.
	pub fn with_cached_token(mut self, token: IdentityToken) -> Self {
		self.cache = IdentityTokenCache::new(Some(token));

		self
	}

	/// Builds a production provider from validated settings.
	#[cfg(feature = "reqwest")]
	pub fn from_settings(settings: ProviderSettings) -> Self {
		let clock: Arc<dyn Clock> = Arc::new(SystemClock);
		let identity_source =
			FederatedTokenSource::new(settings.federated_token_file, settings.authority_host)
				.with_clock(Arc::clone(&clock));

		Self::with_collaborators(
			settings.tenant_id,
			settings.client_id,
			Arc::new(identity_source),
			Arc::new(ReqwestRegistryClientFactory::default()),
		)
		.with_clock(clock)
	}

	/// Validates `config` against `env` and builds a production provider.
	///
	/// No network call is made; the identity token is fetched on the first
	/// [`provide`](Self::provide) or [`prime`](Self::prime).
	#[cfg(feature = "reqwest")]
	pub fn from_config(config: serde_json::Value, env: &impl EnvSource) -> Result<Self> {
		ProviderSettings::from_config(config, env).map(Self::from_settings)
	}

	/// Directory (tenant) of the workload identity.
	pub fn tenant_id(&self) -> &str {
		&self.tenant_id
	}

	/// Client ID of the workload identity.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Returns a copy of the cached identity token, if any.
	pub fn cached_token(&self) -> Option<IdentityToken> {
		self.cache.snapshot()
	}

	/// Returns `true` when the tenant ID, client ID, and cached access token are all present.
	pub fn enabled(&self) -> bool {
		!self.tenant_id.is_empty() && !self.client_id.is_empty() && self.cache.has_access_token()
	}

	/// Bounds `identity_expiry` by the registry token window measured from the clock's now.
	pub fn earlier_expiry(&self, identity_expiry: OffsetDateTime) -> OffsetDateTime {
		auth::earlier_expiry(identity_expiry, self.clock.now())
	}

	/// Refreshes the identity token when it is missing or stale.
	pub async fn prime(&self) -> Result<()> {
		self.fresh_identity_token().await.map(|_| ())
	}

	/// Issues a registry credential for the registry `reference` points at.
	pub async fn provide(&self, reference: &str) -> Result<RegistryCredential> {
		const KIND: FlowKind = FlowKind::Provide;

		let span = FlowSpan::new(KIND, "provide");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(self.provide_inner(reference)).await;

		match &result {
			Ok(_) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				self.metrics.record_success();
			},
			Err(_) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.metrics.record_failure();
			},
		}

		result
	}

	async fn provide_inner(&self, reference: &str) -> Result<RegistryCredential> {
		let host = self.host_resolver.resolve_host(reference)?;
		let identity = self.fresh_identity_token().await?;
		let (refresh_token, elapsed) = self.exchange(&host, &identity).await?;
		let Some(refresh_token) = refresh_token else {
			return Err(Error::MissingRefreshToken { host });
		};

		self.metrics_sink.record_exchange_duration(elapsed, &host);
		obs::registry_token_exchanged(&host, elapsed);

		Ok(RegistryCredential::from_refresh_token(
			refresh_token,
			self.earlier_expiry(identity.expires_on),
		))
	}

	async fn exchange(
		&self,
		host: &str,
		identity: &IdentityToken,
	) -> Result<(Option<auth::TokenSecret>, std::time::Duration)> {
		const KIND: FlowKind = FlowKind::RegistryExchange;

		let span = FlowSpan::new(KIND, "exchange");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let server_url = Url::parse(&format!("https://{host}"))
					.map_err(|e| Error::ClientConstruction { source: Box::new(e) })?;
				let started = Instant::now();
				let client = self
					.client_factory
					.new_client(&server_url, &self.client_options)
					.map_err(|source| Error::ClientConstruction { source })?;
				let tenant = Some(self.tenant_id.as_str()).filter(|tenant| !tenant.is_empty());
				let response = client
					.exchange(ExchangeRequest {
						grant_type: GRANT_TYPE_ACCESS_TOKEN,
						service: host,
						tenant,
						access_token: &identity.access_token,
					})
					.await
					.map_err(|source| Error::RegistryExchange { source })?;

				Ok::<_, Error>((response.refresh_token, started.elapsed()))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn fresh_identity_token(&self) -> Result<IdentityToken> {
		if let Some(token) = self.cache.fresh_at(self.clock.now(), self.refresh_margin) {
			self.metrics.record_cache_hit();

			return Ok(token);
		}

		let _singleflight = self.cache.lock_refresh().await;

		// Another caller may have refreshed while this one waited.
		if let Some(token) = self.cache.fresh_at(self.clock.now(), self.refresh_margin) {
			self.metrics.record_cache_hit();

			return Ok(token);
		}

		self.refresh_identity_token().await
	}

	async fn refresh_identity_token(&self) -> Result<IdentityToken> {
		const KIND: FlowKind = FlowKind::IdentityRefresh;

		let span = FlowSpan::new(KIND, "refresh_identity_token");
		let request = IdentityTokenRequest {
			tenant_id: &self.tenant_id,
			client_id: &self.client_id,
			resource: REGISTRY_RESOURCE,
		};

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		match span.instrument(self.identity_source.access_token(request)).await {
			Ok(token) => {
				self.cache.store(token.clone());
				self.metrics.record_identity_refresh();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				obs::identity_token_refreshed(token.expires_on);

				Ok(token)
			},
			Err(source) => {
				self.metrics.record_identity_refresh_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				Err(Error::IdentityTokenRefresh { source })
			},
		}
	}
}
impl Debug for WorkloadIdentityProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WorkloadIdentityProvider")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("cache", &self.cache)
			.field("client_options", &self.client_options)
			.field("refresh_margin", &self.refresh_margin)
			.finish()
	}
}
