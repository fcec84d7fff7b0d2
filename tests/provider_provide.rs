mod common;

// std
use std::sync::Arc;
// crates.io
use time::Duration;
// self
use acr_workload_identity::{
	WorkloadIdentityProvider,
	auth::{DEFAULT_REGISTRY_TOKEN_LIFETIME, IdentityToken, TOKEN_LOGIN_USERNAME},
	clock::ManualClock,
	error::Error,
	identity::REGISTRY_RESOURCE,
	reference::ReferenceError,
};
use common::*;

const REFERENCE: &str = "myregistry.azurecr.io/app:v1";

struct Harness {
	identity: Arc<StubIdentitySource>,
	registry: StubRegistry,
	sink: Arc<RecordingMetricsSink>,
	clock: Arc<ManualClock>,
	provider: WorkloadIdentityProvider,
}
impl Harness {
	fn new(identity: StubIdentitySource, registry: StubRegistry) -> Self {
		let identity = Arc::new(identity);
		let sink = Arc::new(RecordingMetricsSink::default());
		let clock = Arc::new(ManualClock::new(epoch()));
		let provider = build_provider(&identity, &registry, &sink, &clock);

		Self { identity, registry, sink, clock, provider }
	}

	fn with_cached(mut self, token: IdentityToken) -> Self {
		self.provider = self.provider.with_cached_token(token);

		self
	}
}

fn fresh_identity() -> StubIdentitySource {
	StubIdentitySource::issuing(IdentityToken::new("newAccessToken", epoch() + Duration::hours(1)))
}

#[tokio::test]
async fn fresh_cached_token_skips_the_identity_provider() {
	let harness = Harness::new(fresh_identity(), StubRegistry::issuing(REFRESH_TOKEN))
		.with_cached(IdentityToken::new("mockToken", epoch() + Duration::hours(1)));
	let credential =
		harness.provider.provide(REFERENCE).await.expect("Provide should succeed on a warm cache.");

	assert_eq!(credential.username, TOKEN_LOGIN_USERNAME);
	assert_eq!(credential.password.expose(), REFRESH_TOKEN);
	assert_eq!(credential.expires_on, epoch() + Duration::hours(1));
	assert_eq!(harness.identity.calls(), 0);
	assert_eq!(harness.provider.metrics.cache_hits(), 1);
	assert_eq!(harness.registry.builds(), vec!["https://myregistry.azurecr.io/".to_owned()]);
	assert_eq!(harness.registry.exchanges(), vec![RecordedExchange {
		server_url: "https://myregistry.azurecr.io/".into(),
		grant_type: "access_token".into(),
		service: REGISTRY_HOST.into(),
		tenant: Some(TENANT_ID.into()),
		access_token: "mockToken".into(),
	}]);
	assert_eq!(harness.sink.hosts(), vec![REGISTRY_HOST.to_owned()]);
}

#[tokio::test]
async fn expired_token_is_refreshed_once_and_cached() {
	let identity =
		StubIdentitySource::issuing(IdentityToken::new("newAccessToken", epoch() + Duration::hours(12)));
	let harness = Harness::new(identity, StubRegistry::issuing(REFRESH_TOKEN))
		.with_cached(IdentityToken::new("mockToken", epoch()));
	let credential =
		harness.provider.provide(REFERENCE).await.expect("Provide should refresh a stale token.");

	assert_eq!(harness.identity.calls(), 1);
	assert_eq!(harness.identity.requests()[0], RecordedIdentityRequest {
		tenant_id: TENANT_ID.into(),
		client_id: CLIENT_ID.into(),
		resource: REGISTRY_RESOURCE.into(),
	});
	assert_eq!(harness.registry.exchanges()[0].access_token, "newAccessToken");
	assert_eq!(credential.expires_on, epoch() + DEFAULT_REGISTRY_TOKEN_LIFETIME);
	assert_eq!(
		harness.provider.cached_token().map(|token| token.expires_on),
		Some(epoch() + Duration::hours(12))
	);

	harness.provider.provide(REFERENCE).await.expect("Second provide should reuse the cache.");

	assert_eq!(harness.identity.calls(), 1);
	assert_eq!(harness.provider.metrics.identity_refreshes(), 1);
}

#[tokio::test]
async fn refresh_margin_triggers_an_early_refresh() {
	let harness = Harness::new(fresh_identity(), StubRegistry::issuing(REFRESH_TOKEN))
		.with_cached(IdentityToken::new("mockToken", epoch() + Duration::hours(1)));

	harness.provider.provide(REFERENCE).await.expect("Warm provide should succeed.");
	assert_eq!(harness.identity.calls(), 0);

	harness.clock.advance(Duration::minutes(56));
	harness.provider.provide(REFERENCE).await.expect("Provide inside the margin should succeed.");

	assert_eq!(harness.identity.calls(), 1);
}

#[tokio::test]
async fn zero_margin_refreshes_only_at_expiry() {
	let mut harness = Harness::new(fresh_identity(), StubRegistry::issuing(REFRESH_TOKEN))
		.with_cached(IdentityToken::new("mockToken", epoch() + Duration::minutes(1)));

	harness.provider = harness.provider.with_refresh_margin(Duration::ZERO);
	harness.provider.provide(REFERENCE).await.expect("Provide before expiry should succeed.");

	assert_eq!(harness.identity.calls(), 0);

	harness.clock.advance(Duration::minutes(1));
	harness.provider.provide(REFERENCE).await.expect("Provide at expiry should refresh.");

	assert_eq!(harness.identity.calls(), 1);
}

#[tokio::test]
async fn empty_refresh_token_is_still_a_credential() {
	let registry = StubRegistry::new(RegistryBehavior::RefreshToken(Some(String::new())));
	let harness =
		Harness::new(fresh_identity(), registry).with_cached(IdentityToken::new("mockToken", epoch()));
	let credential = harness
		.provider
		.provide(REFERENCE)
		.await
		.expect("An empty refresh token should be accepted.");

	assert_eq!(credential.password.expose(), "");
	assert_eq!(harness.identity.calls(), 1);
	assert_eq!(harness.sink.hosts(), vec![REGISTRY_HOST.to_owned()]);
}

#[tokio::test]
async fn missing_refresh_token_fails_without_reporting_latency() {
	let registry = StubRegistry::new(RegistryBehavior::RefreshToken(None));
	let harness = Harness::new(fresh_identity(), registry);
	let err = harness
		.provider
		.provide(REFERENCE)
		.await
		.expect_err("A response without a refresh token should fail.");

	assert!(matches!(err, Error::MissingRefreshToken { ref host } if host == REGISTRY_HOST));
	assert_eq!(harness.registry.exchanges().len(), 1);
	assert!(harness.sink.hosts().is_empty());
	assert_eq!(harness.provider.metrics.failures(), 1);
}

#[tokio::test]
async fn host_resolution_failure_stops_before_any_network_call() {
	let harness = Harness::new(fresh_identity(), StubRegistry::issuing(REFRESH_TOKEN));
	let err = harness.provider.provide("").await.expect_err("An empty reference should fail.");

	assert!(matches!(err, Error::HostResolution(ReferenceError::Empty)));
	assert_eq!(harness.identity.calls(), 0);
	assert!(harness.registry.builds().is_empty());
	assert!(harness.sink.hosts().is_empty());
}

#[tokio::test]
async fn malformed_hosts_fail_before_the_stale_token_is_refreshed() {
	let harness = Harness::new(fresh_identity(), StubRegistry::issuing(REFRESH_TOKEN))
		.with_cached(IdentityToken::new("mockToken", epoch()));

	for reference in ["registry.io:abc/app", "artifact", "team/app:v1"] {
		let err = harness.provider.provide(reference).await.expect_err("Resolution should fail.");

		assert!(matches!(err, Error::HostResolution(_)), "{reference}: {err:?}");
	}

	assert_eq!(harness.identity.calls(), 0);
	assert!(harness.registry.builds().is_empty());
	assert_eq!(
		harness.provider.cached_token().map(|token| token.access_token.expose().to_owned()),
		Some("mockToken".to_owned())
	);
}

#[tokio::test]
async fn custom_host_resolver_drives_the_exchange() {
	let mut harness = Harness::new(fresh_identity(), StubRegistry::issuing(REFRESH_TOKEN))
		.with_cached(IdentityToken::new("mockToken", epoch() + Duration::hours(1)));

	harness.provider = harness
		.provider
		.with_host_resolver(Arc::new(|_: &str| Ok::<_, ReferenceError>(REGISTRY_HOST.to_owned())));

	let credential =
		harness.provider.provide("artifact").await.expect("Provide should use the custom host.");

	assert_eq!(credential.password.expose(), REFRESH_TOKEN);
	assert_eq!(harness.identity.calls(), 0);
	assert_eq!(harness.registry.exchanges()[0].service, REGISTRY_HOST);
}

#[tokio::test]
async fn custom_host_resolver_failures_are_wrapped() {
	let mut harness = Harness::new(fresh_identity(), StubRegistry::issuing(REFRESH_TOKEN));

	harness.provider = harness.provider.with_host_resolver(Arc::new(|_: &str| {
		Err::<String, _>(ReferenceError::InvalidRegistry { host: "invalid hostname".into() })
	}));

	let err = harness.provider.provide("artifact").await.expect_err("Resolver errors should surface.");

	assert!(matches!(err, Error::HostResolution(ReferenceError::InvalidRegistry { .. })));
	assert!(harness.registry.builds().is_empty());
}

#[tokio::test]
async fn factory_failure_is_a_client_construction_error() {
	let registry =
		StubRegistry::new(RegistryBehavior::FailBuild("failed to create authentication client".into()));
	let harness = Harness::new(fresh_identity(), registry);
	let err = harness.provider.provide(REFERENCE).await.expect_err("Factory errors should surface.");

	match err {
		Error::ClientConstruction { source } =>
			assert_eq!(source.to_string(), "failed to create authentication client"),
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(harness.registry.builds(), vec!["https://myregistry.azurecr.io/".to_owned()]);
	assert!(harness.sink.hosts().is_empty());
}

#[tokio::test]
async fn exchange_failure_is_a_registry_exchange_error() {
	let registry = StubRegistry::new(RegistryBehavior::FailExchange("unauthorized".into()));
	let harness = Harness::new(fresh_identity(), registry);
	let err = harness.provider.provide(REFERENCE).await.expect_err("Exchange errors should surface.");

	assert!(matches!(err, Error::RegistryExchange { .. }));
	assert!(harness.sink.hosts().is_empty());
	// The refreshed identity token stays cached even though the exchange failed.
	assert!(harness.provider.enabled());
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_token() {
	let stale = IdentityToken::new("mockToken", epoch() - Duration::minutes(1));
	let harness = Harness::new(
		StubIdentitySource::failing("identity provider unavailable"),
		StubRegistry::issuing(REFRESH_TOKEN),
	)
	.with_cached(stale.clone());
	let err = harness.provider.provide(REFERENCE).await.expect_err("A failed refresh should surface.");

	match err {
		Error::IdentityTokenRefresh { source } =>
			assert_eq!(source.to_string(), "identity provider unavailable"),
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(harness.provider.cached_token(), Some(stale));
	assert!(harness.registry.builds().is_empty());
	assert_eq!(harness.provider.metrics.identity_refresh_failures(), 1);
}

#[tokio::test]
async fn concurrent_stale_callers_share_one_refresh() {
	let harness =
		Harness::new(fresh_identity().yielding(), StubRegistry::issuing(REFRESH_TOKEN));
	let (first, second) =
		tokio::join!(harness.provider.provide(REFERENCE), harness.provider.provide(REFERENCE));

	first.expect("First concurrent provide should succeed.");
	second.expect("Second concurrent provide should succeed.");

	assert_eq!(harness.identity.calls(), 1);
	assert_eq!(harness.registry.exchanges().len(), 2);
	assert_eq!(harness.provider.metrics.successes(), 2);
}

#[tokio::test]
async fn prime_warms_the_cache() {
	let harness = Harness::new(fresh_identity(), StubRegistry::issuing(REFRESH_TOKEN));

	assert!(!harness.provider.enabled());

	harness.provider.prime().await.expect("Prime should fetch an identity token.");

	assert!(harness.provider.enabled());
	assert_eq!(harness.identity.calls(), 1);

	harness.provider.prime().await.expect("Prime on a warm cache should be a no-op.");

	assert_eq!(harness.identity.calls(), 1);
	assert!(harness.registry.builds().is_empty());
}
