//! Demonstrates validating a workload environment, then trading a projected federated token for
//! a registry credential against a local mock of both the identity provider and the registry.

// std
use std::{collections::BTreeMap, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use acr_workload_identity::{
	WorkloadIdentityProvider,
	config::{
		AZURE_AUTHORITY_HOST, AZURE_CLIENT_ID, AZURE_FEDERATED_TOKEN_FILE, AZURE_TENANT_ID,
		PROVIDER_NAME, ProviderSettings,
	},
	http::ReqwestHttpClient,
	identity::FederatedTokenSource,
	registry::{RegistryClientFactory, RegistryClientOptions, ReqwestRegistryClientFactory},
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/demo-tenant/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-aad\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let exchange_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/exchange");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"refresh_token\":\"demo-refresh\"}");
		})
		.await;
	let token_file = std::env::temp_dir().join("acr-workload-identity-demo-token");

	std::fs::write(&token_file, "demo-federated-assertion")?;

	let env = BTreeMap::from([
		(AZURE_TENANT_ID.to_owned(), "demo-tenant".to_owned()),
		(AZURE_CLIENT_ID.to_owned(), "demo-client".to_owned()),
		(AZURE_FEDERATED_TOKEN_FILE.to_owned(), token_file.display().to_string()),
		(AZURE_AUTHORITY_HOST.to_owned(), server.base_url()),
	]);
	let settings = ProviderSettings::from_config(json!({ "name": PROVIDER_NAME }), &env)?;
	// The mock server presents a self-signed certificate.
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let identity = FederatedTokenSource::new(settings.federated_token_file, settings.authority_host)
		.with_http_client(http_client.clone());
	let mock_registry = Url::parse(&server.base_url())?;
	let factory = ReqwestRegistryClientFactory::with_http_client(http_client);
	let provider = WorkloadIdentityProvider::with_collaborators(
		settings.tenant_id,
		settings.client_id,
		Arc::new(identity),
		Arc::new(move |_: &Url, options: &RegistryClientOptions| {
			factory.new_client(&mock_registry, options)
		}),
	);
	let credential = provider.provide("myregistry.azurecr.io/hello-world:latest").await?;

	println!(
		"Registry login {} / {} valid until {}.",
		credential.username,
		credential.password.expose(),
		credential.expires_on
	);

	token_mock.assert_async().await;
	exchange_mock.assert_async().await;

	Ok(())
}
